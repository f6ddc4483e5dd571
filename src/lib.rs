pub mod auth; // Session gate, credential store, signals
pub mod authorization; // Route + affordance rules
pub mod config;
pub mod core_state; // Shared application state
pub mod db;
pub mod models;
pub mod scheduling; // Slot catalog + conflict check
pub mod session_cache;

use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use auth::{CredentialStore, MockCredentialStore};
use core_state::{ClinicState, CoreError};
use db::SqliteAppointmentRepository;
use scheduling::AppointmentRepository;

/// Install the global fmt subscriber. `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();
}

/// Start the clinic console core against the local store and mock
/// credential service, report the restored state, then shut down.
pub async fn run() -> Result<(), CoreError> {
    init_tracing();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let config = config::ClinicConfig::load(&config::config_path())?;

    let repository = SqliteAppointmentRepository::open(&config.database_path)?;
    repository.seed_demo_data()?;
    let repository: Arc<dyn AppointmentRepository> = Arc::new(repository);

    let store: Arc<dyn CredentialStore> = Arc::new(MockCredentialStore::seeded());
    let state = ClinicState::bootstrap(config, store, repository);
    let listener = state.listen();

    match state.gate().current_identity() {
        Some(identity) => tracing::info!(
            user = %identity.name,
            role = %identity.role,
            routes = ?state.visible_routes(),
            "Session active"
        ),
        None => tracing::info!("No cached session; login required"),
    }

    for (band, slots) in scheduling::slots_by_band(&state.config().schedule) {
        let labels: Vec<String> = slots.iter().map(|s| s.label()).collect();
        tracing::info!(%band, slots = %labels.join(" "), "Slot catalog");
    }

    listener.shutdown_and_wait().await;
    tracing::info!("{} stopped", config::APP_NAME);
    Ok(())
}
