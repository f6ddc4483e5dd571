//! Application state shared by every screen of the clinic console.
//!
//! `ClinicState` bundles the session gate, the conflict checker and the
//! schedule configuration. It is built once at startup and wrapped in
//! `Arc`; all session reads go through the gate's `RwLock`.

use std::sync::Arc;

use chrono::NaiveDate;

use crate::auth::{AuthError, CredentialStore, SessionGate, SignalListener};
use crate::authorization::{self, Affordance, Route, RouteDecision};
use crate::config::{ClinicConfig, ConfigError};
use crate::db::DatabaseError;
use crate::models::SlotCandidate;
use crate::scheduling::{
    self, AppointmentRepository, ConflictChecker, ConflictWarning, TimeSlot,
};
use crate::session_cache::{CacheError, FileStore, KeyValueStore, PersistentSessionCache};

// ═══════════════════════════════════════════════════════════
// ClinicState
// ═══════════════════════════════════════════════════════════

pub struct ClinicState {
    config: ClinicConfig,
    gate: Arc<SessionGate>,
    checker: ConflictChecker<Arc<dyn AppointmentRepository>>,
}

impl ClinicState {
    /// Assemble state from already-built parts.
    pub fn new(
        config: ClinicConfig,
        gate: Arc<SessionGate>,
        repository: Arc<dyn AppointmentRepository>,
    ) -> Self {
        Self {
            config,
            gate,
            checker: ConflictChecker::new(repository),
        }
    }

    /// Restore the session from the on-disk cache and wire the repository.
    pub fn bootstrap(
        config: ClinicConfig,
        store: Arc<dyn CredentialStore>,
        repository: Arc<dyn AppointmentRepository>,
    ) -> Self {
        let cache_store = FileStore::new(config.session_cache_path.clone());
        Self::with_cache_store(config, store, repository, cache_store)
    }

    /// Like `bootstrap`, with an explicit backing store for the session cache.
    pub fn with_cache_store(
        config: ClinicConfig,
        store: Arc<dyn CredentialStore>,
        repository: Arc<dyn AppointmentRepository>,
        cache_store: impl KeyValueStore + 'static,
    ) -> Self {
        let cache = PersistentSessionCache::new(cache_store);
        let gate = Arc::new(SessionGate::restore(store, cache));
        Self::new(config, gate, repository)
    }

    pub fn config(&self) -> &ClinicConfig {
        &self.config
    }

    pub fn gate(&self) -> &Arc<SessionGate> {
        &self.gate
    }

    /// Start applying credential store signals to the gate.
    pub fn listen(&self) -> SignalListener {
        self.gate.listen()
    }

    // ── Authorization ───────────────────────────────────────

    pub fn guard(&self, route: Route) -> RouteDecision {
        authorization::guard(&self.gate, route)
    }

    pub fn can(&self, affordance: Affordance) -> bool {
        authorization::can(&self.gate, affordance)
    }

    /// Navigation entries for the current role.
    pub fn visible_routes(&self) -> Vec<Route> {
        authorization::visible_routes(self.gate.current_role())
    }

    // ── Scheduling ──────────────────────────────────────────

    /// Advisory double-booking check for the booking form.
    pub fn check_slot(&self, candidate: &SlotCandidate) -> Option<ConflictWarning> {
        self.checker.check(candidate)
    }

    pub fn slot_catalog(&self) -> Vec<TimeSlot> {
        scheduling::generate_slots(&self.config.schedule)
    }

    /// Catalog slots the vet still has free on `date`.
    /// Falls back to the full catalog when the repository is unavailable.
    pub fn available_slots(&self, veterinarian_id: &str, date: NaiveDate) -> Vec<TimeSlot> {
        match self.checker.repository().list_for_day(veterinarian_id, date) {
            Ok(appointments) => {
                scheduling::available_slots(&self.config.schedule, veterinarian_id, date, &appointments)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Appointment repository unavailable; showing full catalog");
                self.slot_catalog()
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Error type
// ═══════════════════════════════════════════════════════════

/// Errors surfaced while starting or running the console.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
    #[error("Session cache error: {0}")]
    Cache(#[from] CacheError),
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),
}
