pub mod appointments;
pub mod sqlite;

pub use appointments::SqliteAppointmentRepository;
pub use sqlite::*;

use thiserror::Error;

use crate::models::ModelError;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound { entity_type: String, id: String },

    #[error("Corrupt row: {0}")]
    Model(#[from] ModelError),

    #[error("Migration failed at version {version}: {reason}")]
    MigrationFailed { version: i64, reason: String },

    #[error("Cannot prepare database location: {0}")]
    Io(String),

    #[error("Connection lock poisoned")]
    LockPoisoned,
}
