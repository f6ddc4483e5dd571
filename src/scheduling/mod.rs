pub mod conflict;
pub mod repository;
pub mod slots;

pub use conflict::{check_conflict, ConflictChecker, ConflictWarning};
pub use repository::{AppointmentRepository, InMemoryAppointmentRepository, RepositoryError};
pub use slots::{available_slots, generate_slots, slots_by_band, TimeSlot};
