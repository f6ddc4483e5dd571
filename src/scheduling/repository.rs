//! Appointment repository contract and the in-memory mock dataset.

use std::sync::{Arc, RwLock};

use chrono::{NaiveDate, NaiveTime};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::{AppointmentRecord, AppointmentStatus, NewAppointment};

/// Errors from reading appointments.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Appointment repository unavailable: {0}")]
    Unavailable(String),
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

/// Read access to existing appointments.
pub trait AppointmentRepository: Send + Sync {
    /// Every appointment, active and historical.
    fn list_appointments(&self) -> Result<Vec<AppointmentRecord>, RepositoryError>;

    /// Appointments for one vet on one day.
    fn list_for_day(
        &self,
        veterinarian_id: &str,
        date: NaiveDate,
    ) -> Result<Vec<AppointmentRecord>, RepositoryError> {
        Ok(self
            .list_appointments()?
            .into_iter()
            .filter(|a| a.veterinarian_id == veterinarian_id && a.date == date)
            .collect())
    }
}

impl<R: AppointmentRepository + ?Sized> AppointmentRepository for Arc<R> {
    fn list_appointments(&self) -> Result<Vec<AppointmentRecord>, RepositoryError> {
        (**self).list_appointments()
    }

    fn list_for_day(
        &self,
        veterinarian_id: &str,
        date: NaiveDate,
    ) -> Result<Vec<AppointmentRecord>, RepositoryError> {
        (**self).list_for_day(veterinarian_id, date)
    }
}

// ═══════════════════════════════════════════════════════════
// Mock dataset
// ═══════════════════════════════════════════════════════════

/// Demo veterinarians: (id, name, specialty).
pub const DEMO_VETERINARIANS: &[(&str, &str, &str)] = &[
    ("vet-1", "Maya Ortiz", "Surgery"),
    ("vet-2", "Liam Chen", "Dermatology"),
    ("vet-3", "Priya Nair", "Exotics"),
];

/// Demo appointments: (vet id, pet, reason, date, time, status).
const DEMO_APPOINTMENTS: &[(&str, &str, &str, (i32, u32, u32), (u32, u32), AppointmentStatus)] = &[
    ("vet-1", "Biscuit", "Annual vaccination", (2026, 3, 1), (10, 0), AppointmentStatus::Scheduled),
    ("vet-1", "Luna", "Dental cleaning", (2026, 3, 1), (11, 30), AppointmentStatus::Scheduled),
    ("vet-1", "Mochi", "Limp, left hind leg", (2026, 3, 1), (14, 0), AppointmentStatus::Cancelled),
    ("vet-2", "Pepper", "Itchy skin", (2026, 3, 1), (10, 0), AppointmentStatus::Scheduled),
    ("vet-2", "Rex", "Follow-up", (2026, 2, 27), (9, 0), AppointmentStatus::Completed),
    ("vet-3", "Kiwi", "Beak trim", (2026, 3, 2), (17, 30), AppointmentStatus::Scheduled),
    ("vet-3", "Nibbles", "Weight check", (2026, 2, 28), (16, 0), AppointmentStatus::NoShow),
];

pub fn demo_veterinarian_name(id: &str) -> Option<&'static str> {
    DEMO_VETERINARIANS
        .iter()
        .find(|(vet_id, _, _)| *vet_id == id)
        .map(|(_, name, _)| *name)
}

/// The mock appointment list the clinic console ships with.
pub fn demo_appointments() -> Vec<AppointmentRecord> {
    DEMO_APPOINTMENTS
        .iter()
        .enumerate()
        .filter_map(|(i, (vet, pet, reason, (y, m, d), (hh, mm), status))| {
            Some(AppointmentRecord {
                id: format!("apt-{:03}", i + 1),
                veterinarian_id: (*vet).to_string(),
                veterinarian_name: demo_veterinarian_name(vet)?.to_string(),
                pet_name: (*pet).to_string(),
                reason: (*reason).to_string(),
                date: NaiveDate::from_ymd_opt(*y, *m, *d)?,
                time: NaiveTime::from_hms_opt(*hh, *mm, 0)?,
                status: *status,
            })
        })
        .collect()
}

// ═══════════════════════════════════════════════════════════
// In-memory repository
// ═══════════════════════════════════════════════════════════

/// Repository over an in-memory list, used in offline/demo mode.
#[derive(Debug, Default)]
pub struct InMemoryAppointmentRepository {
    appointments: RwLock<Vec<AppointmentRecord>>,
}

impl InMemoryAppointmentRepository {
    pub fn new(appointments: Vec<AppointmentRecord>) -> Self {
        Self {
            appointments: RwLock::new(appointments),
        }
    }

    pub fn seeded() -> Self {
        Self::new(demo_appointments())
    }

    /// Accept a new booking. Conflicts are not rejected here; the
    /// conflict check is advisory.
    pub fn create(&self, new: NewAppointment, veterinarian_name: &str) -> Result<String, RepositoryError> {
        let id = Uuid::new_v4().to_string();
        let record = AppointmentRecord {
            id: id.clone(),
            veterinarian_id: new.veterinarian_id,
            veterinarian_name: veterinarian_name.to_string(),
            pet_name: new.pet_name,
            reason: new.reason,
            date: new.date,
            time: new.time,
            status: AppointmentStatus::Scheduled,
        };
        self.appointments
            .write()
            .map_err(|_| RepositoryError::Unavailable("lock poisoned".into()))?
            .push(record);
        Ok(id)
    }

    /// Returns false if the appointment does not exist.
    pub fn set_status(&self, id: &str, status: AppointmentStatus) -> bool {
        let Ok(mut appointments) = self.appointments.write() else {
            return false;
        };
        match appointments.iter_mut().find(|a| a.id == id) {
            Some(appointment) => {
                appointment.status = status;
                true
            }
            None => false,
        }
    }
}

impl AppointmentRepository for InMemoryAppointmentRepository {
    fn list_appointments(&self) -> Result<Vec<AppointmentRecord>, RepositoryError> {
        self.appointments
            .read()
            .map(|a| a.clone())
            .map_err(|_| RepositoryError::Unavailable("lock poisoned".into()))
    }
}
