use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use super::enums::AppointmentStatus;

/// Appointment as read from the appointment repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppointmentRecord {
    pub id: String,
    pub veterinarian_id: String,
    pub veterinarian_name: String,
    pub pet_name: String,
    pub reason: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub status: AppointmentStatus,
}

impl AppointmentRecord {
    /// Whether this appointment occupies the given (vet, date, time) slot.
    pub fn occupies(&self, veterinarian_id: &str, date: NaiveDate, time: NaiveTime) -> bool {
        self.status.is_active()
            && self.veterinarian_id == veterinarian_id
            && self.date == date
            && self.time == time
    }
}

/// New appointment to be written by the repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAppointment {
    pub veterinarian_id: String,
    pub pet_name: String,
    pub reason: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
}

/// Candidate slot under edit in the booking form. Any field may be unset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotCandidate {
    pub veterinarian_id: Option<String>,
    pub date: Option<NaiveDate>,
    pub time: Option<NaiveTime>,
}

impl SlotCandidate {
    pub fn new(veterinarian_id: impl Into<String>, date: NaiveDate, time: NaiveTime) -> Self {
        Self {
            veterinarian_id: Some(veterinarian_id.into()),
            date: Some(date),
            time: Some(time),
        }
    }

    /// All three fields, or `None` when the candidate is incomplete.
    /// An empty veterinarian id counts as unset.
    pub fn complete(&self) -> Option<(&str, NaiveDate, NaiveTime)> {
        let vet = self.veterinarian_id.as_deref().filter(|v| !v.is_empty())?;
        Some((vet, self.date?, self.time?))
    }
}

/// Parse an `HH:MM` time-of-day string.
pub fn parse_time(raw: &str) -> Result<NaiveTime, super::ModelError> {
    NaiveTime::parse_from_str(raw, "%H:%M").map_err(|_| super::ModelError::InvalidValue {
        field: "time".into(),
        value: raw.into(),
    })
}

/// Parse a `YYYY-MM-DD` date string.
pub fn parse_date(raw: &str) -> Result<NaiveDate, super::ModelError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| super::ModelError::InvalidValue {
        field: "date".into(),
        value: raw.into(),
    })
}
