//! Advisory double-booking check for the booking form.
//!
//! A conflict is an active appointment on exactly the candidate's
//! (veterinarian, date, time) slot. Slots are quantized, so no overlap
//! math is needed. The check warns; it never blocks submission.

use std::fmt;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use super::repository::AppointmentRepository;
use crate::models::{AppointmentRecord, SlotCandidate};

/// Display-ready description of the colliding appointment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictWarning {
    pub appointment_id: String,
    pub pet_name: String,
    pub reason: String,
    pub veterinarian_name: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
}

impl ConflictWarning {
    fn from_record(record: &AppointmentRecord) -> Self {
        Self {
            appointment_id: record.id.clone(),
            pet_name: record.pet_name.clone(),
            reason: record.reason.clone(),
            veterinarian_name: record.veterinarian_name.clone(),
            date: record.date,
            time: record.time,
        }
    }

    pub fn message(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ConflictWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Dr. {} already has {} booked on {} at {}",
            self.veterinarian_name,
            self.pet_name,
            self.date.format("%Y-%m-%d"),
            self.time.format("%H:%M"),
        )?;
        if !self.reason.is_empty() {
            write!(f, " ({})", self.reason)?;
        }
        f.write_str(".")
    }
}

/// First active appointment occupying the candidate's slot, in iteration
/// order. `None` for an incomplete candidate.
pub fn check_conflict<'a, I>(candidate: &SlotCandidate, appointments: I) -> Option<ConflictWarning>
where
    I: IntoIterator<Item = &'a AppointmentRecord>,
{
    let (vet, date, time) = candidate.complete()?;
    appointments
        .into_iter()
        .find(|a| a.occupies(vet, date, time))
        .map(ConflictWarning::from_record)
}

/// Conflict check backed by an appointment repository.
///
/// Repository failures fail open: no warning is produced, and the absence
/// of a warning is therefore not a guarantee that the slot is free.
pub struct ConflictChecker<R> {
    repository: R,
}

impl<R: AppointmentRepository> ConflictChecker<R> {
    pub fn new(repository: R) -> Self {
        Self { repository }
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    pub fn check(&self, candidate: &SlotCandidate) -> Option<ConflictWarning> {
        let (vet, date, _) = candidate.complete()?;
        match self.repository.list_for_day(vet, date) {
            Ok(appointments) => check_conflict(candidate, &appointments),
            Err(e) => {
                tracing::warn!(error = %e, "Appointment repository unavailable; skipping conflict check");
                None
            }
        }
    }
}
