//! Bookable time-of-day catalog.
//!
//! Fixed increments from opening hour (inclusive) to closing hour
//! (exclusive), tagged morning / afternoon / evening. Pure: the same
//! configuration always produces the same ordered list.

use chrono::{NaiveDate, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::config::ScheduleConfig;
use crate::models::{AppointmentRecord, SlotBand};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub time: NaiveTime,
    pub band: SlotBand,
}

impl TimeSlot {
    /// `HH:MM`, the form shown in the booking UI and stored by the backend.
    pub fn label(&self) -> String {
        self.time.format("%H:%M").to_string()
    }
}

pub fn band_for(config: &ScheduleConfig, hour: u32) -> SlotBand {
    if hour >= config.evening_start {
        SlotBand::Evening
    } else if hour >= config.afternoon_start {
        SlotBand::Afternoon
    } else {
        SlotBand::Morning
    }
}

/// The full ordered catalog. An invalid configuration yields an empty list.
pub fn generate_slots(config: &ScheduleConfig) -> Vec<TimeSlot> {
    if config.validate().is_err() {
        tracing::warn!(?config, "Invalid schedule configuration; no slots generated");
        return Vec::new();
    }
    let start = config.opening_hour * 60;
    let end = config.closing_hour * 60;
    (start..end)
        .step_by(config.slot_minutes as usize)
        .filter_map(|minute| NaiveTime::from_hms_opt(minute / 60, minute % 60, 0))
        .map(|time| TimeSlot {
            time,
            band: band_for(config, time.hour()),
        })
        .collect()
}

/// Catalog grouped by band, in band order. Empty bands are omitted.
pub fn slots_by_band(config: &ScheduleConfig) -> Vec<(SlotBand, Vec<TimeSlot>)> {
    let mut groups: Vec<(SlotBand, Vec<TimeSlot>)> = Vec::new();
    for slot in generate_slots(config) {
        match groups.last_mut() {
            Some((band, slots)) if *band == slot.band => slots.push(slot),
            _ => groups.push((slot.band, vec![slot])),
        }
    }
    groups
}

pub fn is_catalog_slot(config: &ScheduleConfig, time: NaiveTime) -> bool {
    generate_slots(config).iter().any(|s| s.time == time)
}

/// Catalog slots the vet has free on `date`.
pub fn available_slots<'a, I>(
    config: &ScheduleConfig,
    veterinarian_id: &str,
    date: NaiveDate,
    appointments: I,
) -> Vec<TimeSlot>
where
    I: IntoIterator<Item = &'a AppointmentRecord>,
{
    let taken: Vec<NaiveTime> = appointments
        .into_iter()
        .filter(|a| a.status.is_active() && a.veterinarian_id == veterinarian_id && a.date == date)
        .map(|a| a.time)
        .collect();
    generate_slots(config)
        .into_iter()
        .filter(|slot| !taken.contains(&slot.time))
        .collect()
}
