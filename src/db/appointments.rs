//! SQLite-backed appointment repository (local store / offline mode).

use std::path::Path;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::{open_database, open_memory_database, DatabaseError};
use crate::models::{parse_date, parse_time, AppointmentRecord, AppointmentStatus, NewAppointment};
use crate::scheduling::repository::{
    demo_appointments, AppointmentRepository, RepositoryError, DEMO_VETERINARIANS,
};

const SELECT_APPOINTMENTS: &str =
    "SELECT a.id, a.veterinarian_id, v.name, a.pet_name, a.reason, a.date, a.time, a.status
     FROM appointments a
     JOIN veterinarians v ON v.id = a.veterinarian_id";

/// Raw row before date/time/status parsing.
type RawRow = (String, String, String, String, String, String, String, String);

pub struct SqliteAppointmentRepository {
    conn: Mutex<Connection>,
}

impl SqliteAppointmentRepository {
    pub fn open(path: &Path) -> Result<Self, DatabaseError> {
        Ok(Self::from_connection(open_database(path)?))
    }

    pub fn in_memory() -> Result<Self, DatabaseError> {
        Ok(Self::from_connection(open_memory_database()?))
    }

    /// Wrap an already-migrated connection.
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, DatabaseError> {
        self.conn.lock().map_err(|_| DatabaseError::LockPoisoned)
    }

    pub fn insert_veterinarian(
        &self,
        id: &str,
        name: &str,
        specialty: Option<&str>,
    ) -> Result<(), DatabaseError> {
        self.conn()?.execute(
            "INSERT INTO veterinarians (id, name, specialty) VALUES (?1, ?2, ?3)",
            params![id, name, specialty],
        )?;
        Ok(())
    }

    /// Store a new booking as `scheduled` and return its id.
    /// Double bookings are not rejected here.
    pub fn create_appointment(&self, new: &NewAppointment) -> Result<String, DatabaseError> {
        let id = Uuid::new_v4().to_string();
        self.conn()?.execute(
            "INSERT INTO appointments (id, veterinarian_id, pet_name, reason, date, time, status)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'scheduled')",
            params![
                id,
                new.veterinarian_id,
                new.pet_name,
                new.reason,
                new.date.to_string(),
                new.time.format("%H:%M").to_string(),
            ],
        )?;
        Ok(id)
    }

    pub fn update_status(&self, id: &str, status: AppointmentStatus) -> Result<(), DatabaseError> {
        let changed = self.conn()?.execute(
            "UPDATE appointments SET status = ?1 WHERE id = ?2",
            params![status.as_str(), id],
        )?;
        if changed == 0 {
            return Err(DatabaseError::NotFound {
                entity_type: "Appointment".into(),
                id: id.into(),
            });
        }
        Ok(())
    }

    pub fn get_appointment(&self, id: &str) -> Result<Option<AppointmentRecord>, DatabaseError> {
        let conn = self.conn()?;
        let raw = conn
            .query_row(
                &format!("{SELECT_APPOINTMENTS} WHERE a.id = ?1"),
                params![id],
                read_raw,
            )
            .optional()?;
        raw.map(into_record).transpose()
    }

    /// Load the demo veterinarians and appointments into an empty database.
    /// Returns false when data already exists.
    pub fn seed_demo_data(&self) -> Result<bool, DatabaseError> {
        let mut conn = self.conn()?;
        let existing: i64 = conn.query_row("SELECT COUNT(*) FROM veterinarians", [], |row| row.get(0))?;
        if existing > 0 {
            return Ok(false);
        }

        let tx = conn.transaction()?;
        for (id, name, specialty) in DEMO_VETERINARIANS {
            tx.execute(
                "INSERT INTO veterinarians (id, name, specialty) VALUES (?1, ?2, ?3)",
                params![id, name, specialty],
            )?;
        }
        for appt in demo_appointments() {
            tx.execute(
                "INSERT INTO appointments (id, veterinarian_id, pet_name, reason, date, time, status)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    appt.id,
                    appt.veterinarian_id,
                    appt.pet_name,
                    appt.reason,
                    appt.date.to_string(),
                    appt.time.format("%H:%M").to_string(),
                    appt.status.as_str(),
                ],
            )?;
        }
        tx.commit()?;
        tracing::info!("Seeded demo clinic data");
        Ok(true)
    }

    /// Rows that fail to parse are skipped with a warning so one bad
    /// record cannot hide the rest of the day from the conflict check.
    fn query(&self, sql: &str, args: &[&dyn rusqlite::ToSql]) -> Result<Vec<AppointmentRecord>, DatabaseError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
            .query_map(args, read_raw)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows
            .into_iter()
            .filter_map(|raw| {
                let id = raw.0.clone();
                match into_record(raw) {
                    Ok(record) => Some(record),
                    Err(e) => {
                        tracing::warn!(appointment_id = %id, error = %e, "Skipping unreadable appointment row");
                        None
                    }
                }
            })
            .collect())
    }
}

fn read_raw(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
    ))
}

fn into_record(raw: RawRow) -> Result<AppointmentRecord, DatabaseError> {
    let (id, veterinarian_id, veterinarian_name, pet_name, reason, date, time, status) = raw;
    Ok(AppointmentRecord {
        id,
        veterinarian_id,
        veterinarian_name,
        pet_name,
        reason,
        date: parse_date(&date)?,
        time: parse_time(&time)?,
        status: AppointmentStatus::from_str(&status)?,
    })
}

impl AppointmentRepository for SqliteAppointmentRepository {
    fn list_appointments(&self) -> Result<Vec<AppointmentRecord>, RepositoryError> {
        Ok(self.query(
            &format!("{SELECT_APPOINTMENTS} ORDER BY a.date, a.time, a.rowid"),
            &[],
        )?)
    }

    fn list_for_day(
        &self,
        veterinarian_id: &str,
        date: NaiveDate,
    ) -> Result<Vec<AppointmentRecord>, RepositoryError> {
        let date = date.to_string();
        Ok(self.query(
            &format!(
                "{SELECT_APPOINTMENTS} WHERE a.veterinarian_id = ?1 AND a.date = ?2
                 ORDER BY a.time, a.rowid"
            ),
            &[&veterinarian_id, &date],
        )?)
    }
}
