use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Timelike, Utc};
use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{Booking, BookingPatch, BookingStatus, ServiceType};
use crate::repository::BookingRepository;

const BOOKING_COLUMNS: &str = "id, user_id, barber_id, start_time, end_time, service_type, status, notes, created_at, updated_at";

pub struct SqliteBookingRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteBookingRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }
}

/// Timestamps are stored as fixed-width RFC3339 UTC text so that string
/// comparison in SQL matches chronological order.
fn fmt_ts(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

fn parse_ts(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn store_now() -> DateTime<Utc> {
    // Truncated to whole seconds to match the stored representation.
    Utc::now().with_nanosecond(0).unwrap_or_else(Utc::now)
}

fn parse_booking_row(row: &rusqlite::Row) -> rusqlite::Result<Booking> {
    let start_time_str: String = row.get(3)?;
    let end_time_str: String = row.get(4)?;
    let service_type_str: String = row.get(5)?;
    let status_str: String = row.get(6)?;
    let created_at_str: String = row.get(8)?;
    let updated_at_str: String = row.get(9)?;

    Ok(Booking {
        id: row.get(0)?,
        user_id: row.get(1)?,
        barber_id: row.get(2)?,
        start_time: parse_ts(&start_time_str),
        end_time: parse_ts(&end_time_str),
        service_type: ServiceType::parse(&service_type_str),
        status: BookingStatus::parse(&status_str),
        notes: row.get(7)?,
        created_at: parse_ts(&created_at_str),
        updated_at: parse_ts(&updated_at_str),
    })
}

fn collect_bookings(
    rows: impl Iterator<Item = rusqlite::Result<Booking>>,
) -> Result<Vec<Booking>, AppError> {
    let mut bookings = vec![];
    for row in rows {
        bookings.push(row?);
    }
    Ok(bookings)
}

#[async_trait]
impl BookingRepository for SqliteBookingRepository {
    async fn create(&self, mut booking: Booking) -> Result<Booking, AppError> {
        let now = store_now();
        booking.id = Uuid::new_v4().to_string();
        booking.created_at = now;
        booking.updated_at = now;

        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO bookings (id, user_id, barber_id, start_time, end_time, service_type, status, notes, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                booking.id,
                booking.user_id,
                booking.barber_id,
                fmt_ts(&booking.start_time),
                fmt_ts(&booking.end_time),
                booking.service_type.as_str(),
                booking.status.as_str(),
                booking.notes,
                fmt_ts(&booking.created_at),
                fmt_ts(&booking.updated_at),
            ],
        )?;

        Ok(booking)
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Booking>, AppError> {
        let conn = self.conn.lock().unwrap();
        let result = conn.query_row(
            &format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ?1"),
            params![id],
            parse_booking_row,
        );

        match result {
            Ok(booking) => Ok(Some(booking)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn update(&self, id: &str, patch: BookingPatch) -> Result<Option<Booking>, AppError> {
        let mut sets: Vec<String> = vec![];
        let mut values: Vec<Box<dyn rusqlite::types::ToSql + Send>> = vec![];

        if let Some(start_time) = &patch.start_time {
            sets.push(format!("start_time = ?{}", values.len() + 1));
            values.push(Box::new(fmt_ts(start_time)));
        }
        if let Some(end_time) = &patch.end_time {
            sets.push(format!("end_time = ?{}", values.len() + 1));
            values.push(Box::new(fmt_ts(end_time)));
        }
        if let Some(service_type) = &patch.service_type {
            sets.push(format!("service_type = ?{}", values.len() + 1));
            values.push(Box::new(service_type.as_str().to_string()));
        }
        if let Some(notes) = &patch.notes {
            sets.push(format!("notes = ?{}", values.len() + 1));
            values.push(Box::new(notes.clone()));
        }

        sets.push(format!("updated_at = ?{}", values.len() + 1));
        values.push(Box::new(fmt_ts(&store_now())));

        let id_param = values.len() + 1;
        values.push(Box::new(id.to_string()));

        let changed = {
            let conn = self.conn.lock().unwrap();
            let sql = format!(
                "UPDATE bookings SET {} WHERE id = ?{id_param}",
                sets.join(", ")
            );
            let params_refs: Vec<&dyn rusqlite::types::ToSql> =
                values.iter().map(|p| p.as_ref() as &dyn rusqlite::types::ToSql).collect();
            conn.execute(&sql, params_refs.as_slice())?
        };

        if changed == 0 {
            return Ok(None);
        }
        self.get_by_id(id).await
    }

    async fn cancel(&self, id: &str) -> Result<bool, AppError> {
        let conn = self.conn.lock().unwrap();
        let count = conn.execute(
            "UPDATE bookings SET status = 'cancelled', updated_at = ?1
             WHERE id = ?2 AND status != 'cancelled'",
            params![fmt_ts(&store_now()), id],
        )?;
        Ok(count > 0)
    }

    async fn list_by_user(&self, user_id: &str) -> Result<Vec<Booking>, AppError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE user_id = ?1 ORDER BY created_at ASC, id ASC"
        ))?;
        let rows = stmt.query_map(params![user_id], parse_booking_row)?;
        collect_bookings(rows)
    }

    async fn list_by_barber(
        &self,
        barber_id: &str,
        day: Option<NaiveDate>,
    ) -> Result<Vec<Booking>, AppError> {
        let conn = self.conn.lock().unwrap();

        match day {
            Some(day) => {
                let day_start = day.and_time(chrono::NaiveTime::MIN).and_utc();
                let day_end = day_start + chrono::Duration::hours(24);

                let mut stmt = conn.prepare(&format!(
                    "SELECT {BOOKING_COLUMNS} FROM bookings
                     WHERE barber_id = ?1 AND start_time >= ?2 AND start_time < ?3
                     ORDER BY created_at ASC, id ASC"
                ))?;
                let rows = stmt.query_map(
                    params![barber_id, fmt_ts(&day_start), fmt_ts(&day_end)],
                    parse_booking_row,
                )?;
                collect_bookings(rows)
            }
            None => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {BOOKING_COLUMNS} FROM bookings WHERE barber_id = ?1
                     ORDER BY created_at ASC, id ASC"
                ))?;
                let rows = stmt.query_map(params![barber_id], parse_booking_row)?;
                collect_bookings(rows)
            }
        }
    }

    async fn list_overlapping(
        &self,
        barber_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Booking>, AppError> {
        let conn = self.conn.lock().unwrap();
        // Three interval shapes intersect [start, end): those starting inside
        // it, those ending inside it, and those spanning it entirely.
        let mut stmt = conn.prepare(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings
             WHERE barber_id = ?1 AND status != 'cancelled'
               AND ((start_time >= ?2 AND start_time < ?3)
                 OR (end_time > ?2 AND end_time <= ?3)
                 OR (start_time <= ?2 AND end_time >= ?3))
             ORDER BY start_time ASC"
        ))?;
        let rows = stmt.query_map(
            params![barber_id, fmt_ts(&start), fmt_ts(&end)],
            parse_booking_row,
        )?;
        collect_bookings(rows)
    }
}
