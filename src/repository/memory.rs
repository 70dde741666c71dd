use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{Booking, BookingPatch, BookingStatus};
use crate::repository::BookingRepository;

/// In-memory double for [`BookingRepository`], honoring the same filter and
/// ordering semantics as the SQLite implementation. Used by unit and
/// integration tests to exercise the service without a database file.
#[derive(Default)]
pub struct InMemoryBookingRepository {
    bookings: Mutex<BTreeMap<String, Booking>>,
}

impl InMemoryBookingRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn sorted_by_creation(mut bookings: Vec<Booking>) -> Vec<Booking> {
        bookings.sort_by(|a, b| (a.created_at, &a.id).cmp(&(b.created_at, &b.id)));
        bookings
    }
}

#[async_trait]
impl BookingRepository for InMemoryBookingRepository {
    async fn create(&self, mut booking: Booking) -> Result<Booking, AppError> {
        let now = Utc::now();
        booking.id = Uuid::new_v4().to_string();
        booking.created_at = now;
        booking.updated_at = now;

        self.bookings
            .lock()
            .unwrap()
            .insert(booking.id.clone(), booking.clone());
        Ok(booking)
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Booking>, AppError> {
        Ok(self.bookings.lock().unwrap().get(id).cloned())
    }

    async fn update(&self, id: &str, patch: BookingPatch) -> Result<Option<Booking>, AppError> {
        let mut bookings = self.bookings.lock().unwrap();
        let Some(booking) = bookings.get_mut(id) else {
            return Ok(None);
        };

        if let Some(start_time) = patch.start_time {
            booking.start_time = start_time;
        }
        if let Some(end_time) = patch.end_time {
            booking.end_time = end_time;
        }
        if let Some(service_type) = patch.service_type {
            booking.service_type = service_type;
        }
        if let Some(notes) = patch.notes {
            booking.notes = Some(notes);
        }
        booking.updated_at = Utc::now();

        Ok(Some(booking.clone()))
    }

    async fn cancel(&self, id: &str) -> Result<bool, AppError> {
        let mut bookings = self.bookings.lock().unwrap();
        match bookings.get_mut(id) {
            Some(booking) if booking.status != BookingStatus::Cancelled => {
                booking.status = BookingStatus::Cancelled;
                booking.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list_by_user(&self, user_id: &str) -> Result<Vec<Booking>, AppError> {
        let bookings = self.bookings.lock().unwrap();
        let matches = bookings
            .values()
            .filter(|b| b.user_id == user_id)
            .cloned()
            .collect();
        Ok(Self::sorted_by_creation(matches))
    }

    async fn list_by_barber(
        &self,
        barber_id: &str,
        day: Option<NaiveDate>,
    ) -> Result<Vec<Booking>, AppError> {
        let (day_start, day_end) = match day {
            Some(day) => {
                let start = day.and_time(chrono::NaiveTime::MIN).and_utc();
                (Some(start), Some(start + chrono::Duration::hours(24)))
            }
            None => (None, None),
        };

        let bookings = self.bookings.lock().unwrap();
        let matches = bookings
            .values()
            .filter(|b| b.barber_id == barber_id)
            .filter(|b| match (day_start, day_end) {
                (Some(start), Some(end)) => b.start_time >= start && b.start_time < end,
                _ => true,
            })
            .cloned()
            .collect();
        Ok(Self::sorted_by_creation(matches))
    }

    async fn list_overlapping(
        &self,
        barber_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Booking>, AppError> {
        let bookings = self.bookings.lock().unwrap();
        let mut matches: Vec<Booking> = bookings
            .values()
            .filter(|b| b.barber_id == barber_id && b.status != BookingStatus::Cancelled)
            .filter(|b| {
                (b.start_time >= start && b.start_time < end)
                    || (b.end_time > start && b.end_time <= end)
                    || (b.start_time <= start && b.end_time >= end)
            })
            .cloned()
            .collect();
        matches.sort_by(|a, b| a.start_time.cmp(&b.start_time));
        Ok(matches)
    }
}
