pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::errors::AppError;
use crate::models::{Booking, BookingPatch};

pub use memory::InMemoryBookingRepository;
pub use sqlite::SqliteBookingRepository;

/// Persistence contract for bookings. The store owns id generation and the
/// created/updated timestamps; callers never write those fields directly.
#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// Persists a new booking, assigning its id and timestamps.
    async fn create(&self, booking: Booking) -> Result<Booking, AppError>;

    async fn get_by_id(&self, id: &str) -> Result<Option<Booking>, AppError>;

    /// Applies the supplied fields only, refreshes `updated_at`, and returns
    /// the updated booking, or `None` if the id does not exist.
    async fn update(&self, id: &str, patch: BookingPatch) -> Result<Option<Booking>, AppError>;

    /// Soft-cancels a booking. Returns whether a record actually changed;
    /// missing or already-cancelled ids report `false` rather than erroring.
    async fn cancel(&self, id: &str) -> Result<bool, AppError>;

    async fn list_by_user(&self, user_id: &str) -> Result<Vec<Booking>, AppError>;

    /// All bookings for a barber, optionally restricted to the given day's
    /// `[00:00, +24h)` window.
    async fn list_by_barber(
        &self,
        barber_id: &str,
        day: Option<NaiveDate>,
    ) -> Result<Vec<Booking>, AppError>;

    /// Non-cancelled bookings for a barber whose interval intersects
    /// `[start, end)`. The filter must be the three-way OR: booking starts
    /// inside the window, booking ends inside it, or booking fully spans it.
    /// A single range clause misses the latter two shapes.
    async fn list_overlapping(
        &self,
        barber_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Booking>, AppError>;
}
