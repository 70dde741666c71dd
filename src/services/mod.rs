pub mod availability;
pub mod booking;

pub use booking::BookingService;
