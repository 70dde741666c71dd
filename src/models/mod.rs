pub mod booking;

pub use booking::{
    calculate_end_time, Booking, BookingPatch, BookingStatus, ServiceType, TimeSlot,
};
