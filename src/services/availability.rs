use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};

use crate::models::{Booking, BookingStatus, TimeSlot};

/// Working hours: 09:00 to 17:00 on the requested day.
const WORK_START_HOUR: i64 = 9;
const WORK_END_HOUR: i64 = 17;
const SLOT_MINUTES: i64 = 30;

/// Two half-open intervals `[s1, e1)` and `[s2, e2)` overlap iff neither ends
/// at or before the other begins. Touching boundaries do not overlap.
pub fn overlaps(
    s1: DateTime<Utc>,
    e1: DateTime<Utc>,
    s2: DateTime<Utc>,
    e2: DateTime<Utc>,
) -> bool {
    s1 < e2 && s2 < e1
}

/// Whether a booking blocks the interval `[start, end)`. Cancelled bookings
/// never block anything.
pub fn booking_conflicts(booking: &Booking, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
    booking.status != BookingStatus::Cancelled
        && overlaps(booking.start_time, booking.end_time, start, end)
}

/// Enumerates the free 30-minute slots within working hours on `date`,
/// judged against the given day's bookings. Chronological order; may be empty.
pub fn available_slots(date: NaiveDate, bookings: &[Booking]) -> Vec<TimeSlot> {
    let midnight = date.and_time(NaiveTime::MIN).and_utc();
    let work_start = midnight + Duration::hours(WORK_START_HOUR);
    let work_end = midnight + Duration::hours(WORK_END_HOUR);

    let mut slots = vec![];
    let mut slot_start = work_start;
    while slot_start < work_end {
        let slot_end = slot_start + Duration::minutes(SLOT_MINUTES);

        let is_free = !bookings
            .iter()
            .any(|b| booking_conflicts(b, slot_start, slot_end));

        if is_free {
            slots.push(TimeSlot {
                start_time: slot_start,
                end_time: slot_end,
            });
        }

        slot_start = slot_end;
    }

    slots
}
