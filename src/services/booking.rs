use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};

use crate::auth::Caller;
use crate::errors::AppError;
use crate::models::{
    calculate_end_time, Booking, BookingPatch, BookingStatus, ServiceType, TimeSlot,
};
use crate::repository::BookingRepository;
use crate::services::availability;

/// Booking lifecycle manager. Stateless: every decision re-reads current
/// state through the repository, so the conflict check and the subsequent
/// write are not atomic (accepted race; exclusivity would need a store-level
/// constraint).
pub struct BookingService {
    repo: Arc<dyn BookingRepository>,
}

impl BookingService {
    pub fn new(repo: Arc<dyn BookingRepository>) -> Self {
        Self { repo }
    }

    pub async fn create_booking(
        &self,
        caller: &Caller,
        user_id: &str,
        barber_id: &str,
        start_time: DateTime<Utc>,
        service_type: ServiceType,
        notes: Option<String>,
    ) -> Result<Booking, AppError> {
        let end_time = calculate_end_time(start_time, service_type);

        let existing = self
            .repo
            .list_overlapping(barber_id, start_time, end_time)
            .await?;
        if !existing.is_empty() {
            return Err(AppError::SchedulingConflict);
        }

        let booking = Booking {
            id: String::new(),
            user_id: user_id.to_string(),
            barber_id: barber_id.to_string(),
            start_time,
            end_time,
            service_type,
            status: BookingStatus::Pending,
            notes,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let created = self.repo.create(booking).await?;

        tracing::info!(
            booking_id = %created.id,
            user_id,
            barber_id,
            start_time = %start_time,
            caller = %caller.user_id,
            "booking created"
        );

        Ok(created)
    }

    pub async fn get_booking(&self, id: &str) -> Result<Booking, AppError> {
        self.repo
            .get_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(id.to_string()))
    }

    /// Partial update. Moving the start or changing the service kind
    /// recomputes the end and re-checks availability before anything is
    /// written; a conflict aborts the whole update. Notes pass through
    /// without any availability check.
    pub async fn update_booking(
        &self,
        caller: &Caller,
        id: &str,
        start_time: Option<DateTime<Utc>>,
        service_type: Option<ServiceType>,
        notes: Option<String>,
    ) -> Result<Booking, AppError> {
        let existing = self
            .repo
            .get_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(id.to_string()))?;

        let mut patch = BookingPatch::default();

        if let Some(new_start) = start_time {
            let effective_type = service_type.unwrap_or(existing.service_type);
            let new_end = calculate_end_time(new_start, effective_type);
            self.ensure_interval_free(&existing, new_start, new_end)
                .await?;
            patch.start_time = Some(new_start);
            patch.end_time = Some(new_end);
        }

        if let Some(new_type) = service_type {
            patch.service_type = Some(new_type);

            // Start unchanged but the service may now run longer: the new end
            // can push into a neighboring booking.
            if start_time.is_none() {
                let new_end = calculate_end_time(existing.start_time, new_type);
                self.ensure_interval_free(&existing, existing.start_time, new_end)
                    .await?;
                patch.end_time = Some(new_end);
            }
        }

        if let Some(notes) = notes {
            patch.notes = Some(notes);
        }

        let updated = self
            .repo
            .update(id, patch)
            .await?
            .ok_or_else(|| AppError::NotFound(id.to_string()))?;

        tracing::info!(booking_id = %id, caller = %caller.user_id, "booking updated");

        Ok(updated)
    }

    /// An overlap query over the barber's schedule always returns the booking
    /// being updated, since it overlaps its own prior interval. It must be
    /// excluded by id before judging the conflict.
    async fn ensure_interval_free(
        &self,
        existing: &Booking,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<(), AppError> {
        let mut conflicts = self
            .repo
            .list_overlapping(&existing.barber_id, start, end)
            .await?;
        conflicts.retain(|b| b.id != existing.id);

        if !conflicts.is_empty() {
            return Err(AppError::SchedulingConflict);
        }
        Ok(())
    }

    /// Idempotent soft cancellation; returns whether a record changed.
    pub async fn cancel_booking(&self, caller: &Caller, id: &str) -> Result<bool, AppError> {
        let changed = self.repo.cancel(id).await?;

        if changed {
            tracing::info!(booking_id = %id, caller = %caller.user_id, "booking cancelled");
        } else {
            tracing::info!(booking_id = %id, "booking not found or already cancelled");
        }

        Ok(changed)
    }

    pub async fn user_bookings(&self, user_id: &str) -> Result<Vec<Booking>, AppError> {
        self.repo.list_by_user(user_id).await
    }

    pub async fn barber_bookings(
        &self,
        barber_id: &str,
        day: Option<NaiveDate>,
    ) -> Result<Vec<Booking>, AppError> {
        self.repo.list_by_barber(barber_id, day).await
    }

    pub async fn available_time_slots(
        &self,
        barber_id: &str,
        date: NaiveDate,
    ) -> Result<Vec<TimeSlot>, AppError> {
        let bookings = self.repo.list_by_barber(barber_id, Some(date)).await?;
        Ok(availability::available_slots(date, &bookings))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryBookingRepository;

    fn service() -> BookingService {
        BookingService::new(Arc::new(InMemoryBookingRepository::new()))
    }

    fn caller(user_id: &str) -> Caller {
        Caller {
            user_id: user_id.to_string(),
            is_barber: false,
        }
    }

    fn ts(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[tokio::test]
    async fn test_create_booking_derives_end_and_status() {
        let svc = service();
        let booking = svc
            .create_booking(
                &caller("user-1"),
                "user-1",
                "barber-1",
                ts("2024-01-01T10:00:00Z"),
                ServiceType::Haircut,
                None,
            )
            .await
            .unwrap();

        assert_eq!(booking.end_time, ts("2024-01-01T10:30:00Z"));
        assert_eq!(booking.status, BookingStatus::Pending);
        assert!(!booking.id.is_empty());
    }

    #[tokio::test]
    async fn test_create_conflicting_booking_fails() {
        let svc = service();
        svc.create_booking(
            &caller("user-1"),
            "user-1",
            "barber-1",
            ts("2024-01-01T10:00:00Z"),
            ServiceType::Haircut,
            None,
        )
        .await
        .unwrap();

        // 10:15 falls inside the 10:00-10:30 haircut, whatever the service.
        let result = svc
            .create_booking(
                &caller("user-2"),
                "user-2",
                "barber-1",
                ts("2024-01-01T10:15:00Z"),
                ServiceType::BeardTrim,
                None,
            )
            .await;
        assert!(matches!(result, Err(AppError::SchedulingConflict)));
    }

    #[tokio::test]
    async fn test_adjacent_bookings_do_not_conflict() {
        let svc = service();
        svc.create_booking(
            &caller("user-1"),
            "user-1",
            "barber-1",
            ts("2024-01-01T10:00:00Z"),
            ServiceType::Haircut,
            None,
        )
        .await
        .unwrap();

        // Starts exactly where the previous one ends.
        svc.create_booking(
            &caller("user-2"),
            "user-2",
            "barber-1",
            ts("2024-01-01T10:30:00Z"),
            ServiceType::Haircut,
            None,
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_other_barber_schedule_is_independent() {
        let svc = service();
        svc.create_booking(
            &caller("user-1"),
            "user-1",
            "barber-1",
            ts("2024-01-01T10:00:00Z"),
            ServiceType::Haircut,
            None,
        )
        .await
        .unwrap();

        svc.create_booking(
            &caller("user-2"),
            "user-2",
            "barber-2",
            ts("2024-01-01T10:00:00Z"),
            ServiceType::Haircut,
            None,
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_cancel_frees_the_slot() {
        let svc = service();
        let first = svc
            .create_booking(
                &caller("user-1"),
                "user-1",
                "barber-1",
                ts("2024-01-01T10:00:00Z"),
                ServiceType::Haircut,
                None,
            )
            .await
            .unwrap();

        let blocked = svc
            .create_booking(
                &caller("user-2"),
                "user-2",
                "barber-1",
                ts("2024-01-01T10:15:00Z"),
                ServiceType::Haircut,
                None,
            )
            .await;
        assert!(matches!(blocked, Err(AppError::SchedulingConflict)));

        assert!(svc.cancel_booking(&caller("user-1"), &first.id).await.unwrap());

        // The exact same interval is now bookable.
        svc.create_booking(
            &caller("user-2"),
            "user-2",
            "barber-1",
            ts("2024-01-01T10:15:00Z"),
            ServiceType::Haircut,
            None,
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_cancel_is_idempotent_and_never_errors() {
        let svc = service();
        let booking = svc
            .create_booking(
                &caller("user-1"),
                "user-1",
                "barber-1",
                ts("2024-01-01T10:00:00Z"),
                ServiceType::Haircut,
                None,
            )
            .await
            .unwrap();

        assert!(svc.cancel_booking(&caller("user-1"), &booking.id).await.unwrap());
        assert!(!svc.cancel_booking(&caller("user-1"), &booking.id).await.unwrap());
        assert!(!svc.cancel_booking(&caller("user-1"), "missing").await.unwrap());
    }

    #[tokio::test]
    async fn test_get_missing_booking_is_not_found() {
        let svc = service();
        assert!(matches!(
            svc.get_booking("missing").await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_update_missing_booking_is_not_found() {
        let svc = service();
        let result = svc
            .update_booking(&caller("user-1"), "missing", None, None, Some("hi".into()))
            .await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_update_notes_only_touches_nothing_else() {
        let svc = service();
        let booking = svc
            .create_booking(
                &caller("user-1"),
                "user-1",
                "barber-1",
                ts("2024-01-01T10:00:00Z"),
                ServiceType::Haircut,
                None,
            )
            .await
            .unwrap();
        // Surround it so any accidental interval change would collide.
        svc.create_booking(
            &caller("user-2"),
            "user-2",
            "barber-1",
            ts("2024-01-01T09:30:00Z"),
            ServiceType::Haircut,
            None,
        )
        .await
        .unwrap();
        svc.create_booking(
            &caller("user-3"),
            "user-3",
            "barber-1",
            ts("2024-01-01T10:30:00Z"),
            ServiceType::Haircut,
            None,
        )
        .await
        .unwrap();

        let updated = svc
            .update_booking(
                &caller("user-1"),
                &booking.id,
                None,
                None,
                Some("fade please".to_string()),
            )
            .await
            .unwrap();

        assert_eq!(updated.notes.as_deref(), Some("fade please"));
        assert_eq!(updated.start_time, booking.start_time);
        assert_eq!(updated.end_time, booking.end_time);
        assert_eq!(updated.service_type, ServiceType::Haircut);
    }

    #[tokio::test]
    async fn test_update_does_not_conflict_with_itself() {
        let svc = service();
        let booking = svc
            .create_booking(
                &caller("user-1"),
                "user-1",
                "barber-1",
                ts("2024-01-01T10:00:00Z"),
                ServiceType::Haircut,
                None,
            )
            .await
            .unwrap();

        // Nudge within its own old interval: the overlap query returns the
        // booking itself, which must not count as a conflict.
        let updated = svc
            .update_booking(
                &caller("user-1"),
                &booking.id,
                Some(ts("2024-01-01T10:15:00Z")),
                None,
                None,
            )
            .await
            .unwrap();

        assert_eq!(updated.start_time, ts("2024-01-01T10:15:00Z"));
        assert_eq!(updated.end_time, ts("2024-01-01T10:45:00Z"));
    }

    #[tokio::test]
    async fn test_update_lengthening_service_into_free_time_succeeds() {
        let svc = service();
        let booking = svc
            .create_booking(
                &caller("user-1"),
                "user-1",
                "barber-1",
                ts("2024-01-01T10:00:00Z"),
                ServiceType::Haircut,
                None,
            )
            .await
            .unwrap();

        let updated = svc
            .update_booking(
                &caller("user-1"),
                &booking.id,
                None,
                Some(ServiceType::FullService),
                None,
            )
            .await
            .unwrap();

        assert_eq!(updated.service_type, ServiceType::FullService);
        assert_eq!(updated.start_time, ts("2024-01-01T10:00:00Z"));
        assert_eq!(updated.end_time, ts("2024-01-01T11:00:00Z"));
    }

    #[tokio::test]
    async fn test_update_lengthening_service_into_neighbor_fails() {
        let svc = service();
        let booking = svc
            .create_booking(
                &caller("user-1"),
                "user-1",
                "barber-1",
                ts("2024-01-01T10:00:00Z"),
                ServiceType::Haircut,
                None,
            )
            .await
            .unwrap();
        svc.create_booking(
            &caller("user-2"),
            "user-2",
            "barber-1",
            ts("2024-01-01T10:30:00Z"),
            ServiceType::Haircut,
            None,
        )
        .await
        .unwrap();

        // Haircut -> full service would run 10:00-11:00, into the neighbor.
        let result = svc
            .update_booking(
                &caller("user-1"),
                &booking.id,
                None,
                Some(ServiceType::FullService),
                None,
            )
            .await;
        assert!(matches!(result, Err(AppError::SchedulingConflict)));

        // Aborted before any write: the booking is unchanged.
        let unchanged = svc.get_booking(&booking.id).await.unwrap();
        assert_eq!(unchanged.service_type, ServiceType::Haircut);
        assert_eq!(unchanged.end_time, ts("2024-01-01T10:30:00Z"));
    }

    #[tokio::test]
    async fn test_update_moving_start_into_other_booking_fails() {
        let svc = service();
        let booking = svc
            .create_booking(
                &caller("user-1"),
                "user-1",
                "barber-1",
                ts("2024-01-01T10:00:00Z"),
                ServiceType::Haircut,
                None,
            )
            .await
            .unwrap();
        svc.create_booking(
            &caller("user-2"),
            "user-2",
            "barber-1",
            ts("2024-01-01T11:00:00Z"),
            ServiceType::Haircut,
            None,
        )
        .await
        .unwrap();

        let result = svc
            .update_booking(
                &caller("user-1"),
                &booking.id,
                Some(ts("2024-01-01T11:15:00Z")),
                None,
                None,
            )
            .await;
        assert!(matches!(result, Err(AppError::SchedulingConflict)));
    }

    #[tokio::test]
    async fn test_update_with_new_start_and_kind_uses_new_duration() {
        let svc = service();
        let booking = svc
            .create_booking(
                &caller("user-1"),
                "user-1",
                "barber-1",
                ts("2024-01-01T10:00:00Z"),
                ServiceType::Haircut,
                None,
            )
            .await
            .unwrap();

        let updated = svc
            .update_booking(
                &caller("user-1"),
                &booking.id,
                Some(ts("2024-01-01T14:00:00Z")),
                Some(ServiceType::BeardTrim),
                None,
            )
            .await
            .unwrap();

        assert_eq!(updated.start_time, ts("2024-01-01T14:00:00Z"));
        assert_eq!(updated.end_time, ts("2024-01-01T14:15:00Z"));
        assert_eq!(updated.service_type, ServiceType::BeardTrim);
    }

    #[tokio::test]
    async fn test_user_bookings_keeps_cancelled_entries() {
        let svc = service();
        let first = svc
            .create_booking(
                &caller("user-1"),
                "user-1",
                "barber-1",
                ts("2024-01-01T10:00:00Z"),
                ServiceType::Haircut,
                None,
            )
            .await
            .unwrap();
        svc.cancel_booking(&caller("user-1"), &first.id).await.unwrap();
        svc.create_booking(
            &caller("user-1"),
            "user-1",
            "barber-1",
            ts("2024-01-02T10:00:00Z"),
            ServiceType::HairWash,
            None,
        )
        .await
        .unwrap();

        let bookings = svc.user_bookings("user-1").await.unwrap();
        assert_eq!(bookings.len(), 2);
    }

    #[tokio::test]
    async fn test_available_time_slots_reflect_schedule() {
        let svc = service();
        svc.create_booking(
            &caller("user-1"),
            "user-1",
            "barber-1",
            ts("2024-01-01T10:00:00Z"),
            ServiceType::Haircut,
            None,
        )
        .await
        .unwrap();

        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let slots = svc.available_time_slots("barber-1", date).await.unwrap();
        assert_eq!(slots.len(), 15);
        assert!(!slots
            .iter()
            .any(|s| s.start_time == ts("2024-01-01T10:00:00Z")));

        // Another barber's day is untouched.
        let other = svc.available_time_slots("barber-2", date).await.unwrap();
        assert_eq!(other.len(), 16);
    }
}
