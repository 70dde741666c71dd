use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::{Extension, Json};
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::Caller;
use crate::errors::AppError;
use crate::models::{Booking, ServiceType, TimeSlot};
use crate::state::AppState;

fn parse_start_time(s: &str) -> Result<DateTime<Utc>, AppError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| AppError::InvalidInput(format!("invalid start time format: {e}")))
}

fn parse_date(s: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| AppError::InvalidInput(format!("invalid date format: {e}")))
}

fn rfc3339(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingResponse {
    id: String,
    user_id: String,
    barber_id: String,
    start_time: String,
    end_time: String,
    service_type: ServiceType,
    status: String,
    notes: Option<String>,
    created_at: String,
    updated_at: String,
}

impl From<Booking> for BookingResponse {
    fn from(b: Booking) -> Self {
        BookingResponse {
            id: b.id,
            user_id: b.user_id,
            barber_id: b.barber_id,
            start_time: rfc3339(&b.start_time),
            end_time: rfc3339(&b.end_time),
            service_type: b.service_type,
            status: b.status.as_str().to_string(),
            notes: b.notes,
            created_at: rfc3339(&b.created_at),
            updated_at: rfc3339(&b.updated_at),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSlotResponse {
    start_time: String,
    end_time: String,
}

impl From<TimeSlot> for TimeSlotResponse {
    fn from(slot: TimeSlot) -> Self {
        TimeSlotResponse {
            start_time: rfc3339(&slot.start_time),
            end_time: rfc3339(&slot.end_time),
        }
    }
}

// POST /api/bookings
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    pub user_id: String,
    pub barber_id: String,
    pub start_time: String,
    pub service_type: ServiceType,
    pub notes: Option<String>,
}

pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Json(req): Json<CreateBookingRequest>,
) -> Result<Json<BookingResponse>, AppError> {
    if !caller.can_act_for(&req.user_id) {
        return Err(AppError::Forbidden(
            "cannot create bookings for another user".to_string(),
        ));
    }

    let start_time = parse_start_time(&req.start_time)?;

    let booking = state
        .bookings
        .create_booking(
            &caller,
            &req.user_id,
            &req.barber_id,
            start_time,
            req.service_type,
            req.notes,
        )
        .await?;

    Ok(Json(booking.into()))
}

// GET /api/bookings/:id
pub async fn get_booking(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
) -> Result<Json<BookingResponse>, AppError> {
    let booking = state.bookings.get_booking(&id).await?;

    if !caller.can_act_for(&booking.user_id) {
        return Err(AppError::Forbidden(
            "cannot view another user's booking".to_string(),
        ));
    }

    Ok(Json(booking.into()))
}

// PATCH /api/bookings/:id
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBookingRequest {
    pub start_time: Option<String>,
    pub service_type: Option<ServiceType>,
    pub notes: Option<String>,
}

pub async fn update_booking(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
    Json(req): Json<UpdateBookingRequest>,
) -> Result<Json<BookingResponse>, AppError> {
    let existing = state.bookings.get_booking(&id).await?;
    if !caller.can_act_for(&existing.user_id) {
        return Err(AppError::Forbidden(
            "cannot modify another user's booking".to_string(),
        ));
    }

    let start_time = req.start_time.as_deref().map(parse_start_time).transpose()?;

    let booking = state
        .bookings
        .update_booking(&caller, &id, start_time, req.service_type, req.notes)
        .await?;

    Ok(Json(booking.into()))
}

// POST /api/bookings/:id/cancel
#[derive(Serialize)]
pub struct CancelBookingResponse {
    pub success: bool,
    pub message: String,
}

pub async fn cancel_booking(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
) -> Result<Json<CancelBookingResponse>, AppError> {
    // Idempotent: a missing id is "no change", not an error. Only an existing
    // booking carries an owner to authorize against.
    if let Some(existing) = match state.bookings.get_booking(&id).await {
        Ok(b) => Some(b),
        Err(AppError::NotFound(_)) => None,
        Err(e) => return Err(e),
    } {
        if !caller.can_act_for(&existing.user_id) {
            return Err(AppError::Forbidden(
                "cannot cancel another user's booking".to_string(),
            ));
        }
    }

    let success = state.bookings.cancel_booking(&caller, &id).await?;

    let message = if success {
        "Booking cancelled successfully"
    } else {
        "Booking not found or already cancelled"
    };

    Ok(Json(CancelBookingResponse {
        success,
        message: message.to_string(),
    }))
}

// GET /api/users/:user_id/bookings
pub async fn get_user_bookings(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<BookingResponse>>, AppError> {
    if !caller.can_act_for(&user_id) {
        return Err(AppError::Forbidden(
            "cannot list another user's bookings".to_string(),
        ));
    }

    let bookings = state.bookings.user_bookings(&user_id).await?;
    Ok(Json(bookings.into_iter().map(Into::into).collect()))
}

// GET /api/barbers/:barber_id/bookings?date=YYYY-MM-DD
#[derive(Deserialize)]
pub struct BarberBookingsQuery {
    pub date: Option<String>,
}

pub async fn get_barber_bookings(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Path(barber_id): Path<String>,
    Query(query): Query<BarberBookingsQuery>,
) -> Result<Json<Vec<BookingResponse>>, AppError> {
    if !caller.is_barber {
        return Err(AppError::Forbidden(
            "barber schedules are barber-only".to_string(),
        ));
    }

    let day = query.date.as_deref().map(parse_date).transpose()?;

    let bookings = state.bookings.barber_bookings(&barber_id, day).await?;
    Ok(Json(bookings.into_iter().map(Into::into).collect()))
}

// GET /api/barbers/:barber_id/slots?date=YYYY-MM-DD
#[derive(Deserialize)]
pub struct AvailableSlotsQuery {
    pub date: String,
}

pub async fn get_available_time_slots(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Path(barber_id): Path<String>,
    Query(query): Query<AvailableSlotsQuery>,
) -> Result<Json<Vec<TimeSlotResponse>>, AppError> {
    if !caller.is_barber {
        return Err(AppError::Forbidden(
            "barber schedules are barber-only".to_string(),
        ));
    }

    let date = parse_date(&query.date)?;

    let slots = state
        .bookings
        .available_time_slots(&barber_id, date)
        .await?;
    Ok(Json(slots.into_iter().map(Into::into).collect()))
}
