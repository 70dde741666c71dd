use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: String,
    pub user_id: String,
    pub barber_id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub service_type: ServiceType,
    pub status: BookingStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ServiceType {
    Haircut,
    BeardTrim,
    HairWash,
    FullService,
}

impl ServiceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceType::Haircut => "haircut",
            ServiceType::BeardTrim => "beard_trim",
            ServiceType::HairWash => "hair_wash",
            ServiceType::FullService => "full_service",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "beard_trim" => ServiceType::BeardTrim,
            "hair_wash" => ServiceType::HairWash,
            "full_service" => ServiceType::FullService,
            _ => ServiceType::Haircut,
        }
    }

    pub fn duration_minutes(&self) -> i64 {
        match self {
            ServiceType::Haircut => 30,
            ServiceType::BeardTrim => 15,
            ServiceType::HairWash => 20,
            ServiceType::FullService => 60,
        }
    }

    pub fn duration(&self) -> Duration {
        Duration::minutes(self.duration_minutes())
    }
}

/// End of a booking is always derived from its start and service kind.
pub fn calculate_end_time(start: DateTime<Utc>, service_type: ServiceType) -> DateTime<Utc> {
    start + service_type.duration()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "confirmed" => BookingStatus::Confirmed,
            "cancelled" => BookingStatus::Cancelled,
            "completed" => BookingStatus::Completed,
            _ => BookingStatus::Pending,
        }
    }
}

/// A free interval in a barber's day. Derived on the fly, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimeSlot {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

/// Typed partial update. Absent fields are left untouched by the repository.
#[derive(Debug, Clone, Default)]
pub struct BookingPatch {
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub service_type: Option<ServiceType>,
    pub notes: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_duration_table() {
        assert_eq!(ServiceType::Haircut.duration_minutes(), 30);
        assert_eq!(ServiceType::BeardTrim.duration_minutes(), 15);
        assert_eq!(ServiceType::HairWash.duration_minutes(), 20);
        assert_eq!(ServiceType::FullService.duration_minutes(), 60);
    }

    #[test]
    fn test_end_time_derived_from_service_type() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();
        assert_eq!(
            calculate_end_time(start, ServiceType::Haircut),
            Utc.with_ymd_and_hms(2024, 1, 1, 10, 30, 0).unwrap()
        );
        assert_eq!(
            calculate_end_time(start, ServiceType::FullService),
            Utc.with_ymd_and_hms(2024, 1, 1, 11, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_service_type_round_trip() {
        for st in [
            ServiceType::Haircut,
            ServiceType::BeardTrim,
            ServiceType::HairWash,
            ServiceType::FullService,
        ] {
            assert_eq!(ServiceType::parse(st.as_str()), st);
        }
    }

    #[test]
    fn test_status_round_trip() {
        for status in [
            BookingStatus::Pending,
            BookingStatus::Confirmed,
            BookingStatus::Cancelled,
            BookingStatus::Completed,
        ] {
            assert_eq!(BookingStatus::parse(status.as_str()), status);
        }
    }
}
