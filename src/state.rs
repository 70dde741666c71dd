use crate::config::AppConfig;
use crate::services::BookingService;

pub struct AppState {
    pub bookings: BookingService,
    pub config: AppConfig,
}
