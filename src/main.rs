use std::sync::{Arc, Mutex};

use tracing_subscriber::EnvFilter;

use barberbook::config::AppConfig;
use barberbook::db;
use barberbook::repository::SqliteBookingRepository;
use barberbook::services::BookingService;
use barberbook::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();

    let conn = db::init_db(&config.database_url)?;
    let repo = SqliteBookingRepository::new(Arc::new(Mutex::new(conn)));

    let state = Arc::new(AppState {
        bookings: BookingService::new(Arc::new(repo)),
        config: config.clone(),
    });

    let app = barberbook::app(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
