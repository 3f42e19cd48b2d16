use std::sync::{Arc, Mutex};
use std::time::Instant;

use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use slotbook::config::AppConfig;
use slotbook::db;
use slotbook::handlers;
use slotbook::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();

    let conn = db::init_db(&config.database_url)?;
    db::seed_initial_data(&conn, &config)?;

    let state = Arc::new(AppState {
        db: Arc::new(Mutex::new(conn)),
        config: config.clone(),
        started_at: Instant::now(),
    });

    let app = Router::new()
        .route("/", get(handlers::health::index))
        .route("/health", get(handlers::health::health))
        .route(
            "/api/businesses",
            get(handlers::businesses::list_businesses).post(handlers::businesses::create_business),
        )
        .route(
            "/api/businesses/:id",
            get(handlers::businesses::get_business)
                .put(handlers::businesses::update_business)
                .delete(handlers::businesses::delete_business),
        )
        .route(
            "/api/businesses/:id/services",
            get(handlers::businesses::get_services).put(handlers::businesses::update_services),
        )
        .route(
            "/api/businesses/:id/contact",
            get(handlers::businesses::get_contact),
        )
        .route(
            "/api/availability/:id",
            get(handlers::availability::get_week),
        )
        .route(
            "/api/availability/:id/dates",
            get(handlers::availability::get_dates),
        )
        .route(
            "/api/availability/:id/next-available",
            get(handlers::availability::next_available),
        )
        .route(
            "/api/availability/:id/slots/:date",
            get(handlers::availability::get_slots),
        )
        .route(
            "/api/availability/:id/day/:weekday",
            get(handlers::availability::get_day).put(handlers::availability::set_day),
        )
        .route(
            "/api/availability/:id/reset",
            post(handlers::availability::reset_week),
        )
        .route("/api/bookings", post(handlers::bookings::create_booking))
        .route(
            "/api/bookings/single/:id",
            get(handlers::bookings::get_booking),
        )
        .route(
            "/api/bookings/:id",
            get(handlers::bookings::list_for_business).delete(handlers::bookings::delete_booking),
        )
        .route(
            "/api/bookings/:id/today",
            get(handlers::bookings::todays_bookings),
        )
        .route(
            "/api/bookings/:id/upcoming",
            get(handlers::bookings::upcoming_bookings),
        )
        .route(
            "/api/bookings/:id/status",
            put(handlers::bookings::update_status),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
