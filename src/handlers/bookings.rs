use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Booking, BookingStatus};
use crate::services::scheduling::{self, ReservationRequest, SchedulingError};
use crate::state::AppState;

// POST /api/bookings
pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ReservationRequest>,
) -> Result<impl IntoResponse, AppError> {
    let today = Utc::now().date_naive();
    let mut db = state.db.lock().unwrap();
    let booking = scheduling::reserve(&mut db, &body, today)?;
    Ok((StatusCode::CREATED, Json(booking)))
}

// GET /api/bookings/:id (business id; optional date= and status= filters)
#[derive(Deserialize)]
pub struct BookingsQuery {
    pub date: Option<String>,
    pub status: Option<String>,
}

pub async fn list_for_business(
    State(state): State<Arc<AppState>>,
    Path(business_id): Path<String>,
    Query(query): Query<BookingsQuery>,
) -> Result<Json<Vec<Booking>>, AppError> {
    let date = match query.date.as_deref() {
        Some(s) => Some(scheduling::parse_date(s)?),
        None => None,
    };
    let status = match query.status.as_deref() {
        Some(s) => Some(BookingStatus::parse(s).ok_or(SchedulingError::InvalidStatus)?),
        None => None,
    };

    let db = state.db.lock().unwrap();
    let bookings = queries::get_bookings_for_business(&db, &business_id, date, status)?;
    Ok(Json(bookings))
}

// GET /api/bookings/:id/today
pub async fn todays_bookings(
    State(state): State<Arc<AppState>>,
    Path(business_id): Path<String>,
) -> Result<Json<Vec<Booking>>, AppError> {
    let today = Utc::now().date_naive();
    let db = state.db.lock().unwrap();
    let bookings = queries::get_bookings_for_business(&db, &business_id, Some(today), None)?;
    Ok(Json(bookings))
}

// GET /api/bookings/:id/upcoming?days=N
#[derive(Deserialize)]
pub struct UpcomingQuery {
    pub days: Option<i64>,
}

pub async fn upcoming_bookings(
    State(state): State<Arc<AppState>>,
    Path(business_id): Path<String>,
    Query(query): Query<UpcomingQuery>,
) -> Result<Json<Vec<Booking>>, AppError> {
    let days = query.days.unwrap_or(7);
    let today = Utc::now().date_naive();
    let db = state.db.lock().unwrap();
    let bookings = queries::get_upcoming_bookings(&db, &business_id, today, days)?;
    Ok(Json(bookings))
}

// GET /api/bookings/single/:id
pub async fn get_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Booking>, AppError> {
    let db = state.db.lock().unwrap();
    let booking = queries::get_booking(&db, &id)?
        .ok_or_else(|| AppError::NotFound("booking".to_string()))?;
    Ok(Json(booking))
}

// PUT /api/bookings/:id/status
#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: Option<String>,
}

pub async fn update_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<UpdateStatusRequest>,
) -> Result<Json<Booking>, AppError> {
    let status = body.status.unwrap_or_default();
    let db = state.db.lock().unwrap();
    let booking = scheduling::update_status(&db, &id, &status)?;
    Ok(Json(booking))
}

// DELETE /api/bookings/:id
pub async fn delete_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let db = state.db.lock().unwrap();
    if !queries::delete_booking(&db, &id)? {
        return Err(AppError::NotFound("booking".to_string()));
    }
    Ok(Json(serde_json::json!({"ok": true})))
}
