use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{AvailabilityDay, Slot};
use crate::services::scheduling::{self, AvailableDate, SchedulingError};
use crate::state::AppState;

fn parse_weekday(s: &str) -> Result<u8, SchedulingError> {
    s.parse::<u8>()
        .ok()
        .filter(|d| *d <= 6)
        .ok_or(SchedulingError::InvalidWeekday)
}

// GET /api/availability/:id
pub async fn get_week(
    State(state): State<Arc<AppState>>,
    Path(business_id): Path<String>,
) -> Result<Json<Vec<AvailabilityDay>>, AppError> {
    let db = state.db.lock().unwrap();
    let week = queries::get_week_availability(&db, &business_id)?;
    if week.is_empty() {
        return Err(AppError::NotFound(
            "availability for this business".to_string(),
        ));
    }
    Ok(Json(week))
}

// GET /api/availability/:id/day/:weekday
pub async fn get_day(
    State(state): State<Arc<AppState>>,
    Path((business_id, weekday)): Path<(String, String)>,
) -> Result<Json<AvailabilityDay>, AppError> {
    let weekday = parse_weekday(&weekday)?;
    let db = state.db.lock().unwrap();
    let day = queries::get_availability_day(&db, &business_id, weekday)?
        .ok_or_else(|| AppError::NotFound("availability for that day".to_string()))?;
    Ok(Json(day))
}

// PUT /api/availability/:id/day/:weekday
#[derive(Deserialize)]
pub struct DayFlags {
    #[serde(default)]
    pub morning: bool,
    #[serde(default)]
    pub afternoon: bool,
    #[serde(default)]
    pub evening: bool,
}

pub async fn set_day(
    State(state): State<Arc<AppState>>,
    Path((business_id, weekday)): Path<(String, String)>,
    Json(body): Json<DayFlags>,
) -> Result<Json<AvailabilityDay>, AppError> {
    let weekday = parse_weekday(&weekday)?;
    let db = state.db.lock().unwrap();
    if queries::get_business(&db, &business_id)?.is_none() {
        return Err(AppError::NotFound("business".to_string()));
    }
    let day = scheduling::set_weekday_availability(
        &db,
        &business_id,
        weekday,
        body.morning,
        body.afternoon,
        body.evening,
    )?;
    Ok(Json(day))
}

// POST /api/availability/:id/reset
pub async fn reset_week(
    State(state): State<Arc<AppState>>,
    Path(business_id): Path<String>,
) -> Result<Json<Vec<AvailabilityDay>>, AppError> {
    let db = state.db.lock().unwrap();
    if queries::get_business(&db, &business_id)?.is_none() {
        return Err(AppError::NotFound("business".to_string()));
    }
    for weekday in 0..=6 {
        let day = AvailabilityDay::closed(&business_id, weekday);
        queries::upsert_availability_day(&db, &day)?;
    }
    let week = queries::get_week_availability(&db, &business_id)?;
    Ok(Json(week))
}

// GET /api/availability/:id/dates?days=N
#[derive(Deserialize)]
pub struct DatesQuery {
    pub days: Option<i64>,
}

pub async fn get_dates(
    State(state): State<Arc<AppState>>,
    Path(business_id): Path<String>,
    Query(query): Query<DatesQuery>,
) -> Result<Json<Vec<AvailableDate>>, AppError> {
    let days = query.days.unwrap_or(30);
    let today = Utc::now().date_naive();
    let db = state.db.lock().unwrap();
    let dates = scheduling::available_dates(&db, &business_id, days, today)?;
    Ok(Json(dates))
}

// GET /api/availability/:id/next-available?days=N
pub async fn next_available(
    State(state): State<Arc<AppState>>,
    Path(business_id): Path<String>,
    Query(query): Query<DatesQuery>,
) -> Result<Json<Option<AvailableDate>>, AppError> {
    let days = query.days.unwrap_or(60);
    let today = Utc::now().date_naive();
    let db = state.db.lock().unwrap();
    let next = scheduling::available_dates(&db, &business_id, days, today)?
        .into_iter()
        .next();
    Ok(Json(next))
}

// GET /api/availability/:id/slots/:date
pub async fn get_slots(
    State(state): State<Arc<AppState>>,
    Path((business_id, date)): Path<(String, String)>,
) -> Result<Json<Vec<Slot>>, AppError> {
    let today = Utc::now().date_naive();
    let db = state.db.lock().unwrap();
    let slots = scheduling::open_slots_on_date(&db, &business_id, &date, today)?;
    Ok(Json(slots))
}
