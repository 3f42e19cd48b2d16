use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::Business;
use crate::services::scheduling;
use crate::state::AppState;

fn require_field(value: Option<&str>, field: &str) -> Result<String, AppError> {
    match value {
        Some(s) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        _ => Err(AppError::Validation(format!(
            "missing required field: {field}"
        ))),
    }
}

// POST /api/businesses
#[derive(Deserialize)]
pub struct CreateBusinessRequest {
    pub business_name: Option<String>,
    pub owner_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub service_types: Option<Vec<String>>,
}

pub async fn create_business(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateBusinessRequest>,
) -> Result<impl IntoResponse, AppError> {
    let business_name = require_field(body.business_name.as_deref(), "business_name")?;
    let owner_name = require_field(body.owner_name.as_deref(), "owner_name")?;
    let email = require_field(body.email.as_deref(), "email")?;

    if !scheduling::email_looks_valid(&email) {
        return Err(AppError::Validation("invalid email format".to_string()));
    }

    let db = state.db.lock().unwrap();
    if queries::get_business_by_email(&db, &email)?.is_some() {
        return Err(AppError::Conflict(
            "a business with that email already exists".to_string(),
        ));
    }

    let business = Business {
        id: Uuid::new_v4().to_string(),
        business_name,
        owner_name,
        email,
        phone: body.phone,
        service_types: body.service_types.unwrap_or_default(),
        created_at: Utc::now().naive_utc(),
    };
    queries::create_business(&db, &business)?;

    Ok((StatusCode::CREATED, Json(business)))
}

// GET /api/businesses
pub async fn list_businesses(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Business>>, AppError> {
    let db = state.db.lock().unwrap();
    let businesses = queries::list_businesses(&db)?;
    Ok(Json(businesses))
}

// GET /api/businesses/:id
pub async fn get_business(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Business>, AppError> {
    let db = state.db.lock().unwrap();
    let business = queries::get_business(&db, &id)?
        .ok_or_else(|| AppError::NotFound("business".to_string()))?;
    Ok(Json(business))
}

// PUT /api/businesses/:id
#[derive(Deserialize)]
pub struct UpdateBusinessRequest {
    pub business_name: Option<String>,
    pub owner_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub service_types: Option<Vec<String>>,
}

pub async fn update_business(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<UpdateBusinessRequest>,
) -> Result<Json<Business>, AppError> {
    let db = state.db.lock().unwrap();
    let mut business = queries::get_business(&db, &id)?
        .ok_or_else(|| AppError::NotFound("business".to_string()))?;

    if let Some(name) = body.business_name {
        business.business_name = name;
    }
    if let Some(name) = body.owner_name {
        business.owner_name = name;
    }
    if let Some(email) = body.email {
        if !scheduling::email_looks_valid(&email) {
            return Err(AppError::Validation("invalid email format".to_string()));
        }
        if let Some(existing) = queries::get_business_by_email(&db, &email)? {
            if existing.id != business.id {
                return Err(AppError::Conflict(
                    "a business with that email already exists".to_string(),
                ));
            }
        }
        business.email = email;
    }
    if let Some(phone) = body.phone {
        business.phone = Some(phone);
    }
    if let Some(services) = body.service_types {
        business.service_types = services;
    }

    queries::update_business(&db, &business)?;
    Ok(Json(business))
}

// DELETE /api/businesses/:id
pub async fn delete_business(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let db = state.db.lock().unwrap();
    if !queries::delete_business(&db, &id)? {
        return Err(AppError::NotFound("business".to_string()));
    }
    Ok(Json(serde_json::json!({"ok": true})))
}

// GET /api/businesses/:id/services
pub async fn get_services(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<String>>, AppError> {
    let db = state.db.lock().unwrap();
    let business = queries::get_business(&db, &id)?
        .ok_or_else(|| AppError::NotFound("business".to_string()))?;
    Ok(Json(business.service_types))
}

// PUT /api/businesses/:id/services
#[derive(Deserialize)]
pub struct UpdateServicesRequest {
    pub service_types: Option<Vec<String>>,
}

pub async fn update_services(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<UpdateServicesRequest>,
) -> Result<Json<Vec<String>>, AppError> {
    let services = body.service_types.ok_or_else(|| {
        AppError::Validation("missing required field: service_types".to_string())
    })?;
    if services.is_empty() {
        return Err(AppError::Validation(
            "service_types must not be empty".to_string(),
        ));
    }

    // Trim entries and drop duplicates, keeping first occurrence order.
    let mut cleaned: Vec<String> = vec![];
    for service in &services {
        let trimmed = service.trim();
        if trimmed.is_empty() {
            return Err(AppError::Validation(
                "service names must not be blank".to_string(),
            ));
        }
        if !cleaned.iter().any(|s| s == trimmed) {
            cleaned.push(trimmed.to_string());
        }
    }

    let db = state.db.lock().unwrap();
    let mut business = queries::get_business(&db, &id)?
        .ok_or_else(|| AppError::NotFound("business".to_string()))?;
    business.service_types = cleaned;
    queries::update_business(&db, &business)?;

    Ok(Json(business.service_types))
}

// GET /api/businesses/:id/contact
#[derive(Serialize)]
pub struct ContactResponse {
    business_name: String,
    phone: Option<String>,
    email: String,
}

pub async fn get_contact(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ContactResponse>, AppError> {
    let db = state.db.lock().unwrap();
    let business = queries::get_business(&db, &id)?
        .ok_or_else(|| AppError::NotFound("business".to_string()))?;
    Ok(Json(ContactResponse {
        business_name: business.business_name,
        phone: business.phone,
        email: business.email,
    }))
}
