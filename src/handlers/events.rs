use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::db::event_repo::{self, EventChanges, NewEvent};
use crate::error::{AppError, Result};
use crate::middleware::AuthedUser;
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateEventRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,

    pub description: Option<String>,
    pub location: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: Option<DateTime<Utc>>,

    /// 0 means unlimited
    #[serde(default)]
    #[validate(range(min = 0))]
    pub capacity: i32,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateEventRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,

    pub description: Option<String>,
    pub location: Option<String>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,

    #[validate(range(min = 0))]
    pub capacity: Option<i32>,
}

/// POST /api/v1/events (admin)
pub async fn create_event(
    admin: AuthedUser,
    state: web::Data<AppState>,
    req: web::Json<CreateEventRequest>,
) -> Result<HttpResponse> {
    req.validate()?;

    let event = event_repo::create_event(
        &state.db,
        admin.id,
        NewEvent {
            title: req.title.trim(),
            description: req.description.as_deref(),
            location: req.location.as_deref(),
            starts_at: req.starts_at,
            ends_at: req.ends_at,
            capacity: req.capacity,
        },
    )
    .await?;

    tracing::info!("Event created: {} ({})", event.title, event.id);

    Ok(HttpResponse::Created().json(event))
}

/// GET /api/v1/events
pub async fn list_events(user: AuthedUser, state: web::Data<AppState>) -> Result<HttpResponse> {
    let events = event_repo::list_with_attendance(&state.db, user.id).await?;
    Ok(HttpResponse::Ok().json(events))
}

/// GET /api/v1/events/{id}
pub async fn get_event(
    user: AuthedUser,
    state: web::Data<AppState>,
    event_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let event = event_repo::get_with_attendance(&state.db, *event_id, user.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;

    Ok(HttpResponse::Ok().json(event))
}

/// PUT /api/v1/events/{id} (admin)
pub async fn update_event(
    state: web::Data<AppState>,
    event_id: web::Path<Uuid>,
    req: web::Json<UpdateEventRequest>,
) -> Result<HttpResponse> {
    req.validate()?;

    let event = event_repo::update_event(
        &state.db,
        *event_id,
        EventChanges {
            title: req.title.as_deref().map(str::trim),
            description: req.description.as_deref(),
            location: req.location.as_deref(),
            starts_at: req.starts_at,
            ends_at: req.ends_at,
            capacity: req.capacity,
        },
    )
    .await?
    .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;

    Ok(HttpResponse::Ok().json(event))
}

/// DELETE /api/v1/events/{id} (admin)
pub async fn delete_event(
    state: web::Data<AppState>,
    event_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    if !event_repo::delete_event(&state.db, *event_id).await? {
        return Err(AppError::NotFound("Event not found".to_string()));
    }

    Ok(HttpResponse::Ok().json(serde_json::json!({ "success": true })))
}

/// POST /api/v1/events/{id}/rsvp
pub async fn rsvp(
    user: AuthedUser,
    state: web::Data<AppState>,
    event_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let rsvp = event_repo::create_rsvp(&state.db, *event_id, user.id).await?;

    tracing::info!("User {} RSVPed to event {}", user.id, event_id);

    Ok(HttpResponse::Created().json(rsvp))
}

/// DELETE /api/v1/events/{id}/rsvp
pub async fn cancel_rsvp(
    user: AuthedUser,
    state: web::Data<AppState>,
    event_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    if !event_repo::delete_rsvp(&state.db, *event_id, user.id).await? {
        return Err(AppError::NotFound("RSVP not found".to_string()));
    }

    Ok(HttpResponse::Ok().json(serde_json::json!({ "success": true })))
}

/// GET /api/v1/events/{id}/attendees
pub async fn list_attendees(
    state: web::Data<AppState>,
    event_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    event_repo::find_by_id(&state.db, *event_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;

    let attendees = event_repo::list_attendees(&state.db, *event_id).await?;

    Ok(HttpResponse::Ok().json(attendees))
}
