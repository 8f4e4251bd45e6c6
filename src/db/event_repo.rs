// Event repository: event CRUD and RSVP operations
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{is_unique_violation, AppError};
use crate::models::{Attendee, Event, EventRsvp, EventWithAttendance};

pub struct NewEvent<'a> {
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub location: Option<&'a str>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: Option<DateTime<Utc>>,
    pub capacity: i32,
}

pub struct EventChanges<'a> {
    pub title: Option<&'a str>,
    pub description: Option<&'a str>,
    pub location: Option<&'a str>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub capacity: Option<i32>,
}

pub async fn create_event(
    pool: &PgPool,
    created_by: Uuid,
    event: NewEvent<'_>,
) -> Result<Event, AppError> {
    let id = Uuid::new_v4();
    let now = Utc::now();

    let event = sqlx::query_as::<_, Event>(
        r#"
        INSERT INTO events (id, title, description, location, starts_at, ends_at, capacity, created_by, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9)
        RETURNING id, title, description, location, starts_at, ends_at, capacity, created_by, created_at, updated_at
        "#,
    )
    .bind(id)
    .bind(event.title)
    .bind(event.description)
    .bind(event.location)
    .bind(event.starts_at)
    .bind(event.ends_at)
    .bind(event.capacity)
    .bind(created_by)
    .bind(now)
    .fetch_one(pool)
    .await?;

    Ok(event)
}

pub async fn find_by_id(pool: &PgPool, event_id: Uuid) -> Result<Option<Event>, AppError> {
    let event = sqlx::query_as::<_, Event>(
        r#"
        SELECT id, title, description, location, starts_at, ends_at, capacity, created_by, created_at, updated_at
        FROM events
        WHERE id = $1
        "#,
    )
    .bind(event_id)
    .fetch_optional(pool)
    .await?;

    Ok(event)
}

/// List events with attendee counts and the requesting user's RSVP state,
/// soonest first.
pub async fn list_with_attendance(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Vec<EventWithAttendance>, AppError> {
    let events = sqlx::query_as::<_, EventWithAttendance>(
        r#"
        SELECT e.id, e.title, e.description, e.location, e.starts_at, e.ends_at,
               e.capacity, e.created_by, e.created_at, e.updated_at,
               (SELECT COUNT(*) FROM event_rsvps r WHERE r.event_id = e.id) AS attendee_count,
               EXISTS(SELECT 1 FROM event_rsvps r WHERE r.event_id = e.id AND r.user_id = $1) AS user_has_rsvped
        FROM events e
        ORDER BY e.starts_at ASC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(events)
}

pub async fn get_with_attendance(
    pool: &PgPool,
    event_id: Uuid,
    user_id: Uuid,
) -> Result<Option<EventWithAttendance>, AppError> {
    let event = sqlx::query_as::<_, EventWithAttendance>(
        r#"
        SELECT e.id, e.title, e.description, e.location, e.starts_at, e.ends_at,
               e.capacity, e.created_by, e.created_at, e.updated_at,
               (SELECT COUNT(*) FROM event_rsvps r WHERE r.event_id = e.id) AS attendee_count,
               EXISTS(SELECT 1 FROM event_rsvps r WHERE r.event_id = e.id AND r.user_id = $2) AS user_has_rsvped
        FROM events e
        WHERE e.id = $1
        "#,
    )
    .bind(event_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(event)
}

pub async fn update_event(
    pool: &PgPool,
    event_id: Uuid,
    changes: EventChanges<'_>,
) -> Result<Option<Event>, AppError> {
    let event = sqlx::query_as::<_, Event>(
        r#"
        UPDATE events
        SET title = COALESCE($1, title),
            description = COALESCE($2, description),
            location = COALESCE($3, location),
            starts_at = COALESCE($4, starts_at),
            ends_at = COALESCE($5, ends_at),
            capacity = COALESCE($6, capacity),
            updated_at = $7
        WHERE id = $8
        RETURNING id, title, description, location, starts_at, ends_at, capacity, created_by, created_at, updated_at
        "#,
    )
    .bind(changes.title)
    .bind(changes.description)
    .bind(changes.location)
    .bind(changes.starts_at)
    .bind(changes.ends_at)
    .bind(changes.capacity)
    .bind(Utc::now())
    .bind(event_id)
    .fetch_optional(pool)
    .await?;

    Ok(event)
}

pub async fn delete_event(pool: &PgPool, event_id: Uuid) -> Result<bool, AppError> {
    let result = sqlx::query("DELETE FROM events WHERE id = $1")
        .bind(event_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Create an RSVP. The event row is locked for the duration of the
/// transaction so the capacity check and the insert cannot interleave with a
/// concurrent RSVP against the same event.
pub async fn create_rsvp(
    pool: &PgPool,
    event_id: Uuid,
    user_id: Uuid,
) -> Result<EventRsvp, AppError> {
    let mut tx = pool.begin().await?;

    let event = sqlx::query_as::<_, Event>(
        r#"
        SELECT id, title, description, location, starts_at, ends_at, capacity, created_by, created_at, updated_at
        FROM events
        WHERE id = $1
        FOR UPDATE
        "#,
    )
    .bind(event_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;

    if event.capacity > 0 {
        let (attendee_count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM event_rsvps WHERE event_id = $1")
                .bind(event_id)
                .fetch_one(&mut *tx)
                .await?;

        if attendee_count >= event.capacity as i64 {
            return Err(AppError::Conflict("Event is at capacity".to_string()));
        }
    }

    let rsvp = sqlx::query_as::<_, EventRsvp>(
        r#"
        INSERT INTO event_rsvps (id, event_id, user_id, created_at)
        VALUES ($1, $2, $3, $4)
        RETURNING id, event_id, user_id, created_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(event_id)
    .bind(user_id)
    .bind(Utc::now())
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Conflict("Already RSVPed to this event".to_string())
        } else {
            AppError::Database(e)
        }
    })?;

    tx.commit().await?;

    Ok(rsvp)
}

pub async fn delete_rsvp(pool: &PgPool, event_id: Uuid, user_id: Uuid) -> Result<bool, AppError> {
    let result = sqlx::query("DELETE FROM event_rsvps WHERE event_id = $1 AND user_id = $2")
        .bind(event_id)
        .bind(user_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn list_attendees(pool: &PgPool, event_id: Uuid) -> Result<Vec<Attendee>, AppError> {
    let attendees = sqlx::query_as::<_, Attendee>(
        r#"
        SELECT r.user_id, u.name, r.created_at
        FROM event_rsvps r
        JOIN users u ON u.id = r.user_id
        WHERE r.event_id = $1
        ORDER BY r.created_at ASC
        "#,
    )
    .bind(event_id)
    .fetch_all(pool)
    .await?;

    Ok(attendees)
}
