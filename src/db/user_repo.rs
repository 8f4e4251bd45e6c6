/// User repository - handles all database operations for users
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{User, UserRole, UserStatus};

/// Create a new user. Registration always starts as a pending member; admin
/// rows are created with an explicit role.
pub async fn create_user(
    pool: &PgPool,
    email: &str,
    name: &str,
    password_hash: &str,
    role: UserRole,
    status: UserStatus,
) -> Result<User, sqlx::Error> {
    let id = Uuid::new_v4();
    let now = Utc::now();

    sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (id, email, name, password_hash, role, status, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
        RETURNING id, email, name, password_hash, role, status, phone, created_at, updated_at
        "#,
    )
    .bind(id)
    .bind(email.to_lowercase())
    .bind(name)
    .bind(password_hash)
    .bind(role)
    .bind(status)
    .bind(now)
    .fetch_one(pool)
    .await
}

/// Find a user by email
pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        r#"
        SELECT id, email, name, password_hash, role, status, phone, created_at, updated_at
        FROM users
        WHERE email = $1
        "#,
    )
    .bind(email.to_lowercase())
    .fetch_optional(pool)
    .await
}

/// Find a user by ID
pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        r#"
        SELECT id, email, name, password_hash, role, status, phone, created_at, updated_at
        FROM users
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

/// List users, optionally filtered by status, newest first
pub async fn list_users(
    pool: &PgPool,
    status: Option<UserStatus>,
) -> Result<Vec<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        r#"
        SELECT id, email, name, password_hash, role, status, phone, created_at, updated_at
        FROM users
        WHERE ($1::varchar IS NULL OR status = $1)
        ORDER BY created_at DESC
        "#,
    )
    .bind(status)
    .fetch_all(pool)
    .await
}

/// List approved users for the member directory, alphabetical
pub async fn list_approved(pool: &PgPool) -> Result<Vec<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        r#"
        SELECT id, email, name, password_hash, role, status, phone, created_at, updated_at
        FROM users
        WHERE status = 'approved'
        ORDER BY name ASC
        "#,
    )
    .fetch_all(pool)
    .await
}

/// Set a user's status (admin approve/reject)
pub async fn update_status(
    pool: &PgPool,
    user_id: Uuid,
    status: UserStatus,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        r#"
        UPDATE users
        SET status = $1, updated_at = $2
        WHERE id = $3
        RETURNING id, email, name, password_hash, role, status, phone, created_at, updated_at
        "#,
    )
    .bind(status)
    .bind(Utc::now())
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

/// Update a user's own profile fields
pub async fn update_profile(
    pool: &PgPool,
    user_id: Uuid,
    name: Option<&str>,
    phone: Option<&str>,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        r#"
        UPDATE users
        SET name = COALESCE($1, name),
            phone = COALESCE($2, phone),
            updated_at = $3
        WHERE id = $4
        RETURNING id, email, name, password_hash, role, status, phone, created_at, updated_at
        "#,
    )
    .bind(name)
    .bind(phone)
    .bind(Utc::now())
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

/// Update a user's password hash
pub async fn update_password(
    pool: &PgPool,
    user_id: Uuid,
    new_password_hash: &str,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("UPDATE users SET password_hash = $1, updated_at = $2 WHERE id = $3")
        .bind(new_password_hash)
        .bind(Utc::now())
        .bind(user_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}

/// Delete a user row; dependent RSVPs, participations, and messages cascade
pub async fn delete_user(pool: &PgPool, user_id: Uuid) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(user_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}

/// Count how many of the given IDs refer to messageable users (approved
/// members or admins). Used for atomic participant-batch validation.
pub async fn count_messageable(pool: &PgPool, ids: &[Uuid]) -> Result<i64, sqlx::Error> {
    let (count,): (i64,) = sqlx::query_as(
        r#"
        SELECT COUNT(*)
        FROM users
        WHERE id = ANY($1) AND (status = 'approved' OR role = 'admin')
        "#,
    )
    .bind(ids)
    .fetch_one(pool)
    .await?;

    Ok(count)
}
