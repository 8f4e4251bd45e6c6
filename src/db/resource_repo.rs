// Resource repository: shared-file metadata and download counters
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{AccessLevel, Resource};

pub struct NewResource<'a> {
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub file_name: Option<&'a str>,
    pub file_path: &'a str,
    pub content_type: Option<&'a str>,
    pub size_bytes: i64,
    pub access_level: AccessLevel,
}

pub async fn insert_resource(
    pool: &PgPool,
    uploaded_by: Uuid,
    resource: NewResource<'_>,
) -> Result<Resource, AppError> {
    let id = Uuid::new_v4();
    let now = Utc::now();

    let resource = sqlx::query_as::<_, Resource>(
        r#"
        INSERT INTO resources (id, title, description, file_name, file_path, content_type,
                               size_bytes, access_level, download_count, uploaded_by, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 0, $9, $10, $10)
        RETURNING id, title, description, file_name, file_path, content_type,
                  size_bytes, access_level, download_count, uploaded_by, created_at, updated_at
        "#,
    )
    .bind(id)
    .bind(resource.title)
    .bind(resource.description)
    .bind(resource.file_name)
    .bind(resource.file_path)
    .bind(resource.content_type)
    .bind(resource.size_bytes)
    .bind(resource.access_level)
    .bind(uploaded_by)
    .bind(now)
    .fetch_one(pool)
    .await?;

    Ok(resource)
}

pub async fn find_by_id(pool: &PgPool, resource_id: Uuid) -> Result<Option<Resource>, AppError> {
    let resource = sqlx::query_as::<_, Resource>(
        r#"
        SELECT id, title, description, file_name, file_path, content_type,
               size_bytes, access_level, download_count, uploaded_by, created_at, updated_at
        FROM resources
        WHERE id = $1
        "#,
    )
    .bind(resource_id)
    .fetch_optional(pool)
    .await?;

    Ok(resource)
}

/// List resources newest first. Non-admin callers only see rows open to all
/// members.
pub async fn list_resources(pool: &PgPool, include_admin: bool) -> Result<Vec<Resource>, AppError> {
    let resources = sqlx::query_as::<_, Resource>(
        r#"
        SELECT id, title, description, file_name, file_path, content_type,
               size_bytes, access_level, download_count, uploaded_by, created_at, updated_at
        FROM resources
        WHERE $1 OR access_level = 'all'
        ORDER BY created_at DESC
        "#,
    )
    .bind(include_admin)
    .fetch_all(pool)
    .await?;

    Ok(resources)
}

pub async fn update_metadata(
    pool: &PgPool,
    resource_id: Uuid,
    title: Option<&str>,
    description: Option<&str>,
    access_level: Option<AccessLevel>,
) -> Result<Option<Resource>, AppError> {
    let resource = sqlx::query_as::<_, Resource>(
        r#"
        UPDATE resources
        SET title = COALESCE($1, title),
            description = COALESCE($2, description),
            access_level = COALESCE($3, access_level),
            updated_at = $4
        WHERE id = $5
        RETURNING id, title, description, file_name, file_path, content_type,
                  size_bytes, access_level, download_count, uploaded_by, created_at, updated_at
        "#,
    )
    .bind(title)
    .bind(description)
    .bind(access_level)
    .bind(Utc::now())
    .bind(resource_id)
    .fetch_optional(pool)
    .await?;

    Ok(resource)
}

pub async fn delete_resource(pool: &PgPool, resource_id: Uuid) -> Result<bool, AppError> {
    let result = sqlx::query("DELETE FROM resources WHERE id = $1")
        .bind(resource_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Bump the download counter. Runs before the byte stream starts and is not
/// rolled back if the client disconnects mid-download.
pub async fn increment_download_count(pool: &PgPool, resource_id: Uuid) -> Result<(), AppError> {
    sqlx::query("UPDATE resources SET download_count = download_count + 1 WHERE id = $1")
        .bind(resource_id)
        .execute(pool)
        .await?;

    Ok(())
}
