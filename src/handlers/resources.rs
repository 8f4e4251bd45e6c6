use actix_multipart::{Field, Multipart};
use actix_web::{http::header, web, HttpResponse};
use futures_util::TryStreamExt;
use serde::Deserialize;
use uuid::Uuid;

use crate::db::resource_repo::{self, NewResource};
use crate::error::{AppError, Result};
use crate::middleware::AuthedUser;
use crate::models::{AccessLevel, Resource};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct UpdateResourceRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub access_level: Option<AccessLevel>,
}

/// POST /api/v1/resources
/// Multipart upload: a `file` part plus optional `title`, `description`, and
/// `access_level` text parts. The blob lands in storage before the metadata
/// row is written.
pub async fn upload_resource(
    user: AuthedUser,
    state: web::Data<AppState>,
    mut payload: Multipart,
) -> Result<HttpResponse> {
    let max_bytes = state.config.storage.max_upload_bytes;

    let mut title: Option<String> = None;
    let mut description: Option<String> = None;
    let mut access_level = AccessLevel::All;
    let mut file_bytes: Vec<u8> = Vec::new();
    let mut file_name: Option<String> = None;
    let mut content_type: Option<String> = None;
    let mut saw_file = false;

    while let Some(mut field) = payload.try_next().await.map_err(bad_multipart)? {
        let field_name = field
            .content_disposition()
            .get_name()
            .unwrap_or_default()
            .to_string();

        match field_name.as_str() {
            "file" => {
                saw_file = true;
                file_name = field
                    .content_disposition()
                    .get_filename()
                    .map(|s| s.to_string());
                content_type = field.content_type().map(|m| m.to_string());

                while let Some(chunk) = field.try_next().await.map_err(bad_multipart)? {
                    if file_bytes.len() + chunk.len() > max_bytes {
                        return Err(AppError::Validation(format!(
                            "File exceeds the maximum upload size of {} bytes",
                            max_bytes
                        )));
                    }
                    file_bytes.extend_from_slice(&chunk);
                }
            }
            "title" => title = Some(read_text_field(&mut field).await?),
            "description" => description = Some(read_text_field(&mut field).await?),
            "access_level" => {
                access_level = match read_text_field(&mut field).await?.trim() {
                    "all" => AccessLevel::All,
                    "admin" => AccessLevel::Admin,
                    other => {
                        return Err(AppError::Validation(format!(
                            "access_level must be 'all' or 'admin', got '{}'",
                            other
                        )));
                    }
                };
            }
            _ => {
                // Drain unknown parts so the stream stays consumable.
                while field.try_next().await.map_err(bad_multipart)?.is_some() {}
            }
        }
    }

    if !saw_file {
        return Err(AppError::Validation("Missing file field".to_string()));
    }

    let original_name = file_name.clone().unwrap_or_else(|| "file".to_string());
    let title = title
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| original_name.clone());

    let file_path = state.storage.save(&file_bytes, &original_name).await?;

    let resource = resource_repo::insert_resource(
        &state.db,
        user.id,
        NewResource {
            title: title.trim(),
            description: description.as_deref(),
            file_name: file_name.as_deref(),
            file_path: &file_path,
            content_type: content_type.as_deref(),
            size_bytes: file_bytes.len() as i64,
            access_level,
        },
    )
    .await?;

    tracing::info!("Resource uploaded: {} ({})", resource.title, resource.id);

    Ok(HttpResponse::Created().json(resource))
}

/// GET /api/v1/resources
pub async fn list_resources(user: AuthedUser, state: web::Data<AppState>) -> Result<HttpResponse> {
    let resources = resource_repo::list_resources(&state.db, user.is_admin()).await?;
    Ok(HttpResponse::Ok().json(resources))
}

/// GET /api/v1/resources/{id}
pub async fn get_resource(
    user: AuthedUser,
    state: web::Data<AppState>,
    resource_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let resource = find_readable(&user, &state, *resource_id).await?;
    Ok(HttpResponse::Ok().json(resource))
}

/// GET /api/v1/resources/{id}/download
/// The download counter is bumped before streaming begins; a client
/// disconnect mid-stream does not undo it.
pub async fn download_resource(
    user: AuthedUser,
    state: web::Data<AppState>,
    resource_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let resource = find_readable(&user, &state, *resource_id).await?;

    resource_repo::increment_download_count(&state.db, resource.id).await?;

    let stream = state.storage.open_stream(&resource.file_path).await?;

    let download_name = resource
        .file_name
        .clone()
        .unwrap_or_else(|| resource.title.clone())
        .replace('"', "_");

    Ok(HttpResponse::Ok()
        .content_type(
            resource
                .content_type
                .clone()
                .unwrap_or_else(|| "application/octet-stream".to_string()),
        )
        .insert_header((
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", download_name),
        ))
        .streaming(stream))
}

/// PUT /api/v1/resources/{id}
pub async fn update_resource(
    user: AuthedUser,
    state: web::Data<AppState>,
    resource_id: web::Path<Uuid>,
    req: web::Json<UpdateResourceRequest>,
) -> Result<HttpResponse> {
    let resource = resource_repo::find_by_id(&state.db, *resource_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Resource not found".to_string()))?;

    require_owner_or_admin(&user, &resource)?;

    if let Some(ref title) = req.title {
        if title.trim().is_empty() {
            return Err(AppError::Validation("Title cannot be empty".to_string()));
        }
    }

    let updated = resource_repo::update_metadata(
        &state.db,
        resource.id,
        req.title.as_deref().map(str::trim),
        req.description.as_deref(),
        req.access_level,
    )
    .await?
    .ok_or_else(|| AppError::NotFound("Resource not found".to_string()))?;

    Ok(HttpResponse::Ok().json(updated))
}

/// DELETE /api/v1/resources/{id}
pub async fn delete_resource(
    user: AuthedUser,
    state: web::Data<AppState>,
    resource_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let resource = resource_repo::find_by_id(&state.db, *resource_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Resource not found".to_string()))?;

    require_owner_or_admin(&user, &resource)?;

    resource_repo::delete_resource(&state.db, resource.id).await?;

    if let Err(e) = state.storage.delete(&resource.file_path).await {
        tracing::warn!("Failed to delete blob {}: {}", resource.file_path, e);
    }

    Ok(HttpResponse::Ok().json(serde_json::json!({ "success": true })))
}

async fn find_readable(
    user: &AuthedUser,
    state: &web::Data<AppState>,
    resource_id: Uuid,
) -> Result<Resource> {
    let resource = resource_repo::find_by_id(&state.db, resource_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Resource not found".to_string()))?;

    require_readable(user, &resource)?;

    Ok(resource)
}

fn require_owner_or_admin(user: &AuthedUser, resource: &Resource) -> Result<()> {
    if resource.uploaded_by != user.id && !user.is_admin() {
        return Err(AppError::Authorization(
            "Only the uploader or an administrator can modify this resource".to_string(),
        ));
    }
    Ok(())
}

fn require_readable(user: &AuthedUser, resource: &Resource) -> Result<()> {
    if resource.access_level == AccessLevel::Admin && !user.is_admin() {
        return Err(AppError::Authorization(
            "Administrator access required for this resource".to_string(),
        ));
    }
    Ok(())
}

fn bad_multipart(e: actix_multipart::MultipartError) -> AppError {
    AppError::Validation(format!("Invalid multipart payload: {}", e))
}

async fn read_text_field(field: &mut Field) -> Result<String> {
    let mut data = Vec::new();
    while let Some(chunk) = field.try_next().await.map_err(bad_multipart)? {
        data.extend_from_slice(&chunk);
    }

    String::from_utf8(data).map_err(|_| AppError::Validation("Form fields must be UTF-8".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{UserRole, UserStatus};
    use chrono::Utc;

    fn user(id: Uuid, role: UserRole) -> AuthedUser {
        AuthedUser {
            id,
            name: "Test".to_string(),
            email: "test@example.com".to_string(),
            role,
            status: UserStatus::Approved,
        }
    }

    fn resource(uploaded_by: Uuid, access_level: AccessLevel) -> Resource {
        Resource {
            id: Uuid::new_v4(),
            title: "Notes".to_string(),
            description: None,
            file_name: None,
            file_path: "abc-notes.txt".to_string(),
            content_type: None,
            size_bytes: Some(42),
            access_level,
            download_count: 0,
            uploaded_by,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_admin_level_resource_blocked_for_members() {
        let member = user(Uuid::new_v4(), UserRole::Member);
        let admin = user(Uuid::new_v4(), UserRole::Admin);
        let restricted = resource(admin.id, AccessLevel::Admin);

        assert!(require_readable(&member, &restricted).is_err());
        assert!(require_readable(&admin, &restricted).is_ok());
    }

    #[test]
    fn test_open_resource_readable_by_anyone() {
        let member = user(Uuid::new_v4(), UserRole::Member);
        let open = resource(Uuid::new_v4(), AccessLevel::All);

        assert!(require_readable(&member, &open).is_ok());
    }

    #[test]
    fn test_only_uploader_or_admin_may_modify() {
        let uploader = user(Uuid::new_v4(), UserRole::Member);
        let other = user(Uuid::new_v4(), UserRole::Member);
        let admin = user(Uuid::new_v4(), UserRole::Admin);
        let owned = resource(uploader.id, AccessLevel::All);

        assert!(require_owner_or_admin(&uploader, &owned).is_ok());
        assert!(require_owner_or_admin(&admin, &owned).is_ok());
        assert!(require_owner_or_admin(&other, &owned).is_err());
    }
}
