use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::db::user_repo;
use crate::error::{AppError, Result};
use crate::middleware::AuthedUser;
use crate::models::UserStatus;
use crate::security::password;
use crate::validators;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ListUsersQuery {
    pub status: Option<UserStatus>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: UserStatus,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,

    #[validate(length(max = 30))]
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Serialize)]
pub struct DirectoryEntry {
    pub id: Uuid,
    pub name: String,
}

/// GET /api/v1/users (admin)
pub async fn list_users(
    state: web::Data<AppState>,
    query: web::Query<ListUsersQuery>,
) -> Result<HttpResponse> {
    let users = user_repo::list_users(&state.db, query.status)
        .await
        .map_err(AppError::Database)?;

    Ok(HttpResponse::Ok().json(users))
}

/// GET /api/v1/users/{id} (admin)
pub async fn get_user(state: web::Data<AppState>, user_id: web::Path<Uuid>) -> Result<HttpResponse> {
    let user = user_repo::find_by_id(&state.db, *user_id)
        .await
        .map_err(AppError::Database)?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(HttpResponse::Ok().json(user))
}

/// PUT /api/v1/users/{id}/status (admin)
/// Approve or reject a pending registration.
pub async fn update_user_status(
    state: web::Data<AppState>,
    user_id: web::Path<Uuid>,
    req: web::Json<UpdateStatusRequest>,
) -> Result<HttpResponse> {
    if req.status == UserStatus::Pending {
        return Err(AppError::Validation(
            "Status can only be set to approved or rejected".to_string(),
        ));
    }

    let user = user_repo::update_status(&state.db, *user_id, req.status)
        .await
        .map_err(AppError::Database)?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    tracing::info!("User {} status set to {:?}", user.email, user.status);

    Ok(HttpResponse::Ok().json(user))
}

/// DELETE /api/v1/users/{id} (admin)
pub async fn delete_user(
    admin: AuthedUser,
    state: web::Data<AppState>,
    user_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    if *user_id == admin.id {
        return Err(AppError::Validation(
            "Cannot delete your own account".to_string(),
        ));
    }

    let deleted = user_repo::delete_user(&state.db, *user_id)
        .await
        .map_err(AppError::Database)?;

    if deleted == 0 {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    Ok(HttpResponse::Ok().json(serde_json::json!({ "success": true })))
}

/// GET /api/v1/users/directory
/// Approved members, for picking conversation partners.
pub async fn user_directory(state: web::Data<AppState>) -> Result<HttpResponse> {
    let users = user_repo::list_approved(&state.db)
        .await
        .map_err(AppError::Database)?;

    let entries: Vec<DirectoryEntry> = users
        .into_iter()
        .map(|u| DirectoryEntry { id: u.id, name: u.name })
        .collect();

    Ok(HttpResponse::Ok().json(entries))
}

/// PUT /api/v1/users/me
pub async fn update_profile(
    user: AuthedUser,
    state: web::Data<AppState>,
    req: web::Json<UpdateProfileRequest>,
) -> Result<HttpResponse> {
    req.validate()?;

    if let Some(ref name) = req.name {
        if !validators::validate_name(name) {
            return Err(AppError::Validation("Name cannot be empty".to_string()));
        }
    }

    let updated = user_repo::update_profile(
        &state.db,
        user.id,
        req.name.as_deref().map(str::trim),
        req.phone.as_deref(),
    )
    .await
    .map_err(AppError::Database)?
    .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(HttpResponse::Ok().json(updated))
}

/// PUT /api/v1/users/me/password
pub async fn change_password(
    user: AuthedUser,
    state: web::Data<AppState>,
    req: web::Json<ChangePasswordRequest>,
) -> Result<HttpResponse> {
    let record = user_repo::find_by_id(&state.db, user.id)
        .await
        .map_err(AppError::Database)?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    if !password::verify_password(&req.current_password, &record.password_hash)? {
        return Err(AppError::Authentication(
            "Current password is incorrect".to_string(),
        ));
    }

    if !validators::validate_password(&req.new_password) {
        return Err(AppError::Validation(
            "Password must be at least 8 characters and contain a letter and a digit".to_string(),
        ));
    }

    let new_hash = password::hash_password(&req.new_password)?;
    user_repo::update_password(&state.db, user.id, &new_hash)
        .await
        .map_err(AppError::Database)?;

    tracing::info!("Password changed for user {}", record.email);

    Ok(HttpResponse::Ok().json(serde_json::json!({ "success": true })))
}
