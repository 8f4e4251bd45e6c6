use actix_web::{
    cookie::{time::Duration as CookieDuration, Cookie},
    web, HttpResponse,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::db::user_repo;
use crate::error::{is_unique_violation, AppError, Result};
use crate::middleware::AuthedUser;
use crate::models::{User, UserRole, UserStatus};
use crate::security::password;
use crate::validators;
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email)]
    pub email: String,

    #[validate(length(min = 1, max = 100))]
    pub name: String,

    #[validate(length(min = 8))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,

    #[validate(length(min = 1))]
    pub password: String,

    #[serde(default)]
    pub remember_me: bool,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user: User,
    pub access_token: String,
    pub expires_in: i64,
}

/// POST /api/v1/auth/register
/// New accounts start as pending members and cannot log in until approved.
pub async fn register(
    state: web::Data<AppState>,
    req: web::Json<RegisterRequest>,
) -> Result<HttpResponse> {
    req.validate()?;

    if !validators::validate_password(&req.password) {
        return Err(AppError::Validation(
            "Password must be at least 8 characters and contain a letter and a digit".to_string(),
        ));
    }
    if !validators::validate_name(&req.name) {
        return Err(AppError::Validation("Name cannot be empty".to_string()));
    }

    let password_hash = password::hash_password(&req.password)?;

    let user = user_repo::create_user(
        &state.db,
        &req.email,
        req.name.trim(),
        &password_hash,
        UserRole::Member,
        UserStatus::Pending,
    )
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Conflict("Email already registered".to_string())
        } else {
            AppError::Database(e)
        }
    })?;

    tracing::info!("User registered: {}", user.email);

    Ok(HttpResponse::Created().json(user))
}

/// POST /api/v1/auth/login
/// Verifies credentials, enforces the account-status policy, and issues a
/// session token both in the response body and as an HttpOnly cookie.
pub async fn login(
    state: web::Data<AppState>,
    req: web::Json<LoginRequest>,
) -> Result<HttpResponse> {
    req.validate()?;

    let user = user_repo::find_by_email(&state.db, &req.email)
        .await
        .map_err(AppError::Database)?
        .ok_or_else(|| AppError::Authentication("Invalid email or password".to_string()))?;

    if !password::verify_password(&req.password, &user.password_hash)? {
        return Err(AppError::Authentication(
            "Invalid email or password".to_string(),
        ));
    }

    if user.role != UserRole::Admin && user.status != UserStatus::Approved {
        let message = match user.status {
            UserStatus::Pending => "Your account is awaiting approval",
            _ => "Your account has been rejected",
        };
        return Err(AppError::NotApproved(message.to_string()));
    }

    let ttl = if req.remember_me {
        state.config.jwt.remember_me_ttl
    } else {
        state.config.jwt.session_ttl
    };

    let token = state.jwt.mint_token(user.id, &user.email, ttl)?;

    let cookie = Cookie::build("session", token.clone())
        .path("/")
        .http_only(true)
        .max_age(CookieDuration::seconds(ttl))
        .finish();

    tracing::info!("User logged in: {}", user.email);

    Ok(HttpResponse::Ok().cookie(cookie).json(LoginResponse {
        user,
        access_token: token,
        expires_in: ttl,
    }))
}

/// POST /api/v1/auth/logout
/// Token issuance is stateless; logout just clears the session cookie.
pub async fn logout() -> Result<HttpResponse> {
    let mut cookie = Cookie::build("session", "").path("/").http_only(true).finish();
    cookie.make_removal();

    Ok(HttpResponse::Ok()
        .cookie(cookie)
        .json(serde_json::json!({ "success": true })))
}

/// GET /api/v1/auth/me
pub async fn me(user: AuthedUser) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(user))
}
