use actix_web::{web, HttpResponse};

use crate::error::{AppError, Result};
use crate::AppState;

/// GET /api/v1/health
pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// GET /api/v1/health/ready
/// Ready only when the database answers.
pub async fn readiness_check(state: web::Data<AppState>) -> Result<HttpResponse> {
    sqlx::query("SELECT 1")
        .execute(&state.db)
        .await
        .map_err(AppError::Database)?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "status": "ready" })))
}
