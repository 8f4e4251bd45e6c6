/// Authentication middleware: resolves the session token to a live user row
/// and enforces the account-status policy before a request reaches its
/// handler. A second, composable guard restricts routes to administrators.
use actix_web::{
    dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform},
    web, Error, FromRequest, HttpMessage, HttpRequest,
};
use futures_util::future::{ready, LocalBoxFuture, Ready};
use serde::Serialize;
use std::rc::Rc;
use uuid::Uuid;

use crate::db::user_repo;
use crate::error::AppError;
use crate::models::{UserRole, UserStatus};
use crate::AppState;

/// The authenticated user attached to the request after the guard passes.
#[derive(Debug, Clone, Serialize)]
pub struct AuthedUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    pub status: UserStatus,
}

impl AuthedUser {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

impl FromRequest for AuthedUser {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        match req.extensions().get::<AuthedUser>().cloned() {
            Some(user) => ready(Ok(user)),
            None => ready(Err(AppError::Authentication(
                "Missing authentication token".to_string(),
            )
            .into())),
        }
    }
}

/// Authentication guard factory
pub struct AuthGuard;

impl<S, B> Transform<S, ServiceRequest> for AuthGuard
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = AuthGuardService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(AuthGuardService {
            service: Rc::new(service),
        }))
    }
}

pub struct AuthGuardService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for AuthGuardService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();

        Box::pin(async move {
            let state = req
                .app_data::<web::Data<AppState>>()
                .cloned()
                .ok_or_else(|| {
                    Error::from(AppError::Internal(
                        "Application state not configured".to_string(),
                    ))
                })?;

            // Bearer header first, session cookie as fallback. Extracted to
            // an owned String so no request borrow survives into
            // extensions_mut() below.
            let bearer = req
                .headers()
                .get("Authorization")
                .and_then(|h| h.to_str().ok())
                .and_then(|h| h.strip_prefix("Bearer "))
                .map(|t| t.to_string());

            let token = match bearer.or_else(|| {
                req.request().cookie("session").map(|c| c.value().to_string())
            }) {
                Some(t) => t,
                None => {
                    return Err(AppError::Authentication(
                        "Missing authentication token".to_string(),
                    )
                    .into());
                }
            };

            let user_id = state.jwt.subject(&token)?;

            // Resolve against the user store on every request; a token for a
            // deleted account never yields a stale identity.
            let user = user_repo::find_by_id(&state.db, user_id)
                .await
                .map_err(AppError::Database)?
                .ok_or_else(|| {
                    AppError::Authentication("User no longer exists".to_string())
                })?;

            if user.role != UserRole::Admin && user.status != UserStatus::Approved {
                let message = match user.status {
                    UserStatus::Pending => "Your account is awaiting approval",
                    _ => "Your account has been rejected",
                };
                return Err(AppError::NotApproved(message.to_string()).into());
            }

            req.extensions_mut().insert(AuthedUser {
                id: user.id,
                name: user.name,
                email: user.email,
                role: user.role,
                status: user.status,
            });

            service.call(req).await
        })
    }
}

/// Admin guard factory; composes after [`AuthGuard`]
pub struct RequireAdmin;

impl<S, B> Transform<S, ServiceRequest> for RequireAdmin
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = RequireAdminService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(RequireAdminService {
            service: Rc::new(service),
        }))
    }
}

pub struct RequireAdminService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for RequireAdminService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();

        Box::pin(async move {
            let role = req.extensions().get::<AuthedUser>().map(|u| u.role);

            match role {
                Some(UserRole::Admin) => service.call(req).await,
                Some(_) => Err(AppError::Authorization(
                    "Administrator access required".to_string(),
                )
                .into()),
                None => Err(AppError::Authentication(
                    "Missing authentication token".to_string(),
                )
                .into()),
            }
        })
    }
}
