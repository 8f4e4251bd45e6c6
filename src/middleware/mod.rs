pub mod auth;

pub use auth::{AuthGuard, AuthedUser, RequireAdmin};
