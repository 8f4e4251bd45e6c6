//! Route configuration
//!
//! Centralized route setup; each domain configures its own scope. Guards are
//! applied at the scope level so role/status policy is never re-checked ad
//! hoc inside handlers.

use actix_web::web;

use crate::handlers;
use crate::middleware::{AuthGuard, RequireAdmin};

/// Configure all routes for the application
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .route("/health", web::get().to(handlers::health_check))
            .route("/health/ready", web::get().to(handlers::readiness_check))
            .configure(routes::auth::configure)
            .configure(routes::users::configure)
            .configure(routes::events::configure)
            .configure(routes::resources::configure)
            .configure(routes::messaging::configure),
    );
}

// Sub-modules for each domain
mod routes {
    use super::*;

    pub mod auth {
        use super::*;
        pub fn configure(cfg: &mut web::ServiceConfig) {
            cfg.service(
                web::scope("/auth")
                    .route("/register", web::post().to(handlers::register))
                    .route("/login", web::post().to(handlers::login))
                    .route("/logout", web::post().to(handlers::logout))
                    .service(
                        web::scope("")
                            .wrap(AuthGuard)
                            .route("/me", web::get().to(handlers::me)),
                    ),
            );
        }
    }

    pub mod users {
        use super::*;
        pub fn configure(cfg: &mut web::ServiceConfig) {
            cfg.service(
                web::scope("/users")
                    .wrap(AuthGuard)
                    .route("/directory", web::get().to(handlers::user_directory))
                    .route("/me", web::put().to(handlers::update_profile))
                    .route("/me/password", web::put().to(handlers::change_password))
                    .service(
                        web::scope("")
                            .wrap(RequireAdmin)
                            .route("", web::get().to(handlers::list_users))
                            .route("/{id}", web::get().to(handlers::get_user))
                            .route("/{id}/status", web::put().to(handlers::update_user_status))
                            .route("/{id}", web::delete().to(handlers::delete_user)),
                    ),
            );
        }
    }

    pub mod events {
        use super::*;
        pub fn configure(cfg: &mut web::ServiceConfig) {
            cfg.service(
                web::scope("/events")
                    .wrap(AuthGuard)
                    .route("", web::get().to(handlers::list_events))
                    .route("/{id}", web::get().to(handlers::get_event))
                    .route("/{id}/rsvp", web::post().to(handlers::rsvp))
                    .route("/{id}/rsvp", web::delete().to(handlers::cancel_rsvp))
                    .route("/{id}/attendees", web::get().to(handlers::list_attendees))
                    .service(
                        web::scope("")
                            .wrap(RequireAdmin)
                            .route("", web::post().to(handlers::create_event))
                            .route("/{id}", web::put().to(handlers::update_event))
                            .route("/{id}", web::delete().to(handlers::delete_event)),
                    ),
            );
        }
    }

    pub mod resources {
        use super::*;
        pub fn configure(cfg: &mut web::ServiceConfig) {
            cfg.service(
                web::scope("/resources")
                    .wrap(AuthGuard)
                    .route("", web::get().to(handlers::list_resources))
                    .route("", web::post().to(handlers::upload_resource))
                    .route("/{id}", web::get().to(handlers::get_resource))
                    .route("/{id}", web::put().to(handlers::update_resource))
                    .route("/{id}", web::delete().to(handlers::delete_resource))
                    .route(
                        "/{id}/download",
                        web::get().to(handlers::download_resource),
                    ),
            );
        }
    }

    pub mod messaging {
        use super::*;
        pub fn configure(cfg: &mut web::ServiceConfig) {
            cfg.service(
                web::scope("/messages/conversations")
                    .wrap(AuthGuard)
                    .route("", web::get().to(handlers::list_conversations))
                    .route("", web::post().to(handlers::create_conversation))
                    .route("/{id}", web::get().to(handlers::get_conversation))
                    .route("/{id}", web::put().to(handlers::update_conversation))
                    .route("/{id}", web::delete().to(handlers::leave_conversation))
                    .route("/{id}/messages", web::get().to(handlers::list_messages))
                    .route("/{id}/messages", web::post().to(handlers::send_message))
                    .route(
                        "/{id}/read",
                        web::post().to(handlers::mark_conversation_read),
                    ),
            );
        }
    }
}
