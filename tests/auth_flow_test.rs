// Integration tests for registration, login, and the access guard
mod common;

use actix_web::{test, web, App};
use serde_json::{json, Value};

use common::fixtures;
use community_service::db::user_repo;
use community_service::models::{UserRole, UserStatus};
use community_service::routes::configure_routes;

#[actix_web::test]
#[ignore] // Requires database
async fn test_register_creates_pending_user() {
    let pool = fixtures::create_test_pool().await;
    let state = fixtures::test_state(pool.clone()).await;
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state.clone()))
            .configure(configure_routes),
    )
    .await;

    let email = fixtures::unique_email("bob");
    let req = test::TestRequest::post()
        .uri("/api/v1/auth/register")
        .set_json(json!({ "email": email, "name": "Bob", "password": "Password123" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 201);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "pending");
    assert_eq!(body["role"], "member");
    assert!(body.get("password_hash").is_none());
}

#[actix_web::test]
#[ignore] // Requires database
async fn test_duplicate_email_is_conflict() {
    let pool = fixtures::create_test_pool().await;
    let state = fixtures::test_state(pool.clone()).await;
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state.clone()))
            .configure(configure_routes),
    )
    .await;

    let email = fixtures::unique_email("dup");
    for expected in [201, 409] {
        let req = test::TestRequest::post()
            .uri("/api/v1/auth/register")
            .set_json(json!({ "email": email, "name": "Dup", "password": "Password123" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), expected);
    }
}

#[actix_web::test]
#[ignore] // Requires database
async fn test_login_distinguishes_pending_and_rejected() {
    let pool = fixtures::create_test_pool().await;
    let state = fixtures::test_state(pool.clone()).await;
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state.clone()))
            .configure(configure_routes),
    )
    .await;

    let user = fixtures::create_user(&pool, "pending", UserRole::Member, UserStatus::Pending).await;

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/login")
        .set_json(json!({ "email": user.email, "password": fixtures::TEST_PASSWORD }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 403);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["message"].as_str().unwrap().contains("awaiting approval"));

    user_repo::update_status(&pool, user.id, UserStatus::Rejected)
        .await
        .unwrap();

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/login")
        .set_json(json!({ "email": user.email, "password": fixtures::TEST_PASSWORD }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 403);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["message"].as_str().unwrap().contains("rejected"));
}

#[actix_web::test]
#[ignore] // Requires database
async fn test_wrong_password_is_unauthorized() {
    let pool = fixtures::create_test_pool().await;
    let state = fixtures::test_state(pool.clone()).await;
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state.clone()))
            .configure(configure_routes),
    )
    .await;

    let user = fixtures::create_member(&pool).await;

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/login")
        .set_json(json!({ "email": user.email, "password": "WrongPassword1" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 401);
}

#[actix_web::test]
#[ignore] // Requires database
async fn test_approved_member_logs_in_and_gets_session() {
    let pool = fixtures::create_test_pool().await;
    let state = fixtures::test_state(pool.clone()).await;
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state.clone()))
            .configure(configure_routes),
    )
    .await;

    let user = fixtures::create_member(&pool).await;

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/login")
        .set_json(json!({ "email": user.email, "password": fixtures::TEST_PASSWORD }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);

    let cookie_header = resp
        .headers()
        .get("set-cookie")
        .expect("login should set a session cookie")
        .to_str()
        .unwrap()
        .to_string();
    assert!(cookie_header.starts_with("session="));

    let body: Value = test::read_body_json(resp).await;
    let token = body["access_token"].as_str().unwrap().to_string();
    assert_eq!(body["user"]["email"], user.email.as_str());

    // The bearer token works on a protected route
    let req = test::TestRequest::get()
        .uri("/api/v1/auth/me")
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);

    // The session cookie alone works too
    let session_value = cookie_header.split(';').next().unwrap().to_string();
    let req = test::TestRequest::get()
        .uri("/api/v1/auth/me")
        .insert_header(("Cookie", session_value))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
}

#[actix_web::test]
#[ignore] // Requires database
async fn test_missing_token_is_unauthorized() {
    let pool = fixtures::create_test_pool().await;
    let state = fixtures::test_state(pool.clone()).await;
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state.clone()))
            .configure(configure_routes),
    )
    .await;

    let req = test::TestRequest::get().uri("/api/v1/auth/me").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 401);
}

#[actix_web::test]
#[ignore] // Requires database
async fn test_token_for_deleted_user_is_rejected() {
    let pool = fixtures::create_test_pool().await;
    let state = fixtures::test_state(pool.clone()).await;
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state.clone()))
            .configure(configure_routes),
    )
    .await;

    let user = fixtures::create_member(&pool).await;
    let token = fixtures::token_for(&state, &user);

    user_repo::delete_user(&pool, user.id).await.unwrap();

    let req = test::TestRequest::get()
        .uri("/api/v1/auth/me")
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 401);
}

#[actix_web::test]
#[ignore] // Requires database
async fn test_pending_user_token_is_status_gated() {
    let pool = fixtures::create_test_pool().await;
    let state = fixtures::test_state(pool.clone()).await;
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state.clone()))
            .configure(configure_routes),
    )
    .await;

    // A token minted before the account was gated must still be blocked.
    let user = fixtures::create_user(&pool, "pending", UserRole::Member, UserStatus::Pending).await;

    let req = test::TestRequest::get()
        .uri("/api/v1/events")
        .insert_header(fixtures::bearer(&state, &user))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 403);
}

#[actix_web::test]
#[ignore] // Requires database
async fn test_admin_routes_require_admin_role() {
    let pool = fixtures::create_test_pool().await;
    let state = fixtures::test_state(pool.clone()).await;
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state.clone()))
            .configure(configure_routes),
    )
    .await;

    let member = fixtures::create_member(&pool).await;
    let admin = fixtures::create_admin(&pool).await;

    let req = test::TestRequest::get()
        .uri("/api/v1/users")
        .insert_header(fixtures::bearer(&state, &member))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 403);

    let req = test::TestRequest::get()
        .uri("/api/v1/users")
        .insert_header(fixtures::bearer(&state, &admin))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
}

#[actix_web::test]
#[ignore] // Requires database
async fn test_admin_approves_pending_member() {
    let pool = fixtures::create_test_pool().await;
    let state = fixtures::test_state(pool.clone()).await;
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state.clone()))
            .configure(configure_routes),
    )
    .await;

    let admin = fixtures::create_admin(&pool).await;
    let user = fixtures::create_user(&pool, "joiner", UserRole::Member, UserStatus::Pending).await;

    let req = test::TestRequest::put()
        .uri(&format!("/api/v1/users/{}/status", user.id))
        .insert_header(fixtures::bearer(&state, &admin))
        .set_json(json!({ "status": "approved" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/login")
        .set_json(json!({ "email": user.email, "password": fixtures::TEST_PASSWORD }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
}
