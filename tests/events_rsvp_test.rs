// Integration tests for event management and capacity-gated RSVPs
mod common;

use actix_web::{test, web, App};
use serde_json::{json, Value};

use common::fixtures;
use community_service::routes::configure_routes;

macro_rules! init_app {
    ($state:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new($state.clone()))
                .configure(configure_routes),
        )
        .await
    };
}

macro_rules! create_event {
    ($app:expr, $auth:expr, $capacity:expr) => {{
        let req = test::TestRequest::post()
            .uri("/api/v1/events")
            .insert_header($auth)
            .set_json(json!({
                "title": "Community meetup",
                "description": "Monthly get-together",
                "location": "Main hall",
                "starts_at": "2026-09-01T18:00:00Z",
                "capacity": $capacity
            }))
            .to_request();
        let resp = test::call_service(&$app, req).await;
        assert_eq!(resp.status(), 201);
        let body: Value = test::read_body_json(resp).await;
        body["id"].as_str().unwrap().to_string()
    }};
}

#[actix_web::test]
#[ignore] // Requires database
async fn test_event_creation_is_admin_only() {
    let pool = fixtures::create_test_pool().await;
    let state = fixtures::test_state(pool.clone()).await;
    let app = init_app!(state);

    let member = fixtures::create_member(&pool).await;

    let req = test::TestRequest::post()
        .uri("/api/v1/events")
        .insert_header(fixtures::bearer(&state, &member))
        .set_json(json!({
            "title": "Rogue event",
            "starts_at": "2026-09-01T18:00:00Z"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 403);

    let admin = fixtures::create_admin(&pool).await;
    create_event!(app, fixtures::bearer(&state, &admin), 0);
}

#[actix_web::test]
#[ignore] // Requires database
async fn test_rsvp_and_duplicate_rejection() {
    let pool = fixtures::create_test_pool().await;
    let state = fixtures::test_state(pool.clone()).await;
    let app = init_app!(state);

    let admin = fixtures::create_admin(&pool).await;
    let member = fixtures::create_member(&pool).await;
    let event_id = create_event!(app, fixtures::bearer(&state, &admin), 0);

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/events/{}/rsvp", event_id))
        .insert_header(fixtures::bearer(&state, &member))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 201);

    // Second attempt by the same user is a conflict
    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/events/{}/rsvp", event_id))
        .insert_header(fixtures::bearer(&state, &member))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 409);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["message"].as_str().unwrap().contains("Already RSVPed"));
}

#[actix_web::test]
#[ignore] // Requires database
async fn test_rsvp_blocked_at_capacity() {
    let pool = fixtures::create_test_pool().await;
    let state = fixtures::test_state(pool.clone()).await;
    let app = init_app!(state);

    let admin = fixtures::create_admin(&pool).await;
    let first = fixtures::create_member(&pool).await;
    let second = fixtures::create_member(&pool).await;
    let event_id = create_event!(app, fixtures::bearer(&state, &admin), 1);

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/events/{}/rsvp", event_id))
        .insert_header(fixtures::bearer(&state, &first))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 201);

    // Event is now exactly at capacity
    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/events/{}/rsvp", event_id))
        .insert_header(fixtures::bearer(&state, &second))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 409);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["message"].as_str().unwrap().contains("capacity"));

    // Cancelling frees the spot
    let req = test::TestRequest::delete()
        .uri(&format!("/api/v1/events/{}/rsvp", event_id))
        .insert_header(fixtures::bearer(&state, &first))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 200);

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/events/{}/rsvp", event_id))
        .insert_header(fixtures::bearer(&state, &second))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 201);
}

#[actix_web::test]
#[ignore] // Requires database
async fn test_cancel_without_rsvp_is_not_found() {
    let pool = fixtures::create_test_pool().await;
    let state = fixtures::test_state(pool.clone()).await;
    let app = init_app!(state);

    let admin = fixtures::create_admin(&pool).await;
    let member = fixtures::create_member(&pool).await;
    let event_id = create_event!(app, fixtures::bearer(&state, &admin), 0);

    let req = test::TestRequest::delete()
        .uri(&format!("/api/v1/events/{}/rsvp", event_id))
        .insert_header(fixtures::bearer(&state, &member))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 404);
}

#[actix_web::test]
#[ignore] // Requires database
async fn test_event_detail_reports_attendance() {
    let pool = fixtures::create_test_pool().await;
    let state = fixtures::test_state(pool.clone()).await;
    let app = init_app!(state);

    let admin = fixtures::create_admin(&pool).await;
    let member = fixtures::create_member(&pool).await;
    let event_id = create_event!(app, fixtures::bearer(&state, &admin), 10);

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/events/{}/rsvp", event_id))
        .insert_header(fixtures::bearer(&state, &member))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 201);

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/events/{}", event_id))
        .insert_header(fixtures::bearer(&state, &member))
        .to_request();
    let detail: Value = test::read_body_json(test::call_service(&app, req).await).await;
    assert_eq!(detail["attendee_count"], 1);
    assert_eq!(detail["user_has_rsvped"], true);

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/events/{}/attendees", event_id))
        .insert_header(fixtures::bearer(&state, &member))
        .to_request();
    let attendees: Value = test::read_body_json(test::call_service(&app, req).await).await;
    assert_eq!(attendees.as_array().unwrap().len(), 1);
    assert_eq!(attendees[0]["user_id"].as_str().unwrap(), member.id.to_string());
}

#[actix_web::test]
#[ignore] // Requires database
async fn test_update_and_delete_events() {
    let pool = fixtures::create_test_pool().await;
    let state = fixtures::test_state(pool.clone()).await;
    let app = init_app!(state);

    let admin = fixtures::create_admin(&pool).await;
    let member = fixtures::create_member(&pool).await;
    let event_id = create_event!(app, fixtures::bearer(&state, &admin), 0);

    let req = test::TestRequest::put()
        .uri(&format!("/api/v1/events/{}", event_id))
        .insert_header(fixtures::bearer(&state, &member))
        .set_json(json!({ "title": "Hijacked" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 403);

    let req = test::TestRequest::put()
        .uri(&format!("/api/v1/events/{}", event_id))
        .insert_header(fixtures::bearer(&state, &admin))
        .set_json(json!({ "title": "Rescheduled meetup", "capacity": 25 }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let updated: Value = test::read_body_json(resp).await;
    assert_eq!(updated["title"], "Rescheduled meetup");
    assert_eq!(updated["capacity"], 25);

    let req = test::TestRequest::delete()
        .uri(&format!("/api/v1/events/{}", event_id))
        .insert_header(fixtures::bearer(&state, &admin))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 200);

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/events/{}", event_id))
        .insert_header(fixtures::bearer(&state, &admin))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 404);
}
