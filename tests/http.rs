//! Superfície HTTP sobre os stores em memória.

mod common;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use event_tickets::{config::AppState, middleware::actor::ACTOR_HEADER, routes};

fn router(app: &AppState) -> Router {
    routes::router(app.clone())
}

async fn send(app: &AppState, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut request = Request::builder()
        .method(method)
        .uri(uri)
        .header(ACTOR_HEADER, Uuid::new_v4().to_string());
    let body = match body {
        Some(body) => {
            request = request.header(header::CONTENT_TYPE, "application/json");
            Body::from(body.to_string())
        }
        None => Body::empty(),
    };

    let response = router(app).oneshot(request.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn health_check() {
    let app = common::app();
    let response = router(&app)
        .oneshot(Request::builder().uri("/api/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn ticket_lifecycle_over_http() {
    let app = common::app();

    let (status, event) = send(&app, "POST", "/api/events", Some(json!({ "title": "Show" }))).await;
    assert_eq!(status, StatusCode::CREATED);
    let event_id = event["id"].as_str().unwrap().to_string();

    let (status, ticket) = send(
        &app,
        "POST",
        &format!("/api/events/{event_id}/tickets"),
        Some(json!({
            "provider": "commerce",
            "name": "Pista",
            "price": "50.00",
            "mode": "global",
            "eventCapacity": 89
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let ticket_id = ticket["id"].as_str().unwrap().to_string();
    assert_eq!(ticket["available"], json!({ "kind": "limited", "value": 89 }));

    let (status, adjustment) = send(
        &app,
        "POST",
        &format!("/api/tickets/{ticket_id}/claims"),
        Some(json!({ "delta": 2 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(adjustment["pool"]["stock"], json!(87));

    let (status, counts) = send(&app, "GET", &format!("/api/events/{event_id}/counts"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(counts["tickets"]["available"], json!(87));

    let (status, listed) = send(
        &app,
        "GET",
        &format!("/api/events/{event_id}/tickets?costOp=%3E&cost=10"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/api/events/{event_id}/tickets/{ticket_id}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, "GET", &format!("/api/tickets/{ticket_id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn sold_out_claim_is_a_conflict() {
    let app = common::app();
    let event_id = common::event(&app).await;
    let id = common::ticket(&app, event_id, "Geral", common::own(1)).await;

    let uri = format!("/api/tickets/{id}/claims");
    let (first, _) = send(&app, "POST", &uri, Some(json!({ "delta": 1 }))).await;
    let (second, body) = send(&app, "POST", &uri, Some(json!({ "delta": 1 }))).await;
    assert_eq!(first, StatusCode::OK);
    assert_eq!(second, StatusCode::CONFLICT);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn protected_fields_are_bad_requests() {
    let app = common::app();
    let event_id = common::event(&app).await;
    let id = common::ticket(&app, event_id, "Geral", common::own(10)).await;

    let (status, _) = send(
        &app,
        "PATCH",
        &format!("/api/tickets/{id}/fields"),
        Some(json!({ "_stock": 3 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, ticket) = send(
        &app,
        "PATCH",
        &format!("/api/tickets/{id}/fields"),
        Some(json!({ "_name": "Geral - Lote 2", "_capacity": 12 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ticket["name"], json!("Geral - Lote 2"));
    assert_eq!(ticket["stock"], json!(12));
}

#[tokio::test]
async fn invalid_payloads_and_headers_are_rejected() {
    let app = common::app();

    let (status, body) = send(&app, "POST", "/api/events", Some(json!({ "title": "" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["details"]["title"].is_array());

    let response = router(&app)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/events")
                .header(ACTOR_HEADER, "not-a-uuid")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json!({ "title": "Show" }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn attendee_checkin_over_http() {
    let app = common::app();
    let event_id = common::event(&app).await;
    let id = common::ticket(&app, event_id, "Geral", common::own(10)).await;

    let (status, created) = send(
        &app,
        "POST",
        &format!("/api/tickets/{id}/attendees"),
        Some(json!({ "quantity": 1, "fullName": "Ana", "email": "ana@example.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let attendee_id = created["attendeeIds"][0].as_str().unwrap().to_string();

    let (status, attendee) = send(
        &app,
        "POST",
        &format!("/api/attendees/{attendee_id}/checkin"),
        Some(json!({ "viaQr": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(attendee["checkedIn"], json!(true));
    assert_eq!(attendee["checkinDetails"]["source"], json!("app"));

    let (status, attendee) = send(&app, "DELETE", &format!("/api/attendees/{attendee_id}/checkin"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(attendee["checkedIn"], json!(false));

    let (status, _) = send(&app, "GET", &format!("/api/attendees/{}", Uuid::new_v4()), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn attendee_quantity_is_bounded() {
    let app = common::app();
    let event_id = common::event(&app).await;
    let id = common::ticket(&app, event_id, "Geral", common::own(-1)).await;

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/tickets/{id}/attendees"),
        Some(json!({ "quantity": 1000, "fullName": "Ana", "email": "ana@example.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["details"]["quantity"].is_array());

    let ticket = app.tickets.get_ticket(id).await.unwrap().unwrap();
    assert_eq!(ticket.sales, 0);
}
