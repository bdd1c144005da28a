use std::collections::HashSet;
use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use ticketing_server::config::Config;
use ticketing_server::routes::create_routes;
use ticketing_server::store::MemoryStore;
use ticketing_server::AppState;

struct TestApp {
    router: Router,
    store: Arc<MemoryStore>,
}

impl TestApp {
    fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let state = AppState::new(store.clone(), Config::default());
        Self {
            router: create_routes(state),
            store,
        }
    }

    async fn call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    async fn register(&self, email: &str, role: &str) -> String {
        let (status, body) = self
            .call(
                Method::POST,
                "/api/users/register",
                None,
                Some(json!({
                    "name": "Test User",
                    "email": email,
                    "password": "correct horse",
                    "role": role,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {}", body);
        body["data"]["token"].as_str().unwrap().to_string()
    }

    async fn create_event(&self, token: &str, date: &str) -> Value {
        let (status, body) = self
            .call(
                Method::POST,
                "/api/events",
                Some(token),
                Some(event_payload(date)),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create failed: {}", body);
        body["data"].clone()
    }
}

fn event_payload(date: &str) -> Value {
    json!({
        "title": "  Rust Meetup ",
        "description": "Talks and pizza",
        "date": date,
        "location": "Berlin",
        "image": "/uploads/meetup.png",
        "ticketTypes": [
            { "name": "General", "price": 10.00, "quantity": 100 },
            { "name": "VIP", "price": 25.00, "quantity": 10 }
        ]
    })
}

fn tier_id(event: &Value, index: usize) -> String {
    event["ticketTypes"][index]["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health_and_root() {
    let app = TestApp::new();
    let (status, body) = app.call(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "ok");

    let (status, _) = app.call(Method::GET, "/", None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_register_returns_token_and_defaults_to_attendee() {
    let app = TestApp::new();
    let (status, body) = app
        .call(
            Method::POST,
            "/api/users/register",
            None,
            Some(json!({ "name": "Ada", "email": "Ada@Example.com", "password": "pw" })),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["role"], "attendee");
    assert_eq!(body["data"]["email"], "ada@example.com");
    assert!(body["data"]["token"].as_str().is_some());
    assert!(body["data"].get("passwordHash").is_none());
}

#[tokio::test]
async fn test_register_duplicate_email_is_rejected() {
    let app = TestApp::new();
    app.register("dup@example.com", "attendee").await;

    let (status, body) = app
        .call(
            Method::POST,
            "/api/users/register",
            None,
            Some(json!({ "name": "Other", "email": "DUP@example.com", "password": "x" })),
        )
        .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["message"], "User with this email already exists");
}

#[tokio::test]
async fn test_register_validation() {
    let app = TestApp::new();
    let (status, _) = app
        .call(
            Method::POST,
            "/api/users/register",
            None,
            Some(json!({ "email": "a@b.io", "password": "x" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .call(
            Method::POST,
            "/api/users/register",
            None,
            Some(json!({ "name": "A", "email": "a@b.io", "password": "x", "role": "admin" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .call(
            Method::POST,
            "/api/users/register",
            None,
            Some(json!({ "name": "A", "email": "not-an-email", "password": "x" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_login_with_wrong_password_is_unauthorized() {
    let app = TestApp::new();
    app.register("login@example.com", "attendee").await;

    let (status, body) = app
        .call(
            Method::POST,
            "/api/users/login",
            None,
            Some(json!({ "email": "login@example.com", "password": "wrong" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["message"], "Invalid credentials");

    let (status, body) = app
        .call(
            Method::POST,
            "/api/users/login",
            None,
            Some(json!({ "email": "login@example.com", "password": "correct horse" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["token"].as_str().is_some());
}

#[tokio::test]
async fn test_create_event_with_missing_field_is_bad_request() {
    let app = TestApp::new();
    let token = app.register("org@example.com", "organizer").await;

    let mut payload = event_payload("2030-01-01T10:00:00Z");
    payload.as_object_mut().unwrap().remove("location");

    let (status, body) = app
        .call(Method::POST, "/api/events", Some(&token), Some(payload))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "Please include all event fields");
}

#[tokio::test]
async fn test_event_routes_require_organizer() {
    let app = TestApp::new();
    let (status, _) = app
        .call(
            Method::POST,
            "/api/events",
            None,
            Some(event_payload("2030-01-01T10:00:00Z")),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let attendee = app.register("fan@example.com", "attendee").await;
    let (status, _) = app
        .call(
            Method::POST,
            "/api/events",
            Some(&attendee),
            Some(event_payload("2030-01-01T10:00:00Z")),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .call(Method::GET, "/api/events", Some("bogus-token"), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .call(Method::GET, "/api/events/myevents", Some("bogus-token"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_events_are_listed_by_date_and_fetched_by_id() {
    let app = TestApp::new();
    let token = app.register("org@example.com", "organizer").await;
    let later = app.create_event(&token, "2031-06-01T10:00:00Z").await;
    let sooner = app.create_event(&token, "2030-06-01T10:00:00Z").await;

    assert_eq!(later["title"], "Rust Meetup");

    let (status, body) = app.call(Method::GET, "/api/events", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<_> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["id"].clone())
        .collect();
    assert_eq!(ids, vec![sooner["id"].clone(), later["id"].clone()]);

    let uri = format!("/api/events/{}", sooner["id"].as_str().unwrap());
    let (status, body) = app.call(Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["ticketTypes"].as_array().unwrap().len(), 2);

    let (status, _) = app
        .call(Method::GET, "/api/events/not-an-id", None, None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_my_events_only_lists_own() {
    let app = TestApp::new();
    let mine = app.register("me@example.com", "organizer").await;
    let theirs = app.register("them@example.com", "organizer").await;
    let own = app.create_event(&mine, "2030-01-01T10:00:00Z").await;
    app.create_event(&theirs, "2030-02-01T10:00:00Z").await;

    let (status, body) = app
        .call(Method::GET, "/api/events/myevents", Some(&mine), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let events = body["data"].as_array().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["id"], own["id"]);
}

#[tokio::test]
async fn test_other_organizer_cannot_update_or_delete() {
    let app = TestApp::new();
    let owner = app.register("owner@example.com", "organizer").await;
    let intruder = app.register("intruder@example.com", "organizer").await;
    let event = app.create_event(&owner, "2030-01-01T10:00:00Z").await;
    let uri = format!("/api/events/{}", event["id"].as_str().unwrap());

    // Invalid payload still gets the authorization failure.
    let (status, _) = app
        .call(Method::PUT, &uri, Some(&intruder), Some(json!({ "ticketTypes": [] })))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .call(
            Method::PUT,
            &uri,
            Some(&intruder),
            Some(event_payload("2030-01-01T10:00:00Z")),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.call(Method::DELETE, &uri, Some(&intruder), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.call(Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_owner_updates_and_deletes_event() {
    let app = TestApp::new();
    let owner = app.register("owner@example.com", "organizer").await;
    let event = app.create_event(&owner, "2030-01-01T10:00:00Z").await;
    let uri = format!("/api/events/{}", event["id"].as_str().unwrap());
    let vip_id = tier_id(&event, 1);

    let (status, _) = app
        .call(Method::PUT, &uri, Some(&owner), Some(json!({ "title": "Renamed" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .call(
            Method::PUT,
            &uri,
            Some(&owner),
            Some(json!({
                "title": "Renamed",
                "ticketTypes": [
                    { "id": vip_id, "name": "VIP", "price": 30, "quantity": 5 }
                ]
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["title"], "Renamed");
    assert_eq!(body["data"]["location"], "Berlin");
    assert_eq!(body["data"]["ticketTypes"][0]["id"], vip_id.as_str());
    assert_eq!(body["data"]["ticketTypes"][0]["price"], json!(30.0));

    let (status, body) = app.call(Method::DELETE, &uri, Some(&owner), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Event removed");

    let (status, _) = app.call(Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.call(Method::DELETE, &uri, Some(&owner), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_purchase_totals_and_issues_one_ticket_per_unit() {
    let app = TestApp::new();
    let organizer = app.register("org@example.com", "organizer").await;
    let attendee = app.register("fan@example.com", "attendee").await;
    let event = app.create_event(&organizer, "2030-01-01T10:00:00Z").await;

    let (status, body) = app
        .call(
            Method::POST,
            "/api/orders/create-payment-intent",
            Some(&attendee),
            Some(json!({
                "eventId": event["id"],
                "tickets": [
                    { "ticketTypeId": tier_id(&event, 0), "quantity": 2 },
                    { "ticketTypeId": tier_id(&event, 1), "quantity": 1 }
                ]
            })),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED, "{}", body);
    let data = &body["data"];
    assert_eq!(data["totalAmount"], json!(45.0));
    assert!(data["clientSecret"]
        .as_str()
        .unwrap()
        .starts_with("fake_client_secret_"));

    let tickets = data["tickets"].as_array().unwrap();
    assert_eq!(tickets.len(), 3);
    let codes: HashSet<_> = tickets
        .iter()
        .map(|t| t["uniqueCode"].as_str().unwrap())
        .collect();
    assert_eq!(codes.len(), 3);
    assert_eq!(app.store.ticket_count().await, 3);
    assert_eq!(app.store.order_count().await, 1);

    // Tier stock is not decremented by a purchase.
    let uri = format!("/api/events/{}", event["id"].as_str().unwrap());
    let (_, body) = app.call(Method::GET, &uri, None, None).await;
    assert_eq!(body["data"]["ticketTypes"][0]["quantity"], 100);
}

#[tokio::test]
async fn test_unknown_tier_creates_no_tickets() {
    let app = TestApp::new();
    let organizer = app.register("org@example.com", "organizer").await;
    let attendee = app.register("fan@example.com", "attendee").await;
    let event = app.create_event(&organizer, "2030-01-01T10:00:00Z").await;

    let (status, _) = app
        .call(
            Method::POST,
            "/api/orders/create-payment-intent",
            Some(&attendee),
            Some(json!({
                "eventId": event["id"],
                "tickets": [
                    { "ticketTypeId": tier_id(&event, 0), "quantity": 1 },
                    { "ticketTypeId": uuid::Uuid::new_v4().to_string(), "quantity": 1 }
                ]
            })),
        )
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(app.store.ticket_count().await, 0);
    assert_eq!(app.store.order_count().await, 0);
}

#[tokio::test]
async fn test_oversized_prices_and_purchases_are_rejected() {
    let app = TestApp::new();
    let organizer = app.register("org@example.com", "organizer").await;
    let attendee = app.register("fan@example.com", "attendee").await;

    for price in [json!(5e28), json!(1.005)] {
        let mut payload = event_payload("2030-01-01T19:00:00Z");
        payload["ticketTypes"][0]["price"] = price;
        let (status, body) = app
            .call(Method::POST, "/api/events", Some(&organizer), Some(payload))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);
    }

    let mut payload = event_payload("2030-01-01T19:00:00Z");
    payload["ticketTypes"][0]["price"] = json!(0);
    let (status, body) = app
        .call(Method::POST, "/api/events", Some(&organizer), Some(payload))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let event = body["data"].clone();

    let (status, body) = app
        .call(
            Method::POST,
            "/api/orders/create-payment-intent",
            Some(&attendee),
            Some(json!({
                "eventId": event["id"],
                "tickets": [{ "ticketTypeId": tier_id(&event, 0), "quantity": u32::MAX }]
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(app.store.ticket_count().await, 0);
}

#[tokio::test]
async fn test_tier_ids_are_generated_on_create_and_unique_on_update() {
    let app = TestApp::new();
    let organizer = app.register("org@example.com", "organizer").await;

    let chosen = "8d5a4c1e-3f1b-4a55-9c43-5a0e6f3b2d11";
    let mut payload = event_payload("2030-01-01T19:00:00Z");
    payload["ticketTypes"][0]["id"] = json!(chosen);
    payload["ticketTypes"][1]["id"] = json!(chosen);
    let (status, body) = app
        .call(Method::POST, "/api/events", Some(&organizer), Some(payload))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let event = body["data"].clone();
    let first = tier_id(&event, 0);
    let second = tier_id(&event, 1);
    assert_ne!(first, chosen);
    assert_ne!(first, second);

    let uri = format!("/api/events/{}", event["id"].as_str().unwrap());
    let duplicate = json!({
        "ticketTypes": [
            { "id": first, "name": "General", "price": 10, "quantity": 100 },
            { "id": first, "name": "VIP", "price": 25, "quantity": 10 }
        ]
    });
    let (status, _) = app
        .call(Method::PUT, &uri, Some(&organizer), Some(duplicate))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let kept = json!({
        "ticketTypes": [
            { "id": first, "name": "General", "price": 12, "quantity": 100 },
            { "name": "Balcony", "price": 15, "quantity": 20 }
        ]
    });
    let (status, body) = app
        .call(Method::PUT, &uri, Some(&organizer), Some(kept))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tier_id(&body["data"], 0), first);
}

#[tokio::test]
async fn test_purchase_request_validation() {
    let app = TestApp::new();
    let attendee = app.register("fan@example.com", "attendee").await;
    let organizer = app.register("org@example.com", "organizer").await;

    let (status, _) = app
        .call(
            Method::POST,
            "/api/orders/create-payment-intent",
            Some(&attendee),
            Some(json!({ "eventId": uuid::Uuid::new_v4().to_string(), "tickets": [] })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .call(
            Method::POST,
            "/api/orders/create-payment-intent",
            Some(&attendee),
            Some(json!({
                "eventId": uuid::Uuid::new_v4().to_string(),
                "tickets": [{ "ticketTypeId": uuid::Uuid::new_v4().to_string(), "quantity": 1 }]
            })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .call(
            Method::POST,
            "/api/orders/create-payment-intent",
            Some(&organizer),
            Some(json!({ "eventId": "x", "tickets": [] })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_my_tickets_joins_event_newest_first() {
    let app = TestApp::new();
    let organizer = app.register("org@example.com", "organizer").await;
    let attendee = app.register("fan@example.com", "attendee").await;
    let other = app.register("other@example.com", "attendee").await;
    let event = app.create_event(&organizer, "2030-01-01T10:00:00Z").await;

    for (token, quantity) in [(&attendee, 2), (&other, 1)] {
        let (status, _) = app
            .call(
                Method::POST,
                "/api/orders/create-payment-intent",
                Some(token),
                Some(json!({
                    "eventId": event["id"],
                    "tickets": [{ "ticketTypeId": tier_id(&event, 0), "quantity": quantity }]
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = app
        .call(Method::GET, "/api/orders/my-tickets", Some(&attendee), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let tickets = body["data"].as_array().unwrap();
    assert_eq!(tickets.len(), 2);
    assert_eq!(tickets[0]["event"]["title"], "Rust Meetup");
    assert_eq!(tickets[0]["ticketType"], "General");
    assert_eq!(tickets[0]["isCheckedIn"], false);
}

#[tokio::test]
async fn test_check_in_flow() {
    let app = TestApp::new();
    let organizer = app.register("org@example.com", "organizer").await;
    let stranger = app.register("stranger@example.com", "organizer").await;
    let attendee = app.register("fan@example.com", "attendee").await;
    let event = app.create_event(&organizer, "2030-01-01T10:00:00Z").await;

    let (_, body) = app
        .call(
            Method::POST,
            "/api/orders/create-payment-intent",
            Some(&attendee),
            Some(json!({
                "eventId": event["id"],
                "tickets": [{ "ticketTypeId": tier_id(&event, 1), "quantity": 1 }]
            })),
        )
        .await;
    let code = body["data"]["tickets"][0]["uniqueCode"]
        .as_str()
        .unwrap()
        .to_string();
    let uri = format!("/api/events/{}/check-in", event["id"].as_str().unwrap());

    let (status, _) = app
        .call(Method::POST, &uri, Some(&stranger), Some(json!({ "uniqueCode": code })))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .call(Method::POST, &uri, Some(&organizer), Some(json!({ "uniqueCode": "NOPE" })))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app
        .call(Method::POST, &uri, Some(&organizer), Some(json!({ "uniqueCode": code })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["isCheckedIn"], true);

    let (status, _) = app
        .call(Method::POST, &uri, Some(&organizer), Some(json!({ "uniqueCode": code })))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_malformed_json_uses_error_envelope() {
    let app = TestApp::new();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/users/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}
