use axum::{
    body::{to_bytes, Body, Bytes},
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

use crate::app::{create_app, AppState};
use crate::bidding::clock::FixedClock;
use crate::bidding::Clock;
use crate::config::Settings;
use crate::domain::auth::{User, UserRole};
use crate::services::PdfRenderer;
use crate::store::flaky::{Fault, FlakyStore};
use crate::store::UserStore;

/// Router over an in-memory store that can be told to fail individual calls.
struct TestApp {
    router: Router,
    state: Arc<AppState>,
    store: Arc<FlakyStore>,
    clock: Arc<FixedClock>,
}

impl TestApp {
    fn new() -> Self {
        let store = Arc::new(FlakyStore::new());
        let clock = Arc::new(FixedClock::new(Utc::now()));
        let state = AppState::new(
            Settings::for_tests(),
            store.clone(),
            clock.clone(),
            Arc::new(PdfRenderer::new()),
        );
        Self {
            router: create_app(state.clone()),
            state,
            store,
            clock,
        }
    }

    /// Inserts an account directly and returns a token for it, skipping
    /// password hashing.
    async fn token_for(&self, email: &str, role: UserRole) -> (Uuid, String) {
        let user = self
            .store
            .insert_user(User {
                id: Uuid::new_v4(),
                email: email.to_string(),
                password_hash: String::new(),
                role,
                created_at: Utc::now(),
            })
            .await
            .unwrap();
        let (token, _) = self.state.tokens.issue(&user).unwrap();
        (user.id, token)
    }

    async fn raw(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, HeaderMap, Bytes) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, headers, bytes)
    }

    async fn call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let (status, _, bytes) = self.raw(method, uri, token, body).await;
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn publish(&self, admin: &str, body: Value) -> Value {
        let (status, body) = self.call(Method::POST, "/tenders", Some(admin), Some(body)).await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["data"].clone()
    }

    fn road_tender(&self) -> Value {
        json!({
            "title": "Ring road resurfacing",
            "min_budget": "5000000",
            "max_timeline": 180,
            "required_materials": ["Cement", "Bitumen", "Steel"],
            "deadline": (self.clock.now() + Duration::days(7)).to_rfc3339(),
        })
    }
}

fn offer(budget: &str, timeline: i64) -> Value {
    json!({
        "budget": budget,
        "timeline": timeline,
        "materials": ["Cement", "Bitumen", "Steel", "Sand"],
    })
}

#[tokio::test]
async fn health_reports_memory_store() {
    let app = TestApp::new();
    let (status, headers, bytes) = app.raw(Method::GET, "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert!(headers.contains_key("x-request-id"));
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["services"]["store"], "memory");
}

#[tokio::test]
async fn register_login_and_me() {
    let app = TestApp::new();
    let credentials = json!({ "email": "Bidder@Example.com", "password": "long enough" });

    let (status, body) = app
        .call(Method::POST, "/auth/register", None, Some(credentials.clone()))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["token_type"], "Bearer");
    assert_eq!(body["data"]["user"]["email"], "bidder@example.com");
    assert_eq!(body["data"]["user"]["role"], "bidder");

    let (status, body) = app
        .call(Method::POST, "/auth/register", None, Some(credentials.clone()))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "CONFLICT");

    let (status, body) = app
        .call(Method::POST, "/auth/login", None, Some(credentials))
        .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["data"]["access_token"].as_str().unwrap().to_string();

    let (status, body) = app.call(Method::GET, "/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["email"], "bidder@example.com");
}

#[tokio::test]
async fn register_survives_one_transient_failure() {
    for fault in [Fault::Before, Fault::After] {
        let app = TestApp::new();
        app.store.fail_once("insert_user", fault);
        let credentials = json!({ "email": "bidder@example.com", "password": "long enough" });

        let (status, body) = app
            .call(Method::POST, "/auth/register", None, Some(credentials.clone()))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        assert_eq!(app.store.calls("insert_user"), 2);

        let (status, _) = app
            .call(Method::POST, "/auth/login", None, Some(credentials))
            .await;
        assert_eq!(status, StatusCode::OK);
    }
}

#[tokio::test]
async fn login_failures_share_one_message() {
    let app = TestApp::new();
    app.call(
        Method::POST,
        "/auth/register",
        None,
        Some(json!({ "email": "admin@example.com", "password": "long enough" })),
    )
    .await;

    let wrong_password = app
        .call(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "email": "admin@example.com", "password": "not it at all" })),
        )
        .await;
    let unknown_email = app
        .call(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "email": "nobody@example.com", "password": "long enough" })),
        )
        .await;

    for (status, body) in [wrong_password, unknown_email] {
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Invalid email or password");
    }
}

#[tokio::test]
async fn register_validates_input_and_grants_admin_role() {
    let app = TestApp::new();

    let (status, body) = app
        .call(
            Method::POST,
            "/auth/register",
            None,
            Some(json!({ "email": "not-an-email", "password": "short" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "VALIDATION_FAILED");

    let (status, body) = app
        .call(
            Method::POST,
            "/auth/register",
            None,
            Some(json!({ "email": "admin@example.com", "password": "long enough" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["user"]["role"], "admin");
}

#[tokio::test]
async fn protected_routes_require_a_valid_token() {
    let app = TestApp::new();

    let (status, body) = app.call(Method::GET, "/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");

    let (status, _) = app.call(Method::GET, "/me", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn tender_publishing_is_admin_only() {
    let app = TestApp::new();
    let (_, bidder) = app.token_for("b@example.com", UserRole::Bidder).await;
    let (_, admin) = app.token_for("admin@example.com", UserRole::Admin).await;

    let (status, body) = app
        .call(Method::POST, "/tenders", Some(&bidder), Some(app.road_tender()))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");

    let tender = app.publish(&admin, app.road_tender()).await;
    assert_eq!(tender["is_open"], true);
    assert_eq!(
        tender["requirements"]["required_materials"],
        json!(["Bitumen", "Cement", "Steel"])
    );

    let (status, body) = app.call(Method::GET, "/tenders?per_page=10", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pagination"]["total_items"], 1);
    assert_eq!(body["data"][0]["id"], tender["id"]);

    let mut invalid = app.road_tender();
    invalid["max_timeline"] = json!(0);
    let (status, body) = app.call(Method::POST, "/tenders", Some(&admin), Some(invalid)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "VALIDATION_FAILED");
}

#[tokio::test]
async fn unknown_tender_is_not_found() {
    let app = TestApp::new();
    let (status, body) = app
        .call(Method::GET, &format!("/tenders/{}", Uuid::new_v4()), None, None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn submission_rules() {
    let app = TestApp::new();
    let (_, admin) = app.token_for("admin@example.com", UserRole::Admin).await;
    let (_, bidder) = app.token_for("b@example.com", UserRole::Bidder).await;
    let tender = app.publish(&admin, app.road_tender()).await;
    let uri = format!("/tenders/{}/proposals", tender["id"].as_str().unwrap());

    let (status, body) = app
        .call(Method::POST, &uri, Some(&bidder), Some(offer("6000000", 150)))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["status"], "pending");
    assert_eq!(body["data"]["rank"], Value::Null);

    let (status, body) = app
        .call(Method::POST, &uri, Some(&bidder), Some(offer("5500000", 120)))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "DUPLICATE_SUBMISSION");

    let (status, body) = app
        .call(Method::POST, &uri, Some(&bidder), Some(offer("100", 0)))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "VALIDATION_FAILED");

    let (_, fresh) = app.token_for("fresh@example.com", UserRole::Bidder).await;
    let (status, body) = app
        .call(Method::POST, &uri, Some(&fresh), Some(offer("6000000", 3_000_000_000)))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "VALIDATION_FAILED");

    let (_, late) =app.token_for("late@example.com", UserRole::Bidder).await;
    app.clock.advance(Duration::days(8));
    let (status, body) = app
        .call(Method::POST, &uri, Some(&late), Some(offer("6000000", 150)))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "DEADLINE_PASSED");

    let (status, _) = app
        .call(
            Method::POST,
            &format!("/tenders/{}/proposals", Uuid::new_v4()),
            Some(&late),
            Some(offer("6000000", 150)),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn rankings_are_provisional_until_the_deadline() {
    let app = TestApp::new();
    let (_, admin) = app.token_for("admin@example.com", UserRole::Admin).await;
    let (first_id, first) = app.token_for("first@example.com", UserRole::Bidder).await;
    let (_, second) = app.token_for("second@example.com", UserRole::Bidder).await;
    let (_, cheap) = app.token_for("cheap@example.com", UserRole::Bidder).await;
    let tender = app.publish(&admin, app.road_tender()).await;
    let tender_id = tender["id"].as_str().unwrap().to_string();
    let submit = format!("/tenders/{tender_id}/proposals");

    app.call(Method::POST, &submit, Some(&second), Some(offer("7000000", 100)))
        .await;
    app.call(Method::POST, &submit, Some(&first), Some(offer("6000000", 150)))
        .await;
    // Below the minimum budget
    app.call(Method::POST, &submit, Some(&cheap), Some(offer("4000000", 150)))
        .await;

    let rankings = format!("/tenders/{tender_id}/rankings");
    let (status, body) = app.call(Method::GET, &rankings, Some(&first), None).await;
    assert_eq!(status, StatusCode::OK);
    let data = &body["data"];
    assert_eq!(data["is_final"], false);
    assert_eq!(data["rejected_count"], 1);
    assert_eq!(data["rankings"].as_array().unwrap().len(), 2);
    assert_eq!(data["rankings"][0]["rank"], 1);
    assert_eq!(data["rankings"][0]["user_id"], first_id.to_string());

    app.clock.advance(Duration::days(7));
    let (_, body) = app.call(Method::GET, &rankings, Some(&first), None).await;
    assert_eq!(body["data"]["is_final"], true);
    assert_eq!(body["data"]["rankings"][1]["rank"], 2);

    let (status, _) = app.call(Method::GET, &rankings, None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn proposal_document_is_rendered_for_owner_and_admin() {
    let app = TestApp::new();
    let (_, admin) = app.token_for("admin@example.com", UserRole::Admin).await;
    let (_, owner) = app.token_for("owner@example.com", UserRole::Bidder).await;
    let (_, other) = app.token_for("other@example.com", UserRole::Bidder).await;
    let tender = app.publish(&admin, app.road_tender()).await;
    let tender_id = tender["id"].as_str().unwrap().to_string();

    let (_, body) = app
        .call(
            Method::POST,
            &format!("/tenders/{tender_id}/proposals"),
            Some(&owner),
            Some(offer("6000000", 150)),
        )
        .await;
    let document = format!("/proposals/{}/document", body["data"]["id"].as_str().unwrap());

    // Still pending
    let (status, _) = app.call(Method::GET, &document, Some(&owner), None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    app.call(
        Method::GET,
        &format!("/tenders/{tender_id}/rankings"),
        Some(&owner),
        None,
    )
    .await;

    let (status, headers, bytes) = app.raw(Method::GET, &document, Some(&owner), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "application/pdf");
    assert!(bytes.starts_with(b"%PDF-1.4"));
    assert!(String::from_utf8_lossy(&bytes).contains("(Tender: Ring road resurfacing) Tj"));

    let (status, _, _) = app.raw(Method::GET, &document, Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.call(Method::GET, &document, Some(&other), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Tender removed: the document still renders, with a placeholder title
    let (status, _) = app
        .call(Method::DELETE, &format!("/tenders/{tender_id}"), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _, bytes) = app.raw(Method::GET, &document, Some(&owner), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(String::from_utf8_lossy(&bytes).contains("(Tender: Deleted) Tj"));
}

#[tokio::test]
async fn my_proposals_survive_tender_removal() {
    let app = TestApp::new();
    let (_, admin) = app.token_for("admin@example.com", UserRole::Admin).await;
    let (_, bidder) = app.token_for("b@example.com", UserRole::Bidder).await;
    let kept = app.publish(&admin, app.road_tender()).await;
    let mut removed_body = app.road_tender();
    removed_body["title"] = json!("Bridge repair");
    let removed = app.publish(&admin, removed_body).await;

    for tender in [&kept, &removed] {
        let (status, _) = app
            .call(
                Method::POST,
                &format!("/tenders/{}/proposals", tender["id"].as_str().unwrap()),
                Some(&bidder),
                Some(offer("6000000", 150)),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, _) = app
        .call(
            Method::DELETE,
            &format!("/tenders/{}", removed["id"].as_str().unwrap()),
            Some(&admin),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = app.call(Method::GET, "/proposals/my", Some(&bidder), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pagination"]["total_items"], 2);

    let items = body["data"].as_array().unwrap();
    let title_of = |tender: &Value| {
        items
            .iter()
            .find(|p| p["tender_id"] == tender["id"])
            .map(|p| p["tender_title"].clone())
            .unwrap()
    };
    assert_eq!(title_of(&kept), json!("Ring road resurfacing"));
    assert_eq!(title_of(&removed), Value::Null);
}

#[tokio::test]
async fn withdrawal_frees_the_slot() {
    let app = TestApp::new();
    let (_, admin) = app.token_for("admin@example.com", UserRole::Admin).await;
    let (_, bidder) = app.token_for("b@example.com", UserRole::Bidder).await;
    let (_, other) = app.token_for("other@example.com", UserRole::Bidder).await;
    let tender = app.publish(&admin, app.road_tender()).await;
    let submit = format!("/tenders/{}/proposals", tender["id"].as_str().unwrap());

    let (_, body) = app
        .call(Method::POST, &submit, Some(&bidder), Some(offer("6000000", 150)))
        .await;
    let withdraw = format!("/proposals/{}", body["data"]["id"].as_str().unwrap());

    let (status, _) = app.call(Method::DELETE, &withdraw, Some(&other), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.call(Method::DELETE, &withdraw, Some(&bidder), None).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = app.call(Method::GET, "/proposals/my", Some(&bidder), None).await;
    assert_eq!(body["pagination"]["total_items"], 0);

    let (status, _) = app
        .call(Method::POST, &submit, Some(&bidder), Some(offer("5900000", 140)))
        .await;
    assert_eq!(status, StatusCode::CREATED);
}
