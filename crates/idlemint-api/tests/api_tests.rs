//! Integration tests for the API endpoints.
//!
//! Tests drive the Axum `Router` directly via `tower::ServiceExt`
//! without starting a TCP server, validating routing, status mapping,
//! and payload shapes against the in-memory backends.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use idlemint_api::router::build_router;
use idlemint_api::state::AppState;
use idlemint_engine::config::AppConfig;
use idlemint_engine::engine::EconomyEngine;
use idlemint_engine::{InMemoryCache, InMemoryStore};
use serde_json::{json, Value};
use tower::ServiceExt;

fn make_router(config: AppConfig) -> Router {
    let engine = EconomyEngine::new(InMemoryStore::new(), InMemoryCache::new(), &config);
    build_router(AppState::new(engine))
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn post_json(router: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let response = router
        .clone()
        .oneshot(
            Request::post(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    (status, body_to_json(response.into_body()).await)
}

async fn get_json(router: &Router, uri: &str) -> (StatusCode, Value) {
    let response = router
        .clone()
        .oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    (status, body_to_json(response.into_body()).await)
}

async fn register(router: &Router, name: &str) -> (String, String) {
    let (status, json) =
        post_json(router, "/api/players", json!({ "display_name": name })).await;
    assert_eq!(status, StatusCode::OK);
    (
        json["player_id"].as_str().unwrap().to_owned(),
        json["referral_code"].as_str().unwrap().to_owned(),
    )
}

// =========================================================================
// Tests
// =========================================================================

#[tokio::test]
async fn test_register_and_profile() {
    let router = make_router(AppConfig::default());
    let (id, code) = register(&router, "Ada").await;
    assert_eq!(code.len(), 12);

    let (status, json) = get_json(&router, &format!("/api/players/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["display_name"], "Ada");
    assert_eq!(json["points"], 0);
    assert_eq!(json["level"], 1);
    assert_eq!(json["daily_counters"]["clicks"], 0);
}

#[tokio::test]
async fn test_register_rejects_empty_name() {
    let router = make_router(AppConfig::default());
    let (status, json) = post_json(&router, "/api/players", json!({ "display_name": "  " })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["status"], 400);
}

#[tokio::test]
async fn test_tap_credits_points() {
    let router = make_router(AppConfig::default());
    let (id, _) = register(&router, "Tapper").await;

    let (status, json) =
        post_json(&router, &format!("/api/players/{id}/tap"), json!({ "taps": 10 })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["points_earned"], 10);
    assert_eq!(json["points"], 10);
    assert_eq!(json["leveled_up"], false);
}

#[tokio::test]
async fn test_tap_quota_maps_to_429() {
    let mut config = AppConfig::default();
    config.limits.clicks = 5;
    let router = make_router(config);
    let (id, _) = register(&router, "Limited").await;

    let uri = format!("/api/players/{id}/tap");
    let (status, _) = post_json(&router, &uri, json!({ "taps": 5 })).await;
    assert_eq!(status, StatusCode::OK);
    let (status, json) = post_json(&router, &uri, json!({ "taps": 1 })).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(json["status"], 429);
}

#[tokio::test]
async fn test_unknown_player_is_404() {
    let router = make_router(AppConfig::default());
    let ghost = uuid::Uuid::now_v7();
    let (status, _) = get_json(&router, &format!("/api/players/{ghost}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_malformed_player_id_is_400() {
    let router = make_router(AppConfig::default());
    let (status, _) = get_json(&router, "/api/players/not-a-uuid").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_business_catalog_lists_entries() {
    let router = make_router(AppConfig::default());
    let (status, json) = get_json(&router, "/api/businesses").await;
    assert_eq!(status, StatusCode::OK);
    let entries = json.as_array().unwrap();
    assert!(!entries.is_empty());
    assert!(entries.iter().any(|e| e["id"] == "lemonade"));
}

#[tokio::test]
async fn test_purchase_upgrade_collect_flow() {
    let router = make_router(AppConfig::default());
    let (id, _) = register(&router, "Mogul").await;

    // Fund the account to 500 points.
    let tap_uri = format!("/api/players/{id}/tap");
    for _ in 0..50 {
        let (status, _) = post_json(&router, &tap_uri, json!({ "taps": 10 })).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, json) = post_json(
        &router,
        &format!("/api/players/{id}/businesses/lemonade/purchase"),
        json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["points"], 400);
    assert_eq!(json["businesses"][0]["business_id"], "lemonade");

    // Unaffordable at 400 points? floor(100 * 1.5) = 150 is fine.
    let (status, json) = post_json(
        &router,
        &format!("/api/players/{id}/businesses/lemonade/upgrade"),
        json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["new_level"], 2);
    assert_eq!(json["cost"], 150);

    // Immediate collect: zero accrued income is a conflict.
    let (status, json) = post_json(
        &router,
        &format!("/api/players/{id}/businesses/lemonade/collect"),
        json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["status"], 409);
}

#[tokio::test]
async fn test_purchase_insufficient_funds_is_409() {
    let router = make_router(AppConfig::default());
    let (id, _) = register(&router, "Broke").await;

    let (status, json) = post_json(
        &router,
        &format!("/api/players/{id}/businesses/lemonade/purchase"),
        json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(json["error"].as_str().unwrap().contains("insufficient"));
}

#[tokio::test]
async fn test_unknown_business_is_404() {
    let router = make_router(AppConfig::default());
    let (id, _) = register(&router, "Lost").await;

    let (status, _) = post_json(
        &router,
        &format!("/api/players/{id}/businesses/moon_base/purchase"),
        json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_leaderboard_orders_and_limits() {
    let router = make_router(AppConfig::default());
    let (a, _) = register(&router, "Gold").await;
    let (b, _) = register(&router, "Silver").await;

    let a_tap = format!("/api/players/{a}/tap");
    post_json(&router, &a_tap, json!({ "taps": 10 })).await;
    post_json(&router, &a_tap, json!({ "taps": 10 })).await;
    post_json(&router, &format!("/api/players/{b}/tap"), json!({ "taps": 10 })).await;

    let (status, json) = get_json(&router, "/api/leaderboard?limit=1").await;
    assert_eq!(status, StatusCode::OK);
    let entries = json.as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["display_name"], "Gold");
    assert_eq!(entries[0]["points"], 20);
}

#[tokio::test]
async fn test_referral_flow_and_conflicts() {
    let router = make_router(AppConfig::default());
    let (alice, alice_code) = register(&router, "Alice").await;
    let (_bob, bob_code) = register(&router, "Bob").await;

    // Self-referral is a conflict.
    let referral_uri = format!("/api/players/{alice}/referral");
    let (status, _) = post_json(&router, &referral_uri, json!({ "code": alice_code })).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, json) = post_json(&router, &referral_uri, json!({ "code": bob_code })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["bonus"], 500);
    assert_eq!(json["referrer_display_name"], "Bob");

    // A second redemption is rejected.
    let (status, _) = post_json(&router, &referral_uri, json!({ "code": bob_code })).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, profile) = get_json(&router, &format!("/api/players/{alice}")).await;
    assert_eq!(profile["points"], 500);
}
