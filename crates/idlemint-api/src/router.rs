//! Axum router construction for the Idlemint API.
//!
//! Assembles all REST routes into a single [`Router`] with CORS and
//! request tracing enabled. CORS allows any origin for development; in
//! production this should be restricted to the game client's origin.

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use idlemint_engine::cache::SnapshotCache;
use idlemint_engine::store::EconomyStore;

use crate::handlers;
use crate::state::AppState;

/// Build the complete Axum router for the API server.
pub fn build_router<S, C>(state: AppState<S, C>) -> Router
where
    S: EconomyStore + 'static,
    C: SnapshotCache + 'static,
{
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/players", post(handlers::register))
        .route("/api/players/{id}", get(handlers::get_profile))
        .route("/api/players/{id}/tap", post(handlers::tap))
        .route("/api/players/{id}/referral", post(handlers::apply_referral))
        .route(
            "/api/players/{id}/businesses/{business}/purchase",
            post(handlers::purchase_business),
        )
        .route(
            "/api/players/{id}/businesses/{business}/upgrade",
            post(handlers::upgrade_business),
        )
        .route(
            "/api/players/{id}/businesses/{business}/collect",
            post(handlers::collect_income),
        )
        .route("/api/businesses", get(handlers::list_businesses))
        .route("/api/leaderboard", get(handlers::leaderboard))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
