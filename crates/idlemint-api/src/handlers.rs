//! REST endpoint handlers for the Idlemint API.
//!
//! Handlers parse path and body input, delegate to the engine, and wrap
//! its results in the shared response payloads. All domain decisions live
//! in the engine; nothing here reads or writes state directly.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/api/players` | Register a player |
//! | `GET` | `/api/players/{id}` | Profile snapshot |
//! | `POST` | `/api/players/{id}/tap` | Credit a tap batch |
//! | `POST` | `/api/players/{id}/referral` | Redeem a referral code |
//! | `GET` | `/api/businesses` | Business catalog |
//! | `POST` | `/api/players/{id}/businesses/{business}/purchase` | Buy |
//! | `POST` | `/api/players/{id}/businesses/{business}/upgrade` | Upgrade |
//! | `POST` | `/api/players/{id}/businesses/{business}/collect` | Collect |
//! | `GET` | `/api/leaderboard` | Top players |

use axum::extract::{Path, Query, State};
use axum::Json;
use uuid::Uuid;

use idlemint_engine::cache::SnapshotCache;
use idlemint_engine::store::EconomyStore;
use idlemint_types::{
    BusinessDefinition, BusinessId, CollectResponse, LeaderboardEntry, PlayerId, ProfileResponse,
    PurchaseResponse, ReferralRequest, ReferralResponse, RegisterRequest, RegisterResponse,
    TapRequest, TapResponse, UpgradeResponse,
};

use crate::error::ApiError;
use crate::state::AppState;

/// Query parameters for `GET /api/leaderboard`.
#[derive(Debug, serde::Deserialize)]
pub struct LeaderboardQuery {
    /// Number of rows to return (default 10, clamped to 1..=100).
    pub limit: Option<usize>,
}

fn parse_player_id(raw: &str) -> Result<PlayerId, ApiError> {
    Uuid::parse_str(raw)
        .map(PlayerId::from)
        .map_err(|e| ApiError::InvalidPath(format!("invalid player id: {e}")))
}

/// `POST /api/players` -- register a new player.
pub async fn register<S, C>(
    State(state): State<AppState<S, C>>,
    Json(request): Json<RegisterRequest>,
) -> Result<Json<RegisterResponse>, ApiError>
where
    S: EconomyStore,
    C: SnapshotCache,
{
    let player = state.engine.register_player(&request.display_name).await?;
    Ok(Json(RegisterResponse {
        player_id: player.id,
        referral_code: player.referral_code,
    }))
}

/// `GET /api/players/{id}` -- profile snapshot.
pub async fn get_profile<S, C>(
    State(state): State<AppState<S, C>>,
    Path(id): Path<String>,
) -> Result<Json<ProfileResponse>, ApiError>
where
    S: EconomyStore,
    C: SnapshotCache,
{
    let id = parse_player_id(&id)?;
    Ok(Json(state.engine.get_profile(id).await?))
}

/// `POST /api/players/{id}/tap` -- credit a tap batch.
pub async fn tap<S, C>(
    State(state): State<AppState<S, C>>,
    Path(id): Path<String>,
    Json(request): Json<TapRequest>,
) -> Result<Json<TapResponse>, ApiError>
where
    S: EconomyStore,
    C: SnapshotCache,
{
    let id = parse_player_id(&id)?;
    Ok(Json(state.engine.tap(id, request.taps).await?))
}

/// `GET /api/businesses` -- the business catalog.
pub async fn list_businesses<S, C>(
    State(state): State<AppState<S, C>>,
) -> Json<Vec<BusinessDefinition>>
where
    S: EconomyStore,
    C: SnapshotCache,
{
    let definitions: Vec<BusinessDefinition> = state.engine.catalog().iter().cloned().collect();
    Json(definitions)
}

/// `POST /api/players/{id}/businesses/{business}/purchase` -- buy a
/// business.
pub async fn purchase_business<S, C>(
    State(state): State<AppState<S, C>>,
    Path((id, business)): Path<(String, String)>,
) -> Result<Json<PurchaseResponse>, ApiError>
where
    S: EconomyStore,
    C: SnapshotCache,
{
    let id = parse_player_id(&id)?;
    let business = BusinessId::from(business);
    let receipt = state.engine.purchase_business(id, &business).await?;
    // The response carries the full portfolio; the profile read also
    // re-warms the cache the purchase just evicted.
    let profile = state.engine.get_profile(id).await?;
    Ok(Json(PurchaseResponse {
        points: receipt.points,
        businesses: profile.businesses,
    }))
}

/// `POST /api/players/{id}/businesses/{business}/upgrade` -- upgrade a
/// business one level.
pub async fn upgrade_business<S, C>(
    State(state): State<AppState<S, C>>,
    Path((id, business)): Path<(String, String)>,
) -> Result<Json<UpgradeResponse>, ApiError>
where
    S: EconomyStore,
    C: SnapshotCache,
{
    let id = parse_player_id(&id)?;
    let business = BusinessId::from(business);
    let receipt = state.engine.upgrade_business(id, &business).await?;
    Ok(Json(UpgradeResponse {
        points: receipt.points,
        business_id: receipt.business_id,
        new_level: receipt.new_level,
        cost: receipt.cost,
    }))
}

/// `POST /api/players/{id}/businesses/{business}/collect` -- collect
/// accrued income.
pub async fn collect_income<S, C>(
    State(state): State<AppState<S, C>>,
    Path((id, business)): Path<(String, String)>,
) -> Result<Json<CollectResponse>, ApiError>
where
    S: EconomyStore,
    C: SnapshotCache,
{
    let id = parse_player_id(&id)?;
    let business = BusinessId::from(business);
    let receipt = state.engine.collect_income(id, &business).await?;
    Ok(Json(CollectResponse {
        collected: receipt.collected,
        points: receipt.points,
    }))
}

/// `GET /api/leaderboard` -- top players by points.
pub async fn leaderboard<S, C>(
    State(state): State<AppState<S, C>>,
    Query(query): Query<LeaderboardQuery>,
) -> Result<Json<Vec<LeaderboardEntry>>, ApiError>
where
    S: EconomyStore,
    C: SnapshotCache,
{
    let limit = query.limit.unwrap_or(10);
    Ok(Json(state.engine.get_leaderboard(limit).await?))
}

/// `POST /api/players/{id}/referral` -- redeem a referral code.
pub async fn apply_referral<S, C>(
    State(state): State<AppState<S, C>>,
    Path(id): Path<String>,
    Json(request): Json<ReferralRequest>,
) -> Result<Json<ReferralResponse>, ApiError>
where
    S: EconomyStore,
    C: SnapshotCache,
{
    let id = parse_player_id(&id)?;
    let receipt = state.engine.apply_referral(id, &request.code).await?;
    Ok(Json(ReferralResponse {
        bonus: receipt.bonus,
        referrer_display_name: receipt.referrer_display_name,
    }))
}
