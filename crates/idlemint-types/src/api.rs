//! Request and response payloads for the engine's logical operations.
//!
//! The HTTP layer frames these over routes and status codes; the engine
//! produces and consumes them directly, so they are also the shapes the
//! read-path cache stores.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::ids::{BusinessId, PlayerId};
use crate::structs::{BusinessOwnership, DailyCounter};

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Create a new player account.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct RegisterRequest {
    /// Name shown on the leaderboard.
    pub display_name: String,
}

/// Record a batch of up to ten taps in one call.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct TapRequest {
    /// Number of taps batched into this request.
    pub taps: u32,
}

/// Redeem a referral code for the signup bonus.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ReferralRequest {
    /// The referrer's code.
    pub code: String,
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// Result of creating a player.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct RegisterResponse {
    /// The new player's id.
    pub player_id: PlayerId,
    /// The code this player can share with others.
    pub referral_code: String,
}

/// Full profile snapshot served by the read path (and cached).
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ProfileResponse {
    /// Player id.
    pub player_id: PlayerId,
    /// Leaderboard name.
    pub display_name: String,
    /// Spendable balance.
    pub points: u64,
    /// Derived level.
    pub level: u32,
    /// Lifetime experience.
    pub experience: u64,
    /// Points credited per tap.
    pub click_power: u64,
    /// Lifetime points earned.
    pub total_earned: u64,
    /// Shareable referral code.
    pub referral_code: String,
    /// Owned businesses.
    pub businesses: Vec<BusinessOwnership>,
    /// Today's action counters.
    pub daily_counters: DailyCounter,
}

/// Result of a tap batch.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct TapResponse {
    /// Points credited by this call.
    pub points_earned: u64,
    /// Balance after the credit.
    pub points: u64,
    /// Level after the credit.
    pub level: u32,
    /// Whether this credit crossed a level boundary.
    pub leveled_up: bool,
}

/// Result of purchasing a business.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct PurchaseResponse {
    /// Balance after the debit.
    pub points: u64,
    /// The full portfolio including the new ownership.
    pub businesses: Vec<BusinessOwnership>,
}

/// Result of upgrading a business.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct UpgradeResponse {
    /// Balance after the debit.
    pub points: u64,
    /// The upgraded business.
    pub business_id: BusinessId,
    /// Level after the upgrade.
    pub new_level: u32,
    /// Points paid.
    pub cost: u64,
}

/// Result of collecting accrued income.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct CollectResponse {
    /// Income credited by this collection.
    pub collected: u64,
    /// Balance after the credit.
    pub points: u64,
}

/// One row of the leaderboard, ordered by points descending with ties
/// broken by account creation order (stable).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct LeaderboardEntry {
    /// Leaderboard name.
    pub display_name: String,
    /// Point balance at query time.
    pub points: u64,
    /// Level at query time.
    pub level: u32,
}

/// Result of redeeming a referral code.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ReferralResponse {
    /// Bonus credited to each side.
    pub bonus: u64,
    /// Display name of the referrer.
    pub referrer_display_name: String,
}
