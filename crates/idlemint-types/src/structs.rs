//! Core entity structs for the Idlemint economy backend.
//!
//! These are the persisted shapes: the player progression record, per-player
//! business ownership rows, the immutable catalog definition, and the daily
//! action counter. Everything here is plain data; the mutation rules live in
//! `idlemint-ledger` and `idlemint-engine`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::day::UtcDay;
use crate::enums::{BusinessCategory, LimitedAction};
use crate::ids::{BusinessId, PlayerId};

// ---------------------------------------------------------------------------
// Player
// ---------------------------------------------------------------------------

/// A player's progression record.
///
/// `level` and `click_power` are derived from `experience` and are always
/// recomputed when experience changes; they are stored alongside it purely
/// so reads never have to re-derive them. `points` never goes negative:
/// debits that exceed the balance are rejected without mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Player {
    /// Stable external identity.
    pub id: PlayerId,
    /// Name shown on the leaderboard.
    pub display_name: String,
    /// Spendable point balance (never negative).
    pub points: u64,
    /// Lifetime experience; monotonically non-decreasing.
    pub experience: u64,
    /// Derived level, `1..=max_level`.
    pub level: u32,
    /// Derived points credited per tap.
    pub click_power: u64,
    /// Lifetime points earned; monotonically non-decreasing.
    pub total_earned: u64,
    /// Unique code other players can redeem at signup.
    pub referral_code: String,
    /// The player who referred this one. Set at most once, immutable after.
    pub referred_by: Option<PlayerId>,
    /// How many players this one has referred.
    pub referral_count: u32,
    /// Account creation time; leaderboard tie-break order.
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// BusinessDefinition
// ---------------------------------------------------------------------------

/// An immutable catalog entry describing a purchasable business.
///
/// Definitions are process-wide configuration shared by reference through
/// the catalog; no player state lives here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct BusinessDefinition {
    /// Catalog slug, unique across the catalog.
    pub id: BusinessId,
    /// Human-readable name.
    pub name: String,
    /// Purchase price in points.
    pub base_cost: u64,
    /// Hourly income at level 1.
    pub base_income_per_hour: u64,
    /// Minimum player level required to purchase.
    pub required_level: u32,
    /// Client-side grouping category.
    pub category: BusinessCategory,
}

// ---------------------------------------------------------------------------
// BusinessOwnership
// ---------------------------------------------------------------------------

/// A player's stake in one business.
///
/// Created at purchase with level 1 (absence of a row means unowned);
/// the level only ever increases, and only by paid upgrades. Never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct BusinessOwnership {
    /// Owning player.
    pub player_id: PlayerId,
    /// Catalog entry this ownership refers to.
    pub business_id: BusinessId,
    /// Current level, `>= 1`.
    pub level: u32,
    /// When income was last collected; accrual measures from here.
    pub last_collected_at: DateTime<Utc>,
    /// Lifetime income collected from this business.
    pub total_earned: u64,
}

// ---------------------------------------------------------------------------
// DailyCounter
// ---------------------------------------------------------------------------

/// Per-player, per-UTC-day action counters.
///
/// Lazily created on the first action of the day; at most one record per
/// `(player, day)`. Records older than the retention window are pruned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct DailyCounter {
    /// The calendar day this record covers.
    pub day: UtcDay,
    /// Taps recorded today.
    pub clicks: u32,
    /// Rewarded ads watched today.
    pub ads_watched: u32,
    /// Business upgrades performed today.
    pub business_upgrades: u32,
    /// Trades performed today.
    pub trades: u32,
    /// Points earned today (informational, not limited).
    pub points_earned: u64,
}

impl DailyCounter {
    /// A fresh all-zero counter for the given day.
    pub const fn empty(day: UtcDay) -> Self {
        Self {
            day,
            clicks: 0,
            ads_watched: 0,
            business_upgrades: 0,
            trades: 0,
            points_earned: 0,
        }
    }

    /// Current count for a limited action.
    pub const fn count_for(&self, action: LimitedAction) -> u32 {
        match action {
            LimitedAction::Clicks => self.clicks,
            LimitedAction::AdsWatched => self.ads_watched,
            LimitedAction::BusinessUpgrades => self.business_upgrades,
            LimitedAction::Trades => self.trades,
        }
    }

    /// Add to a limited action's count, saturating at `u32::MAX`.
    pub const fn add(&mut self, action: LimitedAction, amount: u32) {
        match action {
            LimitedAction::Clicks => self.clicks = self.clicks.saturating_add(amount),
            LimitedAction::AdsWatched => {
                self.ads_watched = self.ads_watched.saturating_add(amount);
            }
            LimitedAction::BusinessUpgrades => {
                self.business_upgrades = self.business_upgrades.saturating_add(amount);
            }
            LimitedAction::Trades => self.trades = self.trades.saturating_add(amount),
        }
    }

    /// Subtract from a limited action's count, saturating at zero.
    ///
    /// Used by the limiter's compensating release when an operation is
    /// abandoned after its quota was consumed.
    pub const fn subtract(&mut self, action: LimitedAction, amount: u32) {
        match action {
            LimitedAction::Clicks => self.clicks = self.clicks.saturating_sub(amount),
            LimitedAction::AdsWatched => {
                self.ads_watched = self.ads_watched.saturating_sub(amount);
            }
            LimitedAction::BusinessUpgrades => {
                self.business_upgrades = self.business_upgrades.saturating_sub(amount);
            }
            LimitedAction::Trades => self.trades = self.trades.saturating_sub(amount),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn empty_counter_is_all_zero() {
        let at = Utc.with_ymd_and_hms(2026, 6, 1, 8, 0, 0).unwrap();
        let counter = DailyCounter::empty(UtcDay::from_datetime(at));
        assert_eq!(counter.clicks, 0);
        assert_eq!(counter.points_earned, 0);
    }

    #[test]
    fn player_serde_round_trip() {
        let player = Player {
            id: PlayerId::new(),
            display_name: String::from("Ada"),
            points: 120,
            experience: 120,
            level: 1,
            click_power: 1,
            total_earned: 120,
            referral_code: String::from("a1b2c3d4e5f6"),
            referred_by: None,
            referral_count: 0,
            created_at: Utc::now(),
        };
        let json = serde_json::to_string(&player).unwrap();
        let back: Player = serde_json::from_str(&json).unwrap();
        assert_eq!(player, back);
    }
}
