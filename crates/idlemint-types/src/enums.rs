//! Enumeration types shared across the Idlemint workspace.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// Rate-limited actions
// ---------------------------------------------------------------------------

/// An action type gated by the daily limiter.
///
/// Each variant has an independent configured ceiling and its own column
/// in the daily counter record. `points_earned` is tracked on the counter
/// as well but is informational, not limited, so it is not a variant here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "snake_case")]
pub enum LimitedAction {
    /// Manual taps that credit points.
    Clicks,
    /// Rewarded ad views.
    AdsWatched,
    /// Business level upgrades.
    BusinessUpgrades,
    /// Player-to-player trades.
    Trades,
}

impl LimitedAction {
    /// Stable snake_case name, used for counter columns and log fields.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Clicks => "clicks",
            Self::AdsWatched => "ads_watched",
            Self::BusinessUpgrades => "business_upgrades",
            Self::Trades => "trades",
        }
    }
}

// ---------------------------------------------------------------------------
// Business categories
// ---------------------------------------------------------------------------

/// Category of a business definition in the catalog.
///
/// Purely descriptive: used for client-side grouping and has no effect
/// on income or cost math.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "snake_case")]
pub enum BusinessCategory {
    /// Food and beverage stands.
    Food,
    /// Retail storefronts.
    Retail,
    /// Service businesses (car wash, gym).
    Services,
    /// Entertainment venues.
    Entertainment,
    /// Technology ventures.
    Tech,
    /// Financial institutions.
    Finance,
}
