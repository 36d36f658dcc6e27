//! Daily action limiter.
//!
//! Per-player, per-UTC-day counters gate rate-limited actions. The limiter
//! itself holds no state: consumption is delegated to the store's atomic
//! conditional increment so that concurrent requests can never push a
//! counter past its limit. What lives here is the limit table, the ban
//! hook, and the consume/release protocol the engine follows.
//!
//! Quota is consumed only after all other preconditions for an action have
//! passed; if the action's commit subsequently fails, the engine releases
//! the consumed quota so a failed attempt costs nothing.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use idlemint_types::{LimitedAction, PlayerId};

/// Per-day limits for each [`LimitedAction`], loaded from configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyLimits {
    /// Maximum tap-credited clicks per day.
    #[serde(default = "default_clicks")]
    pub clicks: u32,
    /// Maximum rewarded ad views per day.
    #[serde(default = "default_ads_watched")]
    pub ads_watched: u32,
    /// Maximum business upgrade steps per day.
    #[serde(default = "default_business_upgrades")]
    pub business_upgrades: u32,
    /// Maximum trades per day.
    #[serde(default = "default_trades")]
    pub trades: u32,
}

const fn default_clicks() -> u32 {
    2000
}

const fn default_ads_watched() -> u32 {
    20
}

const fn default_business_upgrades() -> u32 {
    50
}

const fn default_trades() -> u32 {
    25
}

impl Default for DailyLimits {
    fn default() -> Self {
        Self {
            clicks: default_clicks(),
            ads_watched: default_ads_watched(),
            business_upgrades: default_business_upgrades(),
            trades: default_trades(),
        }
    }
}

impl DailyLimits {
    /// The configured limit for one action kind.
    #[must_use]
    pub const fn limit_for(&self, action: LimitedAction) -> u32 {
        match action {
            LimitedAction::Clicks => self.clicks,
            LimitedAction::AdsWatched => self.ads_watched,
            LimitedAction::BusinessUpgrades => self.business_upgrades,
            LimitedAction::Trades => self.trades,
        }
    }
}

/// Callback consulted before any quota consumption.
///
/// Returns `true` when the player is banned, in which case every
/// rate-limited action is rejected outright. The default hook bans nobody;
/// deployments wire in their own moderation source.
pub type BanHook = Arc<dyn Fn(PlayerId) -> bool + Send + Sync>;

/// A ban hook that never bans anyone.
#[must_use]
pub fn allow_all() -> BanHook {
    Arc::new(|_| false)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_limits() {
        let limits = DailyLimits::default();
        assert_eq!(limits.limit_for(LimitedAction::Clicks), 2000);
        assert_eq!(limits.limit_for(LimitedAction::AdsWatched), 20);
        assert_eq!(limits.limit_for(LimitedAction::BusinessUpgrades), 50);
        assert_eq!(limits.limit_for(LimitedAction::Trades), 25);
    }

    #[test]
    fn partial_config_fills_remaining_defaults() {
        let limits: DailyLimits = serde_yml::from_str("clicks: 100\n").unwrap();
        assert_eq!(limits.clicks, 100);
        assert_eq!(limits.ads_watched, 20);
        assert_eq!(limits.trades, 25);
    }

    #[test]
    fn default_ban_hook_allows_everyone() {
        let hook = allow_all();
        assert!(!hook(PlayerId::new()));
    }
}
