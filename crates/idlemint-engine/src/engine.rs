//! The economy engine: orchestration of every gameplay operation.
//!
//! [`EconomyEngine`] wires the pure transitions (ledger, portfolio,
//! referral validation) to a storage backend and a read-path cache. Writes
//! follow an optimistic protocol: read a versioned snapshot, apply the
//! transition, commit with the snapshot's version, and retry on a version
//! mismatch up to [`MAX_COMMIT_ATTEMPTS`] before reporting
//! [`EngineError::Contention`].
//!
//! Quota for rate-limited actions is consumed after all other
//! preconditions pass and released again if the commit never lands, so a
//! failed request costs no quota.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

use idlemint_ledger::{credit, ProgressionRules};
use idlemint_types::{
    BusinessId, DailyCounter, LeaderboardEntry, LimitedAction, Player, PlayerId, ProfileResponse,
    TapResponse, UtcDay,
};

use crate::cache::{leaderboard_key, profile_key, SnapshotCache};
use crate::catalog::BusinessCatalog;
use crate::clock::{Clock, SystemClock};
use crate::config::AppConfig;
use crate::error::EngineError;
use crate::limiter::{allow_all, BanHook, DailyLimits};
use crate::portfolio;
use crate::referral;
use crate::store::{EconomyStore, Versioned};

/// Optimistic commit attempts before giving up with
/// [`EngineError::Contention`].
pub const MAX_COMMIT_ATTEMPTS: u32 = 5;

/// Maximum taps creditable in a single request.
pub const MAX_TAPS_PER_REQUEST: u32 = 10;

/// Maximum display name length in characters.
const MAX_DISPLAY_NAME_CHARS: usize = 32;

/// Leaderboard page size bounds.
const LEADERBOARD_MIN: usize = 1;
const LEADERBOARD_MAX: usize = 100;

/// Outcome of a purchase, for the transport layer.
#[derive(Debug, Clone)]
pub struct PurchaseReceipt {
    /// Player balance after the debit.
    pub points: u64,
    /// The business purchased.
    pub business_id: BusinessId,
}

/// Outcome of an upgrade.
#[derive(Debug, Clone)]
pub struct UpgradeReceipt {
    /// Player balance after the debit.
    pub points: u64,
    /// The business upgraded.
    pub business_id: BusinessId,
    /// The business's new level.
    pub new_level: u32,
    /// Points paid for this step.
    pub cost: u64,
}

/// Outcome of an income collection.
#[derive(Debug, Clone)]
pub struct CollectReceipt {
    /// Points credited by this collection.
    pub collected: u64,
    /// Player balance after the credit.
    pub points: u64,
}

/// Outcome of a referral redemption.
#[derive(Debug, Clone)]
pub struct ReferralReceipt {
    /// Points credited to each side.
    pub bonus: u64,
    /// Display name of the referrer.
    pub referrer_display_name: String,
}

/// The economy engine, generic over its storage and cache backends.
pub struct EconomyEngine<S, C> {
    store: S,
    cache: C,
    catalog: BusinessCatalog,
    clock: Arc<dyn Clock>,
    rules: ProgressionRules,
    limits: DailyLimits,
    referral_bonus: u64,
    max_accrual_hours: u32,
    counter_retention_days: u64,
    profile_ttl: Duration,
    leaderboard_ttl: Duration,
    ban_hook: BanHook,
}

impl<S, C> EconomyEngine<S, C>
where
    S: EconomyStore,
    C: SnapshotCache,
{
    /// Build an engine with the standard catalog, the system clock, and a
    /// ban hook that bans nobody.
    pub fn new(store: S, cache: C, config: &AppConfig) -> Self {
        Self::with_parts(
            store,
            cache,
            config,
            BusinessCatalog::standard(),
            Arc::new(SystemClock),
            allow_all(),
        )
    }

    /// Build an engine with explicit catalog, clock, and ban hook. Tests
    /// use this with a [`ManualClock`](crate::clock::ManualClock).
    pub fn with_parts(
        store: S,
        cache: C,
        config: &AppConfig,
        catalog: BusinessCatalog,
        clock: Arc<dyn Clock>,
        ban_hook: BanHook,
    ) -> Self {
        Self {
            store,
            cache,
            catalog,
            clock,
            rules: config.progression.clone(),
            limits: config.limits.clone(),
            referral_bonus: config.economy.referral_bonus,
            max_accrual_hours: config.economy.max_accrual_hours,
            counter_retention_days: config.economy.counter_retention_days,
            profile_ttl: Duration::from_secs(config.cache.profile_ttl_secs),
            leaderboard_ttl: Duration::from_secs(config.cache.leaderboard_ttl_secs),
            ban_hook,
        }
    }

    /// The business catalog served to clients.
    pub const fn catalog(&self) -> &BusinessCatalog {
        &self.catalog
    }

    // -----------------------------------------------------------------
    // Registration
    // -----------------------------------------------------------------

    /// Register a new player with a fresh referral code.
    ///
    /// The display name is trimmed; it must be non-empty and at most 32
    /// characters. A referral-code collision (unique-index violation)
    /// retries with a new code.
    pub async fn register_player(&self, display_name: &str) -> Result<Player, EngineError> {
        let name = display_name.trim();
        if name.is_empty() {
            return Err(EngineError::InvalidInput(String::from(
                "display name must not be empty",
            )));
        }
        if name.chars().count() > MAX_DISPLAY_NAME_CHARS {
            return Err(EngineError::InvalidInput(format!(
                "display name must be at most {MAX_DISPLAY_NAME_CHARS} characters"
            )));
        }

        for _ in 0..MAX_COMMIT_ATTEMPTS {
            let player = Player {
                id: PlayerId::new(),
                display_name: name.to_owned(),
                points: 0,
                experience: 0,
                level: 1,
                click_power: self.rules.click_power_for(1),
                total_earned: 0,
                referral_code: referral::generate_referral_code(),
                referred_by: None,
                referral_count: 0,
                created_at: self.clock.now(),
            };
            match self.store.insert_player(player.clone()).await {
                Ok(()) => {
                    info!(player_id = %player.id, "player registered");
                    return Ok(player);
                }
                Err(crate::store::StoreError::Duplicate(detail)) => {
                    debug!(%detail, "referral code collision, regenerating");
                }
                Err(err) => return Err(err.into()),
            }
        }
        Err(EngineError::Contention)
    }

    // -----------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------

    /// A player's profile snapshot: identity, ledger state, businesses,
    /// and today's counters. Served from cache when fresh.
    pub async fn get_profile(&self, id: PlayerId) -> Result<ProfileResponse, EngineError> {
        let key = profile_key(id);
        if let Some(cached) = self.cache_get::<ProfileResponse>(&key).await {
            return Ok(cached);
        }

        let Versioned { value: player, .. } = self.load_player(id).await?;
        let businesses = self.store.get_ownerships(id).await?;
        let counters = self.store.daily_counter(id, self.clock.today()).await?;

        let profile = ProfileResponse {
            player_id: player.id,
            display_name: player.display_name,
            points: player.points,
            level: player.level,
            experience: player.experience,
            click_power: player.click_power,
            total_earned: player.total_earned,
            referral_code: player.referral_code,
            businesses,
            daily_counters: counters,
        };
        self.cache_put(&key, &profile, self.profile_ttl).await;
        Ok(profile)
    }

    /// The top players by points. `limit` is clamped to `1..=100`.
    pub async fn get_leaderboard(
        &self,
        limit: usize,
    ) -> Result<Vec<LeaderboardEntry>, EngineError> {
        let limit = limit.clamp(LEADERBOARD_MIN, LEADERBOARD_MAX);
        let key = leaderboard_key(limit);
        if let Some(cached) = self.cache_get::<Vec<LeaderboardEntry>>(&key).await {
            return Ok(cached);
        }

        let entries: Vec<LeaderboardEntry> = self
            .store
            .top_players(limit)
            .await?
            .into_iter()
            .map(|player| LeaderboardEntry {
                display_name: player.display_name,
                points: player.points,
                level: player.level,
            })
            .collect();
        self.cache_put(&key, &entries, self.leaderboard_ttl).await;
        Ok(entries)
    }

    // -----------------------------------------------------------------
    // Tap
    // -----------------------------------------------------------------

    /// Credit a batch of taps: `taps * click_power` points, gated by the
    /// daily click quota.
    pub async fn tap(&self, id: PlayerId, taps: u32) -> Result<TapResponse, EngineError> {
        if taps == 0 {
            return Err(EngineError::InvalidInput(String::from(
                "taps must be at least 1",
            )));
        }
        if taps > MAX_TAPS_PER_REQUEST {
            return Err(EngineError::InvalidInput(format!(
                "taps must be at most {MAX_TAPS_PER_REQUEST} per request"
            )));
        }
        self.check_ban(id)?;

        // Existence check before consuming quota.
        let _ = self.load_player(id).await?;

        let day = self.clock.today();
        self.consume_quota(id, day, LimitedAction::Clicks, taps)
            .await?;

        let result = self.tap_commit(id, taps).await;
        match result {
            Ok(response) => {
                self.record_points(id, day, response.points_earned).await;
                self.cache_evict(&profile_key(id)).await;
                Ok(response)
            }
            Err(err) => {
                // The quota was consumed but nothing landed; hand it back.
                self.refund_quota(id, day, LimitedAction::Clicks, taps).await;
                Err(err)
            }
        }
    }

    async fn tap_commit(&self, id: PlayerId, taps: u32) -> Result<TapResponse, EngineError> {
        for _ in 0..MAX_COMMIT_ATTEMPTS {
            let Versioned {
                value: mut player,
                version,
            } = self.load_player(id).await?;

            // Click power can change as the credit levels the player up,
            // so it is read fresh on every attempt.
            let earned = player
                .click_power
                .checked_mul(u64::from(taps))
                .ok_or_else(|| EngineError::Invariant(String::from("tap points overflow")))?;
            let outcome = credit(&mut player, earned, &self.rules)?;

            if self.store.update_player(player.clone(), version).await? {
                if outcome.leveled_up {
                    info!(player_id = %id, level = outcome.level, "player leveled up");
                }
                return Ok(TapResponse {
                    points_earned: earned,
                    points: player.points,
                    level: outcome.level,
                    leveled_up: outcome.leveled_up,
                });
            }
        }
        warn!(player_id = %id, "tap commit exhausted retries");
        Err(EngineError::Contention)
    }

    // -----------------------------------------------------------------
    // Businesses
    // -----------------------------------------------------------------

    /// Purchase a business from the catalog.
    pub async fn purchase_business(
        &self,
        id: PlayerId,
        business: &BusinessId,
    ) -> Result<PurchaseReceipt, EngineError> {
        let definition = self
            .catalog
            .get(business)
            .ok_or_else(|| EngineError::BusinessNotFound(business.clone()))?
            .clone();

        for _ in 0..MAX_COMMIT_ATTEMPTS {
            let Versioned {
                value: player,
                version,
            } = self.load_player(id).await?;
            let existing = self.store.get_ownership(id, business).await?;

            let outcome =
                portfolio::purchase(&player, existing.as_ref(), &definition, self.clock.now())?;

            if self
                .store
                .commit_purchase(outcome.player.clone(), version, outcome.ownership)
                .await?
            {
                info!(player_id = %id, business = %business, "business purchased");
                self.cache_evict(&profile_key(id)).await;
                return Ok(PurchaseReceipt {
                    points: outcome.player.points,
                    business_id: business.clone(),
                });
            }
        }
        warn!(player_id = %id, business = %business, "purchase commit exhausted retries");
        Err(EngineError::Contention)
    }

    /// Upgrade an owned business one level, gated by the daily upgrade
    /// quota.
    pub async fn upgrade_business(
        &self,
        id: PlayerId,
        business: &BusinessId,
    ) -> Result<UpgradeReceipt, EngineError> {
        self.check_ban(id)?;
        let definition = self
            .catalog
            .get(business)
            .ok_or_else(|| EngineError::BusinessNotFound(business.clone()))?
            .clone();

        // Validate everything that can be validated before quota is spent.
        let Versioned { value: player, .. } = self.load_player(id).await?;
        let ownership = self
            .store
            .get_ownership(id, business)
            .await?
            .ok_or_else(|| EngineError::NotOwned(business.clone()))?;
        let _ = portfolio::upgrade(&player, &ownership, &definition)?;

        let day = self.clock.today();
        self.consume_quota(id, day, LimitedAction::BusinessUpgrades, 1)
            .await?;

        let result = self.upgrade_commit(id, business, &definition).await;
        match result {
            Ok(receipt) => {
                self.cache_evict(&profile_key(id)).await;
                Ok(receipt)
            }
            Err(err) => {
                self.refund_quota(id, day, LimitedAction::BusinessUpgrades, 1)
                    .await;
                Err(err)
            }
        }
    }

    async fn upgrade_commit(
        &self,
        id: PlayerId,
        business: &BusinessId,
        definition: &idlemint_types::BusinessDefinition,
    ) -> Result<UpgradeReceipt, EngineError> {
        for _ in 0..MAX_COMMIT_ATTEMPTS {
            let Versioned {
                value: player,
                version,
            } = self.load_player(id).await?;
            let ownership = self
                .store
                .get_ownership(id, business)
                .await?
                .ok_or_else(|| EngineError::NotOwned(business.clone()))?;

            let outcome = portfolio::upgrade(&player, &ownership, definition)?;
            let new_level = outcome.ownership.level;

            if self
                .store
                .commit_ownership_update(outcome.player.clone(), version, outcome.ownership)
                .await?
            {
                info!(player_id = %id, business = %business, level = new_level, "business upgraded");
                return Ok(UpgradeReceipt {
                    points: outcome.player.points,
                    business_id: business.clone(),
                    new_level,
                    cost: outcome.cost,
                });
            }
        }
        warn!(player_id = %id, business = %business, "upgrade commit exhausted retries");
        Err(EngineError::Contention)
    }

    /// Collect accrued income from an owned business.
    pub async fn collect_income(
        &self,
        id: PlayerId,
        business: &BusinessId,
    ) -> Result<CollectReceipt, EngineError> {
        let definition = self
            .catalog
            .get(business)
            .ok_or_else(|| EngineError::BusinessNotFound(business.clone()))?
            .clone();

        for _ in 0..MAX_COMMIT_ATTEMPTS {
            let Versioned {
                value: player,
                version,
            } = self.load_player(id).await?;
            let ownership = self
                .store
                .get_ownership(id, business)
                .await?
                .ok_or_else(|| EngineError::NotOwned(business.clone()))?;

            let outcome = portfolio::collect(
                &player,
                &ownership,
                &definition,
                self.clock.now(),
                self.max_accrual_hours,
                &self.rules,
            )?;

            if self
                .store
                .commit_ownership_update(outcome.player.clone(), version, outcome.ownership)
                .await?
            {
                debug!(player_id = %id, business = %business, collected = outcome.collected, "income collected");
                self.record_points(id, self.clock.today(), outcome.collected)
                    .await;
                self.cache_evict(&profile_key(id)).await;
                return Ok(CollectReceipt {
                    collected: outcome.collected,
                    points: outcome.player.points,
                });
            }
        }
        warn!(player_id = %id, business = %business, "collect commit exhausted retries");
        Err(EngineError::Contention)
    }

    // -----------------------------------------------------------------
    // Referrals
    // -----------------------------------------------------------------

    /// Redeem a referral code for the given player. Each player can be
    /// referred at most once; the winning write is decided by the store's
    /// conditional update.
    pub async fn apply_referral(
        &self,
        id: PlayerId,
        code: &str,
    ) -> Result<ReferralReceipt, EngineError> {
        let Versioned {
            value: redeemer, ..
        } = self.load_player(id).await?;
        let referrer = self
            .store
            .find_by_referral_code(code)
            .await?
            .map(|versioned| versioned.value);
        referral::validate(&redeemer, referrer.as_ref())?;
        // validate() guarantees Some past this point.
        let referrer = referrer.ok_or(EngineError::InvalidCode)?;

        let applied = self
            .store
            .apply_referral(id, referrer.id, self.referral_bonus, &self.rules)
            .await?
            // A concurrent redemption won the conditional update.
            .ok_or(EngineError::AlreadyReferred)?;

        info!(player_id = %id, referrer = %applied.referrer.id, "referral applied");
        self.cache_evict(&profile_key(id)).await;
        self.cache_evict(&profile_key(applied.referrer.id)).await;

        Ok(ReferralReceipt {
            bonus: self.referral_bonus,
            referrer_display_name: applied.referrer.display_name,
        })
    }

    // -----------------------------------------------------------------
    // Maintenance
    // -----------------------------------------------------------------

    /// Today's counter row for a player.
    pub async fn daily_counters(&self, id: PlayerId) -> Result<DailyCounter, EngineError> {
        let _ = self.load_player(id).await?;
        Ok(self.store.daily_counter(id, self.clock.today()).await?)
    }

    /// Delete counter rows past the retention window. Returns the number
    /// removed.
    pub async fn prune_daily_counters(&self) -> Result<u64, EngineError> {
        let cutoff = self.clock.today().minus_days(self.counter_retention_days);
        let removed = self.store.prune_daily_counters(cutoff).await?;
        if removed > 0 {
            info!(removed, %cutoff, "pruned stale daily counters");
        }
        Ok(removed)
    }

    // -----------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------

    async fn load_player(&self, id: PlayerId) -> Result<Versioned<Player>, EngineError> {
        self.store
            .get_player(id)
            .await?
            .ok_or(EngineError::PlayerNotFound(id))
    }

    fn check_ban(&self, id: PlayerId) -> Result<(), EngineError> {
        if (self.ban_hook)(id) {
            warn!(player_id = %id, "banned player attempted a rate-limited action");
            return Err(EngineError::Banned);
        }
        Ok(())
    }

    async fn consume_quota(
        &self,
        id: PlayerId,
        day: UtcDay,
        action: LimitedAction,
        amount: u32,
    ) -> Result<(), EngineError> {
        let limit = self.limits.limit_for(action);
        let consumed = self
            .store
            .try_consume_quota(id, day, action, amount, limit)
            .await?;
        if consumed {
            Ok(())
        } else {
            Err(EngineError::QuotaExceeded { action, limit })
        }
    }

    /// Hand consumed quota back after a commit that never landed.
    ///
    /// The refund is bookkeeping around an outcome already decided; a
    /// store hiccup here is logged and the original result stands.
    async fn refund_quota(&self, id: PlayerId, day: UtcDay, action: LimitedAction, amount: u32) {
        if let Err(err) = self.store.release_quota(id, day, action, amount).await {
            warn!(player_id = %id, ?action, amount, %err, "quota refund failed");
        }
    }

    /// Fold freshly earned points into the daily counter.
    ///
    /// The counter is derived reporting state; the balance itself was
    /// committed already, so a failure here must not surface as one.
    async fn record_points(&self, id: PlayerId, day: UtcDay, points: u64) {
        if let Err(err) = self.store.record_points_earned(id, day, points).await {
            warn!(player_id = %id, points, %err, "daily points tally failed");
        }
    }

    /// Cache read that treats every failure as a miss.
    async fn cache_get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.cache.get_raw(key).await {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(value) => Some(value),
                Err(err) => {
                    warn!(%key, %err, "cache entry failed to deserialize, treating as miss");
                    None
                }
            },
            Ok(None) => None,
            Err(err) => {
                warn!(%key, %err, "cache read failed, falling through to store");
                None
            }
        }
    }

    /// Cache write that logs and drops failures.
    async fn cache_put<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        match serde_json::to_string(value) {
            Ok(raw) => {
                if let Err(err) = self.cache.put_raw(key, raw, ttl).await {
                    warn!(%key, %err, "cache write failed");
                }
            }
            Err(err) => warn!(%key, %err, "cache serialization failed"),
        }
    }

    /// Cache eviction that logs and drops failures. A stale entry then
    /// lives at most one TTL.
    async fn cache_evict(&self, key: &str) {
        if let Err(err) = self.cache.delete(key).await {
            warn!(%key, %err, "cache eviction failed");
        }
    }
}
