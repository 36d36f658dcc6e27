//! Storage seam for the economy engine.
//!
//! [`EconomyStore`] is the single persistence contract. The engine reads a
//! versioned snapshot, applies a pure transition, and commits with the
//! snapshot's version; a `false` commit means another writer got there
//! first and the engine re-reads and retries. Quota consumption is a
//! separate conditional increment so counters stay correct under
//! concurrency without holding a player row lock across validation.
//!
//! [`InMemoryStore`] backs tests and single-node development; the Postgres
//! implementation lives in its own crate.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use idlemint_ledger::{credit, ProgressionRules};
use idlemint_types::{
    BusinessId, BusinessOwnership, DailyCounter, LimitedAction, Player, PlayerId, UtcDay,
};

/// Errors surfaced by a storage backend.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    /// The backend rejected or failed the operation.
    #[error("storage backend error: {0}")]
    Backend(String),

    /// The backend did not respond in time.
    #[error("storage timeout: {0}")]
    Timeout(String),

    /// A uniqueness constraint was violated.
    #[error("duplicate key: {0}")]
    Duplicate(String),
}

/// A value paired with its optimistic-concurrency version.
///
/// Every successful write bumps the version; a commit carrying a stale
/// version is rejected without effect.
#[derive(Debug, Clone)]
pub struct Versioned<T> {
    /// The stored value.
    pub value: T,
    /// Version at read time; pass back on commit.
    pub version: u64,
}

/// Both sides of a committed referral redemption.
#[derive(Debug, Clone)]
pub struct ReferralApplied {
    /// The redeeming player, now carrying `referred_by` and the bonus.
    pub redeemer: Player,
    /// The referrer, with the bonus and an incremented referral count.
    pub referrer: Player,
}

/// Persistence contract for players, ownerships, and daily counters.
#[async_trait]
pub trait EconomyStore: Send + Sync {
    /// Insert a new player. Fails with [`StoreError::Duplicate`] on an id
    /// or referral-code collision.
    async fn insert_player(&self, player: Player) -> Result<(), StoreError>;

    /// Fetch a player with their current version.
    async fn get_player(&self, id: PlayerId) -> Result<Option<Versioned<Player>>, StoreError>;

    /// Resolve a referral code to its owner.
    async fn find_by_referral_code(
        &self,
        code: &str,
    ) -> Result<Option<Versioned<Player>>, StoreError>;

    /// Compare-and-swap a player row. Returns `false` when the stored
    /// version no longer matches `expected_version`.
    async fn update_player(
        &self,
        player: Player,
        expected_version: u64,
    ) -> Result<bool, StoreError>;

    /// All ownerships for a player, ordered by business id.
    async fn get_ownerships(&self, player: PlayerId)
        -> Result<Vec<BusinessOwnership>, StoreError>;

    /// One ownership row, if the player owns the business.
    async fn get_ownership(
        &self,
        player: PlayerId,
        business: &BusinessId,
    ) -> Result<Option<BusinessOwnership>, StoreError>;

    /// Atomically commit a purchase: the debited player row (CAS) plus the
    /// new ownership row. Returns `false` on version mismatch, committing
    /// nothing.
    async fn commit_purchase(
        &self,
        player: Player,
        expected_version: u64,
        ownership: BusinessOwnership,
    ) -> Result<bool, StoreError>;

    /// Atomically commit an upgrade or collection: the player row (CAS)
    /// plus the replaced ownership row. Returns `false` on version
    /// mismatch, committing nothing.
    async fn commit_ownership_update(
        &self,
        player: Player,
        expected_version: u64,
        ownership: BusinessOwnership,
    ) -> Result<bool, StoreError>;

    /// Conditionally add `amount` to the action's counter for the day.
    /// Returns `false` without any change when the increment would exceed
    /// `limit`. The increment is atomic with the limit check.
    async fn try_consume_quota(
        &self,
        player: PlayerId,
        day: UtcDay,
        action: LimitedAction,
        amount: u32,
        limit: u32,
    ) -> Result<bool, StoreError>;

    /// Return previously consumed quota after a failed commit. Saturates
    /// at zero.
    async fn release_quota(
        &self,
        player: PlayerId,
        day: UtcDay,
        action: LimitedAction,
        amount: u32,
    ) -> Result<(), StoreError>;

    /// Add to the day's `points_earned` aggregate.
    async fn record_points_earned(
        &self,
        player: PlayerId,
        day: UtcDay,
        amount: u64,
    ) -> Result<(), StoreError>;

    /// The day's counter row, or the empty counter when none exists yet.
    async fn daily_counter(
        &self,
        player: PlayerId,
        day: UtcDay,
    ) -> Result<DailyCounter, StoreError>;

    /// Atomically redeem a referral: set `referred_by` on the redeemer if
    /// and only if it is still unset, credit the bonus to both players,
    /// and bump the referrer's count. Returns `None` when a concurrent
    /// redemption won the race.
    async fn apply_referral(
        &self,
        redeemer: PlayerId,
        referrer: PlayerId,
        bonus: u64,
        rules: &ProgressionRules,
    ) -> Result<Option<ReferralApplied>, StoreError>;

    /// Top players by points, descending. Ties break by id for a stable
    /// order.
    async fn top_players(&self, limit: usize) -> Result<Vec<Player>, StoreError>;

    /// Delete counter rows older than `cutoff`. Returns the number
    /// removed.
    async fn prune_daily_counters(&self, cutoff: UtcDay) -> Result<u64, StoreError>;
}

// ---------------------------------------------------------------------------
// In-memory backend
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct MemoryState {
    players: BTreeMap<PlayerId, Versioned<Player>>,
    codes: BTreeMap<String, PlayerId>,
    ownerships: BTreeMap<(PlayerId, BusinessId), BusinessOwnership>,
    counters: BTreeMap<(PlayerId, UtcDay), DailyCounter>,
}

/// In-process store for tests and single-node development.
///
/// A single async mutex serialises writers, which makes every multi-row
/// commit trivially atomic. The versioning protocol is still honoured so
/// the engine's retry path is exercised identically against both backends.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: Mutex<MemoryState>,
}

impl InMemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EconomyStore for InMemoryStore {
    async fn insert_player(&self, player: Player) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        if state.players.contains_key(&player.id) {
            return Err(StoreError::Duplicate(format!("player {}", player.id)));
        }
        if state.codes.contains_key(&player.referral_code) {
            return Err(StoreError::Duplicate(format!(
                "referral code {}",
                player.referral_code
            )));
        }
        state.codes.insert(player.referral_code.clone(), player.id);
        state.players.insert(
            player.id,
            Versioned {
                value: player,
                version: 1,
            },
        );
        Ok(())
    }

    async fn get_player(&self, id: PlayerId) -> Result<Option<Versioned<Player>>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.players.get(&id).cloned())
    }

    async fn find_by_referral_code(
        &self,
        code: &str,
    ) -> Result<Option<Versioned<Player>>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .codes
            .get(code)
            .and_then(|id| state.players.get(id))
            .cloned())
    }

    async fn update_player(
        &self,
        player: Player,
        expected_version: u64,
    ) -> Result<bool, StoreError> {
        let mut state = self.state.lock().await;
        let Some(stored) = state.players.get_mut(&player.id) else {
            return Ok(false);
        };
        if stored.version != expected_version {
            return Ok(false);
        }
        stored.value = player;
        stored.version = stored.version.saturating_add(1);
        Ok(true)
    }

    async fn get_ownerships(
        &self,
        player: PlayerId,
    ) -> Result<Vec<BusinessOwnership>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .ownerships
            .range((player, BusinessId::new(""))..)
            .take_while(|((owner, _), _)| *owner == player)
            .map(|(_, ownership)| ownership.clone())
            .collect())
    }

    async fn get_ownership(
        &self,
        player: PlayerId,
        business: &BusinessId,
    ) -> Result<Option<BusinessOwnership>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.ownerships.get(&(player, business.clone())).cloned())
    }

    async fn commit_purchase(
        &self,
        player: Player,
        expected_version: u64,
        ownership: BusinessOwnership,
    ) -> Result<bool, StoreError> {
        let mut state = self.state.lock().await;
        let Some(stored) = state.players.get_mut(&player.id) else {
            return Ok(false);
        };
        if stored.version != expected_version {
            return Ok(false);
        }
        stored.value = player;
        stored.version = stored.version.saturating_add(1);
        state
            .ownerships
            .insert((ownership.player_id, ownership.business_id.clone()), ownership);
        Ok(true)
    }

    async fn commit_ownership_update(
        &self,
        player: Player,
        expected_version: u64,
        ownership: BusinessOwnership,
    ) -> Result<bool, StoreError> {
        let mut state = self.state.lock().await;
        let Some(stored) = state.players.get_mut(&player.id) else {
            return Ok(false);
        };
        if stored.version != expected_version {
            return Ok(false);
        }
        stored.value = player;
        stored.version = stored.version.saturating_add(1);
        state
            .ownerships
            .insert((ownership.player_id, ownership.business_id.clone()), ownership);
        Ok(true)
    }

    async fn try_consume_quota(
        &self,
        player: PlayerId,
        day: UtcDay,
        action: LimitedAction,
        amount: u32,
        limit: u32,
    ) -> Result<bool, StoreError> {
        let mut state = self.state.lock().await;
        let counter = state
            .counters
            .entry((player, day))
            .or_insert_with(|| DailyCounter::empty(day));
        let current = counter.count_for(action);
        match current.checked_add(amount) {
            Some(next) if next <= limit => {
                counter.add(action, amount);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn release_quota(
        &self,
        player: PlayerId,
        day: UtcDay,
        action: LimitedAction,
        amount: u32,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        if let Some(counter) = state.counters.get_mut(&(player, day)) {
            counter.subtract(action, amount);
        }
        Ok(())
    }

    async fn record_points_earned(
        &self,
        player: PlayerId,
        day: UtcDay,
        amount: u64,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        let counter = state
            .counters
            .entry((player, day))
            .or_insert_with(|| DailyCounter::empty(day));
        counter.points_earned = counter.points_earned.saturating_add(amount);
        Ok(())
    }

    async fn daily_counter(
        &self,
        player: PlayerId,
        day: UtcDay,
    ) -> Result<DailyCounter, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .counters
            .get(&(player, day))
            .copied()
            .unwrap_or_else(|| DailyCounter::empty(day)))
    }

    async fn apply_referral(
        &self,
        redeemer: PlayerId,
        referrer: PlayerId,
        bonus: u64,
        rules: &ProgressionRules,
    ) -> Result<Option<ReferralApplied>, StoreError> {
        let mut state = self.state.lock().await;

        let Some(stored) = state.players.get(&redeemer) else {
            return Ok(None);
        };
        if stored.value.referred_by.is_some() {
            return Ok(None);
        }
        let mut redeemer_row = stored.value.clone();

        let Some(stored_referrer) = state.players.get(&referrer) else {
            return Ok(None);
        };
        let mut referrer_row = stored_referrer.value.clone();

        redeemer_row.referred_by = Some(referrer);
        let _ = credit(&mut redeemer_row, bonus, rules)
            .map_err(|err| StoreError::Backend(err.to_string()))?;
        let _ = credit(&mut referrer_row, bonus, rules)
            .map_err(|err| StoreError::Backend(err.to_string()))?;
        referrer_row.referral_count = referrer_row.referral_count.saturating_add(1);

        if let Some(stored) = state.players.get_mut(&redeemer) {
            stored.value = redeemer_row.clone();
            stored.version = stored.version.saturating_add(1);
        }
        if let Some(stored) = state.players.get_mut(&referrer) {
            stored.value = referrer_row.clone();
            stored.version = stored.version.saturating_add(1);
        }

        Ok(Some(ReferralApplied {
            redeemer: redeemer_row,
            referrer: referrer_row,
        }))
    }

    async fn top_players(&self, limit: usize) -> Result<Vec<Player>, StoreError> {
        let state = self.state.lock().await;
        let mut players: Vec<Player> = state
            .players
            .values()
            .map(|versioned| versioned.value.clone())
            .collect();
        players.sort_by(|a, b| b.points.cmp(&a.points).then_with(|| a.id.cmp(&b.id)));
        players.truncate(limit);
        Ok(players)
    }

    async fn prune_daily_counters(&self, cutoff: UtcDay) -> Result<u64, StoreError> {
        let mut state = self.state.lock().await;
        let before = state.counters.len();
        state.counters.retain(|(_, day), _| *day >= cutoff);
        let removed = before.saturating_sub(state.counters.len());
        Ok(u64::try_from(removed).unwrap_or(u64::MAX))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn player(code: &str) -> Player {
        Player {
            id: PlayerId::new(),
            display_name: String::from("Test"),
            points: 0,
            experience: 0,
            level: 1,
            click_power: 1,
            total_earned: 0,
            referral_code: String::from(code),
            referred_by: None,
            referral_count: 0,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn stale_version_commit_is_rejected() {
        let store = InMemoryStore::new();
        let p = player("aaaaaaaaaaaa");
        store.insert_player(p.clone()).await.unwrap();

        let first = store.get_player(p.id).await.unwrap().unwrap();

        let mut winner = first.value.clone();
        winner.points = 10;
        assert!(store.update_player(winner, first.version).await.unwrap());

        let mut loser = first.value;
        loser.points = 99;
        assert!(!store.update_player(loser, first.version).await.unwrap());

        let stored = store.get_player(p.id).await.unwrap().unwrap();
        assert_eq!(stored.value.points, 10);
        assert_eq!(stored.version, 2);
    }

    #[tokio::test]
    async fn duplicate_referral_code_is_rejected() {
        let store = InMemoryStore::new();
        store.insert_player(player("samecode0000")).await.unwrap();
        let err = store.insert_player(player("samecode0000")).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(_)));
    }

    #[tokio::test]
    async fn quota_consume_is_all_or_nothing() {
        let store = InMemoryStore::new();
        let id = PlayerId::new();
        let day = UtcDay::from_datetime(Utc::now());

        assert!(store
            .try_consume_quota(id, day, LimitedAction::Trades, 20, 25)
            .await
            .unwrap());
        // 20 + 10 > 25: rejected, and the counter stays at 20.
        assert!(!store
            .try_consume_quota(id, day, LimitedAction::Trades, 10, 25)
            .await
            .unwrap());
        let counter = store.daily_counter(id, day).await.unwrap();
        assert_eq!(counter.trades, 20);

        // 20 + 5 == 25: the limit is inclusive.
        assert!(store
            .try_consume_quota(id, day, LimitedAction::Trades, 5, 25)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn release_returns_quota() {
        let store = InMemoryStore::new();
        let id = PlayerId::new();
        let day = UtcDay::from_datetime(Utc::now());

        store
            .try_consume_quota(id, day, LimitedAction::BusinessUpgrades, 3, 50)
            .await
            .unwrap();
        store
            .release_quota(id, day, LimitedAction::BusinessUpgrades, 1)
            .await
            .unwrap();
        let counter = store.daily_counter(id, day).await.unwrap();
        assert_eq!(counter.business_upgrades, 2);
    }

    #[tokio::test]
    async fn referral_applies_exactly_once() {
        let store = InMemoryStore::new();
        let rules = ProgressionRules::default();
        let redeemer = player("redeemer0000");
        let referrer = player("referrer0000");
        store.insert_player(redeemer.clone()).await.unwrap();
        store.insert_player(referrer.clone()).await.unwrap();

        let applied = store
            .apply_referral(redeemer.id, referrer.id, 500, &rules)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(applied.redeemer.points, 500);
        assert_eq!(applied.referrer.points, 500);
        assert_eq!(applied.referrer.referral_count, 1);
        assert_eq!(applied.redeemer.referred_by, Some(referrer.id));

        // Second attempt loses the `referred_by IS NULL` condition.
        let second = store
            .apply_referral(redeemer.id, referrer.id, 500, &rules)
            .await
            .unwrap();
        assert!(second.is_none());
    }

    #[tokio::test]
    async fn prune_removes_only_stale_days() {
        let store = InMemoryStore::new();
        let id = PlayerId::new();
        let today = UtcDay::from_datetime(Utc::now());
        let old = today.minus_days(40);

        store
            .try_consume_quota(id, today, LimitedAction::Clicks, 1, 2000)
            .await
            .unwrap();
        store
            .try_consume_quota(id, old, LimitedAction::Clicks, 1, 2000)
            .await
            .unwrap();

        let removed = store
            .prune_daily_counters(today.minus_days(30))
            .await
            .unwrap();
        assert_eq!(removed, 1);
        assert_eq!(store.daily_counter(id, today).await.unwrap().clicks, 1);
    }
}
