//! `PostgreSQL` implementation of the engine's storage contract.
//!
//! Player rows carry a `version` column backing the optimistic
//! compare-and-swap protocol: every write goes through
//! `UPDATE ... WHERE id = $1 AND version = $n`, and a zero row count means
//! the caller lost the race. Multi-row commits (purchase, upgrade,
//! referral) run in a single transaction so partial state can never land.
//!
//! Daily-counter consumption is a conditional upsert whose `WHERE` clause
//! re-checks the limit against the incremented value, making the check and
//! the increment one atomic statement.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use idlemint_engine::store::{EconomyStore, ReferralApplied, StoreError, Versioned};
use idlemint_ledger::{credit, ProgressionRules};
use idlemint_types::{
    BusinessId, BusinessOwnership, DailyCounter, LimitedAction, Player, PlayerId, UtcDay,
};

use crate::error::store_error;
use crate::postgres::PostgresPool;

/// [`EconomyStore`] backed by `PostgreSQL`.
#[derive(Clone)]
pub struct PgEconomyStore {
    pool: PgPool,
}

impl PgEconomyStore {
    /// Create a store over an existing connection pool.
    pub fn new(pool: &PostgresPool) -> Self {
        Self {
            pool: pool.pool().clone(),
        }
    }
}

// -------------------------------------------------------------------------
// Row types and conversions
// -------------------------------------------------------------------------

#[derive(Debug, Clone, sqlx::FromRow)]
struct PlayerRow {
    id: Uuid,
    display_name: String,
    points: i64,
    experience: i64,
    level: i32,
    click_power: i64,
    total_earned: i64,
    referral_code: String,
    referred_by: Option<Uuid>,
    referral_count: i32,
    version: i64,
    created_at: DateTime<Utc>,
}

impl PlayerRow {
    fn into_versioned(self) -> Versioned<Player> {
        Versioned {
            value: Player {
                id: PlayerId::from(self.id),
                display_name: self.display_name,
                points: db_u64(self.points),
                experience: db_u64(self.experience),
                level: db_u32(self.level),
                click_power: db_u64(self.click_power),
                total_earned: db_u64(self.total_earned),
                referral_code: self.referral_code,
                referred_by: self.referred_by.map(PlayerId::from),
                referral_count: db_u32(self.referral_count),
                created_at: self.created_at,
            },
            version: db_u64(self.version),
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct OwnershipRow {
    player_id: Uuid,
    business_id: String,
    level: i32,
    last_collected_at: DateTime<Utc>,
    total_earned: i64,
}

impl From<OwnershipRow> for BusinessOwnership {
    fn from(row: OwnershipRow) -> Self {
        Self {
            player_id: PlayerId::from(row.player_id),
            business_id: BusinessId::from(row.business_id),
            level: db_u32(row.level),
            last_collected_at: row.last_collected_at,
            total_earned: db_u64(row.total_earned),
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct CounterRow {
    day: chrono::NaiveDate,
    clicks: i32,
    ads_watched: i32,
    business_upgrades: i32,
    trades: i32,
    points_earned: i64,
}

impl From<CounterRow> for DailyCounter {
    fn from(row: CounterRow) -> Self {
        Self {
            day: UtcDay::from(row.day),
            clicks: db_u32(row.clicks),
            ads_watched: db_u32(row.ads_watched),
            business_upgrades: db_u32(row.business_upgrades),
            trades: db_u32(row.trades),
            points_earned: db_u64(row.points_earned),
        }
    }
}

// BIGINT/INT columns hold non-negative application values; negatives can
// only come from manual edits and clamp to zero rather than wrapping.
fn db_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn db_u64(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

fn db_i32(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

fn db_u32(value: i32) -> u32 {
    u32::try_from(value).unwrap_or(0)
}

const SELECT_PLAYER: &str = r"SELECT id, display_name, points, experience, level, click_power,
    total_earned, referral_code, referred_by, referral_count, version, created_at
    FROM players";

const SELECT_OWNERSHIP: &str = r"SELECT player_id, business_id, level, last_collected_at,
    total_earned FROM business_ownerships";

/// Compare-and-swap write of a full player row. Returns `false` on a
/// version mismatch (or a missing row).
async fn cas_update_player(
    conn: &mut PgConnection,
    player: &Player,
    expected_version: u64,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r"UPDATE players SET
            display_name = $2,
            points = $3,
            experience = $4,
            level = $5,
            click_power = $6,
            total_earned = $7,
            referred_by = $8,
            referral_count = $9,
            version = version + 1
          WHERE id = $1 AND version = $10",
    )
    .bind(player.id.into_inner())
    .bind(&player.display_name)
    .bind(db_i64(player.points))
    .bind(db_i64(player.experience))
    .bind(db_i32(player.level))
    .bind(db_i64(player.click_power))
    .bind(db_i64(player.total_earned))
    .bind(player.referred_by.map(PlayerId::into_inner))
    .bind(db_i32(player.referral_count))
    .bind(db_i64(expected_version))
    .execute(conn)
    .await?;
    Ok(result.rows_affected() == 1)
}

async fn upsert_ownership(
    conn: &mut PgConnection,
    ownership: &BusinessOwnership,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r"INSERT INTO business_ownerships
            (player_id, business_id, level, last_collected_at, total_earned)
          VALUES ($1, $2, $3, $4, $5)
          ON CONFLICT (player_id, business_id) DO UPDATE SET
            level = EXCLUDED.level,
            last_collected_at = EXCLUDED.last_collected_at,
            total_earned = EXCLUDED.total_earned",
    )
    .bind(ownership.player_id.into_inner())
    .bind(ownership.business_id.as_str())
    .bind(db_i32(ownership.level))
    .bind(ownership.last_collected_at)
    .bind(db_i64(ownership.total_earned))
    .execute(conn)
    .await?;
    Ok(())
}

// -------------------------------------------------------------------------
// EconomyStore implementation
// -------------------------------------------------------------------------

#[async_trait]
impl EconomyStore for PgEconomyStore {
    async fn insert_player(&self, player: Player) -> Result<(), StoreError> {
        sqlx::query(
            r"INSERT INTO players
                (id, display_name, points, experience, level, click_power, total_earned,
                 referral_code, referred_by, referral_count, version, created_at)
              VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, 1, $11)",
        )
        .bind(player.id.into_inner())
        .bind(&player.display_name)
        .bind(db_i64(player.points))
        .bind(db_i64(player.experience))
        .bind(db_i32(player.level))
        .bind(db_i64(player.click_power))
        .bind(db_i64(player.total_earned))
        .bind(&player.referral_code)
        .bind(player.referred_by.map(PlayerId::into_inner))
        .bind(db_i32(player.referral_count))
        .bind(player.created_at)
        .execute(&self.pool)
        .await
        .map_err(store_error)?;
        Ok(())
    }

    async fn get_player(&self, id: PlayerId) -> Result<Option<Versioned<Player>>, StoreError> {
        let row = sqlx::query_as::<_, PlayerRow>(&format!("{SELECT_PLAYER} WHERE id = $1"))
            .bind(id.into_inner())
            .fetch_optional(&self.pool)
            .await
            .map_err(store_error)?;
        Ok(row.map(PlayerRow::into_versioned))
    }

    async fn find_by_referral_code(
        &self,
        code: &str,
    ) -> Result<Option<Versioned<Player>>, StoreError> {
        let row =
            sqlx::query_as::<_, PlayerRow>(&format!("{SELECT_PLAYER} WHERE referral_code = $1"))
                .bind(code)
                .fetch_optional(&self.pool)
                .await
                .map_err(store_error)?;
        Ok(row.map(PlayerRow::into_versioned))
    }

    async fn update_player(
        &self,
        player: Player,
        expected_version: u64,
    ) -> Result<bool, StoreError> {
        let mut conn = self.pool.acquire().await.map_err(store_error)?;
        cas_update_player(&mut conn, &player, expected_version)
            .await
            .map_err(store_error)
    }

    async fn get_ownerships(
        &self,
        player: PlayerId,
    ) -> Result<Vec<BusinessOwnership>, StoreError> {
        let rows = sqlx::query_as::<_, OwnershipRow>(&format!(
            "{SELECT_OWNERSHIP} WHERE player_id = $1 ORDER BY business_id"
        ))
        .bind(player.into_inner())
        .fetch_all(&self.pool)
        .await
        .map_err(store_error)?;
        Ok(rows.into_iter().map(BusinessOwnership::from).collect())
    }

    async fn get_ownership(
        &self,
        player: PlayerId,
        business: &BusinessId,
    ) -> Result<Option<BusinessOwnership>, StoreError> {
        let row = sqlx::query_as::<_, OwnershipRow>(&format!(
            "{SELECT_OWNERSHIP} WHERE player_id = $1 AND business_id = $2"
        ))
        .bind(player.into_inner())
        .bind(business.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error)?;
        Ok(row.map(BusinessOwnership::from))
    }

    async fn commit_purchase(
        &self,
        player: Player,
        expected_version: u64,
        ownership: BusinessOwnership,
    ) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await.map_err(store_error)?;
        if !cas_update_player(&mut tx, &player, expected_version)
            .await
            .map_err(store_error)?
        {
            tx.rollback().await.map_err(store_error)?;
            return Ok(false);
        }
        upsert_ownership(&mut tx, &ownership)
            .await
            .map_err(store_error)?;
        tx.commit().await.map_err(store_error)?;
        Ok(true)
    }

    async fn commit_ownership_update(
        &self,
        player: Player,
        expected_version: u64,
        ownership: BusinessOwnership,
    ) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await.map_err(store_error)?;
        if !cas_update_player(&mut tx, &player, expected_version)
            .await
            .map_err(store_error)?
        {
            tx.rollback().await.map_err(store_error)?;
            return Ok(false);
        }
        upsert_ownership(&mut tx, &ownership)
            .await
            .map_err(store_error)?;
        tx.commit().await.map_err(store_error)?;
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
        if amount > limit {
            return Ok(false);
        }
        // Column name comes from the enum's fixed string table, never from
        // request input.
        let col = action.as_str();
        let sql = format!(
            r"INSERT INTO daily_counters (player_id, day, {col}) VALUES ($1, $2, $3)
              ON CONFLICT (player_id, day) DO UPDATE
                SET {col} = daily_counters.{col} + EXCLUDED.{col}
                WHERE daily_counters.{col} + EXCLUDED.{col} <= $4
              RETURNING {col}"
        );
        let row: Option<(i32,)> = sqlx::query_as(&sql)
            .bind(player.into_inner())
            .bind(day.into_inner())
            .bind(db_i32(amount))
            .bind(db_i32(limit))
            .fetch_optional(&self.pool)
            .await
            .map_err(store_error)?;
        Ok(row.is_some())
    }

    async fn release_quota(
        &self,
        player: PlayerId,
        day: UtcDay,
        action: LimitedAction,
        amount: u32,
    ) -> Result<(), StoreError> {
        let col = action.as_str();
        let sql = format!(
            r"UPDATE daily_counters
              SET {col} = GREATEST({col} - $3, 0)
              WHERE player_id = $1 AND day = $2"
        );
        sqlx::query(&sql)
            .bind(player.into_inner())
            .bind(day.into_inner())
            .bind(db_i32(amount))
            .execute(&self.pool)
            .await
            .map_err(store_error)?;
        Ok(())
    }

    async fn record_points_earned(
        &self,
        player: PlayerId,
        day: UtcDay,
        amount: u64,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r"INSERT INTO daily_counters (player_id, day, points_earned) VALUES ($1, $2, $3)
              ON CONFLICT (player_id, day) DO UPDATE
                SET points_earned = daily_counters.points_earned + EXCLUDED.points_earned",
        )
        .bind(player.into_inner())
        .bind(day.into_inner())
        .bind(db_i64(amount))
        .execute(&self.pool)
        .await
        .map_err(store_error)?;
        Ok(())
    }

    async fn daily_counter(
        &self,
        player: PlayerId,
        day: UtcDay,
    ) -> Result<DailyCounter, StoreError> {
        let row = sqlx::query_as::<_, CounterRow>(
            r"SELECT day, clicks, ads_watched, business_upgrades, trades, points_earned
              FROM daily_counters WHERE player_id = $1 AND day = $2",
        )
        .bind(player.into_inner())
        .bind(day.into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error)?;
        Ok(row.map_or_else(|| DailyCounter::empty(day), DailyCounter::from))
    }

    async fn apply_referral(
        &self,
        redeemer: PlayerId,
        referrer: PlayerId,
        bonus: u64,
        rules: &ProgressionRules,
    ) -> Result<Option<ReferralApplied>, StoreError> {
        let mut tx = self.pool.begin().await.map_err(store_error)?;

        // Lock both rows in id order so two concurrent redemptions can
        // never deadlock on each other.
        let lock_sql = format!("{SELECT_PLAYER} WHERE id = $1 FOR UPDATE");
        let (first, second) = if redeemer < referrer {
            (redeemer, referrer)
        } else {
            (referrer, redeemer)
        };
        let mut locked = Vec::with_capacity(2);
        for id in [first, second] {
            let row = sqlx::query_as::<_, PlayerRow>(&lock_sql)
                .bind(id.into_inner())
                .fetch_optional(&mut *tx)
                .await
                .map_err(store_error)?;
            match row {
                Some(row) => locked.push(row.into_versioned()),
                None => {
                    tx.rollback().await.map_err(store_error)?;
                    return Ok(None);
                }
            }
        }

        let mut redeemer_row = None;
        let mut referrer_row = None;
        for versioned in locked {
            if versioned.value.id == redeemer {
                redeemer_row = Some(versioned);
            } else {
                referrer_row = Some(versioned);
            }
        }
        let (Some(redeemer_v), Some(referrer_v)) = (redeemer_row, referrer_row) else {
            tx.rollback().await.map_err(store_error)?;
            return Ok(None);
        };

        // Win condition: the edge is still unset while we hold the lock.
        if redeemer_v.value.referred_by.is_some() {
            tx.rollback().await.map_err(store_error)?;
            return Ok(None);
        }

        let mut redeemer_player = redeemer_v.value;
        let mut referrer_player = referrer_v.value;
        redeemer_player.referred_by = Some(referrer);
        let _ = credit(&mut redeemer_player, bonus, rules)
            .map_err(|err| StoreError::Backend(err.to_string()))?;
        let _ = credit(&mut referrer_player, bonus, rules)
            .map_err(|err| StoreError::Backend(err.to_string()))?;
        referrer_player.referral_count = referrer_player.referral_count.saturating_add(1);

        // Rows are locked, so the CAS cannot fail except on corruption.
        for (player, version) in [
            (&redeemer_player, redeemer_v.version),
            (&referrer_player, referrer_v.version),
        ] {
            if !cas_update_player(&mut tx, player, version)
                .await
                .map_err(store_error)?
            {
                tx.rollback().await.map_err(store_error)?;
                return Err(StoreError::Backend(String::from(
                    "player version changed under row lock",
                )));
            }
        }

        tx.commit().await.map_err(store_error)?;
        Ok(Some(ReferralApplied {
            redeemer: redeemer_player,
            referrer: referrer_player,
        }))
    }

    async fn top_players(&self, limit: usize) -> Result<Vec<Player>, StoreError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows =
            sqlx::query_as::<_, PlayerRow>(&format!("{SELECT_PLAYER} ORDER BY points DESC, id LIMIT $1"))
                .bind(limit)
                .fetch_all(&self.pool)
                .await
                .map_err(store_error)?;
        Ok(rows
            .into_iter()
            .map(|row| row.into_versioned().value)
            .collect())
    }

    async fn prune_daily_counters(&self, cutoff: UtcDay) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM daily_counters WHERE day < $1")
            .bind(cutoff.into_inner())
            .execute(&self.pool)
            .await
            .map_err(store_error)?;
        Ok(result.rows_affected())
    }
}
