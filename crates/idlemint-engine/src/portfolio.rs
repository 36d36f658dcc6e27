//! Business portfolio transitions: purchase, upgrade, collect.
//!
//! Each function is a pure transition over cloned state: it validates the
//! preconditions in order, applies the ledger debit or credit, and returns
//! the updated `(player, ownership)` pair for the storage layer to commit
//! atomically. A returned error guarantees nothing was mutated anywhere.
//!
//! State machine per `(player, business)`:
//!
//! ```text
//! Unowned --purchase--> Owned(1) --upgrade--> Owned(2) --upgrade--> ...
//! ```
//!
//! Ownership rows are never deleted.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use idlemint_ledger::{credit, debit, ProgressionRules};
use idlemint_types::{BusinessDefinition, BusinessOwnership, Player};

use crate::catalog::upgrade_cost;
use crate::error::EngineError;

/// Seconds per hour, as a `Decimal` divisor for accrual math.
const SECONDS_PER_HOUR: i64 = 3600;

// ---------------------------------------------------------------------------
// Purchase
// ---------------------------------------------------------------------------

/// Result of a successful purchase transition.
#[derive(Debug, Clone)]
pub struct PurchaseOutcome {
    /// The player after the debit.
    pub player: Player,
    /// The newly created level-1 ownership.
    pub ownership: BusinessOwnership,
}

/// Purchase a business: `Unowned -> Owned(1)`.
///
/// Checked in order: player level against the catalog requirement, no
/// existing ownership, then funds. The threshold is inclusive -- a player
/// holding exactly `base_cost` points succeeds and ends at zero.
pub fn purchase(
    player: &Player,
    existing: Option<&BusinessOwnership>,
    definition: &BusinessDefinition,
    now: DateTime<Utc>,
) -> Result<PurchaseOutcome, EngineError> {
    if player.level < definition.required_level {
        return Err(EngineError::LevelTooLow {
            required: definition.required_level,
            actual: player.level,
        });
    }
    if existing.is_some() {
        return Err(EngineError::AlreadyOwned(definition.id.clone()));
    }

    let mut updated = player.clone();
    debit(&mut updated, definition.base_cost)?;

    let ownership = BusinessOwnership {
        player_id: player.id,
        business_id: definition.id.clone(),
        level: 1,
        last_collected_at: now,
        total_earned: 0,
    };

    Ok(PurchaseOutcome {
        player: updated,
        ownership,
    })
}

// ---------------------------------------------------------------------------
// Upgrade
// ---------------------------------------------------------------------------

/// Result of a successful upgrade transition.
#[derive(Debug, Clone)]
pub struct UpgradeOutcome {
    /// The player after the debit.
    pub player: Player,
    /// The ownership at its new level.
    pub ownership: BusinessOwnership,
    /// Points paid for this step.
    pub cost: u64,
}

/// Upgrade an owned business: `Owned(n) -> Owned(n+1)`.
///
/// Cost is `floor(base_cost * 1.5^n)` where `n` is the current level. The
/// daily-quota consumption for `business_upgrades` is the engine's
/// responsibility, not this transition's.
pub fn upgrade(
    player: &Player,
    ownership: &BusinessOwnership,
    definition: &BusinessDefinition,
) -> Result<UpgradeOutcome, EngineError> {
    let cost = upgrade_cost(definition.base_cost, ownership.level).ok_or_else(|| {
        EngineError::Invariant(format!(
            "upgrade cost overflow for {} at level {}",
            definition.id, ownership.level
        ))
    })?;

    let mut updated = player.clone();
    debit(&mut updated, cost)?;

    let mut upgraded = ownership.clone();
    upgraded.level = upgraded.level.checked_add(1).ok_or_else(|| {
        EngineError::Invariant(format!("ownership level overflow for {}", definition.id))
    })?;

    Ok(UpgradeOutcome {
        player: updated,
        ownership: upgraded,
        cost,
    })
}

// ---------------------------------------------------------------------------
// Collect
// ---------------------------------------------------------------------------

/// Result of a successful collection transition.
#[derive(Debug, Clone)]
pub struct CollectOutcome {
    /// The player after the credit.
    pub player: Player,
    /// The ownership with `last_collected_at` reset to `now`.
    pub ownership: BusinessOwnership,
    /// Income credited.
    pub collected: u64,
}

/// Income accrued by an ownership since `last_collected_at`.
///
/// `floor(base_income_per_hour * level * min(hours_elapsed, cap_hours))`,
/// computed in `Decimal` so fractional hours never touch floating point.
/// The cap bounds the benefit of long absences; repeated rapid collection
/// cannot bypass it because every successful collection zeroes the window.
pub fn accrued_income(
    definition: &BusinessDefinition,
    level: u32,
    last_collected_at: DateTime<Utc>,
    now: DateTime<Utc>,
    cap_hours: u32,
) -> u64 {
    let elapsed_secs = now
        .signed_duration_since(last_collected_at)
        .num_seconds()
        .max(0);
    let hours = Decimal::from(elapsed_secs)
        .checked_div(Decimal::from(SECONDS_PER_HOUR))
        .unwrap_or(Decimal::ZERO)
        .min(Decimal::from(cap_hours));

    Decimal::from(definition.base_income_per_hour)
        .checked_mul(Decimal::from(level))
        .and_then(|rate| rate.checked_mul(hours))
        .map_or(u64::MAX, |gross| gross.floor().to_u64().unwrap_or(u64::MAX))
}

/// Collect accrued income from an owned business.
///
/// Fails with [`EngineError::NoIncomeAvailable`] when the computed income
/// is zero (including the immediate double-collect case), in which case
/// `last_collected_at` is not reset -- the rejected call is not a free
/// timer reset.
pub fn collect(
    player: &Player,
    ownership: &BusinessOwnership,
    definition: &BusinessDefinition,
    now: DateTime<Utc>,
    cap_hours: u32,
    rules: &ProgressionRules,
) -> Result<CollectOutcome, EngineError> {
    let income = accrued_income(
        definition,
        ownership.level,
        ownership.last_collected_at,
        now,
        cap_hours,
    );
    if income == 0 {
        return Err(EngineError::NoIncomeAvailable);
    }

    let mut updated = player.clone();
    let _ = credit(&mut updated, income, rules)?;

    let mut collected = ownership.clone();
    collected.last_collected_at = now;
    collected.total_earned = collected.total_earned.saturating_add(income);

    Ok(CollectOutcome {
        player: updated,
        ownership: collected,
        collected: income,
    })
}
