//! Credit/debit transitions and level derivation.
//!
//! The default rule credits experience 1:1 with points. Level and click
//! power are pure functions of experience and the [`ProgressionRules`],
//! recomputed on every credit.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use idlemint_types::Player;

use crate::LedgerError;

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

/// Tunable constants of the progression curve.
///
/// Injected configuration, shared by reference. The defaults match the
/// live game balance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressionRules {
    /// Experience required per level step.
    #[serde(default = "default_experience_per_level")]
    pub experience_per_level: u64,
    /// Hard level cap.
    #[serde(default = "default_max_level")]
    pub max_level: u32,
    /// Click power at level 1.
    #[serde(default = "default_base_click_power")]
    pub base_click_power: u64,
    /// Click power gained per level above 1 (fractional; the final value
    /// is floored).
    #[serde(default = "default_click_power_per_level")]
    pub click_power_per_level: Decimal,
}

impl Default for ProgressionRules {
    fn default() -> Self {
        Self {
            experience_per_level: default_experience_per_level(),
            max_level: default_max_level(),
            base_click_power: default_base_click_power(),
            click_power_per_level: default_click_power_per_level(),
        }
    }
}

const fn default_experience_per_level() -> u64 {
    1000
}

const fn default_max_level() -> u32 {
    100
}

const fn default_base_click_power() -> u64 {
    1
}

fn default_click_power_per_level() -> Decimal {
    // 0.5 click power per level; floored when derived.
    Decimal::new(5, 1)
}

impl ProgressionRules {
    /// Derive the level for a given experience total.
    ///
    /// `min(experience / experience_per_level + 1, max_level)`. A zero
    /// divisor is treated as 1 so a malformed configuration can never
    /// panic or produce level 0.
    pub fn level_for(&self, experience: u64) -> u32 {
        let per = self.experience_per_level.max(1);
        let steps = experience.checked_div(per).unwrap_or(0);
        let raw = steps.saturating_add(1);
        u32::try_from(raw)
            .unwrap_or(self.max_level)
            .min(self.max_level)
    }

    /// Derive the click power for a given level.
    ///
    /// `floor(base_click_power + (level - 1) * click_power_per_level)`.
    pub fn click_power_for(&self, level: u32) -> u64 {
        let steps = Decimal::from(level.saturating_sub(1));
        let bonus = self
            .click_power_per_level
            .checked_mul(steps)
            .unwrap_or(Decimal::ZERO);
        let total = Decimal::from(self.base_click_power)
            .checked_add(bonus)
            .unwrap_or(Decimal::MAX);
        total.floor().to_u64().unwrap_or(u64::MAX)
    }
}

// ---------------------------------------------------------------------------
// Credit
// ---------------------------------------------------------------------------

/// What a credit did to the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreditOutcome {
    /// The amount credited.
    pub credited: u64,
    /// Whether this credit crossed at least one level boundary.
    pub leveled_up: bool,
    /// Level after the credit.
    pub level: u32,
    /// Click power after the credit.
    pub click_power: u64,
}

/// Credit `amount` points to the player.
///
/// Adds to `points`, `total_earned`, and `experience` (1:1), then
/// recomputes `level` and `click_power`. The level-up is signalled in the
/// returned [`CreditOutcome`], not queued as an event.
///
/// # Errors
///
/// [`LedgerError::ZeroAmount`] for a zero credit;
/// [`LedgerError::Overflow`] if any counter would overflow, in which case
/// the player is left unmodified.
pub fn credit(
    player: &mut Player,
    amount: u64,
    rules: &ProgressionRules,
) -> Result<CreditOutcome, LedgerError> {
    if amount == 0 {
        return Err(LedgerError::ZeroAmount);
    }

    let points = player
        .points
        .checked_add(amount)
        .ok_or(LedgerError::Overflow {
            context: "points credit",
        })?;
    let total_earned = player
        .total_earned
        .checked_add(amount)
        .ok_or(LedgerError::Overflow {
            context: "total_earned credit",
        })?;
    let experience = player
        .experience
        .checked_add(amount)
        .ok_or(LedgerError::Overflow {
            context: "experience credit",
        })?;

    let previous_level = player.level;
    let level = rules.level_for(experience);
    let click_power = rules.click_power_for(level);

    // All checked math succeeded; apply the transition in one go.
    player.points = points;
    player.total_earned = total_earned;
    player.experience = experience;
    player.level = level;
    player.click_power = click_power;

    Ok(CreditOutcome {
        credited: amount,
        leveled_up: level > previous_level,
        level,
        click_power,
    })
}

// ---------------------------------------------------------------------------
// Debit
// ---------------------------------------------------------------------------

/// Debit `amount` points from the player.
///
/// Only `points` changes: experience, level, and lifetime totals are
/// untouched by spending.
///
/// # Errors
///
/// [`LedgerError::InsufficientFunds`] if `amount > points`; the player is
/// left unmodified. [`LedgerError::ZeroAmount`] for a zero debit.
pub fn debit(player: &mut Player, amount: u64) -> Result<(), LedgerError> {
    if amount == 0 {
        return Err(LedgerError::ZeroAmount);
    }
    let remaining = player
        .points
        .checked_sub(amount)
        .ok_or(LedgerError::InsufficientFunds {
            requested: amount,
            available: player.points,
        })?;
    player.points = remaining;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]
mod tests {
    use super::*;
    use chrono::Utc;
    use idlemint_types::PlayerId;

    fn fresh_player() -> Player {
        let rules = ProgressionRules::default();
        Player {
            id: PlayerId::new(),
            display_name: String::from("Test"),
            points: 0,
            experience: 0,
            level: rules.level_for(0),
            click_power: rules.click_power_for(1),
            total_earned: 0,
            referral_code: String::from("code00000000"),
            referred_by: None,
            referral_count: 0,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn fresh_player_starts_at_level_one() {
        let player = fresh_player();
        assert_eq!(player.level, 1);
        assert_eq!(player.click_power, 1);
    }

    #[test]
    fn credit_updates_all_three_counters() {
        let rules = ProgressionRules::default();
        let mut player = fresh_player();

        let outcome = credit(&mut player, 250, &rules).unwrap();

        assert_eq!(player.points, 250);
        assert_eq!(player.experience, 250);
        assert_eq!(player.total_earned, 250);
        assert_eq!(outcome.credited, 250);
        assert!(!outcome.leveled_up);
    }

    #[test]
    fn credit_crossing_boundary_levels_up() {
        let rules = ProgressionRules::default();
        let mut player = fresh_player();

        let outcome = credit(&mut player, 1000, &rules).unwrap();
        assert!(outcome.leveled_up);
        assert_eq!(player.level, 2);

        // A second small credit stays within the level.
        let outcome = credit(&mut player, 10, &rules).unwrap();
        assert!(!outcome.leveled_up);
        assert_eq!(player.level, 2);
    }

    #[test]
    fn level_never_drifts_from_experience() {
        let rules = ProgressionRules::default();
        let mut player = fresh_player();

        for amount in [1, 999, 1, 500, 2500, 42, 99_999] {
            let _ = credit(&mut player, amount, &rules).unwrap();
            let expected =
                u32::try_from((player.experience / 1000).saturating_add(1)).unwrap().min(100);
            assert_eq!(player.level, expected);
            assert_eq!(player.level, rules.level_for(player.experience));
        }
    }

    #[test]
    fn level_caps_at_max() {
        let rules = ProgressionRules::default();
        // 100 levels at 1000 xp each: anything past 99_000 xp is capped.
        assert_eq!(rules.level_for(99_000), 100);
        assert_eq!(rules.level_for(u64::MAX / 2), 100);
    }

    #[test]
    fn click_power_floors_fractional_slope() {
        let rules = ProgressionRules::default();
        // base 1 + 0.5/level: level 1 -> 1, level 2 -> 1 (1.5 floored),
        // level 3 -> 2, level 4 -> 2 (2.5 floored), level 5 -> 3.
        assert_eq!(rules.click_power_for(1), 1);
        assert_eq!(rules.click_power_for(2), 1);
        assert_eq!(rules.click_power_for(3), 2);
        assert_eq!(rules.click_power_for(4), 2);
        assert_eq!(rules.click_power_for(5), 3);
    }

    #[test]
    fn debit_within_balance_succeeds() {
        let rules = ProgressionRules::default();
        let mut player = fresh_player();
        let _ = credit(&mut player, 100, &rules).unwrap();

        debit(&mut player, 100).unwrap();
        assert_eq!(player.points, 0);
        // Spending never touches experience or lifetime earnings.
        assert_eq!(player.experience, 100);
        assert_eq!(player.total_earned, 100);
    }

    #[test]
    fn debit_exceeding_balance_changes_nothing() {
        let rules = ProgressionRules::default();
        let mut player = fresh_player();
        let _ = credit(&mut player, 50, &rules).unwrap();

        let before = player.clone();
        let err = debit(&mut player, 51).unwrap_err();
        assert_eq!(
            err,
            LedgerError::InsufficientFunds {
                requested: 51,
                available: 50
            }
        );
        assert_eq!(player, before);
    }

    #[test]
    fn zero_amounts_are_rejected() {
        let rules = ProgressionRules::default();
        let mut player = fresh_player();
        assert_eq!(credit(&mut player, 0, &rules), Err(LedgerError::ZeroAmount));
        assert_eq!(debit(&mut player, 0), Err(LedgerError::ZeroAmount));
    }

    #[test]
    fn credit_overflow_leaves_player_unmodified() {
        let rules = ProgressionRules::default();
        let mut player = fresh_player();
        let _ = credit(&mut player, 10, &rules).unwrap();

        let before = player.clone();
        let err = credit(&mut player, u64::MAX, &rules).unwrap_err();
        assert!(matches!(err, LedgerError::Overflow { .. }));
        assert_eq!(player, before);
    }

    #[test]
    fn points_never_negative_for_any_sequence() {
        let rules = ProgressionRules::default();
        let mut player = fresh_player();

        // Interleave credits and (sometimes over-sized) debits; the balance
        // must stay non-negative throughout because over-debits are rejected.
        let steps: [(bool, u64); 8] = [
            (true, 10),
            (false, 5),
            (false, 100),
            (true, 3),
            (false, 8),
            (false, 1),
            (true, 1000),
            (false, 999),
        ];
        for (is_credit, amount) in steps {
            if is_credit {
                let _ = credit(&mut player, amount, &rules);
            } else {
                let _ = debit(&mut player, amount);
            }
            // u64 cannot go negative; the meaningful assertion is that a
            // rejected debit did not wrap or partially apply.
            assert!(player.points <= player.total_earned);
        }
        assert_eq!(player.points, 1);
    }
}
