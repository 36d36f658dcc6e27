//! Progression ledger for the Idlemint economy backend.
//!
//! Every point a player gains or spends flows through this crate. The
//! ledger owns the three coupled quantities on a [`Player`] record --
//! `points`, `experience`, `total_earned` -- and the two values derived
//! from them, `level` and `click_power`.
//!
//! # Invariants
//!
//! - `points >= 0` at all times: a debit exceeding the balance is rejected
//!   without mutation.
//! - `experience` and `total_earned` are monotonically non-decreasing:
//!   only credits touch them, and credits only add.
//! - `level` is always exactly `min(experience / experience_per_level + 1,
//!   max_level)` after any operation -- it is recomputed on every
//!   experience change, never drifts, and is never written independently.
//! - All arithmetic is checked; overflow is surfaced as
//!   [`LedgerError::Overflow`], an invariant-class failure that must not
//!   persist corrupted state.
//!
//! # Concurrency
//!
//! The functions here are pure transitions on an owned [`Player`] value.
//! Atomicity under concurrent requests is the storage layer's job
//! (versioned compare-and-swap or a transactional row lock); callers apply
//! a transition and commit it as a single read-modify-write.
//!
//! The ledger is multiplier-agnostic: any VIP or event multiplier is
//! applied by the caller before invoking [`credit`].
//!
//! [`Player`]: idlemint_types::Player
//! [`credit`]: progression::credit

pub mod progression;

// Re-export primary types at crate root.
pub use progression::{credit, debit, CreditOutcome, ProgressionRules};

/// Errors that can occur when applying ledger operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    /// A debit was requested for more points than the player holds.
    #[error("insufficient funds: requested {requested} but balance is {available}")]
    InsufficientFunds {
        /// The amount the caller attempted to debit.
        requested: u64,
        /// The player's balance at the time of the attempt.
        available: u64,
    },

    /// Credits and debits must move a non-zero amount.
    #[error("ledger amount must be non-zero")]
    ZeroAmount,

    /// A checked arithmetic operation overflowed.
    ///
    /// This indicates a logic defect or absurd configuration, never a
    /// normal gameplay outcome. The operation is halted and nothing is
    /// persisted.
    #[error("arithmetic overflow in ledger operation: {context}")]
    Overflow {
        /// Description of what was being computed.
        context: &'static str,
    },
}
