//! Error types for the economy engine.
//!
//! [`EngineError`] unifies every operation failure. Each variant belongs to
//! one [`ErrorKind`] class; the transport layer maps classes to status
//! codes without inspecting individual variants. Every variant in the
//! `Precondition`, `Quota`, and `Validation` classes is guaranteed
//! side-effect-free: nothing was debited, no counter moved.

use idlemint_types::{BusinessId, LimitedAction, PlayerId};

use crate::store::StoreError;

/// Classification of an [`EngineError`] for transport mapping and retry
/// decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed input, rejected before touching any state.
    Validation,
    /// The referenced player or catalog entry does not exist.
    NotFound,
    /// A business rule rejected the operation; safe to report verbatim.
    Precondition,
    /// A daily quota is exhausted; retryable after the UTC day rolls over.
    Quota,
    /// The store was unavailable or contended; retryable with backoff.
    Transient,
    /// A logic defect or corrupted state was detected; the operation was
    /// halted and nothing was persisted. Never reported verbatim.
    Invariant,
}

/// Errors produced by engine operations.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Malformed request input.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// No player with the given id.
    #[error("player not found: {0}")]
    PlayerNotFound(PlayerId),

    /// No catalog entry with the given slug.
    #[error("business not found: {0}")]
    BusinessNotFound(BusinessId),

    /// The player's level is below the catalog entry's requirement.
    #[error("level too low: requires {required}, player is {actual}")]
    LevelTooLow {
        /// Required level from the catalog.
        required: u32,
        /// The player's current level.
        actual: u32,
    },

    /// The player already owns this business.
    #[error("business already owned: {0}")]
    AlreadyOwned(BusinessId),

    /// The player cannot afford the operation.
    #[error("insufficient funds: requested {requested} but balance is {available}")]
    InsufficientFunds {
        /// Points the operation would debit.
        requested: u64,
        /// The player's balance.
        available: u64,
    },

    /// The player does not own this business.
    #[error("business not owned: {0}")]
    NotOwned(BusinessId),

    /// Accrued income rounds to zero; nothing to collect.
    #[error("no income available to collect")]
    NoIncomeAvailable,

    /// The player already has a referrer; the edge is immutable.
    #[error("player already referred")]
    AlreadyReferred,

    /// No player owns the submitted referral code.
    #[error("invalid referral code")]
    InvalidCode,

    /// The submitted code belongs to the player themselves.
    #[error("self-referral is not allowed")]
    SelfReferral,

    /// The daily quota for this action is exhausted.
    #[error("daily quota exceeded for {action:?} (limit {limit})")]
    QuotaExceeded {
        /// The limited action.
        action: LimitedAction,
        /// The configured daily ceiling.
        limit: u32,
    },

    /// The ban hook short-circuited the limiter.
    #[error("player is banned from rate-limited actions")]
    Banned,

    /// Optimistic retries were exhausted without a successful commit.
    #[error("concurrent update contention; retry later")]
    Contention,

    /// The storage backend failed.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// An internal invariant was violated; the operation was aborted.
    #[error("internal invariant violation: {0}")]
    Invariant(String),
}

impl EngineError {
    /// The error's classification.
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput(_) => ErrorKind::Validation,
            Self::PlayerNotFound(_) | Self::BusinessNotFound(_) => ErrorKind::NotFound,
            Self::LevelTooLow { .. }
            | Self::AlreadyOwned(_)
            | Self::InsufficientFunds { .. }
            | Self::NotOwned(_)
            | Self::NoIncomeAvailable
            | Self::AlreadyReferred
            | Self::InvalidCode
            | Self::SelfReferral => ErrorKind::Precondition,
            Self::QuotaExceeded { .. } | Self::Banned => ErrorKind::Quota,
            Self::Contention | Self::Store(_) => ErrorKind::Transient,
            Self::Invariant(_) => ErrorKind::Invariant,
        }
    }
}

impl From<idlemint_ledger::LedgerError> for EngineError {
    fn from(err: idlemint_ledger::LedgerError) -> Self {
        match err {
            idlemint_ledger::LedgerError::InsufficientFunds {
                requested,
                available,
            } => Self::InsufficientFunds {
                requested,
                available,
            },
            // Zero amounts and overflow at this layer mean a logic defect,
            // not a player-facing rejection.
            other => Self::Invariant(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precondition_errors_classify_as_precondition() {
        assert_eq!(
            EngineError::NoIncomeAvailable.kind(),
            ErrorKind::Precondition
        );
        assert_eq!(EngineError::AlreadyReferred.kind(), ErrorKind::Precondition);
    }

    #[test]
    fn quota_and_ban_classify_as_quota() {
        let err = EngineError::QuotaExceeded {
            action: LimitedAction::Clicks,
            limit: 100,
        };
        assert_eq!(err.kind(), ErrorKind::Quota);
        assert_eq!(EngineError::Banned.kind(), ErrorKind::Quota);
    }

    #[test]
    fn ledger_insufficient_funds_maps_through() {
        let err: EngineError = idlemint_ledger::LedgerError::InsufficientFunds {
            requested: 10,
            available: 5,
        }
        .into();
        assert!(matches!(
            err,
            EngineError::InsufficientFunds {
                requested: 10,
                available: 5
            }
        ));
    }

    #[test]
    fn ledger_overflow_maps_to_invariant() {
        let err: EngineError = idlemint_ledger::LedgerError::Overflow { context: "points" }.into();
        assert_eq!(err.kind(), ErrorKind::Invariant);
    }
}
