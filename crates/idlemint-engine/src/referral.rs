//! Referral code generation and validation.
//!
//! Every player gets an opaque 12-character code at registration. A new
//! player may redeem exactly one code, ever; redemption mints the bonus for
//! both sides and bumps the referrer's count. The write itself is a
//! conditional update in the store (`referred_by IS NULL`), so a racing
//! double-redeem resolves to one winner.

use uuid::Uuid;

use idlemint_types::Player;

use crate::error::EngineError;

/// Length of a referral code.
pub const REFERRAL_CODE_LEN: usize = 12;

/// Generate a fresh referral code: 12 lowercase hex characters drawn from
/// a random UUID. Uniqueness is enforced by the store's unique index; on
/// the vanishingly rare collision, registration retries with a new code.
#[must_use]
pub fn generate_referral_code() -> String {
    Uuid::new_v4()
        .simple()
        .to_string()
        .chars()
        .take(REFERRAL_CODE_LEN)
        .collect()
}

/// Validate a referral redemption before any write.
///
/// Checked in order:
/// 1. the redeeming player has not already been referred,
/// 2. the code resolves to a real player,
/// 3. the code is not the redeemer's own.
pub fn validate(
    redeemer: &Player,
    referrer: Option<&Player>,
) -> Result<(), EngineError> {
    if redeemer.referred_by.is_some() {
        return Err(EngineError::AlreadyReferred);
    }
    let Some(referrer) = referrer else {
        return Err(EngineError::InvalidCode);
    };
    if referrer.id == redeemer.id {
        return Err(EngineError::SelfReferral);
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use idlemint_types::PlayerId;

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

    #[test]
    fn generated_codes_have_fixed_length() {
        for _ in 0..64 {
            let code = generate_referral_code();
            assert_eq!(code.len(), REFERRAL_CODE_LEN);
            assert!(code.chars().all(|c| c.is_ascii_hexdigit()));
        }
    }

    #[test]
    fn generated_codes_differ() {
        assert_ne!(generate_referral_code(), generate_referral_code());
    }

    #[test]
    fn already_referred_takes_precedence_over_bad_code() {
        let mut redeemer = player("aaaaaaaaaaaa");
        redeemer.referred_by = Some(PlayerId::new());
        let err = validate(&redeemer, None).unwrap_err();
        assert!(matches!(err, EngineError::AlreadyReferred));
    }

    #[test]
    fn unknown_code_is_rejected() {
        let redeemer = player("aaaaaaaaaaaa");
        let err = validate(&redeemer, None).unwrap_err();
        assert!(matches!(err, EngineError::InvalidCode));
    }

    #[test]
    fn self_referral_is_rejected() {
        let redeemer = player("aaaaaaaaaaaa");
        let err = validate(&redeemer, Some(&redeemer)).unwrap_err();
        assert!(matches!(err, EngineError::SelfReferral));
    }

    #[test]
    fn valid_redemption_passes() {
        let redeemer = player("aaaaaaaaaaaa");
        let referrer = player("bbbbbbbbbbbb");
        validate(&redeemer, Some(&referrer)).unwrap();
    }
}
