//! Shared type definitions for the Idlemint economy backend.
//!
//! This crate is the single source of truth for all types used across the
//! Idlemint workspace. Types defined here flow downstream to `TypeScript`
//! via `ts-rs` for the game client.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe identifier wrappers
//! - [`enums`] -- Enumeration types (limited actions, business categories)
//! - [`day`] -- The UTC calendar-day type keying daily counters
//! - [`structs`] -- Persisted entity structs (player, ownership, counters)
//! - [`api`] -- Operation request/response payloads

pub mod api;
pub mod day;
pub mod enums;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use api::{
    CollectResponse, LeaderboardEntry, ProfileResponse, PurchaseResponse, ReferralRequest,
    ReferralResponse, RegisterRequest, RegisterResponse, TapRequest, TapResponse, UpgradeResponse,
};
pub use day::UtcDay;
pub use enums::{BusinessCategory, LimitedAction};
pub use ids::{BusinessId, PlayerId};
pub use structs::{BusinessDefinition, BusinessOwnership, DailyCounter, Player};

#[cfg(test)]
mod tests {
    //! Integration tests for type exports and `TypeScript` binding generation.

    #[test]
    fn export_bindings() {
        // ts-rs generates TypeScript bindings when types with
        // #[ts(export)] are used. Importing them here triggers generation.
        // The actual files are written to the `bindings/` directory
        // relative to the crate root.
        use ts_rs::TS;

        // IDs
        let _ = crate::ids::PlayerId::export_all();
        let _ = crate::ids::BusinessId::export_all();

        // Enums
        let _ = crate::enums::LimitedAction::export_all();
        let _ = crate::enums::BusinessCategory::export_all();

        // Day
        let _ = crate::day::UtcDay::export_all();

        // Structs
        let _ = crate::structs::Player::export_all();
        let _ = crate::structs::BusinessDefinition::export_all();
        let _ = crate::structs::BusinessOwnership::export_all();
        let _ = crate::structs::DailyCounter::export_all();

        // API payloads
        let _ = crate::api::RegisterRequest::export_all();
        let _ = crate::api::TapRequest::export_all();
        let _ = crate::api::ReferralRequest::export_all();
        let _ = crate::api::RegisterResponse::export_all();
        let _ = crate::api::ProfileResponse::export_all();
        let _ = crate::api::TapResponse::export_all();
        let _ = crate::api::PurchaseResponse::export_all();
        let _ = crate::api::UpgradeResponse::export_all();
        let _ = crate::api::CollectResponse::export_all();
        let _ = crate::api::LeaderboardEntry::export_all();
        let _ = crate::api::ReferralResponse::export_all();
    }
}
