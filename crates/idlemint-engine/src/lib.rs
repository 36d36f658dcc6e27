//! Core economy engine for the Idlemint backend.
//!
//! This crate holds the game rules and their orchestration, independent of
//! any transport or concrete storage:
//!
//! - [`catalog`]: the business catalog and the upgrade cost curve
//! - [`portfolio`]: purchase/upgrade/collect transitions
//! - [`limiter`]: daily action limits and the ban hook
//! - [`referral`]: referral code generation and validation
//! - [`store`]: the [`EconomyStore`] persistence seam plus the in-memory
//!   backend
//! - [`cache`]: the [`SnapshotCache`] read-path seam plus in-memory and
//!   no-op backends
//! - [`engine`]: [`EconomyEngine`], which ties it all together
//! - [`config`]: typed YAML configuration
//! - [`clock`]: the time source seam, so day boundaries are testable
//!
//! [`EconomyStore`]: store::EconomyStore
//! [`SnapshotCache`]: cache::SnapshotCache
//! [`EconomyEngine`]: engine::EconomyEngine

pub mod cache;
pub mod catalog;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod limiter;
pub mod portfolio;
pub mod referral;
pub mod store;

pub use cache::{InMemoryCache, NoopCache, SnapshotCache};
pub use catalog::BusinessCatalog;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::AppConfig;
pub use engine::EconomyEngine;
pub use error::{EngineError, ErrorKind};
pub use limiter::{BanHook, DailyLimits};
pub use store::{EconomyStore, InMemoryStore, StoreError, Versioned};
