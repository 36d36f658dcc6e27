//! Data layer for the Idlemint backend.
//!
//! `PostgreSQL` is the system of record ([`PgEconomyStore`] implements the
//! engine's storage contract); Redis carries the read-path snapshot cache
//! ([`RedisCache`]). Both backends are optional at runtime -- the engine's
//! in-memory implementations cover development and tests -- and this crate
//! is only linked when a deployment selects them.

mod cache;
mod error;
mod player_store;
mod postgres;

pub use cache::RedisCache;
pub use error::DbError;
pub use player_store::PgEconomyStore;
pub use postgres::PostgresPool;
