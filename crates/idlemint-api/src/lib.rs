//! HTTP API layer for the Idlemint backend.
//!
//! Frames the engine's operations over REST routes. The router and state
//! are generic over the engine's storage and cache backends, so one
//! handler set serves both the in-memory development stack and the
//! Postgres-plus-Redis deployment.

pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod state;

pub use error::ApiError;
pub use router::build_router;
pub use server::{start_server, ServerError};
pub use state::AppState;
