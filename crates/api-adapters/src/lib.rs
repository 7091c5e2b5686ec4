//! # api-adapters
//!
//! The HTTP boundary. Authentication happens upstream; this layer only
//! reads the already-authenticated principal, calls the services and maps
//! `DomainError` kinds to status codes with a `{ "message": ... }` body.

pub mod metrics;
pub mod state;

#[cfg(feature = "web-axum")]
pub mod http;

pub use metrics::Metrics;
pub use state::AppState;
