//! # domains
//!
//! The entities, invariants and port definitions of Rusty-Social.
//! Nothing in this crate performs I/O; adapters implement the ports and
//! services orchestrate them.

pub mod errors;
pub mod ids;
pub mod models;
pub mod pagination;
pub mod ports;

// Re-exporting for easier access in other crates
pub use errors::*;
pub use ids::*;
pub use models::*;
pub use pagination::*;
pub use ports::*;
