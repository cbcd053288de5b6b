//! HTTP binding for the router core (axum).

pub mod endpoints;
pub mod error;
pub mod router;
pub mod types;

pub use router::build_router;
