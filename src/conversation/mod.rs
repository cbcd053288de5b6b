pub mod classify;
pub mod names;
pub mod session;
pub mod types;
pub mod orchestrator;

use thiserror::Error;

/// The only failures a turn reports. Unknown patients and empty evidence are
/// ordinary decisions, not errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RoutingError {
    #[error("Malformed message: {0}")]
    MalformedInput(String),

    #[error("Clinical knowledge is unavailable; only patient identification is being served")]
    KnowledgeUnavailable,
}
