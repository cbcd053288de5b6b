pub mod types;
pub mod gateway;
pub mod retrieval;

use thiserror::Error;

/// External search failures. Absorbed by the retrieval service, which then
/// answers from the knowledge base alone.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("HTTP client setup failed: {0}")]
    Client(String),

    #[error("Search service unreachable: {0}")]
    Connection(String),

    #[error("Search request timed out")]
    Timeout,

    #[error("Search service returned {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Search response parsing error: {0}")]
    ResponseParsing(String),
}
