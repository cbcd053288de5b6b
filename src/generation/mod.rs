//! Reply generation for a routed turn.
//!
//! The orchestrator decides role, patient and evidence; this module turns a
//! decision into text, through a language model when one is configured and
//! through canned replies otherwise.

pub mod prompt;
pub mod ollama;
pub mod fallback;

use std::sync::Mutex;

use async_trait::async_trait;
use thiserror::Error;

use crate::conversation::session::HistoryEntry;
use crate::conversation::types::RoutingDecision;

#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("Language model unreachable at {0}")]
    Connection(String),

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Language model returned {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("Response parsing error: {0}")]
    ResponseParsing(String),

    #[error("Language model returned an empty reply")]
    EmptyResponse,
}

/// Text generation backend.
#[async_trait]
pub trait ReplyGenerator: Send + Sync {
    async fn generate(&self, system: &str, prompt: &str) -> Result<String, GenerationError>;

    fn name(&self) -> &str;
}

/// Reply for `decision`. Falls back to the canned reply when no generator is
/// configured or the generator fails.
pub async fn generate_reply(
    generator: Option<&dyn ReplyGenerator>,
    decision: &RoutingDecision,
    message: &str,
    history: &[HistoryEntry],
) -> String {
    let Some(generator) = generator else {
        return fallback::fallback_reply(decision);
    };

    let system = prompt::system_prompt(decision.role);
    let user_prompt = prompt::build_prompt(decision, message, history);
    match generator.generate(system, &user_prompt).await {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!(
                generator = generator.name(),
                session_id = %decision.session_id,
                error = %e,
                "Generation failed, using canned reply"
            );
            fallback::fallback_reply(decision)
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Mock generator for tests
// ═══════════════════════════════════════════════════════════

/// Returns a fixed reply (or fails) and remembers the last prompt pair.
pub struct MockGenerator {
    reply: Option<String>,
    last: Mutex<Option<(String, String)>>,
}

impl MockGenerator {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: Some(reply.to_string()),
            last: Mutex::new(None),
        }
    }

    pub fn failing() -> Self {
        Self {
            reply: None,
            last: Mutex::new(None),
        }
    }

    /// `(system, prompt)` from the most recent call.
    pub fn last_call(&self) -> Option<(String, String)> {
        self.last.lock().ok().and_then(|l| l.clone())
    }
}

#[async_trait]
impl ReplyGenerator for MockGenerator {
    async fn generate(&self, system: &str, prompt: &str) -> Result<String, GenerationError> {
        if let Ok(mut last) = self.last.lock() {
            *last = Some((system.to_string(), prompt.to_string()));
        }
        self.reply
            .clone()
            .ok_or_else(|| GenerationError::Connection("mock".into()))
    }

    fn name(&self) -> &str {
        "mock"
    }
}
