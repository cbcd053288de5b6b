//! Request and response bodies for the HTTP API.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core_state::CoreState;
use crate::models::PatientRecord;
use crate::pipeline::rag::types::EvidenceItem;

/// Shared context for all API routes.
#[derive(Clone)]
pub struct ApiContext {
    pub core: Arc<CoreState>,
}

impl ApiContext {
    pub fn new(core: Arc<CoreState>) -> Self {
        Self { core }
    }
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    /// Empty or missing starts a new session.
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub patient_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
    /// `receptionist` or `clinical`.
    pub agent: &'static str,
    pub handoff: bool,
    pub session_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patient_data: Option<PatientRecord>,
    /// Distinct evidence labels, in evidence order.
    pub sources: Vec<String>,
    pub evidence: Vec<EvidenceItem>,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub patient_count: usize,
    pub knowledge_chunk_count: usize,
    pub active_session_count: usize,
    pub knowledge_available: bool,
}
