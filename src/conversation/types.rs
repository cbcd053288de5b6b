use serde::Serialize;

use crate::models::{ClinicalTopic, PatientRecord, Role};
use crate::pipeline::rag::types::EvidenceItem;

/// A directory lookup made during a turn.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LookupOutcome {
    pub query: String,
    pub found: bool,
}

/// Output of one orchestrator turn.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoutingDecision {
    /// Echo of the session id (generated when the caller sent none).
    pub session_id: String,
    pub role: Role,
    /// Bound patient after the turn.
    pub patient: Option<PatientRecord>,
    /// Knowledge-base items first, then web items. Empty for non-clinical turns.
    pub evidence: Vec<EvidenceItem>,
    /// The resolved role differs from the role at turn start.
    pub handoff: bool,
    pub topics: Vec<ClinicalTopic>,
    pub lookup: Option<LookupOutcome>,
}

impl RoutingDecision {
    pub fn is_clinical(&self) -> bool {
        !self.topics.is_empty()
    }

    /// One-line summary kept in the session transcript.
    pub fn summary(&self) -> String {
        let patient = self
            .patient
            .as_ref()
            .map(|p| p.full_name.as_str())
            .unwrap_or("none");
        format!(
            "role={} handoff={} patient={} evidence={}",
            self.role,
            self.handoff,
            patient,
            self.evidence.len()
        )
    }
}
