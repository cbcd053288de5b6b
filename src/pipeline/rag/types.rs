use serde::{Deserialize, Serialize};

use crate::models::EvidenceSource;

/// One ranked passage handed to the clinical role. Built fresh per query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceItem {
    pub text: String,
    pub source: EvidenceSource,
    /// Human-readable origin: document and page, or the web page title.
    pub label: String,
    pub score: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// A raw hit from the external search service.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WebResult {
    #[serde(default)]
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub content: String,
}
