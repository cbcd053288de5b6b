//! Retrieval Service: knowledge-base search plus optional web evidence.
//!
//! Knowledge-base items always come first. Web items are scored strictly
//! below the weakest knowledge-base item so the combined list stays sorted.
//! The web step never fails the query: an unconfigured, failing or slow
//! gateway just contributes nothing.

use std::sync::Arc;
use std::time::Duration;

use super::gateway::EvidenceGateway;
use super::types::{EvidenceItem, WebResult};
use crate::models::EvidenceSource;
use crate::pipeline::storage::vectordb::{KnowledgeIndex, ScoredChunk};

/// Appended to the patient's question for the web query.
pub const WEB_QUERY_QUALIFIER: &str = "nephrology clinical guidelines";
/// Web snippets are cut to this many chars.
pub const WEB_SNIPPET_CHARS: usize = 500;

pub struct RetrievalService {
    index: Arc<KnowledgeIndex>,
    gateway: Option<Arc<dyn EvidenceGateway>>,
    top_k: usize,
    web_results: usize,
    gateway_timeout: Duration,
}

impl RetrievalService {
    pub fn new(index: Arc<KnowledgeIndex>, top_k: usize) -> Self {
        Self {
            index,
            gateway: None,
            top_k,
            web_results: 0,
            gateway_timeout: Duration::from_secs(5),
        }
    }

    pub fn with_gateway(
        mut self,
        gateway: Arc<dyn EvidenceGateway>,
        web_results: usize,
        timeout: Duration,
    ) -> Self {
        self.gateway = Some(gateway);
        self.web_results = web_results;
        self.gateway_timeout = timeout;
        self
    }

    /// Largest evidence list `retrieve` can return.
    pub fn max_items(&self) -> usize {
        self.top_k
    }

    pub fn index(&self) -> &KnowledgeIndex {
        &self.index
    }

    /// Ranked evidence for `query`, at most `top_k` items. Knowledge-base
    /// items come first; web items only fill the slots the knowledge base
    /// left open, up to `web_results` of them.
    pub async fn retrieve(&self, query: &str) -> Vec<EvidenceItem> {
        let mut evidence = self.knowledge_evidence(query);
        let open_slots = self.top_k.saturating_sub(evidence.len()).min(self.web_results);

        if let Some(gateway) = &self.gateway {
            if open_slots > 0 {
                let floor = evidence.last().map(|e| e.score).unwrap_or(1.0);
                let hits = self.web_search(gateway.as_ref(), query, open_slots).await;
                evidence.extend(web_evidence(hits, floor));
                evidence.truncate(self.top_k);
            } else {
                tracing::debug!("Knowledge base filled every slot, skipping web search");
            }
        }

        tracing::debug!(
            results = evidence.len(),
            web = evidence.iter().filter(|e| e.source == EvidenceSource::Web).count(),
            "Retrieval complete"
        );
        evidence
    }

    /// Knowledge-base portion only. Never touches the gateway. Chunks with no
    /// similarity to the query are dropped.
    pub fn knowledge_evidence(&self, query: &str) -> Vec<EvidenceItem> {
        match self.index.search(query, self.top_k) {
            Ok(hits) => hits
                .into_iter()
                .filter(|hit| hit.score > 0.0)
                .map(knowledge_item)
                .collect(),
            Err(e) => {
                tracing::error!(error = %e, "Knowledge search failed");
                Vec::new()
            }
        }
    }

    async fn web_search(
        &self,
        gateway: &dyn EvidenceGateway,
        query: &str,
        max_results: usize,
    ) -> Vec<WebResult> {
        let web_query = format!("{} {}", query.trim(), WEB_QUERY_QUALIFIER);

        // Dropping the future on timeout cancels the in-flight request
        match tokio::time::timeout(self.gateway_timeout, gateway.search(&web_query, max_results)).await {
            Ok(Ok(hits)) => {
                tracing::info!(gateway = gateway.name(), results = hits.len(), "Web search succeeded");
                hits.into_iter().take(max_results).collect()
            }
            Ok(Err(e)) => {
                tracing::warn!(gateway = gateway.name(), error = %e, "Web search failed, continuing without it");
                Vec::new()
            }
            Err(_) => {
                tracing::warn!(
                    gateway = gateway.name(),
                    timeout_ms = self.gateway_timeout.as_millis() as u64,
                    "Web search timed out, continuing without it"
                );
                Vec::new()
            }
        }
    }
}

fn knowledge_item(hit: ScoredChunk) -> EvidenceItem {
    let label = match hit.chunk.unit {
        Some(page) => format!("{} (p. {page})", hit.chunk.source),
        None => hit.chunk.source,
    };
    EvidenceItem {
        text: hit.chunk.text,
        source: EvidenceSource::KnowledgeBase,
        label,
        score: hit.score,
        url: None,
    }
}

/// Item `i` scores `floor * 0.5^(i+1)`, strictly below `floor` and strictly
/// decreasing. Knowledge items never score 0, so `floor` is positive.
fn web_evidence(hits: Vec<WebResult>, floor: f32) -> Vec<EvidenceItem> {
    let floor = floor.max(f32::MIN_POSITIVE);
    hits.into_iter()
        .filter(|hit| !hit.content.trim().is_empty())
        .enumerate()
        .map(|(i, hit)| EvidenceItem {
            text: hit.content.chars().take(WEB_SNIPPET_CHARS).collect(),
            source: EvidenceSource::Web,
            label: if hit.title.is_empty() { hit.url.clone() } else { hit.title },
            score: floor * 0.5f32.powi(i as i32 + 1),
            url: Some(hit.url),
        })
        .collect()
}
