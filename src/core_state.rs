//! Application state shared by every HTTP handler.
//!
//! `CoreState::initialize` wires the directory, corpus, knowledge index,
//! evidence gateway and reply generator from `Settings`. A knowledge index
//! that cannot be built does not stop startup: the orchestrator then serves
//! identification only.

use std::sync::Arc;

use serde::Serialize;

use crate::config::{Settings, SettingsError};
use crate::conversation::orchestrator::Orchestrator;
use crate::directory::{DirectoryError, PatientDirectory};
use crate::generation::ollama::OllamaGenerator;
use crate::generation::{GenerationError, ReplyGenerator};
use crate::models::CorpusOrigin;
use crate::pipeline::rag::gateway::{EvidenceGateway, TavilyGateway};
use crate::pipeline::rag::retrieval::RetrievalService;
use crate::pipeline::rag::GatewayError;
use crate::pipeline::storage::chunker::SlidingWindowChunker;
use crate::pipeline::storage::embedder::HashingEmbedder;
use crate::pipeline::storage::types::EmbeddingModel;
use crate::pipeline::storage::{corpus, persist};

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("Invalid settings: {0}")]
    Settings(#[from] SettingsError),
    #[error("Cannot create data directory: {0}")]
    DataDir(#[from] std::io::Error),
    #[error("Patient directory unavailable: {0}")]
    Directory(#[from] DirectoryError),
    #[error("Evidence gateway setup failed: {0}")]
    Gateway(#[from] GatewayError),
    #[error("Reply generator setup failed: {0}")]
    Generator(#[from] GenerationError),
}

/// Read-only counters for `GET /api/status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusSnapshot {
    pub patient_count: usize,
    pub knowledge_chunk_count: usize,
    pub active_session_count: usize,
    pub knowledge_available: bool,
}

pub struct CoreState {
    pub settings: Settings,
    pub orchestrator: Arc<Orchestrator>,
    /// `None` means canned replies.
    pub generator: Option<Arc<dyn ReplyGenerator>>,
    /// `None` when the knowledge index could not be built.
    pub corpus_origin: Option<CorpusOrigin>,
}

impl CoreState {
    pub fn initialize(settings: Settings) -> Result<Self, StartupError> {
        settings.validate()?;
        std::fs::create_dir_all(&settings.data_dir)?;

        let directory = Arc::new(PatientDirectory::load_or_seed(
            &settings.patient_store_path(),
        )?);

        let (retrieval, corpus_origin) = match build_retrieval(&settings)? {
            Some((service, origin)) => (Some(Arc::new(service)), Some(origin)),
            None => (None, None),
        };

        let generator: Option<Arc<dyn ReplyGenerator>> = match &settings.ollama_url {
            Some(url) => Some(Arc::new(OllamaGenerator::new(
                url,
                &settings.model,
                settings.generation_timeout_secs,
            )?)),
            None => None,
        };

        let orchestrator = Arc::new(Orchestrator::new(
            directory,
            retrieval,
            settings.max_message_chars,
        ));

        let state = Self {
            settings,
            orchestrator,
            generator,
            corpus_origin,
        };
        let status = state.get_status();
        tracing::info!(
            patients = status.patient_count,
            chunks = status.knowledge_chunk_count,
            knowledge_available = status.knowledge_available,
            corpus = state.corpus_origin.map(|o| o.as_str()).unwrap_or("none"),
            web_search = state.settings.tavily_api_key.is_some(),
            generator = state.generator.as_ref().map(|g| g.name()).unwrap_or("canned"),
            "Postcare core initialized"
        );
        Ok(state)
    }

    pub fn get_status(&self) -> StatusSnapshot {
        StatusSnapshot {
            patient_count: self.orchestrator.directory().len(),
            knowledge_chunk_count: self
                .orchestrator
                .retrieval()
                .map(|r| r.index().len())
                .unwrap_or(0),
            active_session_count: self.orchestrator.active_sessions(),
            knowledge_available: self.orchestrator.knowledge_available(),
        }
    }

    pub fn generator(&self) -> Option<&dyn ReplyGenerator> {
        self.generator.as_deref()
    }
}

/// Corpus → index → retrieval service. Index failure is logged and yields
/// `Ok(None)`; only a broken gateway configuration is an error.
fn build_retrieval(
    settings: &Settings,
) -> Result<Option<(RetrievalService, CorpusOrigin)>, StartupError> {
    let chunker = SlidingWindowChunker::new(settings.chunk_size, settings.chunk_overlap);
    let corpus = corpus::load(&settings.source_document, &chunker);
    let origin = corpus.origin;

    let loaded = match persist::load_or_build(
        &settings.index_path(),
        corpus,
        settings.chunk_size,
        settings.chunk_overlap,
        select_embedder(settings),
    ) {
        Ok(loaded) => loaded,
        Err(e) => {
            tracing::error!(error = %e, "Knowledge index unavailable, serving identification only");
            return Ok(None);
        }
    };

    let mut service = RetrievalService::new(Arc::new(loaded.index), settings.top_k);
    if let Some(key) = &settings.tavily_api_key {
        let gateway: Arc<dyn EvidenceGateway> =
            Arc::new(TavilyGateway::new(key.clone(), settings.gateway_timeout())?);
        service = service.with_gateway(gateway, settings.web_results, settings.gateway_timeout());
    }
    Ok(Some((service, origin)))
}

#[cfg(not(feature = "onnx-embeddings"))]
fn select_embedder(_settings: &Settings) -> Arc<dyn EmbeddingModel> {
    Arc::new(HashingEmbedder::new())
}

/// ONNX model when `<data_dir>/models/all-MiniLM-L6-v2` loads, hashing otherwise.
#[cfg(feature = "onnx-embeddings")]
fn select_embedder(settings: &Settings) -> Arc<dyn EmbeddingModel> {
    use crate::pipeline::storage::embedder::OnnxEmbedder;

    let model_dir = settings.data_dir.join("models").join("all-MiniLM-L6-v2");
    match OnnxEmbedder::load(&model_dir) {
        Ok(embedder) => Arc::new(embedder),
        Err(e) => {
            tracing::warn!(path = %model_dir.display(), error = %e, "ONNX model unavailable, using hashing embedder");
            Arc::new(HashingEmbedder::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_settings(dir: &std::path::Path) -> Settings {
        Settings {
            data_dir: dir.to_path_buf(),
            source_document: dir.join("missing.pdf"),
            ..Settings::default()
        }
    }

    #[test]
    fn initializes_with_seed_patients_and_fallback_corpus() {
        let tmp = tempfile::tempdir().unwrap();
        let state = CoreState::initialize(test_settings(tmp.path())).unwrap();

        let status = state.get_status();
        assert_eq!(status.patient_count, 8);
        assert!(status.knowledge_chunk_count > 0);
        assert_eq!(status.active_session_count, 0);
        assert!(status.knowledge_available);
        assert_eq!(state.corpus_origin, Some(CorpusOrigin::Fallback));
        assert!(state.generator().is_none());

        assert!(tmp.path().join("patient_reports.json").exists());
        assert!(tmp.path().join("knowledge_index.json").exists());
    }

    #[test]
    fn text_source_document_is_indexed() {
        let tmp = tempfile::tempdir().unwrap();
        let doc = tmp.path().join("nephrology.txt");
        std::fs::write(&doc, "Dialysis removes waste.\x0cPotassium binders lower potassium.").unwrap();
        let settings = Settings {
            source_document: doc,
            ..test_settings(tmp.path())
        };

        let state = CoreState::initialize(settings).unwrap();
        assert_eq!(state.corpus_origin, Some(CorpusOrigin::Document));
        assert_eq!(state.get_status().knowledge_chunk_count, 2);
    }

    #[test]
    fn second_start_reuses_stores() {
        let tmp = tempfile::tempdir().unwrap();
        let first = CoreState::initialize(test_settings(tmp.path())).unwrap();
        let second = CoreState::initialize(test_settings(tmp.path())).unwrap();
        assert_eq!(first.get_status(), second.get_status());
    }

    #[test]
    fn invalid_settings_are_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let settings = Settings {
            chunk_overlap: 1000,
            ..test_settings(tmp.path())
        };
        assert!(matches!(
            CoreState::initialize(settings),
            Err(StartupError::Settings(_))
        ));
    }

    #[test]
    fn configured_services_are_wired() {
        let tmp = tempfile::tempdir().unwrap();
        let settings = Settings {
            tavily_api_key: Some("tvly-test".into()),
            ollama_url: Some("http://127.0.0.1:11434".into()),
            ..test_settings(tmp.path())
        };
        let state = CoreState::initialize(settings).unwrap();
        assert_eq!(state.generator().map(|g| g.name()), Some("ollama"));
        assert!(state.get_status().knowledge_available);
    }

    #[tokio::test]
    async fn sessions_show_up_in_status() {
        let tmp = tempfile::tempdir().unwrap();
        let state = CoreState::initialize(test_settings(tmp.path())).unwrap();
        state
            .orchestrator
            .submit_message("s1", "Hello", None)
            .await
            .unwrap();
        assert_eq!(state.get_status().active_session_count, 1);
    }
}
