use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Application-level constants
pub const APP_NAME: &str = "Postcare";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default tracing filter when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "info,postcare_lib=debug,tower_http=info"
}

/// Get the application data directory.
/// ~/Postcare/ on all platforms; falls back to `./data` when no home dir exists.
pub fn app_data_dir() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(APP_NAME))
        .unwrap_or_else(|| PathBuf::from("./data"))
}

/// Runtime settings for every component.
///
/// Defaults mirror the values the assistant has always shipped with
/// (1000-char chunks, 200-char overlap, 3 knowledge results).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub data_dir: PathBuf,
    /// Clinical reference document (PDF or plain text).
    pub source_document: PathBuf,
    pub patient_store_file: String,
    pub index_file: String,

    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub top_k: usize,
    pub web_results: usize,
    pub gateway_timeout_secs: u64,
    pub max_message_chars: usize,

    /// Tavily key; `None` disables the web evidence step.
    #[serde(skip_serializing)]
    pub tavily_api_key: Option<String>,
    /// Ollama base URL for the reply generator; `None` uses canned replies.
    pub ollama_url: Option<String>,
    pub model: String,
    pub generation_timeout_secs: u64,

    pub host: String,
    pub port: u16,
}

impl Default for Settings {
    fn default() -> Self {
        let data_dir = app_data_dir();
        Self {
            source_document: data_dir.join("comprehensive-clinical-nephrology.pdf"),
            data_dir,
            patient_store_file: "patient_reports.json".into(),
            index_file: "knowledge_index.json".into(),
            chunk_size: 1000,
            chunk_overlap: 200,
            top_k: 3,
            web_results: 3,
            gateway_timeout_secs: 5,
            max_message_chars: 2000,
            tavily_api_key: None,
            ollama_url: None,
            model: "llama3.1".into(),
            generation_timeout_secs: 120,
            host: "0.0.0.0".into(),
            port: 8000,
        }
    }
}

/// Invalid combination of settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Chunk overlap ({overlap}) must be smaller than chunk size ({size})")]
    OverlapTooLarge { size: usize, overlap: usize },
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

impl Settings {
    /// Defaults overlaid with `POSTCARE_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Overlay settings from an arbitrary key lookup (env in production, a map in tests).
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Settings::default();

        if let Some(dir) = lookup("POSTCARE_DATA_DIR") {
            let dir = PathBuf::from(dir);
            settings.source_document = dir.join("comprehensive-clinical-nephrology.pdf");
            settings.data_dir = dir;
        }
        if let Some(doc) = lookup("POSTCARE_SOURCE_DOCUMENT") {
            settings.source_document = PathBuf::from(doc);
        }

        overlay_number(&lookup, "POSTCARE_CHUNK_SIZE", &mut settings.chunk_size);
        overlay_number(&lookup, "POSTCARE_CHUNK_OVERLAP", &mut settings.chunk_overlap);
        overlay_number(&lookup, "POSTCARE_TOP_K", &mut settings.top_k);
        overlay_number(&lookup, "POSTCARE_WEB_RESULTS", &mut settings.web_results);
        overlay_number(
            &lookup,
            "POSTCARE_GATEWAY_TIMEOUT_SECS",
            &mut settings.gateway_timeout_secs,
        );
        overlay_number(
            &lookup,
            "POSTCARE_MAX_MESSAGE_CHARS",
            &mut settings.max_message_chars,
        );
        overlay_number(
            &lookup,
            "POSTCARE_GENERATION_TIMEOUT_SECS",
            &mut settings.generation_timeout_secs,
        );
        overlay_number(&lookup, "POSTCARE_PORT", &mut settings.port);

        if let Some(host) = lookup("POSTCARE_HOST") {
            settings.host = host;
        }
        settings.tavily_api_key = lookup("TAVILY_API_KEY").filter(|k| !k.trim().is_empty());
        settings.ollama_url = lookup("POSTCARE_OLLAMA_URL").filter(|u| !u.trim().is_empty());
        if let Some(model) = lookup("POSTCARE_MODEL") {
            settings.model = model;
        }

        settings
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.chunk_size == 0 {
            return Err(SettingsError::Zero("chunk_size"));
        }
        if self.top_k == 0 {
            return Err(SettingsError::Zero("top_k"));
        }
        if self.max_message_chars == 0 {
            return Err(SettingsError::Zero("max_message_chars"));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(SettingsError::OverlapTooLarge {
                size: self.chunk_size,
                overlap: self.chunk_overlap,
            });
        }
        Ok(())
    }

    pub fn patient_store_path(&self) -> PathBuf {
        self.data_dir.join(&self.patient_store_file)
    }

    pub fn index_path(&self) -> PathBuf {
        self.data_dir.join(&self.index_file)
    }

    pub fn gateway_timeout(&self) -> Duration {
        Duration::from_secs(self.gateway_timeout_secs)
    }
}

fn overlay_number<F, T>(lookup: &F, key: &str, slot: &mut T)
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    if let Some(raw) = lookup(key) {
        match raw.trim().parse::<T>() {
            Ok(value) => *slot = value,
            Err(_) => tracing::warn!(key, value = %raw, "Ignoring unparseable setting"),
        }
    }
}
