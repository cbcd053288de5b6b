//! Patient Directory: discharge reports keyed by full name with tolerant lookup.
//!
//! Records are loaded once at startup and read concurrently. `add` takes the
//! write lock for the duration of the insert and the store rewrite.

pub mod matching;
pub mod seed;
pub mod store;

use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use thiserror::Error;

use crate::models::PatientRecord;
use matching::{find_match, normalize_name};

#[derive(Error, Debug)]
pub enum DirectoryError {
    #[error("Patient store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Patient store is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("A patient named '{0}' already exists")]
    DuplicateName(String),

    #[error("Patient name must not be empty")]
    EmptyName,
}

pub struct PatientDirectory {
    records: RwLock<Vec<PatientRecord>>,
    store_path: Option<PathBuf>,
}

impl PatientDirectory {
    /// In-memory directory with no backing file. Duplicate or empty names
    /// are rejected the same way `add` rejects them.
    pub fn from_records(records: Vec<PatientRecord>) -> Result<Self, DirectoryError> {
        validate_all(&records)?;
        Ok(Self {
            records: RwLock::new(records),
            store_path: None,
        })
    }

    /// Load the store at `path`, writing the demo records there first if the
    /// file does not exist yet.
    pub fn load_or_seed(path: &Path) -> Result<Self, DirectoryError> {
        let records = if path.exists() {
            let records = store::load_records(path)?;
            tracing::info!(path = %path.display(), patients = records.len(), "Patient store loaded");
            records
        } else {
            let records = seed::demo_records();
            store::save_records(path, &records)?;
            tracing::info!(
                path = %path.display(),
                patients = records.len(),
                "Patient store missing, seeded demo records"
            );
            records
        };
        validate_all(&records)?;

        Ok(Self {
            records: RwLock::new(records),
            store_path: Some(path.to_path_buf()),
        })
    }

    /// Tolerant name lookup. `None` means no rule matched; the directory never guesses.
    pub fn find(&self, query: &str) -> Option<PatientRecord> {
        let records = self.records.read().unwrap_or_else(PoisonError::into_inner);
        match find_match(&records, query) {
            Some((pos, kind)) => {
                let record = records[pos].clone();
                tracing::debug!(query, matched = %record.full_name, kind = ?kind, "Patient lookup hit");
                Some(record)
            }
            None => {
                tracing::debug!(query, "Patient lookup miss");
                None
            }
        }
    }

    /// Insert a record and rewrite the backing store. The name must be
    /// non-empty and unique ignoring case.
    pub fn add(&self, record: PatientRecord) -> Result<(), DirectoryError> {
        let key = normalize_name(&record.full_name);
        if key.is_empty() {
            return Err(DirectoryError::EmptyName);
        }

        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);
        if records.iter().any(|r| normalize_name(&r.full_name) == key) {
            return Err(DirectoryError::DuplicateName(record.full_name));
        }

        records.push(record);
        if let Some(path) = &self.store_path {
            if let Err(e) = store::save_records(path, &records) {
                records.pop();
                return Err(e);
            }
        }
        tracing::info!(patients = records.len(), "Patient record added");
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.records.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn validate_all(records: &[PatientRecord]) -> Result<(), DirectoryError> {
    let mut seen = std::collections::HashSet::new();
    for record in records {
        let key = normalize_name(&record.full_name);
        if key.is_empty() {
            return Err(DirectoryError::EmptyName);
        }
        if !seen.insert(key) {
            return Err(DirectoryError::DuplicateName(record.full_name.clone()));
        }
    }
    Ok(())
}
