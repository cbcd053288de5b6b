//! JSON document store for discharge reports.
//!
//! The file is a JSON array of records. Writes go to a temp file in the same
//! directory and are renamed over the target, so a crash never leaves a
//! half-written store behind.

use std::io::Write;
use std::path::Path;

use super::DirectoryError;
use crate::models::PatientRecord;

/// Read every record from `path`.
pub fn load_records(path: &Path) -> Result<Vec<PatientRecord>, DirectoryError> {
    let data = std::fs::read_to_string(path)?;
    let records: Vec<PatientRecord> = serde_json::from_str(&data)?;
    Ok(records)
}

/// Atomically replace the store at `path` with `records`.
pub fn save_records(path: &Path, records: &[PatientRecord]) -> Result<(), DirectoryError> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)?;

    let json = serde_json::to_vec_pretty(records)?;
    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    tmp.write_all(&json)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| DirectoryError::Io(e.error))?;
    Ok(())
}
