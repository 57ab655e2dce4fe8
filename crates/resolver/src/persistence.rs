//! Disk persistence for the corp-code master list (spec.md §4.8/§6:
//! `corp-codes.json`, "array of Corp Mapping").
//!
//! Downloading and unzipping the DART bulk master list is a filings-API
//! concern and lives in `krfin-dart`; this module only owns the
//! plain-JSON read/write once that crate has produced a `Vec<CorpMapping>`.

use std::path::Path;

use thiserror::Error;

use crate::mapping::CorpMapping;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("failed to read corp-codes file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse corp-codes file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Reads the cached corp-code master list from `path`.
pub fn load_from_cache(path: impl AsRef<Path>) -> Result<Vec<CorpMapping>, PersistenceError> {
    let bytes = std::fs::read(path)?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Writes `mappings` to `path` as a JSON array, creating parent
/// directories if needed.
pub fn save(path: impl AsRef<Path>, mappings: &[CorpMapping]) -> Result<(), PersistenceError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let bytes = serde_json::to_vec_pretty(mappings)?;
    std::fs::write(path, bytes)?;
    Ok(())
}
