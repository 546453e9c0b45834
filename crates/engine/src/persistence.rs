//! File persistence: atomic JSON documents and the append-only journal.
//!
//! Every write here is best-effort from the engine's point of view: a
//! failure is logged and in-memory state keeps operating un-persisted.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use strike_core::{EngineError, PersistenceConfig, TradeRecord};
use tracing::{error, info, warn};

/// Resolved file paths for the three persisted artifacts.
#[derive(Debug, Clone)]
pub struct Persistence {
    iv_checkpoint: PathBuf,
    positions: PathBuf,
    journal: PathBuf,
}

impl Persistence {
    #[must_use]
    pub fn new(config: &PersistenceConfig) -> Self {
        let dir = PathBuf::from(&config.data_dir);
        Self {
            iv_checkpoint: dir.join(&config.iv_checkpoint_file),
            positions: dir.join(&config.positions_file),
            journal: dir.join(&config.journal_file),
        }
    }

    /// Saves the IV-history checkpoint; logs and continues on failure.
    pub fn save_iv_checkpoint<T: Serialize>(&self, state: &T) {
        if let Err(e) = write_json_atomic(&self.iv_checkpoint, state) {
            error!(path = %self.iv_checkpoint.display(), error = %e, "IV checkpoint not saved");
        }
    }

    #[must_use]
    pub fn load_iv_checkpoint<T: DeserializeOwned>(&self) -> Option<T> {
        load_json(&self.iv_checkpoint)
    }

    /// Saves the open-positions snapshot; logs and continues on failure.
    pub fn save_positions<T: Serialize>(&self, positions: &T) {
        if let Err(e) = write_json_atomic(&self.positions, positions) {
            error!(path = %self.positions.display(), error = %e, "positions snapshot not saved");
        }
    }

    #[must_use]
    pub fn load_positions<T: DeserializeOwned>(&self) -> Option<T> {
        load_json(&self.positions)
    }

    /// Appends one closed trade to the JSONL journal.
    pub fn append_trade(&self, record: &TradeRecord) {
        if let Err(e) = append_jsonl(&self.journal, record) {
            error!(path = %self.journal.display(), error = %e, "trade record not journaled");
        } else {
            info!(position = %record.position_id, "trade journaled");
        }
    }

    /// Recently journaled trades, newest last. Empty on any read problem.
    #[must_use]
    pub fn recent_trades(&self, limit: usize) -> Vec<TradeRecord> {
        let Ok(contents) = fs::read_to_string(&self.journal) else {
            return Vec::new();
        };
        let records: Vec<TradeRecord> = contents
            .lines()
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect();
        let skip = records.len().saturating_sub(limit);
        records.into_iter().skip(skip).collect()
    }
}

fn persistence_error(path: &Path, source: std::io::Error) -> EngineError {
    EngineError::Persistence {
        path: path.display().to_string(),
        source,
    }
}

/// Serializes to a sibling temp file, then renames over the target so a
/// crash mid-write never leaves a torn document.
fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), EngineError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| persistence_error(path, e))?;
    }
    let tmp = path.with_extension("tmp");
    let json = serde_json::to_vec_pretty(value)
        .map_err(|e| persistence_error(path, std::io::Error::from(e)))?;
    {
        let mut file = fs::File::create(&tmp).map_err(|e| persistence_error(&tmp, e))?;
        file.write_all(&json).map_err(|e| persistence_error(&tmp, e))?;
        file.sync_all().map_err(|e| persistence_error(&tmp, e))?;
    }
    fs::rename(&tmp, path).map_err(|e| persistence_error(path, e))?;
    Ok(())
}

fn load_json<T: DeserializeOwned>(path: &Path) -> Option<T> {
    let contents = fs::read_to_string(path).ok()?;
    match serde_json::from_str(&contents) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "persisted state unreadable; starting cold");
            None
        }
    }
}

fn append_jsonl<T: Serialize>(path: &Path, value: &T) -> Result<(), EngineError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| persistence_error(path, e))?;
    }
    let mut line = serde_json::to_string(value)
        .map_err(|e| persistence_error(path, std::io::Error::from(e)))?;
    line.push('\n');
    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| persistence_error(path, e))?;
    file.write_all(line.as_bytes())
        .map_err(|e| persistence_error(path, e))?;
    Ok(())
}
