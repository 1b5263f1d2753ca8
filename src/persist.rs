//! Durable storage for learned policy state.
//!
//! A single JSON record at a fixed path holds the iteration counter and the
//! policy's opaque blob, so a restored session resumes its counting scheme.
//! The record is read once at startup and rewritten on the save cadence.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// What gets persisted: the session's iteration counter plus whatever the
/// policy produced from `snapshot`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedPolicy {
    pub iterations: u64,
    pub blob: Vec<u8>,
}

/// File-backed store for a [`SavedPolicy`] record.
pub struct PolicyStore {
    path: PathBuf,
}

impl PolicyStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the record. A missing file is not an error, just "no prior
    /// state"; a present-but-malformed file is reported to the caller.
    pub fn load(&self) -> Result<Option<SavedPolicy>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let text = fs::read_to_string(&self.path)
            .with_context(|| format!("read saved policy from {:?}", self.path))?;
        let saved = serde_json::from_str(&text)
            .with_context(|| format!("parse saved policy in {:?}", self.path))?;
        Ok(Some(saved))
    }

    pub fn save(&self, saved: &SavedPolicy) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("create directory {parent:?}"))?;
            }
        }
        let text = serde_json::to_string(saved).context("serialize saved policy")?;
        fs::write(&self.path, text)
            .with_context(|| format!("write saved policy to {:?}", self.path))?;
        Ok(())
    }
}
