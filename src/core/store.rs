/// Persistence seam for finished matches
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::core::controller::MatchState;

/// Injected into the engine; called once per finished match
pub trait MatchStore: Send + Sync {
    fn save(&self, state: &MatchState) -> Result<()>;

    fn load(&self) -> Result<Option<MatchState>>;
}

/// Keeps nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopStore;

impl MatchStore for NoopStore {
    fn save(&self, _state: &MatchState) -> Result<()> {
        Ok(())
    }

    fn load(&self) -> Result<Option<MatchState>> {
        Ok(None)
    }
}

/// Writes the last finished match to a JSON file
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl MatchStore for JsonFileStore {
    fn save(&self, state: &MatchState) -> Result<()> {
        let json = serde_json::to_string_pretty(state)?;
        std::fs::write(&self.path, json)
            .with_context(|| format!("failed to write {}", self.path.display()))
    }

    fn load(&self) -> Result<Option<MatchState>> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("failed to read {}", self.path.display()))
            }
        };
        let state = serde_json::from_str(&text)
            .with_context(|| format!("{} is not a saved match", self.path.display()))?;
        Ok(Some(state))
    }
}
