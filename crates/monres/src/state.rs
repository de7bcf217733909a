use anyhow::{Context, Result};
use monres_common::types::ActiveAlerts;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// JSON file holding the names of active alerts between runs.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the persisted map. A missing or unreadable file yields an empty
    /// map; only the latter is logged.
    pub fn load(&self) -> ActiveAlerts {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "No state file, starting clean");
                return ActiveAlerts::new();
            }
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to read state file");
                return ActiveAlerts::new();
            }
        };

        match serde_json::from_str::<ActiveAlerts>(&content) {
            Ok(state) => {
                tracing::info!(
                    path = %self.path.display(),
                    active = state.values().filter(|a| **a).count(),
                    "Loaded alert state"
                );
                state
            }
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "State file is corrupt, ignoring");
                ActiveAlerts::new()
            }
        }
    }

    /// Writes `state` to a sibling temp file, then renames it into place.
    pub fn save(&self, state: &ActiveAlerts) -> Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("failed to create state directory {}", dir.display()))?;
        }

        let json = serde_json::to_string_pretty(state).context("failed to serialize alert state")?;
        let tmp = self.tmp_path();
        std::fs::write(&tmp, json)
            .with_context(|| format!("failed to write {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("failed to move state into {}", self.path.display()))?;

        tracing::debug!(path = %self.path.display(), active = state.len(), "Saved alert state");
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "state.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}
