//! Persisted user settings: `<config dir>/portal_patterns/config.json`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub portals_directory: Option<PathBuf>,
}

pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("portal_patterns").join("config.json"))
}

impl Config {
    /// Absent or malformed files give the empty config.
    pub fn load(path: &Path) -> Self {
        let Ok(text) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        match serde_json::from_str(&text) {
            Ok(cfg) => cfg,
            Err(err) => {
                tracing::warn!(file = %path.display(), %err, "ignoring malformed config");
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("creating {}", dir.display()))?;
        }
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text).with_context(|| format!("writing {}", path.display()))
    }

    /// A relative input that does not exist is looked up in `portals_directory`.
    pub fn resolve_input(&self, input: &Path) -> PathBuf {
        if input.is_relative() && !input.exists() {
            if let Some(dir) = &self.portals_directory {
                let candidate = dir.join(input);
                if candidate.exists() {
                    return candidate;
                }
            }
        }
        input.to_path_buf()
    }

    /// Remember the directory of a successfully loaded input. Returns whether it changed.
    pub fn remember_input(&mut self, loaded: &Path) -> bool {
        let Some(dir) = loaded
            .canonicalize()
            .ok()
            .and_then(|p| p.parent().map(Path::to_path_buf))
        else {
            return false;
        };
        if self.portals_directory.as_deref() == Some(dir.as_path()) {
            return false;
        }
        self.portals_directory = Some(dir);
        true
    }
}
