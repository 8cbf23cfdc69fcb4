//! Session storage configuration from TOML (`[storage]` section)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileStorageConfig {
    /// Persist session events and reports
    pub enabled: bool,
    /// Directory for `<id>.events.jsonl` / `<id>.report.json`
    pub directory: Option<PathBuf>,
}

impl Default for FileStorageConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            directory: None,
        }
    }
}

impl FileStorageConfig {
    /// Configured directory, or `$XDG_DATA_HOME/mdt-consult/sessions`.
    pub fn resolve_directory(&self) -> Option<PathBuf> {
        self.directory
            .clone()
            .or_else(|| dirs::data_dir().map(|d| d.join("mdt-consult").join("sessions")))
    }
}
