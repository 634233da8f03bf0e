use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Entity store
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Directory holding `catalog.json`.
    #[serde(default = "d_state_path")]
    pub state_path: PathBuf,
    /// Write every commit to disk. When `false` the catalog lives in memory
    /// only and is lost on exit.
    #[serde(default = "d_true")]
    pub persist: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            state_path: d_state_path(),
            persist: true,
        }
    }
}

impl StoreConfig {
    pub fn catalog_path(&self) -> PathBuf {
        self.state_path.join("catalog.json")
    }
}

fn d_state_path() -> PathBuf {
    PathBuf::from("./data")
}

fn d_true() -> bool {
    true
}
