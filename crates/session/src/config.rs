use serde::{Deserialize, Serialize};
use stepsheet_engine::EngineConfig;

use crate::error::SessionError;

/// Rows of each table sent to the frontend.
pub const DEFAULT_MAX_ROWS: usize = 1500;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub max_rows: usize,
    /// Prepended to the analysis id to form the analysis name.
    pub analysis_name_prefix: String,
    pub engine: EngineConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_rows: DEFAULT_MAX_ROWS,
            analysis_name_prefix: "UUID-".into(),
            engine: EngineConfig::default(),
        }
    }
}

impl SessionConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, SessionError> {
        Ok(toml::from_str(raw)?)
    }
}
