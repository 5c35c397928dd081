use serde::{Deserialize, Serialize};

/// Knobs for [`crate::StepsManager`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Re-run the generated script after every change and compare it with the
    /// live state.
    pub verify_round_trip: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            verify_round_trip: true,
        }
    }
}
