pub mod config;
pub mod error;
pub mod manager;
pub mod skip;
pub mod step;
pub mod steps;
pub mod transpile;

pub use config::EngineConfig;
pub use error::{EXECUTION_ERROR_HEADER, EXECUTION_ERROR_TO_FIX, EditError, ValidationError};
pub use manager::{StepRecord, StepSummary, StepsManager};
pub use step::{STEP_KIND_IDS, Step, StepParams, StepPerformer};
pub use transpile::{fold_renames, transpile, transpile_cached};
