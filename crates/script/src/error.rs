use stepsheet_core::CoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("core error: {0}")]
    Core(#[from] CoreError),

    #[error("name '{0}' is not defined")]
    UndefinedVariable(String),

    #[error("statement {index} failed: {source}")]
    Statement {
        index: usize,
        #[source]
        source: Box<ScriptError>,
    },
}
