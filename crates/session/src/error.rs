use stepsheet_core::CoreError;
use stepsheet_engine::{EditError, ValidationError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Edit(#[from] EditError),

    #[error("malformed message: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Config(#[from] toml::de::Error),

    #[error("core error: {0}")]
    Core(#[from] CoreError),

    #[error("unknown event {0:?}")]
    UnknownEvent(String),

    #[error("invalid saved analysis: {0}")]
    SavedAnalysis(String),

    #[error("saved analysis checksum mismatch: expected {expected}, found {found}")]
    Checksum { expected: String, found: String },

    #[error("msgpack encoding failed: {0}")]
    Encode(#[from] rmp_serde::encode::Error),
}

impl From<ValidationError> for SessionError {
    fn from(err: ValidationError) -> Self {
        SessionError::Edit(EditError::Validation(err))
    }
}

impl SessionError {
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::Edit(e) => e.error_type(),
            Self::Json(_) | Self::UnknownEvent(_) | Self::SavedAnalysis(_) | Self::Checksum { .. } => {
                "validation_error"
            }
            Self::Config(_) | Self::Core(_) | Self::Encode(_) => "execution_error",
        }
    }

    pub fn header(&self) -> &'static str {
        match self {
            Self::Edit(e) => e.header(),
            Self::Json(_) | Self::UnknownEvent(_) => "Invalid Message",
            Self::SavedAnalysis(_) | Self::Checksum { .. } => "Invalid Saved Analysis",
            Self::Config(_) | Self::Core(_) | Self::Encode(_) => stepsheet_engine::EXECUTION_ERROR_HEADER,
        }
    }

    pub fn to_fix(&self) -> String {
        match self {
            Self::Edit(e) => e.to_fix(),
            Self::Json(_) | Self::UnknownEvent(_) => {
                "The message could not be understood. Make sure the frontend and backend versions match.".into()
            }
            Self::SavedAnalysis(_) | Self::Checksum { .. } => {
                "The saved analysis is damaged or from an unsupported version. Rerun it from the original notebook.".into()
            }
            Self::Config(_) | Self::Core(_) | Self::Encode(_) => stepsheet_engine::EXECUTION_ERROR_TO_FIX.into(),
        }
    }

    pub fn traceback(&self) -> String {
        match self {
            Self::Edit(e) => e.traceback(),
            other => other.to_string(),
        }
    }
}
