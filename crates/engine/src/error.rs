use std::error::Error as _;

use stepsheet_core::{ColumnId, CoreError};
use stepsheet_script::ScriptError;
use thiserror::Error;

/// A recoverable problem with an edit's params, detected before any mutation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("sheet {0} does not exist")]
    NoSheet(usize),

    #[error("column {column_id} does not exist in sheet {sheet_index}")]
    NoColumn { sheet_index: usize, column_id: ColumnId },

    #[error("a column named {0} already exists")]
    ColumnExists(String),

    #[error("{0:?} is not a valid column header")]
    InvalidHeader(String),

    #[error("row {row} does not exist in sheet {sheet_index}")]
    NoRow { sheet_index: usize, row: usize },

    #[error("cannot convert {value:?} to {dtype}")]
    CastValue { value: String, dtype: &'static str },

    #[error("{0:?} is not a valid dataframe name")]
    InvalidDataframeName(String),

    #[error("filter {condition} cannot be applied to a column of type {dtype}")]
    InvalidFilter { condition: &'static str, dtype: &'static str },

    #[error("unknown step kind {0}")]
    UnknownStepKind(String),

    #[error("invalid params for {kind}: {reason}")]
    InvalidParams { kind: String, reason: String },

    #[error("column ids already use the legacy scheme")]
    AlreadyMigrated,

    #[error("step index {index} is out of range, history has {len} steps")]
    NoStepIndex { index: usize, len: usize },

    #[error("expected {expected} dataframe names, got {actual}")]
    NameCount { expected: usize, actual: usize },

    #[error("cannot take the {aggregation} of a column of type {dtype}")]
    InvalidAggregation { aggregation: &'static str, dtype: &'static str },

    #[error("sheet {0} was not made by a pivot")]
    NotAPivot(usize),

    #[error("invalid formula {formula}: {reason}")]
    InvalidFormula { formula: String, reason: String },
}

impl ValidationError {
    /// Short title shown above the error in the frontend.
    pub fn header(&self) -> &'static str {
        match self {
            Self::NoSheet(_) => "Dataframe Does Not Exist",
            Self::NoColumn { .. } => "Column Does Not Exist",
            Self::ColumnExists(_) => "Column Already Exists",
            Self::InvalidHeader(_) => "Invalid Column Header",
            Self::NoRow { .. } => "Row Does Not Exist",
            Self::CastValue { .. } => "Invalid Value",
            Self::InvalidDataframeName(_) | Self::NameCount { .. } => "Invalid Dataframe Name",
            Self::InvalidFilter { .. } => "Invalid Filter",
            Self::UnknownStepKind(_) | Self::InvalidParams { .. } => "Invalid Edit",
            Self::AlreadyMigrated => "Already Migrated",
            Self::NoStepIndex { .. } => "Step Does Not Exist",
            Self::InvalidAggregation { .. } => "Invalid Aggregation",
            Self::NotAPivot(_) => "Cannot Overwrite Dataframe",
            Self::InvalidFormula { .. } => "Invalid Formula",
        }
    }

    /// What the user can do about it.
    pub fn to_fix(&self) -> String {
        match self {
            Self::NoSheet(index) => format!("There is no dataframe at index {index}. Refresh and try again."),
            Self::NoColumn { column_id, .. } => {
                format!("The column {column_id} was removed or never existed. Pick a column that is in the sheet.")
            }
            Self::ColumnExists(header) => {
                format!("Column headers must be unique. Pick a name other than {header}.")
            }
            Self::InvalidHeader(_) => "Column headers cannot be empty. Enter a header with at least one character.".into(),
            Self::NoRow { row, .. } => format!("Row {row} is past the end of the dataframe."),
            Self::CastValue { value, dtype } => {
                format!("The column has type {dtype} and {value:?} cannot be converted to it. Enter a value of that type.")
            }
            Self::InvalidDataframeName(_) | Self::NameCount { .. } => {
                "Dataframe names must be valid Python variable names.".into()
            }
            Self::InvalidFilter { condition, dtype } => {
                format!("The {condition} filter does not apply to {dtype} columns. Pick a filter for that type.")
            }
            Self::UnknownStepKind(kind) => format!("{kind} is not an edit this version understands."),
            Self::InvalidParams { reason, .. } => format!("The edit was malformed: {reason}."),
            Self::AlreadyMigrated => "This analysis was already upgraded and needs no further changes.".into(),
            Self::NoStepIndex { len, .. } => format!("Pick a step between 0 and {len}."),
            Self::InvalidAggregation { aggregation, dtype } => {
                format!("A {dtype} column has no {aggregation}. Pick count or count unique instead.")
            }
            Self::NotAPivot(index) => {
                format!("The dataframe at index {index} is not a pivot table, so a pivot cannot overwrite it.")
            }
            Self::InvalidFormula { reason, .. } => format!("Fix the formula and try again: {reason}."),
        }
    }
}

/// Everything that can go wrong applying a change to the step history.
#[derive(Debug, Error)]
pub enum EditError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{step_kind_id} failed during execution: {source}")]
    Execution {
        step_kind_id: &'static str,
        #[source]
        source: CoreError,
    },

    #[error("failed to build the initial state: {0}")]
    Initialize(#[source] CoreError),

    #[error("state invariant violated: {0}")]
    Invariant(String),

    #[error("generated script does not reproduce the state: {0}")]
    RoundTrip(#[source] ScriptError),
}

pub const EXECUTION_ERROR_HEADER: &str = "Execution Error";
pub const EXECUTION_ERROR_TO_FIX: &str = "Sorry, there was an error during executing this code.";

impl EditError {
    pub fn execution(step_kind_id: &'static str, source: CoreError) -> Self {
        Self::Execution { step_kind_id, source }
    }

    pub fn error_type(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::Execution { .. } | Self::Initialize(_) => "execution_error",
            Self::Invariant(_) | Self::RoundTrip(_) => "state_invariant_violation",
        }
    }

    pub fn header(&self) -> &'static str {
        match self {
            Self::Validation(e) => e.header(),
            Self::Execution { .. } | Self::Initialize(_) => EXECUTION_ERROR_HEADER,
            Self::Invariant(_) | Self::RoundTrip(_) => "Internal Consistency Error",
        }
    }

    pub fn to_fix(&self) -> String {
        match self {
            Self::Validation(e) => e.to_fix(),
            Self::Execution { .. } | Self::Initialize(_) => EXECUTION_ERROR_TO_FIX.into(),
            Self::Invariant(_) | Self::RoundTrip(_) => {
                "This is a bug. The edit was not applied; please report it with the traceback.".into()
            }
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Invariant(_) | Self::RoundTrip(_))
    }

    /// The error and its chain of sources, one per line.
    pub fn traceback(&self) -> String {
        let mut lines = vec![self.to_string()];
        let mut source = self.source();
        while let Some(err) = source {
            lines.push(format!("caused by: {err}"));
            source = err.source();
        }
        lines.join("\n")
    }
}
