use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use stepsheet_core::{State, StepId};
use stepsheet_script::Statement;

use crate::error::{EditError, ValidationError};
use crate::steps::{
    AddColumnParams, BulkOldRenameParams, ChangeColumnFormatParams, DataframeDeleteParams,
    DataframeDuplicateParams, DataframeRenameParams, DeleteColumnParams, FilterColumnParams, PivotParams,
    RenameColumnParams, ReorderColumnParams, SetCellValueParams, SetColumnFormulaParams,
};

/// One kind of edit.
///
/// `validate` runs before anything else and never mutates. `execute` builds a
/// new state from `prior` without touching it. `transpile` only reads
/// `prior` and the params.
pub trait StepPerformer {
    /// Stable tag used in saved analyses and edit events.
    fn step_kind_id(&self) -> &'static str;

    fn step_display_name(&self) -> &'static str;

    fn step_version(&self) -> u32 {
        1
    }

    fn validate(&self, prior: &State) -> Result<(), ValidationError>;

    fn execute(&self, prior: &State) -> Result<State, EditError>;

    fn transpile(&self, prior: &State) -> Result<Vec<Statement>, EditError>;

    /// One sentence for the step list.
    fn describe(&self, df_names: &[String]) -> String;
}

/// Params of every supported edit, tagged by step kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "step_kind_id", content = "params", rename_all = "snake_case")]
pub enum StepParams {
    AddColumn(AddColumnParams),
    DeleteColumn(DeleteColumnParams),
    RenameColumn(RenameColumnParams),
    ReorderColumn(ReorderColumnParams),
    FilterColumn(FilterColumnParams),
    ChangeColumnFormat(ChangeColumnFormatParams),
    SetCellValue(SetCellValueParams),
    DataframeDuplicate(DataframeDuplicateParams),
    DataframeDelete(DataframeDeleteParams),
    DataframeRename(DataframeRenameParams),
    BulkOldRename(BulkOldRenameParams),
    Pivot(PivotParams),
    SetColumnFormula(SetColumnFormulaParams),
}

pub const STEP_KIND_IDS: &[&str] = &[
    "add_column",
    "delete_column",
    "rename_column",
    "reorder_column",
    "filter_column",
    "change_column_format",
    "set_cell_value",
    "dataframe_duplicate",
    "dataframe_delete",
    "dataframe_rename",
    "bulk_old_rename",
    "pivot",
    "set_column_formula",
];

impl StepParams {
    pub fn performer(&self) -> &dyn StepPerformer {
        match self {
            Self::AddColumn(p) => p,
            Self::DeleteColumn(p) => p,
            Self::RenameColumn(p) => p,
            Self::ReorderColumn(p) => p,
            Self::FilterColumn(p) => p,
            Self::ChangeColumnFormat(p) => p,
            Self::SetCellValue(p) => p,
            Self::DataframeDuplicate(p) => p,
            Self::DataframeDelete(p) => p,
            Self::DataframeRename(p) => p,
            Self::BulkOldRename(p) => p,
            Self::Pivot(p) => p,
            Self::SetColumnFormula(p) => p,
        }
    }

    pub fn step_kind_id(&self) -> &'static str {
        self.performer().step_kind_id()
    }

    /// Parse params that arrived separately from their kind tag.
    pub fn from_parts(step_kind_id: &str, params: Value) -> Result<Self, ValidationError> {
        if !STEP_KIND_IDS.contains(&step_kind_id) {
            return Err(ValidationError::UnknownStepKind(step_kind_id.to_string()));
        }
        let params = if params.is_null() { json!({}) } else { params };
        serde_json::from_value(json!({ "step_kind_id": step_kind_id, "params": params })).map_err(|e| {
            ValidationError::InvalidParams {
                kind: step_kind_id.to_string(),
                reason: e.to_string(),
            }
        })
    }

    /// The params alone, without the kind tag.
    pub fn params_value(&self) -> Result<Value, serde_json::Error> {
        let mut tagged = serde_json::to_value(self)?;
        Ok(tagged
            .get_mut("params")
            .map(Value::take)
            .unwrap_or_else(|| json!({})))
    }
}

/// A step as it sits in history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub step_id: StepId,
    pub params: StepParams,
}

impl Step {
    pub fn new(params: StepParams) -> Self {
        Self {
            step_id: StepId::new(),
            params,
        }
    }

    pub fn with_id(step_id: StepId, params: StepParams) -> Self {
        Self { step_id, params }
    }

    pub fn step_kind_id(&self) -> &'static str {
        self.params.step_kind_id()
    }

    pub fn performer(&self) -> &dyn StepPerformer {
        self.params.performer()
    }
}
