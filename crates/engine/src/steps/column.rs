use serde::{Deserialize, Serialize};
use stepsheet_core::{CellValue, ColumnHeader, ColumnId, State};
use stepsheet_script::Statement;

use super::{check_new_header, exec, header_of, require_column, require_sheet, sheet_name, var_name};
use crate::error::{EditError, ValidationError};
use crate::step::StepPerformer;

const ADD_COLUMN: &str = "add_column";
const DELETE_COLUMN: &str = "delete_column";
const RENAME_COLUMN: &str = "rename_column";
const REORDER_COLUMN: &str = "reorder_column";

/// The formula a freshly added column starts with.
pub const NEW_COLUMN_FORMULA: &str = "=0";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddColumnParams {
    pub sheet_index: usize,
    pub column_header: ColumnHeader,
    /// Negative or absent appends.
    #[serde(default)]
    pub column_header_index: Option<i64>,
}

impl AddColumnParams {
    fn position(&self, prior: &State) -> usize {
        let num_columns = prior
            .table(self.sheet_index)
            .map(|t| t.num_columns())
            .unwrap_or(0);
        match self.column_header_index {
            Some(index) if index >= 0 => (index as usize).min(num_columns),
            _ => num_columns,
        }
    }
}

impl StepPerformer for AddColumnParams {
    fn step_kind_id(&self) -> &'static str {
        ADD_COLUMN
    }

    fn step_display_name(&self) -> &'static str {
        "Added a Column"
    }

    fn validate(&self, prior: &State) -> Result<(), ValidationError> {
        let table = require_sheet(prior, self.sheet_index)?;
        check_new_header(table, &self.column_header, None)
    }

    fn execute(&self, prior: &State) -> Result<State, EditError> {
        let mut post = prior.clone();
        post.insert_column(
            self.sheet_index,
            self.position(prior),
            self.column_header.clone(),
            CellValue::Integer(0),
            NEW_COLUMN_FORMULA.to_string(),
        )
        .map_err(exec(ADD_COLUMN))?;
        Ok(post)
    }

    fn transpile(&self, prior: &State) -> Result<Vec<Statement>, EditError> {
        Ok(vec![Statement::InsertColumn {
            var: var_name(prior, self.sheet_index, ADD_COLUMN)?,
            index: self.position(prior),
            header: self.column_header.clone(),
            fill: CellValue::Integer(0),
        }])
    }

    fn describe(&self, df_names: &[String]) -> String {
        format!(
            "Added column {} to {}",
            self.column_header,
            sheet_name(df_names, self.sheet_index)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteColumnParams {
    pub sheet_index: usize,
    pub column_id: ColumnId,
}

impl StepPerformer for DeleteColumnParams {
    fn step_kind_id(&self) -> &'static str {
        DELETE_COLUMN
    }

    fn step_display_name(&self) -> &'static str {
        "Deleted a Column"
    }

    fn validate(&self, prior: &State) -> Result<(), ValidationError> {
        require_column(prior, self.sheet_index, &self.column_id).map(|_| ())
    }

    fn execute(&self, prior: &State) -> Result<State, EditError> {
        let mut post = prior.clone();
        post.delete_column(self.sheet_index, &self.column_id)
            .map_err(exec(DELETE_COLUMN))?;
        Ok(post)
    }

    fn transpile(&self, prior: &State) -> Result<Vec<Statement>, EditError> {
        Ok(vec![Statement::DropColumns {
            var: var_name(prior, self.sheet_index, DELETE_COLUMN)?,
            headers: vec![header_of(prior, self.sheet_index, &self.column_id, DELETE_COLUMN)?],
        }])
    }

    fn describe(&self, df_names: &[String]) -> String {
        format!("Deleted a column from {}", sheet_name(df_names, self.sheet_index))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenameColumnParams {
    pub sheet_index: usize,
    pub column_id: ColumnId,
    pub new_column_header: ColumnHeader,
}

impl StepPerformer for RenameColumnParams {
    fn step_kind_id(&self) -> &'static str {
        RENAME_COLUMN
    }

    fn step_display_name(&self) -> &'static str {
        "Renamed a Column"
    }

    fn validate(&self, prior: &State) -> Result<(), ValidationError> {
        let current = require_column(prior, self.sheet_index, &self.column_id)?;
        let table = require_sheet(prior, self.sheet_index)?;
        check_new_header(table, &self.new_column_header, Some(current))
    }

    fn execute(&self, prior: &State) -> Result<State, EditError> {
        let mut post = prior.clone();
        post.rename_column(self.sheet_index, &self.column_id, self.new_column_header.clone())
            .map_err(exec(RENAME_COLUMN))?;
        Ok(post)
    }

    fn transpile(&self, prior: &State) -> Result<Vec<Statement>, EditError> {
        let old = header_of(prior, self.sheet_index, &self.column_id, RENAME_COLUMN)?;
        if old == self.new_column_header {
            return Ok(Vec::new());
        }
        Ok(vec![Statement::RenameColumns {
            var: var_name(prior, self.sheet_index, RENAME_COLUMN)?,
            renames: vec![(old, self.new_column_header.clone())],
        }])
    }

    fn describe(&self, df_names: &[String]) -> String {
        format!(
            "Renamed a column in {} to {}",
            sheet_name(df_names, self.sheet_index),
            self.new_column_header
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReorderColumnParams {
    pub sheet_index: usize,
    pub column_id: ColumnId,
    pub new_column_index: usize,
}

impl ReorderColumnParams {
    fn position(&self, prior: &State) -> usize {
        let last = prior
            .table(self.sheet_index)
            .map(|t| t.num_columns().saturating_sub(1))
            .unwrap_or(0);
        self.new_column_index.min(last)
    }
}

impl StepPerformer for ReorderColumnParams {
    fn step_kind_id(&self) -> &'static str {
        REORDER_COLUMN
    }

    fn step_display_name(&self) -> &'static str {
        "Reordered a Column"
    }

    fn validate(&self, prior: &State) -> Result<(), ValidationError> {
        require_column(prior, self.sheet_index, &self.column_id).map(|_| ())
    }

    fn execute(&self, prior: &State) -> Result<State, EditError> {
        let mut post = prior.clone();
        post.reorder_column(self.sheet_index, &self.column_id, self.position(prior))
            .map_err(exec(REORDER_COLUMN))?;
        Ok(post)
    }

    fn transpile(&self, prior: &State) -> Result<Vec<Statement>, EditError> {
        Ok(vec![Statement::MoveColumn {
            var: var_name(prior, self.sheet_index, REORDER_COLUMN)?,
            header: header_of(prior, self.sheet_index, &self.column_id, REORDER_COLUMN)?,
            index: self.position(prior),
        }])
    }

    fn describe(&self, df_names: &[String]) -> String {
        format!(
            "Moved a column in {} to position {}",
            sheet_name(df_names, self.sheet_index),
            self.new_column_index
        )
    }
}
