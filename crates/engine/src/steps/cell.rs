use serde::{Deserialize, Serialize};
use stepsheet_core::{CellValue, ColumnId, ColumnType, State};
use stepsheet_script::Statement;

use super::{exec, header_of, require_column, require_sheet, sheet_name, var_name};
use crate::error::{EditError, ValidationError};
use crate::step::StepPerformer;

const SET_CELL_VALUE: &str = "set_cell_value";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetCellValueParams {
    pub sheet_index: usize,
    pub column_id: ColumnId,
    pub row_index: usize,
    /// The text the user typed; cast to the column's type.
    pub new_value: String,
}

impl SetCellValueParams {
    /// The cast value and whether the column must widen from int to float first.
    fn cast(&self, prior: &State) -> Result<(CellValue, bool), ValidationError> {
        let header = require_column(prior, self.sheet_index, &self.column_id)?;
        let table = require_sheet(prior, self.sheet_index)?;
        let dtype = table
            .column(header)
            .map(|c| c.dtype())
            .map_err(|_| ValidationError::NoColumn {
                sheet_index: self.sheet_index,
                column_id: self.column_id.clone(),
            })?;
        let value = CellValue::parse_for(dtype, &self.new_value).map_err(|_| ValidationError::CastValue {
            value: self.new_value.clone(),
            dtype: dtype.name(),
        })?;
        let widen = dtype == ColumnType::Integer && matches!(value, CellValue::Float(_) | CellValue::Null);
        Ok((value, widen))
    }
}

impl StepPerformer for SetCellValueParams {
    fn step_kind_id(&self) -> &'static str {
        SET_CELL_VALUE
    }

    fn step_display_name(&self) -> &'static str {
        "Set Cell Value"
    }

    fn validate(&self, prior: &State) -> Result<(), ValidationError> {
        let table = require_sheet(prior, self.sheet_index)?;
        if self.row_index >= table.num_rows() {
            return Err(ValidationError::NoRow {
                sheet_index: self.sheet_index,
                row: self.row_index,
            });
        }
        self.cast(prior).map(|_| ())
    }

    fn execute(&self, prior: &State) -> Result<State, EditError> {
        let (value, widen) = self.cast(prior)?;
        let mut post = prior.clone();
        if widen {
            post.cast_column_to_float(self.sheet_index, &self.column_id)
                .map_err(exec(SET_CELL_VALUE))?;
        }
        post.set_cell(self.sheet_index, &self.column_id, self.row_index, value)
            .map_err(exec(SET_CELL_VALUE))?;
        Ok(post)
    }

    fn transpile(&self, prior: &State) -> Result<Vec<Statement>, EditError> {
        let (value, widen) = self.cast(prior)?;
        let var = var_name(prior, self.sheet_index, SET_CELL_VALUE)?;
        let header = header_of(prior, self.sheet_index, &self.column_id, SET_CELL_VALUE)?;
        let mut statements = Vec::with_capacity(2);
        if widen {
            statements.push(Statement::CastToFloat {
                var: var.clone(),
                header: header.clone(),
            });
        }
        statements.push(Statement::SetCell {
            var,
            row: self.row_index,
            header,
            value,
        });
        Ok(statements)
    }

    fn describe(&self, df_names: &[String]) -> String {
        format!(
            "Set a cell in row {} of {} to {}",
            self.row_index,
            sheet_name(df_names, self.sheet_index),
            self.new_value
        )
    }
}
