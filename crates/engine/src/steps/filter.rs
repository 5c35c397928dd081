use serde::{Deserialize, Serialize};
use stepsheet_core::{ColumnId, FilterCondition, FilterOperator, FilterSpec, State};
use stepsheet_script::Statement;

use super::{exec, header_of, require_column, require_sheet, sheet_name, var_name};
use crate::error::{EditError, ValidationError};
use crate::step::StepPerformer;

const FILTER_COLUMN: &str = "filter_column";

/// Replace a column's filter and drop the rows it rejects.
///
/// A later filter on the same column supersedes this one, so relaxing a
/// filter brings back the rows an earlier one removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterColumnParams {
    pub sheet_index: usize,
    pub column_id: ColumnId,
    #[serde(default)]
    pub operator: FilterOperator,
    #[serde(default)]
    pub filters: Vec<FilterCondition>,
}

impl FilterColumnParams {
    pub fn spec(&self) -> FilterSpec {
        FilterSpec::new(self.operator, self.filters.clone())
    }
}

impl StepPerformer for FilterColumnParams {
    fn step_kind_id(&self) -> &'static str {
        FILTER_COLUMN
    }

    fn step_display_name(&self) -> &'static str {
        "Filtered a Column"
    }

    fn validate(&self, prior: &State) -> Result<(), ValidationError> {
        let header = require_column(prior, self.sheet_index, &self.column_id)?;
        let dtype = require_sheet(prior, self.sheet_index)?
            .column(header)
            .map(|c| c.dtype())
            .map_err(|_| ValidationError::NoColumn {
                sheet_index: self.sheet_index,
                column_id: self.column_id.clone(),
            })?;
        match self.filters.iter().find(|f| !f.applies_to(dtype)) {
            Some(condition) => Err(ValidationError::InvalidFilter {
                condition: condition.name(),
                dtype: dtype.name(),
            }),
            None => Ok(()),
        }
    }

    fn execute(&self, prior: &State) -> Result<State, EditError> {
        let mut post = prior.clone();
        post.apply_filter(self.sheet_index, &self.column_id, self.spec())
            .map_err(exec(FILTER_COLUMN))?;
        Ok(post)
    }

    fn transpile(&self, prior: &State) -> Result<Vec<Statement>, EditError> {
        if self.filters.is_empty() {
            return Ok(Vec::new());
        }
        Ok(vec![Statement::FilterRows {
            var: var_name(prior, self.sheet_index, FILTER_COLUMN)?,
            header: header_of(prior, self.sheet_index, &self.column_id, FILTER_COLUMN)?,
            spec: self.spec(),
        }])
    }

    fn describe(&self, df_names: &[String]) -> String {
        if self.filters.is_empty() {
            format!("Removed the filter on a column in {}", sheet_name(df_names, self.sheet_index))
        } else {
            format!("Filtered a column in {}", sheet_name(df_names, self.sheet_index))
        }
    }
}
