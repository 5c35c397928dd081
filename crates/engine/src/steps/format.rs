use serde::{Deserialize, Serialize};
use stepsheet_core::{ColumnId, FormatType, State};
use stepsheet_script::Statement;

use super::{exec, require_column, sheet_name};
use crate::error::{EditError, ValidationError};
use crate::step::StepPerformer;

const CHANGE_COLUMN_FORMAT: &str = "change_column_format";

/// Display formatting only. Cell values and generated code are unaffected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeColumnFormatParams {
    pub sheet_index: usize,
    pub column_ids: Vec<ColumnId>,
    pub format_type: FormatType,
}

impl StepPerformer for ChangeColumnFormatParams {
    fn step_kind_id(&self) -> &'static str {
        CHANGE_COLUMN_FORMAT
    }

    fn step_display_name(&self) -> &'static str {
        "Changed Column Format"
    }

    fn validate(&self, prior: &State) -> Result<(), ValidationError> {
        for column_id in &self.column_ids {
            require_column(prior, self.sheet_index, column_id)?;
        }
        Ok(())
    }

    fn execute(&self, prior: &State) -> Result<State, EditError> {
        let mut post = prior.clone();
        for column_id in &self.column_ids {
            post.set_format(self.sheet_index, column_id, self.format_type.clone())
                .map_err(exec(CHANGE_COLUMN_FORMAT))?;
        }
        Ok(post)
    }

    fn transpile(&self, _prior: &State) -> Result<Vec<Statement>, EditError> {
        Ok(Vec::new())
    }

    fn describe(&self, df_names: &[String]) -> String {
        format!(
            "Changed the format of {} column(s) in {}",
            self.column_ids.len(),
            sheet_name(df_names, self.sheet_index)
        )
    }
}
