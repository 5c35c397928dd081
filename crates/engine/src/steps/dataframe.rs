use serde::{Deserialize, Serialize};
use stepsheet_core::names::{first_unused_name, valid_dataframe_name};
use stepsheet_core::State;
use stepsheet_script::Statement;

use super::{exec, require_sheet, sheet_name, var_name};
use crate::error::{EditError, ValidationError};
use crate::step::StepPerformer;

const DATAFRAME_DUPLICATE: &str = "dataframe_duplicate";
const DATAFRAME_DELETE: &str = "dataframe_delete";
const DATAFRAME_RENAME: &str = "dataframe_rename";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataframeDuplicateParams {
    pub sheet_index: usize,
}

impl DataframeDuplicateParams {
    fn copy_name(&self, prior: &State) -> Result<String, EditError> {
        let name = var_name(prior, self.sheet_index, DATAFRAME_DUPLICATE)?;
        Ok(first_unused_name(prior.names(), &format!("{name}_copy")))
    }
}

impl StepPerformer for DataframeDuplicateParams {
    fn step_kind_id(&self) -> &'static str {
        DATAFRAME_DUPLICATE
    }

    fn step_display_name(&self) -> &'static str {
        "Duplicated a Dataframe"
    }

    fn validate(&self, prior: &State) -> Result<(), ValidationError> {
        require_sheet(prior, self.sheet_index).map(|_| ())
    }

    fn execute(&self, prior: &State) -> Result<State, EditError> {
        let name = self.copy_name(prior)?;
        let mut post = prior.clone();
        post.duplicate_table(self.sheet_index, name)
            .map_err(exec(DATAFRAME_DUPLICATE))?;
        Ok(post)
    }

    fn transpile(&self, prior: &State) -> Result<Vec<Statement>, EditError> {
        Ok(vec![Statement::CopyTable {
            from: var_name(prior, self.sheet_index, DATAFRAME_DUPLICATE)?,
            to: self.copy_name(prior)?,
        }])
    }

    fn describe(&self, df_names: &[String]) -> String {
        format!("Duplicated {}", sheet_name(df_names, self.sheet_index))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataframeDeleteParams {
    pub sheet_index: usize,
}

impl StepPerformer for DataframeDeleteParams {
    fn step_kind_id(&self) -> &'static str {
        DATAFRAME_DELETE
    }

    fn step_display_name(&self) -> &'static str {
        "Deleted a Dataframe"
    }

    fn validate(&self, prior: &State) -> Result<(), ValidationError> {
        require_sheet(prior, self.sheet_index).map(|_| ())
    }

    fn execute(&self, prior: &State) -> Result<State, EditError> {
        let mut post = prior.clone();
        post.remove_table(self.sheet_index).map_err(exec(DATAFRAME_DELETE))?;
        Ok(post)
    }

    fn transpile(&self, prior: &State) -> Result<Vec<Statement>, EditError> {
        Ok(vec![Statement::DeleteTable {
            var: var_name(prior, self.sheet_index, DATAFRAME_DELETE)?,
        }])
    }

    fn describe(&self, df_names: &[String]) -> String {
        format!("Deleted {}", sheet_name(df_names, self.sheet_index))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataframeRenameParams {
    pub sheet_index: usize,
    pub new_dataframe_name: String,
}

impl DataframeRenameParams {
    /// The requested name made into an identifier no other sheet uses.
    fn resolved_name(&self, prior: &State) -> Result<String, ValidationError> {
        require_sheet(prior, self.sheet_index)?;
        if self.new_dataframe_name.trim().is_empty() {
            return Err(ValidationError::InvalidDataframeName(self.new_dataframe_name.clone()));
        }
        let others: Vec<String> = prior
            .names()
            .iter()
            .enumerate()
            .filter(|(index, _)| *index != self.sheet_index)
            .map(|(_, name)| name.clone())
            .collect();
        Ok(valid_dataframe_name(&others, &self.new_dataframe_name))
    }
}

impl StepPerformer for DataframeRenameParams {
    fn step_kind_id(&self) -> &'static str {
        DATAFRAME_RENAME
    }

    fn step_display_name(&self) -> &'static str {
        "Renamed a Dataframe"
    }

    fn validate(&self, prior: &State) -> Result<(), ValidationError> {
        self.resolved_name(prior).map(|_| ())
    }

    fn execute(&self, prior: &State) -> Result<State, EditError> {
        let name = self.resolved_name(prior)?;
        let mut post = prior.clone();
        post.rename_table(self.sheet_index, name)
            .map_err(exec(DATAFRAME_RENAME))?;
        Ok(post)
    }

    fn transpile(&self, prior: &State) -> Result<Vec<Statement>, EditError> {
        let from = var_name(prior, self.sheet_index, DATAFRAME_RENAME)?;
        let to = self.resolved_name(prior)?;
        if from == to {
            return Ok(Vec::new());
        }
        Ok(vec![Statement::RenameTable { from, to }])
    }

    fn describe(&self, df_names: &[String]) -> String {
        format!(
            "Renamed {} to {}",
            sheet_name(df_names, self.sheet_index),
            self.new_dataframe_name
        )
    }
}
