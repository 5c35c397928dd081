use serde::{Deserialize, Serialize};
use stepsheet_core::{IdScheme, State};
use stepsheet_script::Statement;

use super::exec;
use crate::error::{EditError, ValidationError};
use crate::step::StepPerformer;

const BULK_OLD_RENAME: &str = "bulk_old_rename";

/// Moves an analysis onto the legacy column id scheme.
///
/// Prepended when replaying analyses saved before synthetic ids existed, so
/// the column ids in their later steps resolve.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BulkOldRenameParams {}

impl StepPerformer for BulkOldRenameParams {
    fn step_kind_id(&self) -> &'static str {
        BULK_OLD_RENAME
    }

    fn step_display_name(&self) -> &'static str {
        "Upgraded Column Ids"
    }

    fn validate(&self, prior: &State) -> Result<(), ValidationError> {
        if prior.column_ids().scheme() == IdScheme::Legacy {
            return Err(ValidationError::AlreadyMigrated);
        }
        Ok(())
    }

    fn execute(&self, prior: &State) -> Result<State, EditError> {
        let mut post = prior.clone();
        post.migrate_to_legacy_scheme().map_err(exec(BULK_OLD_RENAME))?;
        Ok(post)
    }

    fn transpile(&self, _prior: &State) -> Result<Vec<Statement>, EditError> {
        Ok(Vec::new())
    }

    fn describe(&self, _df_names: &[String]) -> String {
        "Upgraded the analysis to the current column id format".into()
    }
}
