//! The step catalog. Each params record implements [`crate::StepPerformer`].

mod bulk_old_rename;
mod cell;
mod column;
mod dataframe;
mod filter;
mod format;
mod formula;
mod pivot;

pub use bulk_old_rename::BulkOldRenameParams;
pub use cell::SetCellValueParams;
pub use column::{AddColumnParams, DeleteColumnParams, RenameColumnParams, ReorderColumnParams};
pub use dataframe::{DataframeDeleteParams, DataframeDuplicateParams, DataframeRenameParams};
pub use filter::FilterColumnParams;
pub use format::ChangeColumnFormatParams;
pub use formula::SetColumnFormulaParams;
pub use pivot::PivotParams;

use stepsheet_core::{ColumnHeader, ColumnId, CoreError, State, Table};

use crate::error::{EditError, ValidationError};

pub(crate) fn require_sheet(prior: &State, sheet_index: usize) -> Result<&Table, ValidationError> {
    prior.table(sheet_index).map_err(|_| ValidationError::NoSheet(sheet_index))
}

pub(crate) fn require_column<'a>(
    prior: &'a State,
    sheet_index: usize,
    column_id: &ColumnId,
) -> Result<&'a ColumnHeader, ValidationError> {
    require_sheet(prior, sheet_index)?;
    prior
        .header(sheet_index, column_id)
        .map_err(|_| ValidationError::NoColumn {
            sheet_index,
            column_id: column_id.clone(),
        })
}

/// A new header must be non-empty and unused, apart from `current` itself.
pub(crate) fn check_new_header(
    table: &Table,
    header: &ColumnHeader,
    current: Option<&ColumnHeader>,
) -> Result<(), ValidationError> {
    if header.as_text().is_some_and(|text| text.trim().is_empty()) {
        return Err(ValidationError::InvalidHeader(header.to_string()));
    }
    if Some(header) != current && table.column_index(header).is_some() {
        return Err(ValidationError::ColumnExists(header.to_string()));
    }
    Ok(())
}

/// The variable name a sheet has in generated code.
pub(crate) fn var_name(prior: &State, sheet_index: usize, kind: &'static str) -> Result<String, EditError> {
    prior
        .name(sheet_index)
        .map(str::to_string)
        .map_err(|e| EditError::execution(kind, e))
}

pub(crate) fn header_of(
    prior: &State,
    sheet_index: usize,
    column_id: &ColumnId,
    kind: &'static str,
) -> Result<ColumnHeader, EditError> {
    prior
        .header(sheet_index, column_id)
        .cloned()
        .map_err(|e| EditError::execution(kind, e))
}

pub(crate) fn exec(kind: &'static str) -> impl Fn(CoreError) -> EditError {
    move |source| EditError::execution(kind, source)
}

/// Display name for a sheet in step descriptions.
pub(crate) fn sheet_name(df_names: &[String], sheet_index: usize) -> String {
    df_names
        .get(sheet_index)
        .cloned()
        .unwrap_or_else(|| format!("sheet {sheet_index}"))
}
