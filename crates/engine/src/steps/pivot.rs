use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use stepsheet_core::names::first_unused_name;
use stepsheet_core::{AddTable, Aggregation, ColumnId, FormatType, PivotSpec, Provenance, State, pivot_table};
use stepsheet_script::Statement;

use super::{exec, require_column, require_sheet, sheet_name, var_name};
use crate::error::{EditError, ValidationError};
use crate::step::StepPerformer;

const PIVOT: &str = "pivot";

/// Group a sheet and aggregate it into a new sheet, or back into the pivot
/// table an earlier pivot produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PivotParams {
    pub sheet_index: usize,
    pub pivot_rows_column_ids: Vec<ColumnId>,
    pub values_column_ids_map: BTreeMap<ColumnId, Vec<Aggregation>>,
    #[serde(default)]
    pub destination_sheet_index: Option<usize>,
}

impl PivotParams {
    /// Headers to group by and aggregate. Value columns follow sheet order.
    fn spec(&self, prior: &State) -> Result<PivotSpec, ValidationError> {
        let table = require_sheet(prior, self.sheet_index)?;
        let rows = self
            .pivot_rows_column_ids
            .iter()
            .map(|column_id| require_column(prior, self.sheet_index, column_id).cloned())
            .collect::<Result<Vec<_>, _>>()?;

        let mut values = Vec::with_capacity(self.values_column_ids_map.len());
        for (column_id, aggs) in &self.values_column_ids_map {
            let header = require_column(prior, self.sheet_index, column_id)?;
            if self.pivot_rows_column_ids.contains(column_id) {
                return Err(ValidationError::InvalidParams {
                    kind: PIVOT.into(),
                    reason: format!("{header} cannot be both a pivot row and a value"),
                });
            }
            let dtype = table
                .column(header)
                .map_err(|_| ValidationError::NoColumn {
                    sheet_index: self.sheet_index,
                    column_id: column_id.clone(),
                })?
                .dtype();
            if let Some(agg) = aggs.iter().find(|agg| !agg.accepts(dtype)) {
                return Err(ValidationError::InvalidAggregation {
                    aggregation: agg.name(),
                    dtype: dtype.name(),
                });
            }
            values.push((header.clone(), aggs.clone()));
        }
        values.sort_by_key(|(header, _)| table.column_index(header));
        Ok(PivotSpec { rows, values })
    }

    fn check_destination(&self, prior: &State) -> Result<(), ValidationError> {
        let Some(destination) = self.destination_sheet_index else {
            return Ok(());
        };
        require_sheet(prior, destination)?;
        if destination == self.sheet_index {
            return Err(ValidationError::InvalidParams {
                kind: PIVOT.into(),
                reason: "a pivot cannot overwrite its own source".into(),
            });
        }
        match prior.provenance(destination) {
            Ok(Provenance::Pivoted) => Ok(()),
            _ => Err(ValidationError::NotAPivot(destination)),
        }
    }

    fn target_name(&self, prior: &State) -> Result<String, EditError> {
        match self.destination_sheet_index {
            Some(destination) => var_name(prior, destination, PIVOT),
            None => {
                let source = var_name(prior, self.sheet_index, PIVOT)?;
                Ok(first_unused_name(prior.names(), &format!("{source}_pivot")))
            }
        }
    }

    /// Replacement options that keep the formats of headers the new pivot shares with the old one.
    fn replacing(&self, prior: &State, destination: usize) -> Result<AddTable, EditError> {
        let formats = prior.column_formats(destination).map_err(exec(PIVOT))?;
        let mut options = AddTable::replacing(destination);
        for (column_id, format) in formats {
            if *format == FormatType::Default {
                continue;
            }
            let header = prior.header(destination, column_id).map_err(exec(PIVOT))?;
            options = options.with_format(header.clone(), format.clone());
        }
        Ok(options)
    }
}

impl StepPerformer for PivotParams {
    fn step_kind_id(&self) -> &'static str {
        PIVOT
    }

    fn step_display_name(&self) -> &'static str {
        "Pivoted"
    }

    fn validate(&self, prior: &State) -> Result<(), ValidationError> {
        self.spec(prior)?;
        self.check_destination(prior)
    }

    fn execute(&self, prior: &State) -> Result<State, EditError> {
        let spec = self.spec(prior)?;
        let source = prior.table(self.sheet_index).map_err(exec(PIVOT))?;
        let pivoted = pivot_table(source, &spec).map_err(exec(PIVOT))?;
        let mut post = prior.clone();
        match self.destination_sheet_index {
            Some(destination) => post.add_table(pivoted, None, self.replacing(prior, destination)?),
            None => post.add_table(
                pivoted,
                Provenance::Pivoted,
                AddTable::append().named(self.target_name(prior)?),
            ),
        }
        .map_err(exec(PIVOT))?;
        Ok(post)
    }

    fn transpile(&self, prior: &State) -> Result<Vec<Statement>, EditError> {
        Ok(vec![Statement::Pivot {
            source: var_name(prior, self.sheet_index, PIVOT)?,
            target: self.target_name(prior)?,
            spec: self.spec(prior)?,
        }])
    }

    fn describe(&self, df_names: &[String]) -> String {
        let source = sheet_name(df_names, self.sheet_index);
        match self.destination_sheet_index {
            Some(destination) => format!("Pivoted {source} into {}", sheet_name(df_names, destination)),
            None => format!("Pivoted {source} into {source}_pivot"),
        }
    }
}
