use std::collections::BTreeMap;

use serde::Serialize;
use stepsheet_core::{CellValue, ColumnHeader, ColumnId, CoreError, FilterSpec, FormatType, Provenance, State};
use stepsheet_engine::StepSummary;

/// One table as the frontend renders it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetData {
    pub df_name: String,
    pub df_source: Provenance,
    pub num_rows: usize,
    pub num_columns: usize,
    #[serde(rename = "columnIDsMap")]
    pub column_ids_map: BTreeMap<ColumnId, ColumnHeader>,
    pub column_spreadsheet_code_map: BTreeMap<ColumnId, String>,
    pub column_filters_map: BTreeMap<ColumnId, FilterSpec>,
    pub column_format_type_obj_map: BTreeMap<ColumnId, FormatType>,
    /// At most `max_rows` values per column.
    pub data: Vec<ColumnData>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnData {
    pub column_id: ColumnId,
    pub column_header: ColumnHeader,
    pub column_dtype: &'static str,
    pub column_data: Vec<CellValue>,
}

impl SheetData {
    pub fn from_state(state: &State, sheet_index: usize, max_rows: usize) -> Result<Self, CoreError> {
        let table = state.table(sheet_index)?;
        let data = table
            .columns()
            .iter()
            .map(|column| {
                Ok(ColumnData {
                    column_id: state.column_ids().get_column_id(sheet_index, column.header())?.clone(),
                    column_header: column.header().clone(),
                    column_dtype: column.dtype().name(),
                    column_data: column.values().iter().take(max_rows).cloned().collect(),
                })
            })
            .collect::<Result<Vec<_>, CoreError>>()?;

        Ok(Self {
            df_name: state.name(sheet_index)?.to_string(),
            df_source: state.provenance(sheet_index)?,
            num_rows: table.num_rows(),
            num_columns: table.num_columns(),
            column_ids_map: state.column_ids().headers_by_id(sheet_index)?,
            column_spreadsheet_code_map: state.column_formulas(sheet_index)?.clone(),
            column_filters_map: state.column_filters(sheet_index)?.clone(),
            column_format_type_obj_map: state.column_formats(sheet_index)?.clone(),
            data,
        })
    }

    pub fn all(state: &State, max_rows: usize) -> Result<Vec<Self>, CoreError> {
        (0..state.num_tables())
            .map(|sheet_index| Self::from_state(state, sheet_index, max_rows))
            .collect()
    }
}

/// The step list and generated code.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisData {
    pub analysis_name: String,
    pub code: Vec<String>,
    pub step_summary_list: Vec<StepSummary>,
    pub curr_step_idx: usize,
    pub version: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use stepsheet_core::{AddTable, Table};

    fn state() -> State {
        let table = Table::new(vec![
            ("A".into(), (1..=5).map(CellValue::Integer).collect()),
            ("B".into(), (1..=5).map(|n| CellValue::text(format!("r{n}"))).collect()),
        ])
        .unwrap();
        let mut state = State::new();
        state
            .add_table(table, Provenance::Imported, AddTable::append().named("sales"))
            .unwrap();
        state
    }

    #[test]
    fn rows_are_capped_but_counts_are_not() {
        let sheet = SheetData::from_state(&state(), 0, 3).unwrap();
        assert_eq!(sheet.num_rows, 5);
        assert_eq!(sheet.data[0].column_data.len(), 3);
        assert_eq!(sheet.data[1].column_id, ColumnId::from("c2"));
    }

    #[test]
    fn serializes_with_frontend_keys() {
        let value = serde_json::to_value(SheetData::from_state(&state(), 0, 1).unwrap()).unwrap();
        assert_eq!(value["dfName"], json!("sales"));
        assert_eq!(value["dfSource"], json!("imported"));
        assert_eq!(value["columnIDsMap"], json!({"c1": "A", "c2": "B"}));
        assert_eq!(value["columnSpreadsheetCodeMap"]["c1"], json!(""));
        assert_eq!(value["data"][0]["columnDtype"], json!("int64"));
        assert_eq!(value["data"][1]["columnData"], json!(["r1"]));
    }

    #[test]
    fn missing_sheet_is_an_error() {
        assert!(SheetData::from_state(&state(), 1, 10).is_err());
    }
}
