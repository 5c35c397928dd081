mod common;

use common::{TestSession, assert_ok, error_type};
use serde_json::json;
use stepsheet_core::{
    AnalysisInput, CellValue, ColumnHeader, ColumnId, FilterSpec, FormatType, MemoryLoader, Provenance, Table,
};
use stepsheet_script::ScriptRunner;
use stepsheet_session::Outbound;

// ============================================================================
// Edits and generated code
// ============================================================================

#[test]
fn rename_then_filter_tracks_ids_and_code() -> Result<(), Box<dyn std::error::Error>> {
    let mut t = TestSession::sales()?;
    assert_ok(&t.rename_column("c1", "A2"));
    let state = t.session.manager().current_state();
    assert_eq!(state.header(0, &ColumnId::from("c1"))?, &"A2".into());

    assert_ok(&t.filter_column("c2", json!([{"condition": "contains", "value": "x"}])));
    let state = t.session.manager().current_state();
    let filters = state.column_filters(0)?;
    assert!(!filters[&ColumnId::from("c2")].is_unrestricted());
    assert_eq!(filters[&ColumnId::from("c1")], FilterSpec::default());
    assert_eq!(state.table(0)?.num_rows(), 2);

    let code = t.code()?;
    assert_eq!(code.len(), 4);
    assert_eq!(code[2], "df1.rename(columns={'A': 'A2'}, inplace=True)");
    assert!(code[3].contains("df1['B'].str.contains('x', na=False, regex=False)"));
    Ok(())
}

#[test]
fn renames_that_return_to_the_original_keep_the_id() -> Result<(), Box<dyn std::error::Error>> {
    let mut t = TestSession::sales()?;
    assert_ok(&t.rename_column("c1", "X"));
    assert_ok(&t.rename_column("c1", "Y"));
    assert_ok(&t.rename_column("c1", "A"));

    let state = t.session.manager().current_state();
    assert_eq!(state.column_ids().get_column_id(0, &"A".into())?, &ColumnId::from("c1"));
    assert_eq!(state, t.session.manager().initial_state());
    // The whole chain folds away.
    assert_eq!(t.code()?.len(), 2);
    Ok(())
}

#[test]
fn generated_script_rebuilds_the_state() -> Result<(), Box<dyn std::error::Error>> {
    let mut t = TestSession::sales()?;
    assert_ok(&t.edit(
        "add_column",
        json!({"sheet_index": 0, "column_header": "C", "column_header_index": 1}),
    ));
    assert_ok(&t.edit(
        "set_cell_value",
        json!({"sheet_index": 0, "column_id": "c1", "row_index": 1, "new_value": "2.5"}),
    ));
    assert_ok(&t.filter_column("c1", json!([{"condition": "greater", "value": 2}])));
    assert_ok(&t.edit("reorder_column", json!({"sheet_index": 0, "column_id": "c2", "new_column_index": 0})));
    assert_ok(&t.edit("dataframe_duplicate", json!({"sheet_index": 0})));
    assert_ok(&t.edit("delete_column", json!({"sheet_index": 1, "column_id": "c3"})));

    let loader = MemoryLoader::new();
    let env = ScriptRunner::new(&loader).run(&t.session.manager().script()?)?;
    let state = t.session.manager().current_state();
    assert_eq!(env.len(), 2);
    for (name, table) in state.names().iter().zip(state.tables()) {
        assert_eq!(env.get(name), Some(table));
    }
    assert_eq!(state.name(1)?, "df1_copy");
    assert_eq!(state.provenance(1)?, Provenance::Duplicated);
    Ok(())
}

#[test]
fn edits_never_alias_earlier_states() -> Result<(), Box<dyn std::error::Error>> {
    let mut t = TestSession::sales()?;
    assert_ok(&t.edit(
        "set_cell_value",
        json!({"sheet_index": 0, "column_id": "c2", "row_index": 0, "new_value": "changed"}),
    ));

    let manager = t.session.manager();
    let before = manager.initial_state().table(0)?.column(&"B".into())?;
    let after = manager.current_state().table(0)?.column(&"B".into())?;
    assert_eq!(before.values()[0], CellValue::text("xa"));
    assert_eq!(after.values()[0], CellValue::text("changed"));
    assert!(!before.shares_storage_with(after));

    // Untouched columns stay shared.
    let a_before = manager.initial_state().table(0)?.column(&"A".into())?;
    let a_after = manager.current_state().table(0)?.column(&"A".into())?;
    assert!(a_before.shares_storage_with(a_after));
    Ok(())
}

#[test]
fn resubmitted_step_replaces_the_original() -> Result<(), Box<dyn std::error::Error>> {
    let mut t = TestSession::sales()?;
    assert_ok(&t.rename_column("c1", "X"));
    let step_id = t.session.manager().records()[0].step.step_id;

    assert_ok(&t.send(json!({
        "event": "edit_event",
        "step_kind_id": "rename_column",
        "step_id": step_id,
        "params": {"sheet_index": 0, "column_id": "c1", "new_column_header": "Z"},
    })));

    let manager = t.session.manager();
    assert_eq!(manager.num_steps(), 2);
    assert_eq!(manager.step_summaries().len(), 1);
    assert_eq!(manager.current_state().header(0, &ColumnId::from("c1"))?, &"Z".into());
    assert_eq!(t.code()?[2], "df1.rename(columns={'A': 'Z'}, inplace=True)");
    Ok(())
}

#[test]
fn resubmission_cannot_move_later_edits_to_another_column() -> Result<(), Box<dyn std::error::Error>> {
    let table = Table::new(vec![("A".into(), vec![CellValue::Integer(1), CellValue::Integer(2)])])?;
    let mut t = TestSession::new(vec![AnalysisInput::table(table)])?;
    assert_ok(&t.edit("add_column", json!({"sheet_index": 0, "column_header": "C"})));
    assert_ok(&t.edit("add_column", json!({"sheet_index": 0, "column_header": "D"})));
    assert_ok(&t.rename_column("c2", "C_renamed"));

    let expected: Vec<ColumnHeader> = vec!["A".into(), "C_renamed".into(), "D".into()];
    assert_eq!(t.session.manager().current_state().table(0)?.headers(), expected);
    let version = t.session.manager().version();
    let first = t.session.manager().records()[0].step.step_id;

    // The rename refers to c2, which only the replaced step created.
    let replies = t.send(json!({
        "event": "edit_event",
        "step_kind_id": "add_column",
        "step_id": first,
        "params": {"sheet_index": 0, "column_header": "C2"},
    }));
    assert_eq!(error_type(&replies), "validation_error");

    let manager = t.session.manager();
    let state = manager.current_state();
    assert_eq!(state.table(0)?.headers(), expected);
    assert_eq!(state.header(0, &ColumnId::from("c2"))?, &"C_renamed".into());
    assert_eq!(state.header(0, &ColumnId::from("c3"))?, &"D".into());
    assert_eq!(manager.num_steps(), 3);
    assert_eq!(manager.version(), version);
    Ok(())
}

#[test]
fn repivot_overwrites_its_sheet_and_keeps_formats() -> Result<(), Box<dyn std::error::Error>> {
    let mut t = TestSession::sales()?;
    assert_ok(&t.edit(
        "pivot",
        json!({"sheet_index": 0, "pivot_rows_column_ids": ["c2"], "values_column_ids_map": {"c1": ["sum"]}}),
    ));
    let state = t.session.manager().current_state();
    assert_eq!(state.name(1)?, "df1_pivot");
    assert_eq!(state.header(1, &ColumnId::from("c4"))?, &"A sum".into());

    assert_ok(&t.edit(
        "change_column_format",
        json!({"sheet_index": 1, "column_ids": ["c4"], "format_type": {"type": "currency"}}),
    ));
    assert_ok(&t.edit(
        "pivot",
        json!({
            "sheet_index": 0,
            "pivot_rows_column_ids": ["c2"],
            "values_column_ids_map": {"c1": ["sum", "mean"]},
            "destination_sheet_index": 1,
        }),
    ));

    let state = t.session.manager().current_state();
    assert_eq!(state.num_tables(), 2);
    let expected: Vec<ColumnHeader> = vec!["B".into(), "A sum".into(), "A mean".into()];
    assert_eq!(state.table(1)?.headers(), expected);
    assert_eq!(state.header(1, &ColumnId::from("c4"))?, &"A sum".into());
    assert_eq!(state.column_formats(1)?[&ColumnId::from("c4")], FormatType::Currency);
    assert_eq!(state.provenance(1)?, Provenance::Pivoted);
    assert_eq!(t.code()?.last().map(String::as_str), Some("df1_pivot = pivot_table.reset_index()"));

    // Only a sheet an earlier pivot made may be overwritten.
    let replies = t.edit(
        "pivot",
        json!({
            "sheet_index": 1,
            "pivot_rows_column_ids": ["c3"],
            "values_column_ids_map": {"c4": ["count"]},
            "destination_sheet_index": 0,
        }),
    );
    assert_eq!(error_type(&replies), "validation_error");
    Ok(())
}

#[test]
fn formula_steps_on_one_column_keep_only_the_last() -> Result<(), Box<dyn std::error::Error>> {
    let mut t = TestSession::sales()?;
    assert_ok(&t.edit("add_column", json!({"sheet_index": 0, "column_header": "C"})));
    assert_ok(&t.edit(
        "set_column_formula",
        json!({"sheet_index": 0, "column_id": "c3", "new_formula": "=A * 2"}),
    ));
    assert_ok(&t.edit(
        "set_column_formula",
        json!({"sheet_index": 0, "column_id": "c3", "new_formula": "=A + 1"}),
    ));

    let manager = t.session.manager();
    let state = manager.current_state();
    assert_eq!(
        state.table(0)?.column(&"C".into())?.values(),
        &[CellValue::Integer(2), CellValue::Integer(6), CellValue::Integer(10)]
    );
    assert_eq!(state.column_formulas(0)?[&ColumnId::from("c3")], "=A + 1");
    assert_eq!(manager.step_summaries().len(), 2);

    let code = t.code()?;
    assert_eq!(code.last().map(String::as_str), Some("df1['C'] = df1['A'] + 1"));
    assert!(!code.iter().any(|line| line.contains("* 2")));

    let replies = t.edit(
        "set_column_formula",
        json!({"sheet_index": 0, "column_id": "c3", "new_formula": "=C + 1"}),
    );
    assert_eq!(error_type(&replies), "validation_error");
    Ok(())
}

// ============================================================================
// Failures
// ============================================================================

#[test]
fn invalid_edits_leave_history_unchanged() -> Result<(), Box<dyn std::error::Error>> {
    let mut t = TestSession::sales()?;
    assert_ok(&t.rename_column("c1", "X"));
    let version = t.session.manager().version();

    assert_eq!(error_type(&t.rename_column("c9", "Q")), "validation_error");
    assert_eq!(error_type(&t.rename_column("c2", "X")), "validation_error");
    assert_eq!(
        error_type(&t.filter_column("c2", json!([{"condition": "greater", "value": 1}]))),
        "validation_error"
    );
    assert_eq!(
        error_type(&t.edit(
            "set_cell_value",
            json!({"sheet_index": 0, "column_id": "c1", "row_index": 0, "new_value": "abc"})
        )),
        "validation_error"
    );
    assert_eq!(error_type(&t.edit("dataframe_delete", json!({"sheet_index": 4}))), "validation_error");

    let manager = t.session.manager();
    assert_eq!(manager.num_steps(), 1);
    assert_eq!(manager.version(), version);
    Ok(())
}

#[test]
fn errors_carry_the_message_id_and_remediation() -> Result<(), Box<dyn std::error::Error>> {
    let mut t = TestSession::sales()?;
    let replies = t.session.receive_message(
        r#"{"event": "edit_event", "id": "e42", "step_kind_id": "delete_column",
            "params": {"sheet_index": 0, "column_id": "c7"}}"#,
    );
    match replies.as_slice() {
        [Outbound::EditError { id, header, to_fix, traceback, .. }] => {
            assert_eq!(id, "e42");
            assert_eq!(*header, "Column Does Not Exist");
            assert!(to_fix.contains("c7"));
            assert!(!traceback.is_empty());
        }
        other => panic!("unexpected replies {other:?}"),
    }
    Ok(())
}

#[test]
fn unknown_kinds_and_events_are_rejected() -> Result<(), Box<dyn std::error::Error>> {
    let mut t = TestSession::sales()?;
    assert_eq!(error_type(&t.edit("sort", json!({}))), "validation_error");
    assert_eq!(error_type(&t.edit("delete_column", json!({"sheet_index": 0}))), "validation_error");
    assert_eq!(error_type(&t.send(json!({"event": "log_event"}))), "validation_error");

    let replies = t.session.receive_message("{not json");
    match replies.as_slice() {
        [Outbound::EditError { id, .. }] => assert_eq!(id, ""),
        other => panic!("unexpected replies {other:?}"),
    }
    assert_eq!(t.session.manager().num_steps(), 0);
    Ok(())
}

// ============================================================================
// Refresh payload
// ============================================================================

#[test]
fn refresh_carries_sheets_and_analysis() -> Result<(), Box<dyn std::error::Error>> {
    let mut t = TestSession::sales()?;
    let replies = t.rename_column("c1", "A2");
    let [Outbound::Response { .. }, refresh @ Outbound::Refresh { .. }] = replies.as_slice() else {
        panic!("unexpected replies {replies:?}");
    };

    let value = serde_json::to_value(refresh)?;
    assert_eq!(value["event"], json!("refresh"));
    let sheet = &value["sheet_data"][0];
    assert_eq!(sheet["dfName"], json!("df1"));
    assert_eq!(sheet["columnIDsMap"], json!({"c1": "A2", "c2": "B"}));
    assert_eq!(sheet["data"][0]["columnData"], json!([1, 5, 9]));

    let analysis = &value["analysis_data"];
    assert!(analysis["analysisName"].as_str().unwrap_or_default().starts_with("UUID-"));
    assert_eq!(analysis["currStepIdx"], json!(1));
    let summary = &analysis["stepSummaryList"][0];
    assert_eq!(summary["stepKindId"], json!("rename_column"));
    assert_eq!(summary["stepIdx"], json!(1));
    assert!(summary.get("step_kind_id").is_none());
    assert_eq!(analysis["code"][2], json!("df1.rename(columns={'A': 'A2'}, inplace=True)"));
    Ok(())
}
