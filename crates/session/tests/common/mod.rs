#![allow(dead_code)]

use serde_json::{Value, json};
use stepsheet_core::{AnalysisInput, CellValue, MemoryLoader, Table};
use stepsheet_session::{Outbound, Session, SessionConfig};

/// A session driven through raw JSON messages, the way the frontend does it.
pub struct TestSession {
    pub session: Session,
    next_id: u64,
}

impl TestSession {
    pub fn new(inputs: Vec<AnalysisInput>) -> Result<Self, Box<dyn std::error::Error>> {
        Self::with_loader(inputs, MemoryLoader::new())
    }

    pub fn with_loader(
        inputs: Vec<AnalysisInput>,
        loader: MemoryLoader,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Self {
            session: Session::new(inputs, Box::new(loader), SessionConfig::default())?,
            next_id: 0,
        })
    }

    /// One table with columns `A` (integers) and `B` (text), ids `c1` and `c2`.
    pub fn sales() -> Result<Self, Box<dyn std::error::Error>> {
        Self::new(vec![AnalysisInput::table(sales_table()?)])
    }

    pub fn send(&mut self, mut message: Value) -> Vec<Outbound> {
        self.next_id += 1;
        message["id"] = json!(format!("m{}", self.next_id));
        self.session.receive_message(&message.to_string())
    }

    pub fn edit(&mut self, step_kind_id: &str, params: Value) -> Vec<Outbound> {
        self.send(json!({"event": "edit_event", "step_kind_id": step_kind_id, "params": params}))
    }

    pub fn update(&mut self, update_type: &str, params: Value) -> Vec<Outbound> {
        self.send(json!({"event": "update_event", "type": update_type, "params": params}))
    }

    pub fn api(&mut self, call_type: &str, params: Value) -> Vec<Outbound> {
        self.send(json!({"event": "api_call", "type": call_type, "params": params}))
    }

    pub fn rename_column(&mut self, column_id: &str, header: &str) -> Vec<Outbound> {
        self.edit(
            "rename_column",
            json!({"sheet_index": 0, "column_id": column_id, "new_column_header": header}),
        )
    }

    pub fn filter_column(&mut self, column_id: &str, filters: Value) -> Vec<Outbound> {
        self.edit(
            "filter_column",
            json!({"sheet_index": 0, "column_id": column_id, "operator": "And", "filters": filters}),
        )
    }

    pub fn code(&self) -> Result<Vec<String>, Box<dyn std::error::Error>> {
        Ok(self.session.manager().to_code()?)
    }
}

pub fn sales_table() -> Result<Table, Box<dyn std::error::Error>> {
    Ok(Table::new(vec![
        (
            "A".into(),
            vec![CellValue::Integer(1), CellValue::Integer(5), CellValue::Integer(9)],
        ),
        (
            "B".into(),
            vec![CellValue::text("xa"), CellValue::text("yb"), CellValue::text("xc")],
        ),
    ])?)
}

/// Panics unless the replies are a `response` followed by a `refresh`.
pub fn assert_ok(replies: &[Outbound]) {
    match replies {
        [Outbound::Response { .. }, Outbound::Refresh { .. }] => {}
        other => panic!("expected response and refresh, got {other:?}"),
    }
}

/// The `type` of the single `edit_error` reply.
pub fn error_type(replies: &[Outbound]) -> &'static str {
    match replies {
        [Outbound::EditError { error_type, .. }] => *error_type,
        other => panic!("expected one edit_error, got {other:?}"),
    }
}

pub fn api_data(replies: Vec<Outbound>) -> Value {
    match replies.as_slice() {
        [Outbound::ApiResponse { data, .. }] => data.clone(),
        other => panic!("expected one api_response, got {other:?}"),
    }
}
