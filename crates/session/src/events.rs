use serde::{Deserialize, Serialize};
use serde_json::Value;
use stepsheet_core::{ColumnId, StepId};

use crate::error::SessionError;
use crate::sheet_data::{AnalysisData, SheetData};

/// A user edit that becomes a step.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EditEvent {
    pub id: String,
    pub step_kind_id: String,
    /// Set when the frontend re-submits an existing step, which then replaces it.
    #[serde(default)]
    pub step_id: Option<StepId>,
    #[serde(default)]
    pub params: Value,
}

/// Non-edit changes. None of these append a step.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", content = "params", rename_all = "snake_case")]
pub enum UpdateKind {
    DfNamesUpdate { df_names: Vec<String> },
    Undo,
    Redo,
    UndoTo { step_index: usize },
    Clear,
    ReplayAnalysis { analysis: Value },
}

/// Read-only queries.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", content = "params", rename_all = "snake_case")]
pub enum ApiCall {
    GetColumnDescribe { sheet_index: usize, column_id: ColumnId },
    GetUniqueValueCounts { sheet_index: usize, column_id: ColumnId },
    GetCode,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Edit(EditEvent),
    Update { id: String, update: UpdateKind },
    Api { id: String, call: ApiCall },
}

impl Inbound {
    pub fn parse(raw: &str) -> Result<Self, SessionError> {
        let mut message: Value = serde_json::from_str(raw)?;
        drop_empty_params(&mut message);
        let event = message
            .get("event")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let id = message_id(&message);
        match event.as_str() {
            "edit_event" => {
                message["id"] = Value::String(id);
                Ok(Self::Edit(serde_json::from_value(message)?))
            }
            "update_event" => Ok(Self::Update {
                id,
                update: serde_json::from_value(message)?,
            }),
            "api_call" => Ok(Self::Api {
                id,
                call: serde_json::from_value(message)?,
            }),
            _ => Err(SessionError::UnknownEvent(event)),
        }
    }
}

/// The message id, or an empty string when there is none.
pub fn message_id(message: &Value) -> String {
    match message.get("id") {
        Some(Value::String(id)) => id.clone(),
        Some(Value::Number(id)) => id.to_string(),
        _ => String::new(),
    }
}

// Updates without params are unit variants, which only accept a missing
// content field.
fn drop_empty_params(message: &mut Value) {
    let Some(fields) = message.as_object_mut() else {
        return;
    };
    let empty = match fields.get("params") {
        Some(Value::Null) => true,
        Some(Value::Object(params)) => params.is_empty(),
        _ => false,
    };
    if empty && fields.get("event").and_then(Value::as_str) != Some("edit_event") {
        fields.remove("params");
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Outbound {
    Response {
        id: String,
    },
    EditError {
        id: String,
        #[serde(rename = "type")]
        error_type: &'static str,
        header: &'static str,
        to_fix: String,
        traceback: String,
    },
    ApiResponse {
        id: String,
        version: u64,
        data: Value,
    },
    Refresh {
        sheet_data: Vec<SheetData>,
        analysis_data: AnalysisData,
    },
}

impl Outbound {
    pub fn edit_error(id: impl Into<String>, err: &SessionError) -> Self {
        Self::EditError {
            id: id.into(),
            error_type: err.error_type(),
            header: err.header(),
            to_fix: err.to_fix(),
            traceback: err.traceback(),
        }
    }

    pub fn event(&self) -> &'static str {
        match self {
            Self::Response { .. } => "response",
            Self::EditError { .. } => "edit_error",
            Self::ApiResponse { .. } => "api_response",
            Self::Refresh { .. } => "refresh",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_each_event_kind() {
        let edit = Inbound::parse(
            r#"{"event": "edit_event", "id": "e1", "step_kind_id": "delete_column",
                "params": {"sheet_index": 0, "column_id": "c1"}}"#,
        )
        .unwrap();
        match edit {
            Inbound::Edit(e) => {
                assert_eq!(e.step_kind_id, "delete_column");
                assert_eq!(e.step_id, None);
                assert_eq!(e.params["column_id"], json!("c1"));
            }
            other => panic!("unexpected {other:?}"),
        }

        let undo = Inbound::parse(r#"{"event": "update_event", "id": "u1", "type": "undo", "params": {}}"#).unwrap();
        assert_eq!(
            undo,
            Inbound::Update {
                id: "u1".into(),
                update: UpdateKind::Undo
            }
        );

        let undo_to = Inbound::parse(
            r#"{"event": "update_event", "id": 7, "type": "undo_to", "params": {"step_index": 2}}"#,
        )
        .unwrap();
        assert_eq!(
            undo_to,
            Inbound::Update {
                id: "7".into(),
                update: UpdateKind::UndoTo { step_index: 2 }
            }
        );

        let api = Inbound::parse(r#"{"event": "api_call", "id": "a1", "type": "get_code"}"#).unwrap();
        assert_eq!(
            api,
            Inbound::Api {
                id: "a1".into(),
                call: ApiCall::GetCode
            }
        );
    }

    #[test]
    fn edit_ids_may_be_numbers() {
        let edit = Inbound::parse(
            r#"{"event": "edit_event", "id": 7, "step_kind_id": "delete_column",
                "params": {"sheet_index": 0, "column_id": "c1"}}"#,
        )
        .unwrap();
        match edit {
            Inbound::Edit(e) => assert_eq!(e.id, "7"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn unknown_events_and_types_are_errors() {
        assert!(matches!(
            Inbound::parse(r#"{"event": "log_event", "id": "x"}"#),
            Err(SessionError::UnknownEvent(e)) if e == "log_event"
        ));
        assert!(matches!(
            Inbound::parse(r#"{"event": "update_event", "id": "x", "type": "sort"}"#),
            Err(SessionError::Json(_))
        ));
        assert!(matches!(Inbound::parse("not json"), Err(SessionError::Json(_))));
    }

    #[test]
    fn outbound_is_tagged_by_event() {
        let value = serde_json::to_value(Outbound::Response { id: "e1".into() }).unwrap();
        assert_eq!(value, json!({"event": "response", "id": "e1"}));

        let err = SessionError::UnknownEvent("log_event".into());
        let value = serde_json::to_value(Outbound::edit_error("e2", &err)).unwrap();
        assert_eq!(value["event"], json!("edit_error"));
        assert_eq!(value["type"], json!("validation_error"));
        assert_eq!(value["id"], json!("e2"));
    }
}
