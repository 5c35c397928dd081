use serde_json::Value;
use stepsheet_core::{AnalysisInput, TableLoader};
use stepsheet_engine::{Step, StepParams, StepsManager};
use tracing::{debug, error, info, warn};

use crate::api;
use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::events::{ApiCall, EditEvent, Inbound, Outbound, UpdateKind, message_id};
use crate::saved_analysis::SavedAnalysis;
use crate::sheet_data::{AnalysisData, SheetData};

/// Edit dispatcher for one analysis.
///
/// Every inbound message gets a structured answer; failures become
/// `edit_error` payloads and leave the analysis untouched.
pub struct Session {
    config: SessionConfig,
    manager: StepsManager,
}

impl Session {
    pub fn new(
        inputs: Vec<AnalysisInput>,
        loader: Box<dyn TableLoader>,
        config: SessionConfig,
    ) -> Result<Self, SessionError> {
        let manager = StepsManager::new(inputs, loader, config.engine.clone())?;
        Ok(Self { config, manager })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn manager(&self) -> &StepsManager {
        &self.manager
    }

    pub fn analysis_name(&self) -> String {
        format!("{}{}", self.config.analysis_name_prefix, self.manager.analysis_id())
    }

    /// Handle one raw JSON message and return everything to send back.
    pub fn receive_message(&mut self, raw: &str) -> Vec<Outbound> {
        let inbound = match Inbound::parse(raw) {
            Ok(inbound) => inbound,
            Err(err) => {
                let id = serde_json::from_str::<Value>(raw)
                    .map(|message| message_id(&message))
                    .unwrap_or_default();
                warn!(id = %id, error = %err, "message rejected");
                return vec![Outbound::edit_error(id, &err)];
            }
        };

        let (id, result) = match inbound {
            Inbound::Edit(edit) => {
                let id = edit.id.clone();
                let result = self.handle_edit(edit).and_then(|()| self.acknowledge(&id));
                (id, result)
            }
            Inbound::Update { id, update } => {
                let result = self.handle_update(update).and_then(|()| self.acknowledge(&id));
                (id, result)
            }
            Inbound::Api { id, call } => {
                let result = self.handle_api(&call).map(|data| {
                    vec![Outbound::ApiResponse {
                        id: id.clone(),
                        version: self.manager.version(),
                        data,
                    }]
                });
                (id, result)
            }
        };

        result.unwrap_or_else(|err| {
            match &err {
                SessionError::Edit(edit) if edit.is_fatal() => {
                    error!(id = %id, error = %err, "state invariant violated");
                }
                _ => warn!(id = %id, error = %err, "message failed"),
            }
            vec![Outbound::edit_error(id, &err)]
        })
    }

    pub fn handle_edit(&mut self, edit: EditEvent) -> Result<(), SessionError> {
        let params = StepParams::from_parts(&edit.step_kind_id, edit.params)?;
        let step = match edit.step_id {
            Some(step_id) => Step::with_id(step_id, params),
            None => Step::new(params),
        };
        self.manager.apply(step)?;
        Ok(())
    }

    pub fn handle_update(&mut self, update: UpdateKind) -> Result<(), SessionError> {
        match update {
            UpdateKind::DfNamesUpdate { df_names } => self.manager.replace_initial_names(df_names)?,
            UpdateKind::Undo => {
                if !self.manager.undo()? {
                    debug!("nothing to undo");
                }
            }
            UpdateKind::Redo => {
                if !self.manager.redo()? {
                    debug!("nothing to redo");
                }
            }
            UpdateKind::UndoTo { step_index } => self.manager.undo_to(step_index)?,
            UpdateKind::Clear => self.manager.clear()?,
            UpdateKind::ReplayAnalysis { analysis } => self.replay_analysis(SavedAnalysis::from_value(analysis)?)?,
        }
        info!(
            curr_step_idx = self.manager.curr_step_idx(),
            version = self.manager.version(),
            "update applied"
        );
        Ok(())
    }

    pub fn handle_api(&self, call: &ApiCall) -> Result<Value, SessionError> {
        debug!(call = ?call, "api call");
        let state = self.manager.current_state();
        match call {
            ApiCall::GetColumnDescribe { sheet_index, column_id } => {
                api::column_describe(state, *sheet_index, column_id)
            }
            ApiCall::GetUniqueValueCounts { sheet_index, column_id } => {
                api::unique_value_counts(state, *sheet_index, column_id)
            }
            ApiCall::GetCode => Ok(serde_json::to_value(self.manager.to_code()?)?),
        }
    }

    pub fn sheet_data(&self) -> Result<Vec<SheetData>, SessionError> {
        Ok(SheetData::all(self.manager.current_state(), self.config.max_rows)?)
    }

    pub fn analysis_data(&self) -> Result<AnalysisData, SessionError> {
        Ok(AnalysisData {
            analysis_name: self.analysis_name(),
            code: self.manager.to_code()?,
            step_summary_list: self.manager.step_summaries(),
            curr_step_idx: self.manager.curr_step_idx(),
            version: self.manager.version(),
        })
    }

    pub fn refresh(&self) -> Result<Outbound, SessionError> {
        Ok(Outbound::Refresh {
            sheet_data: self.sheet_data()?,
            analysis_data: self.analysis_data()?,
        })
    }

    /// The active, unskipped steps in saved-analysis form. Step ids are not
    /// saved, so superseded steps are left out rather than replayed.
    pub fn saved_analysis(&self) -> Result<SavedAnalysis, SessionError> {
        SavedAnalysis::from_steps(
            self.manager
                .records()
                .iter()
                .filter(|record| !record.skipped)
                .map(|record| &record.step),
        )
    }

    /// Append every step of a saved analysis. If any step fails, none are kept.
    pub fn replay_analysis(&mut self, analysis: SavedAnalysis) -> Result<(), SessionError> {
        let version = analysis.version.clone();
        let steps = analysis.into_steps()?;
        let count = steps.len();
        self.manager.apply_all(steps)?;
        info!(version = %version, steps = count, "analysis replayed");
        Ok(())
    }

    fn acknowledge(&self, id: &str) -> Result<Vec<Outbound>, SessionError> {
        Ok(vec![Outbound::Response { id: id.to_string() }, self.refresh()?])
    }
}
