use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use stepsheet_core::names::is_valid_identifier;
use stepsheet_core::{AnalysisId, AnalysisInput, State, StepId, TableLoader};
use stepsheet_script::{Script, ScriptRunner};
use tracing::{debug, error, info, warn};

use crate::config::EngineConfig;
use crate::error::{EditError, ValidationError};
use crate::skip::steps_to_skip;
use crate::step::Step;
use crate::transpile::transpile_cached;

/// A step in history plus the state it produced, if that is still cached.
#[derive(Debug, Clone)]
pub struct StepRecord {
    pub step: Step,
    pub skipped: bool,
    /// Id counter the step first ran with. Re-executions mint from the same
    /// point so later steps keep referring to the columns they saw.
    column_id_base: Option<u64>,
    post_state: Option<Arc<State>>,
}

impl StepRecord {
    fn new(step: Step) -> Self {
        Self {
            step,
            skipped: false,
            column_id_base: None,
            post_state: None,
        }
    }

    fn uncached(&self) -> Self {
        Self {
            post_state: None,
            ..self.clone()
        }
    }

    pub fn column_id_base(&self) -> Option<u64> {
        self.column_id_base
    }

    /// The state this step should run against: `state` with the id counter
    /// moved up to where it stood the first time the step ran.
    fn prior_for(&self, state: &Arc<State>) -> Arc<State> {
        match self.column_id_base {
            Some(base) if state.id_counter() < base => {
                let mut prior = State::clone(state);
                prior.reserve_column_ids(base);
                Arc::new(prior)
            }
            Some(base) if state.id_counter() > base => {
                warn!(
                    step_kind_id = self.step.step_kind_id(),
                    base,
                    counter = state.id_counter(),
                    "column ids already minted past this step's base"
                );
                state.clone()
            }
            _ => state.clone(),
        }
    }
}

/// One row of the step list shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepSummary {
    pub step_id: StepId,
    pub step_idx: usize,
    pub step_kind_id: &'static str,
    pub step_display_name: &'static str,
    pub step_description: String,
}

/// Ordered step history with cached snapshots, undo and redo.
///
/// Index 0 is the initial state; index `i` is the state after the first `i`
/// steps. Every change runs against a copy of the history and is committed
/// only if every re-executed step succeeds, so a failure leaves the manager
/// exactly as it was.
pub struct StepsManager {
    analysis_id: AnalysisId,
    inputs: Vec<AnalysisInput>,
    loader: Box<dyn TableLoader>,
    initial: Arc<State>,
    records: Vec<StepRecord>,
    curr: usize,
    version: u64,
    config: EngineConfig,
}

impl StepsManager {
    pub fn new(
        inputs: Vec<AnalysisInput>,
        loader: Box<dyn TableLoader>,
        config: EngineConfig,
    ) -> Result<Self, EditError> {
        let initial = State::from_inputs(&inputs, loader.as_ref()).map_err(EditError::Initialize)?;
        initial
            .check_invariants()
            .map_err(|e| EditError::Invariant(e.to_string()))?;
        let analysis_id = AnalysisId::new();
        info!(analysis_id = %analysis_id, tables = initial.num_tables(), "analysis started");
        Ok(Self {
            analysis_id,
            inputs,
            loader,
            initial: Arc::new(initial),
            records: Vec::new(),
            curr: 0,
            version: 0,
            config,
        })
    }

    pub fn analysis_id(&self) -> AnalysisId {
        self.analysis_id
    }

    /// Bumped on every committed change.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn inputs(&self) -> &[AnalysisInput] {
        &self.inputs
    }

    pub fn initial_state(&self) -> &State {
        &self.initial
    }

    pub fn curr_step_idx(&self) -> usize {
        self.curr
    }

    /// Steps in history, including any that were undone.
    pub fn num_steps(&self) -> usize {
        self.records.len()
    }

    pub fn active_steps(&self) -> impl Iterator<Item = &Step> {
        self.records[..self.curr].iter().map(|r| &r.step)
    }

    pub fn records(&self) -> &[StepRecord] {
        &self.records[..self.curr]
    }

    pub fn current_state(&self) -> &State {
        self.curr
            .checked_sub(1)
            .and_then(|i| self.records[i].post_state.as_deref())
            .unwrap_or(&self.initial)
    }

    pub fn state_at(&self, index: usize) -> Result<&State, ValidationError> {
        if index == 0 {
            return Ok(&self.initial);
        }
        if index > self.curr {
            return Err(ValidationError::NoStepIndex {
                index,
                len: self.curr,
            });
        }
        Ok(self.records[index - 1]
            .post_state
            .as_deref()
            .unwrap_or(&self.initial))
    }

    /// Validate and execute a step, dropping any undone steps on success.
    pub fn apply(&mut self, step: Step) -> Result<(), EditError> {
        let kind = step.step_kind_id();
        if let Err(err) = step.performer().validate(self.current_state()) {
            warn!(step_kind_id = kind, error = %err, "edit rejected");
            return Err(err.into());
        }
        let mut records = self.records[..self.curr].to_vec();
        records.push(StepRecord::new(step));
        let end = records.len();
        let records = self.replay(records, end, &self.initial).inspect_err(|err| {
            warn!(step_kind_id = kind, error = %err, "edit failed");
        })?;
        self.commit(records, end);
        info!(step_kind_id = kind, curr = self.curr, version = self.version, "edit applied");
        Ok(())
    }

    /// Append several steps at once; if any fails none are kept.
    pub fn apply_all(&mut self, steps: Vec<Step>) -> Result<(), EditError> {
        let count = steps.len();
        let mut records = self.records[..self.curr].to_vec();
        records.extend(steps.into_iter().map(StepRecord::new));
        let end = records.len();
        let records = self.replay(records, end, &self.initial)?;
        self.commit(records, end);
        info!(steps = count, curr = self.curr, version = self.version, "steps replayed");
        Ok(())
    }

    /// Move the current position to `index`, keeping later steps redoable.
    pub fn undo_to(&mut self, index: usize) -> Result<(), EditError> {
        if index > self.records.len() {
            return Err(ValidationError::NoStepIndex {
                index,
                len: self.records.len(),
            }
            .into());
        }
        if index == self.curr {
            return Ok(());
        }
        let records = self.replay(self.records.clone(), index, &self.initial)?;
        self.commit(records, index);
        info!(curr = self.curr, version = self.version, "moved in history");
        Ok(())
    }

    /// Returns false when there was nothing to undo.
    pub fn undo(&mut self) -> Result<bool, EditError> {
        if self.curr == 0 {
            return Ok(false);
        }
        self.undo_to(self.curr - 1)?;
        Ok(true)
    }

    /// Returns false when there was nothing to redo.
    pub fn redo(&mut self) -> Result<bool, EditError> {
        if self.curr == self.records.len() {
            return Ok(false);
        }
        self.undo_to(self.curr + 1)?;
        Ok(true)
    }

    /// Roll back to the initial state. The steps stay redoable.
    pub fn clear(&mut self) -> Result<(), EditError> {
        self.undo_to(0)
    }

    /// Rename the initial tables and replay history on top of them.
    ///
    /// Undone steps are dropped, since they were recorded against the old names.
    pub fn replace_initial_names(&mut self, names: Vec<String>) -> Result<(), EditError> {
        let expected = self.initial.num_tables();
        if names.len() != expected {
            return Err(ValidationError::NameCount {
                expected,
                actual: names.len(),
            }
            .into());
        }
        let mut seen = HashSet::new();
        for name in &names {
            if !is_valid_identifier(name) || !seen.insert(name.as_str()) {
                return Err(ValidationError::InvalidDataframeName(name.clone()).into());
            }
        }

        let mut initial = State::clone(&self.initial);
        for (sheet_index, name) in names.into_iter().enumerate() {
            initial
                .rename_table(sheet_index, name)
                .map_err(EditError::Initialize)?;
        }
        let initial = Arc::new(initial);
        let records: Vec<StepRecord> = self.records[..self.curr].iter().map(StepRecord::uncached).collect();
        let end = records.len();
        let records = self.replay(records, end, &initial)?;
        self.initial = initial;
        self.commit(records, end);
        info!(version = self.version, "initial names replaced");
        Ok(())
    }

    pub fn step_summaries(&self) -> Vec<StepSummary> {
        self.records[..self.curr]
            .iter()
            .enumerate()
            .filter(|(_, record)| !record.skipped)
            .map(|(index, record)| {
                let prior = self.state_at(index).unwrap_or(&self.initial);
                let performer = record.step.performer();
                StepSummary {
                    step_id: record.step.step_id,
                    step_idx: index + 1,
                    step_kind_id: performer.step_kind_id(),
                    step_display_name: performer.step_display_name(),
                    step_description: performer.describe(prior.names()),
                }
            })
            .collect()
    }

    pub fn script(&self) -> Result<Script, EditError> {
        self.script_for(&self.records[..self.curr], &self.initial)
    }

    pub fn to_code(&self) -> Result<Vec<String>, EditError> {
        Ok(self.script()?.lines())
    }

    fn script_for(&self, records: &[StepRecord], initial: &Arc<State>) -> Result<Script, EditError> {
        let mut pairs = Vec::with_capacity(records.len());
        for (index, record) in records.iter().enumerate() {
            if record.skipped {
                continue;
            }
            let prior = match index {
                0 => initial.as_ref(),
                _ => records[index - 1]
                    .post_state
                    .as_deref()
                    .ok_or_else(|| EditError::Invariant(format!("no cached state before step {index}")))?,
            };
            pairs.push((&record.step, prior));
        }
        transpile_cached(&self.inputs, initial, pairs)
    }

    /// Recompute skip flags for `records[..end]` and re-execute from the
    /// first step whose flag changed or whose cached state is missing.
    fn replay(
        &self,
        mut records: Vec<StepRecord>,
        end: usize,
        initial: &Arc<State>,
    ) -> Result<Vec<StepRecord>, EditError> {
        let active: Vec<Step> = records[..end].iter().map(|r| r.step.clone()).collect();
        let skip = steps_to_skip(&active);
        let start = (0..end)
            .find(|&i| records[i].post_state.is_none() || records[i].skipped != skip.contains(&i))
            .unwrap_or(end);

        let mut state = match start {
            0 => initial.clone(),
            _ => records[start - 1]
                .post_state
                .clone()
                .ok_or_else(|| EditError::Invariant(format!("no cached state before step {start}")))?,
        };
        for (index, record) in records.iter_mut().enumerate().take(end).skip(start) {
            record.skipped = skip.contains(&index);
            if record.skipped {
                debug!(index, step_kind_id = record.step.step_kind_id(), "step skipped");
            } else {
                let prior = record.prior_for(&state);
                record.column_id_base = Some(prior.id_counter());
                let performer = record.step.performer();
                performer.validate(&prior)?;
                let post = performer.execute(&prior)?;
                if let Err(err) = post.check_invariants() {
                    error!(index, step_kind_id = performer.step_kind_id(), error = %err, "invariant violated");
                    return Err(EditError::Invariant(err.to_string()));
                }
                debug!(index, step_kind_id = performer.step_kind_id(), "step executed");
                state = Arc::new(post);
            }
            record.post_state = Some(state.clone());
        }
        if start < end {
            for record in &mut records[end..] {
                record.post_state = None;
            }
        }

        if self.config.verify_round_trip {
            self.verify_round_trip(&records[..end], initial, &state)?;
        }
        Ok(records)
    }

    /// Run the generated script and check it rebuilds `state` exactly.
    fn verify_round_trip(
        &self,
        records: &[StepRecord],
        initial: &Arc<State>,
        state: &State,
    ) -> Result<(), EditError> {
        let script = self.script_for(records, initial)?;
        let env = ScriptRunner::new(self.loader.as_ref())
            .run(&script)
            .map_err(|err| {
                error!(error = %err, "generated script failed");
                EditError::RoundTrip(err)
            })?;

        if env.len() != state.num_tables() {
            error!(script_tables = env.len(), state_tables = state.num_tables(), "round trip mismatch");
            return Err(EditError::Invariant(format!(
                "generated script defines {} tables, state has {}",
                env.len(),
                state.num_tables()
            )));
        }
        for (name, table) in state.names().iter().zip(state.tables()) {
            if env.get(name) != Some(table) {
                error!(table = %name, "round trip mismatch");
                return Err(EditError::Invariant(format!(
                    "table {name} differs from what the generated script produces"
                )));
            }
        }
        Ok(())
    }

    fn commit(&mut self, records: Vec<StepRecord>, curr: usize) {
        self.records = records;
        self.curr = curr;
        self.version += 1;
    }
}
