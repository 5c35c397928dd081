use serde::{Deserialize, Serialize};
use serde_json::Value;
use stepsheet_engine::steps::BulkOldRenameParams;
use stepsheet_engine::{Step, StepParams};

use crate::error::SessionError;

/// Format version written into new saved analyses.
pub const SAVED_ANALYSIS_VERSION: &str = "0.2.0";

/// Analyses saved before this version refer to columns by legacy ids.
pub const SYNTHETIC_IDS_SINCE: &str = "0.1.200";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedStep {
    pub step_version: u32,
    pub step_type: String,
    pub params: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedAnalysis {
    pub version: String,
    pub steps_data: Vec<SavedStep>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
}

impl SavedAnalysis {
    pub fn from_steps<'a>(steps: impl IntoIterator<Item = &'a Step>) -> Result<Self, SessionError> {
        let steps_data = steps
            .into_iter()
            .map(|step| {
                Ok(SavedStep {
                    step_version: step.performer().step_version(),
                    step_type: step.step_kind_id().to_string(),
                    params: step.params.params_value()?,
                })
            })
            .collect::<Result<Vec<_>, SessionError>>()?;
        let checksum = checksum_of(&steps_data)?;
        Ok(Self {
            version: SAVED_ANALYSIS_VERSION.to_string(),
            steps_data,
            checksum: Some(checksum),
        })
    }

    pub fn parse(raw: &str) -> Result<Self, SessionError> {
        Self::from_value(serde_json::from_str(raw)?)
    }

    /// Accepts both the current layout and the older one where steps were a
    /// map from 1-based position to step, params inlined.
    pub fn from_value(value: Value) -> Result<Self, SessionError> {
        if value.get("steps_data").is_some() {
            return Ok(serde_json::from_value(value)?);
        }
        let Value::Object(mut fields) = value else {
            return Err(SessionError::SavedAnalysis("expected an object".into()));
        };
        let version = match fields.remove("version") {
            Some(Value::String(version)) => version,
            _ => return Err(SessionError::SavedAnalysis("missing version".into())),
        };
        let Some(Value::Object(steps)) = fields.remove("steps") else {
            return Err(SessionError::SavedAnalysis("missing steps".into()));
        };

        let mut numbered = Vec::with_capacity(steps.len());
        for (position, step) in steps {
            let position: usize = position
                .parse()
                .map_err(|_| SessionError::SavedAnalysis(format!("step key {position:?} is not a number")))?;
            numbered.push((position, legacy_step(step)?));
        }
        numbered.sort_by_key(|(position, _)| *position);
        Ok(Self {
            version,
            steps_data: numbered.into_iter().map(|(_, step)| step).collect(),
            checksum: None,
        })
    }

    pub fn verify(&self) -> Result<(), SessionError> {
        let Some(expected) = &self.checksum else {
            return Ok(());
        };
        let found = checksum_of(&self.steps_data)?;
        if *expected != found {
            return Err(SessionError::Checksum {
                expected: expected.clone(),
                found,
            });
        }
        Ok(())
    }

    /// Verify and turn the saved steps into fresh steps ready to replay.
    pub fn into_steps(self) -> Result<Vec<Step>, SessionError> {
        self.verify()?;
        let mut steps = Vec::with_capacity(self.steps_data.len() + 1);
        if is_prev_version(&self.version, SYNTHETIC_IDS_SINCE)? {
            steps.push(Step::new(StepParams::BulkOldRename(BulkOldRenameParams::default())));
        }
        for saved in self.steps_data {
            steps.push(Step::new(StepParams::from_parts(&saved.step_type, saved.params)?));
        }
        Ok(steps)
    }
}

fn legacy_step(step: Value) -> Result<SavedStep, SessionError> {
    let Value::Object(mut fields) = step else {
        return Err(SessionError::SavedAnalysis("expected each step to be an object".into()));
    };
    let step_type = match fields.remove("step_type") {
        Some(Value::String(step_type)) => step_type,
        _ => return Err(SessionError::SavedAnalysis("step is missing step_type".into())),
    };
    let step_version = fields
        .remove("step_version")
        .and_then(|v| v.as_u64())
        .and_then(|v| u32::try_from(v).ok())
        .unwrap_or(1);
    Ok(SavedStep {
        step_version,
        step_type,
        params: Value::Object(fields),
    })
}

/// Hex blake3 digest of the msgpack-encoded steps.
pub fn checksum_of(steps: &[SavedStep]) -> Result<String, SessionError> {
    let bytes = rmp_serde::to_vec(steps)?;
    Ok(blake3::hash(&bytes).to_hex().to_string())
}

/// Whether dotted version `version` is strictly older than `than`.
pub fn is_prev_version(version: &str, than: &str) -> Result<bool, SessionError> {
    Ok(parse_version(version)? < parse_version(than)?)
}

fn parse_version(version: &str) -> Result<Vec<u64>, SessionError> {
    version
        .split('.')
        .map(|part| {
            part.trim()
                .parse()
                .map_err(|_| SessionError::SavedAnalysis(format!("{version:?} is not a dotted version")))
        })
        .collect()
}
