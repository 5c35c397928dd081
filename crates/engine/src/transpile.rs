use stepsheet_core::{AnalysisInput, ColumnHeader, State};
use stepsheet_script::{Script, Statement};

use crate::error::EditError;
use crate::skip::steps_to_skip;
use crate::step::Step;

/// One statement per initial table binding it to its name.
pub fn seed_statements(inputs: &[AnalysisInput], initial: &State) -> Result<Vec<Statement>, EditError> {
    inputs
        .iter()
        .enumerate()
        .map(|(sheet_index, input)| {
            let var = initial
                .name(sheet_index)
                .map_err(EditError::Initialize)?
                .to_string();
            Ok(match input {
                AnalysisInput::Table { .. } => Statement::Construct {
                    var,
                    table: initial.table(sheet_index).map_err(EditError::Initialize)?.clone(),
                },
                AnalysisInput::ImportPath(path) => Statement::ReadCsv {
                    var,
                    path: path.clone(),
                },
            })
        })
        .collect()
}

/// Generate the script for `steps`, executing each to find the state before the next.
pub fn transpile(inputs: &[AnalysisInput], initial: &State, steps: &[Step]) -> Result<Script, EditError> {
    let skipped = steps_to_skip(steps);
    let mut statements = seed_statements(inputs, initial)?;
    let mut state = initial.clone();
    for (index, step) in steps.iter().enumerate() {
        if skipped.contains(&index) {
            continue;
        }
        let performer = step.performer();
        performer.validate(&state)?;
        statements.extend(performer.transpile(&state)?);
        state = performer.execute(&state)?;
    }
    Ok(Script::new(fold_renames(statements)))
}

/// Generate the script from steps paired with the state each one ran against.
///
/// Callers pass only the steps that were executed, skipped ones excluded.
pub fn transpile_cached<'a>(
    inputs: &[AnalysisInput],
    initial: &State,
    steps: impl IntoIterator<Item = (&'a Step, &'a State)>,
) -> Result<Script, EditError> {
    let mut statements = seed_statements(inputs, initial)?;
    for (step, prior) in steps {
        statements.extend(step.performer().transpile(prior)?);
    }
    Ok(Script::new(fold_renames(statements)))
}

/// Merge back-to-back column renames on the same table into one statement.
///
/// `A -> B` followed by `B -> C` becomes `A -> C`; a chain that returns a
/// column to its original header disappears.
pub fn fold_renames(statements: Vec<Statement>) -> Vec<Statement> {
    let mut folded: Vec<Statement> = Vec::with_capacity(statements.len());
    for statement in statements {
        let Statement::RenameColumns { var, renames } = statement else {
            folded.push(statement);
            continue;
        };
        match folded.last_mut() {
            Some(Statement::RenameColumns {
                var: prev_var,
                renames: prev,
            }) if *prev_var == var => {
                merge_renames(prev, renames);
                if prev.is_empty() {
                    folded.pop();
                }
            }
            _ => {
                let renames: Vec<_> = renames.into_iter().filter(|(from, to)| from != to).collect();
                if !renames.is_empty() {
                    folded.push(Statement::RenameColumns { var, renames });
                }
            }
        }
    }
    folded
}

fn merge_renames(prev: &mut Vec<(ColumnHeader, ColumnHeader)>, next: Vec<(ColumnHeader, ColumnHeader)>) {
    for (from, to) in next {
        match prev.iter_mut().find(|(_, target)| *target == from) {
            Some(pair) => pair.1 = to,
            None => prev.push((from, to)),
        }
    }
    prev.retain(|(from, to)| from != to);
}
