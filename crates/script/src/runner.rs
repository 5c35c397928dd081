use std::collections::BTreeMap;

use stepsheet_core::{CoreError, Table, TableLoader, pivot_table};
use tracing::debug;

use crate::error::ScriptError;
use crate::statement::{Script, Statement};

/// The variables a script leaves bound after it runs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Environment {
    vars: BTreeMap<String, Table>,
}

impl Environment {
    pub fn get(&self, var: &str) -> Option<&Table> {
        self.vars.get(var)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.vars.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    fn table_mut(&mut self, var: &str) -> Result<&mut Table, ScriptError> {
        self.vars
            .get_mut(var)
            .ok_or_else(|| ScriptError::UndefinedVariable(var.to_string()))
    }

    fn take(&mut self, var: &str) -> Result<Table, ScriptError> {
        self.vars
            .remove(var)
            .ok_or_else(|| ScriptError::UndefinedVariable(var.to_string()))
    }
}

/// Executes a [`Script`] with the same semantics the rendered pandas code has.
pub struct ScriptRunner<'a> {
    loader: &'a dyn TableLoader,
}

impl<'a> ScriptRunner<'a> {
    pub fn new(loader: &'a dyn TableLoader) -> Self {
        Self { loader }
    }

    pub fn run(&self, script: &Script) -> Result<Environment, ScriptError> {
        let mut env = Environment::default();
        for (index, statement) in script.statements().iter().enumerate() {
            self.execute(&mut env, statement)
                .map_err(|source| ScriptError::Statement {
                    index,
                    source: Box::new(source),
                })?;
        }
        debug!(statements = script.statements().len(), vars = env.len(), "script run complete");
        Ok(env)
    }

    fn execute(&self, env: &mut Environment, statement: &Statement) -> Result<(), ScriptError> {
        match statement {
            Statement::Construct { var, table } => {
                env.vars.insert(var.clone(), table.deep_copy());
            }
            Statement::ReadCsv { var, path } => {
                let table = self.loader.load(path)?;
                env.vars.insert(var.clone(), table);
            }
            Statement::RenameColumns { var, renames } => {
                env.table_mut(var)?.rename_columns(renames)?;
            }
            Statement::DropColumns { var, headers } => {
                let table = env.table_mut(var)?;
                for header in headers {
                    table.drop_column(header)?;
                }
            }
            Statement::InsertColumn { var, index, header, fill } => {
                let table = env.table_mut(var)?;
                if *index > table.num_columns() {
                    return Err(CoreError::InvalidData(format!("insert index {index} out of bounds")).into());
                }
                table.insert_column(*index, header.clone(), fill.clone())?;
            }
            Statement::MoveColumn { var, header, index } => {
                env.table_mut(var)?.move_column(header, *index)?;
            }
            Statement::FilterRows { var, header, spec } => {
                let table = env.table_mut(var)?;
                let mask = spec.mask(table.column(header)?.values());
                table.retain_rows(&mask)?;
            }
            Statement::CastToFloat { var, header } => {
                env.table_mut(var)?.cast_to_float(header)?;
            }
            Statement::SetCell { var, row, header, value } => {
                env.table_mut(var)?.set_cell(*row, header, value.clone())?;
            }
            Statement::CopyTable { from, to } => {
                let copy = env
                    .get(from)
                    .ok_or_else(|| ScriptError::UndefinedVariable(from.clone()))?
                    .deep_copy();
                env.vars.insert(to.clone(), copy);
            }
            Statement::DeleteTable { var } => {
                env.take(var)?;
            }
            Statement::RenameTable { from, to } => {
                let table = env.take(from)?;
                env.vars.insert(to.clone(), table);
            }
            Statement::Pivot { source, target, spec } => {
                let source = env
                    .get(source)
                    .ok_or_else(|| ScriptError::UndefinedVariable(source.clone()))?;
                let pivoted = pivot_table(source, spec)?;
                env.vars.insert(target.clone(), pivoted);
            }
            Statement::SetColumn { var, header, expr } => {
                let table = env.table_mut(var)?;
                let values = expr.evaluate(table)?;
                table.replace_values(header, values)?;
            }
        }
        Ok(())
    }
}
