use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::CoreError;
use crate::names::{first_unused_name, valid_dataframe_name};
use crate::state::{AddTable, Provenance, State};
use crate::table::Table;

/// One argument an analysis is started with.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisInput {
    /// A table handed over directly, optionally with the caller's variable name.
    Table { name: Option<String>, table: Table },
    /// A file the host knows how to read.
    ImportPath(PathBuf),
}

impl AnalysisInput {
    pub fn table(table: Table) -> Self {
        Self::Table { name: None, table }
    }

    pub fn named_table(name: impl Into<String>, table: Table) -> Self {
        Self::Table {
            name: Some(name.into()),
            table,
        }
    }

    pub fn import(path: impl Into<PathBuf>) -> Self {
        Self::ImportPath(path.into())
    }
}

/// Reads the files behind [`AnalysisInput::ImportPath`].
pub trait TableLoader {
    fn load(&self, path: &Path) -> Result<Table, CoreError>;
}

/// A loader backed by tables the host already holds in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryLoader {
    tables: HashMap<PathBuf, Table>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, path: impl Into<PathBuf>, table: Table) -> Self {
        self.tables.insert(path.into(), table);
        self
    }
}

impl TableLoader for MemoryLoader {
    fn load(&self, path: &Path) -> Result<Table, CoreError> {
        self.tables.get(path).cloned().ok_or_else(|| CoreError::Import {
            path: path.display().to_string(),
            reason: "no such file".into(),
        })
    }
}

impl State {
    /// Build the initial state, loading every import path once.
    pub fn from_inputs(inputs: &[AnalysisInput], loader: &dyn TableLoader) -> Result<Self, CoreError> {
        let mut state = State::new();
        for input in inputs {
            match input {
                AnalysisInput::Table { name, table } => {
                    let options = match name {
                        Some(name) => AddTable::append().named(first_unused_name(state.names(), name)),
                        None => AddTable::append(),
                    };
                    state.add_table(table.clone(), Provenance::Passed, options)?;
                }
                AnalysisInput::ImportPath(path) => {
                    let table = loader.load(path)?;
                    let stem = path
                        .file_stem()
                        .map(|s| s.to_string_lossy().into_owned())
                        .unwrap_or_default();
                    let name = valid_dataframe_name(state.names(), &stem);
                    state.add_table(table, Provenance::Imported, AddTable::append().named(name))?;
                }
            }
        }
        Ok(state)
    }
}
