pub mod column_ids;
pub mod error;
pub mod filter;
pub mod format;
pub mod formula;
pub mod header;
pub mod ids;
pub mod input;
pub mod names;
pub mod pivot;
pub mod state;
pub mod table;
pub mod value;

pub use column_ids::{ColumnIdMap, IdScheme};
pub use error::CoreError;
pub use filter::{FilterCondition, FilterOperator, FilterSpec};
pub use format::FormatType;
pub use formula::{BinaryOp, Expr, normalize_formula, parse_formula};
pub use header::ColumnHeader;
pub use ids::*;
pub use pivot::{Aggregation, PivotSpec, pivot_table};
pub use input::{AnalysisInput, MemoryLoader, TableLoader};
pub use state::{AddTable, ColumnField, Provenance, State};
pub use table::{Column, Table};
pub use value::{CellValue, ColumnType};
