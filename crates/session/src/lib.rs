pub mod api;
pub mod config;
pub mod error;
pub mod events;
pub mod saved_analysis;
pub mod session;
pub mod sheet_data;

pub use config::SessionConfig;
pub use error::SessionError;
pub use events::{ApiCall, EditEvent, Inbound, Outbound, UpdateKind};
pub use saved_analysis::{SAVED_ANALYSIS_VERSION, SavedAnalysis, SavedStep};
pub use session::Session;
pub use sheet_data::{AnalysisData, ColumnData, SheetData};
