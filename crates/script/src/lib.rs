pub mod error;
pub mod literal;
pub mod runner;
pub mod statement;

pub use error::ScriptError;
pub use runner::{Environment, ScriptRunner};
pub use statement::{PRELUDE, Script, Statement};
