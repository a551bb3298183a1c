//! CLI command implementations.
//!
//! - [`run`] - Play a tournament on a scenario
//! - [`validate`] - Check a scenario and describe its bid space

pub mod run;
pub mod validate;

pub use run::RunCommand;
pub use validate::ValidateCommand;
