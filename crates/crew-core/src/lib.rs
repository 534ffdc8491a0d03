//! Shared vocabulary of the crew engine
//!
//! [`Agent`] is what tasks run on, [`Context`] carries a run's inputs and
//! token usage, and [`Error`] is the error every engine crate returns.

pub mod agent;
pub mod context;
pub mod error;

pub use agent::Agent;
pub use context::{Context, UsageMetrics};
pub use error::{Error, Result};
