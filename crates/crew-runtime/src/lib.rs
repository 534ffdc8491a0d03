//! Runs crew agents against an LLM provider
//!
//! [`AgentExecutor`] is the tool-calling loop, [`ExecutorAgent`] puts it
//! behind the [`crew_core::Agent`] trait, and [`AgentRuntime`] owns the
//! provider and tool registry agents are created from.

pub mod agent;
pub mod executor;
pub mod runtime;

pub use agent::ExecutorAgent;
pub use executor::{
    AgentExecutor, ExecutorConfig, ExecutorEventHandler, ExecutorOutput, NoOpEventHandler,
};
pub use runtime::{AgentRuntime, AgentRuntimeBuilder};
