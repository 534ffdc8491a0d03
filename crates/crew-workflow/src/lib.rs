//! Multi-agent orchestration for the stock crew
//!
//! A [`Crew`] runs a set of [`TaskSpec`]s, each assigned to an
//! [`AgentSpec`], over a static [`TaskGraph`]. Edges come from each task's
//! `context` list: a task sees the outputs of the tasks it names. The order
//! in which ready tasks run is decided by a [`SchedulingPolicy`], either
//! declaration order or a manager agent.

pub mod agent;
pub mod crew;
pub mod events;
pub mod graph;
pub mod policy;
pub mod task;
pub mod template;

// Re-export for convenience
pub use agent::AgentSpec;
pub use crew::{Crew, CrewBuilder, CrewOutput, Process};
pub use events::{CrewEventHandler, NoOpCrewEventHandler};
pub use graph::TaskGraph;
pub use policy::{ManagerPolicy, SchedulingPolicy, SequentialPolicy};
pub use task::{TaskOutput, TaskSpec};
