//! Tools agents can call, and the registry they are looked up in

pub mod registry;
pub mod schema;
pub mod tool;

pub use registry::ToolRegistry;
pub use tool::Tool;
