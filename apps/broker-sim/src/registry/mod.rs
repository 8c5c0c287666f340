//! In-memory registries shared by the inbound path and the worker.

pub mod activity;
pub mod executions;
pub mod orders;

pub use activity::{ActivityEntry, ActivityLog, Direction};
pub use executions::ExecutionRegistry;
pub use orders::OrderRegistry;
