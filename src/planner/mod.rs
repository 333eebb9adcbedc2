//! Planning and execution of deployments.
//!
//! This module turns a pair of snapshots into an executable plan:
//! the diff engine classifies resources, the dependency graph orders
//! the resulting steps, and the executor applies them through
//! providers.

mod diff;
mod executor;
mod graph;
mod plan;

pub use diff::{ChangeKind, DiffEngine, PlannedChange, SnapshotDiff};
pub use executor::{Progress, StepFailure};
pub use plan::{Plan, PlanContext, Step, StepOp, Steps};
