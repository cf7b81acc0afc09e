//! Plan and apply.

mod apply;
mod plan;
mod types;

pub use apply::Executor;
pub use plan::{Planner, check_steps};
pub use types::{ApplyError, Plan, PlanEntry, PlanError, StepResult, default_parallelism};
