

pub mod deletion;


pub use deletion::{DeletionManager, DeletionPlan, PlanExecutor, Planner, RemovalOutcome, RemovalTarget};
