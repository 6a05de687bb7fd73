pub mod models;
pub mod walker;
pub mod planner;
pub mod audit;
pub mod executor;
pub mod record;
pub mod manager;


pub use models::{
    AuditReport, BlockedNode, Classification, DeletionPlan, Disposition, ExecutionOutcome,
    ExecutionReport, FailureKind, OperationFailure, OperationKind, RemovalOutcome, RemovalTarget,
};
pub use walker::walk_parent_path;
pub use planner::Planner;
pub use audit::{audit_locks, store_locked_objects};
pub use executor::PlanExecutor;
pub use record::delete_record;
pub use manager::DeletionManager;
