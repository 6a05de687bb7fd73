pub mod config;
pub mod context;
pub mod error;
pub mod filter;
pub mod node;
pub mod telemetry;

pub use self::config::{DeploymentMode, PurgeConfig};
pub use context::RemovalContext;
pub use error::{HostError, PurgeError, Result};
pub use filter::CategoryFilter;
pub use node::{Category, LockState, Node, NodeId, NodeKind, ReleaseState};
pub use telemetry::init_tracing;
