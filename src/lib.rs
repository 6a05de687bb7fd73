//! Delete/release planning for hierarchical content repositories.
//!
//! Removing a node can leave ancestor folders empty and unreferenced, or
//! change a container that must then be republished. [`toolkit::deletion`]
//! computes both sets, audits them for foreign locks, and applies them
//! against a [`db::ContentHost`].

pub mod core;
pub mod db;
pub mod toolkit;


pub use crate::core::config::{DeploymentMode, PurgeConfig};
pub use crate::core::error::{HostError, PurgeError, Result};
pub use crate::core::node::{Category, Node, NodeId, NodeKind};
pub use toolkit::deletion::{DeletionManager, DeletionPlan, RemovalOutcome, RemovalTarget};


pub const LOCKED_OBJECTS_KEY: &str = "wfLockedObjects";
