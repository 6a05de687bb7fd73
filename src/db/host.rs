

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::core::error::HostError;
use crate::core::filter::CategoryFilter;
use crate::core::node::{Node, NodeId};


/// Read side of the content tree.
pub trait NodeQuery: Send + Sync {
    fn node(&self, id: NodeId) -> Result<Node, HostError>;

    /// Children restricted to `filter`, in the host's order. Restartable:
    /// every call yields a fresh iterator.
    fn children<'a>(
        &'a self,
        id: NodeId,
        filter: &'a CategoryFilter,
        recursive: bool,
    ) -> Result<Box<dyn Iterator<Item = NodeId> + 'a>, HostError>;

    fn parent(&self, id: NodeId) -> Result<Option<NodeId>, HostError> {
        Ok(self.node(id)?.parent)
    }
}


/// Per-element breakdown of a finished bulk operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub succeeded: BTreeSet<NodeId>,
    pub lock_failed: BTreeSet<NodeId>,
    pub permission_denied: BTreeSet<NodeId>,
}


#[async_trait]
pub trait OperationHandle: Send {
    /// Blocks until the server-side job finishes.
    async fn await_result(&mut self) -> Result<bool, HostError>;

    fn progress(&self) -> Progress;
}


#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependentRelease {
    /// Lift visibility only for dependents that are not yet visible.
    #[default]
    NewOnly,
    All,
    None,
}


#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseOptions {
    pub new_descendants_only: bool,
    pub accessibility_limited: bool,
    pub recursive: bool,
    pub dependent: DependentRelease,
}

impl ReleaseOptions {
    pub fn new_only() -> Self {
        Self {
            new_descendants_only: true,
            accessibility_limited: true,
            recursive: false,
            dependent: DependentRelease::NewOnly,
        }
    }
}


/// Mutating side of the content tree.
#[async_trait]
pub trait ContentHost: NodeQuery {
    async fn set_lock(&self, id: NodeId, acquire: bool, exclusive: bool) -> Result<(), HostError>;

    async fn refresh(&self, id: NodeId) -> Result<(), HostError>;

    async fn bulk_delete(
        &self,
        ids: &[NodeId],
        ignore_references: bool,
    ) -> Result<Box<dyn OperationHandle>, HostError>;

    async fn bulk_release(
        &self,
        id: NodeId,
        options: ReleaseOptions,
    ) -> Result<Box<dyn OperationHandle>, HostError>;
}


/// Request-scoped key/value store shared with later workflow steps.
pub trait SessionStore: Send + Sync {
    fn put(&self, key: &str, value: serde_json::Value);

    fn get(&self, key: &str) -> Option<serde_json::Value>;
}


pub trait Presenter: Send + Sync {
    fn show_error(&self, title: &str, body: &str);
}


/// The workflow task that requested the removal.
pub trait WorkflowTask: Send + Sync {
    fn close(&self) -> Result<(), HostError>;
}


#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreCopy {
    Working,
    Published,
}


#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordKey(pub String);

impl std::fmt::Display for RecordKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}


#[async_trait]
pub trait RecordSession: Send {
    async fn find(&mut self, key: &RecordKey) -> Result<Option<serde_json::Value>, HostError>;

    async fn delete(&mut self, key: &RecordKey) -> Result<(), HostError>;

    async fn commit(&mut self) -> Result<(), HostError>;

    async fn rollback(&mut self) -> Result<(), HostError>;
}


/// Transactional record storage plus the container that owns the records.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn open_session(&self, copy: StoreCopy) -> Result<Box<dyn RecordSession>, HostError>;

    async fn set_container_lock(&self, acquire: bool, exclusive: bool) -> Result<(), HostError>;

    async fn save_container(&self) -> Result<(), HostError>;
}
