use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::debug;

use crate::core::error::HostError;
use crate::core::node::{Category, NodeId};
use crate::db::host::{Progress, RecordKey};


#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    Delete,
    Release,
}


/// One walker decision, applied to the plan in the order produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub node: NodeId,
    pub disposition: Disposition,
}

impl Classification {
    pub fn delete(node: NodeId) -> Self {
        Self { node, disposition: Disposition::Delete }
    }

    pub fn release(node: NodeId) -> Self {
        Self { node, disposition: Disposition::Release }
    }
}


#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletionPlan {
    pub target: NodeId,
    to_delete: Vec<NodeId>,
    to_release: Vec<NodeId>,
}

impl DeletionPlan {
    pub fn new(target: NodeId) -> Self {
        Self {
            target,
            to_delete: Vec::new(),
            to_release: Vec::new(),
        }
    }

    /// Records `node` under `disposition` unless it was already classified.
    /// Returns whether the plan changed.
    pub fn classify(&mut self, node: NodeId, disposition: Disposition) -> bool {
        if let Some(existing) = self.disposition(node) {
            debug!("Element {} already classified as {:?}, ignoring {:?}", node, existing, disposition);
            return false;
        }
        match disposition {
            Disposition::Delete => self.to_delete.push(node),
            Disposition::Release => self.to_release.push(node),
        }
        true
    }

    pub fn apply(&mut self, classifications: impl IntoIterator<Item = Classification>) {
        for c in classifications {
            self.classify(c.node, c.disposition);
        }
    }

    pub fn to_delete(&self) -> &[NodeId] {
        &self.to_delete
    }

    /// Nodes to release, closest ancestor first.
    pub fn to_release(&self) -> &[NodeId] {
        &self.to_release
    }

    pub fn disposition(&self, node: NodeId) -> Option<Disposition> {
        if self.to_delete.contains(&node) {
            Some(Disposition::Delete)
        } else if self.to_release.contains(&node) {
            Some(Disposition::Release)
        } else {
            None
        }
    }

    pub fn is_empty(&self) -> bool {
        self.to_delete.is_empty() && self.to_release.is_empty()
    }

    /// `to_delete` followed by `to_release`.
    pub fn all(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.to_delete.iter().chain(self.to_release.iter()).copied()
    }
}


#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockedNode {
    pub id: NodeId,
    pub category: Category,
    pub identifier: String,
}


#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditReport {
    pub blocked: Vec<BlockedNode>,
    pub ok: bool,
}


#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Delete,
    Release,
}


#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    pub operation: OperationKind,
    /// Node a release was issued for; `None` for the bulk delete.
    pub node: Option<NodeId>,
    pub succeeded: BTreeSet<NodeId>,
    pub lock_failed: BTreeSet<NodeId>,
    pub permission_denied: BTreeSet<NodeId>,
    pub success: bool,
    pub finished_at: DateTime<Utc>,
}

impl ExecutionOutcome {
    pub fn from_progress(operation: OperationKind, node: Option<NodeId>, success: bool, progress: Progress) -> Self {
        Self {
            operation,
            node,
            succeeded: progress.succeeded,
            lock_failed: progress.lock_failed,
            permission_denied: progress.permission_denied,
            success,
            finished_at: Utc::now(),
        }
    }
}


#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    OperationUnavailable,
    Rejected,
    ReleasePermissionDenied,
}


#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationFailure {
    pub operation: OperationKind,
    pub node: Option<NodeId>,
    pub kind: FailureKind,
    pub message: String,
}

impl OperationFailure {
    pub fn new(operation: OperationKind, node: Option<NodeId>, error: &HostError) -> Self {
        let kind = match error {
            HostError::OperationUnavailable(_) => FailureKind::OperationUnavailable,
            HostError::PermissionDenied(_) if operation == OperationKind::Release => {
                FailureKind::ReleasePermissionDenied
            }
            _ => FailureKind::Rejected,
        };
        Self {
            operation,
            node,
            kind,
            message: error.to_string(),
        }
    }
}


#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub delete: Option<ExecutionOutcome>,
    pub releases: Vec<ExecutionOutcome>,
    pub failures: Vec<OperationFailure>,
    pub success: bool,
}

impl Default for ExecutionReport {
    fn default() -> Self {
        Self {
            delete: None,
            releases: Vec::new(),
            failures: Vec::new(),
            success: true,
        }
    }
}

impl ExecutionReport {
    pub fn record_outcome(&mut self, outcome: ExecutionOutcome) {
        self.success &= outcome.success;
        match outcome.operation {
            OperationKind::Delete => self.delete = Some(outcome),
            OperationKind::Release => self.releases.push(outcome),
        }
    }

    pub fn record_failure(&mut self, failure: OperationFailure) {
        self.failures.push(failure);
    }

    pub fn released(&self) -> BTreeSet<NodeId> {
        self.releases.iter().flat_map(|o| o.succeeded.iter().copied()).collect()
    }
}


#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RemovalTarget {
    Node { id: NodeId },
    /// A data record held by the record store of `container`.
    Record { key: RecordKey, container: NodeId },
}

impl std::fmt::Display for RemovalTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Node { id } => write!(f, "node {}", id),
            Self::Record { key, container } => write!(f, "record {} in {}", key, container),
        }
    }
}


#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RemovalOutcome {
    Audited { plan: DeletionPlan, report: AuditReport },
    Applied { plan: DeletionPlan, report: ExecutionReport },
    RecordDeleted { success: bool },
    Skipped,
}

impl RemovalOutcome {
    pub fn success(&self) -> bool {
        match self {
            Self::Audited { report, .. } => report.ok,
            Self::Applied { report, .. } => report.success,
            Self::RecordDeleted { success } => *success,
            Self::Skipped => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_is_final() {
        let mut plan = DeletionPlan::new(NodeId(1));
        assert!(plan.classify(NodeId(1), Disposition::Delete));
        assert!(!plan.classify(NodeId(1), Disposition::Release));
        assert_eq!(plan.to_delete(), &[NodeId(1)]);
        assert!(plan.to_release().is_empty());
    }

    #[test]
    fn test_deserialized_plan_keeps_classifications() {
        let mut plan = DeletionPlan::new(NodeId(1));
        plan.classify(NodeId(1), Disposition::Delete);
        plan.classify(NodeId(2), Disposition::Release);

        let json = serde_json::to_string(&plan).unwrap();
        let mut restored: DeletionPlan = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, plan);
        assert_eq!(restored.disposition(NodeId(1)), Some(Disposition::Delete));

        assert!(!restored.classify(NodeId(1), Disposition::Release));
        assert_eq!(restored.to_delete(), &[NodeId(1)]);
        assert_eq!(restored.to_release(), &[NodeId(2)]);
    }

    #[test]
    fn test_report_success_is_conjunction() {
        let mut report = ExecutionReport::default();
        assert!(report.success);

        let ok = ExecutionOutcome::from_progress(OperationKind::Delete, None, true, Progress::default());
        report.record_outcome(ok);
        assert!(report.success);

        let failed = ExecutionOutcome::from_progress(OperationKind::Release, Some(NodeId(2)), false, Progress::default());
        report.record_outcome(failed);
        assert!(!report.success);
        assert_eq!(report.releases.len(), 1);
    }

    #[test]
    fn test_target_display_names_container() {
        let target = RemovalTarget::Record { key: RecordKey("news-1".into()), container: NodeId(7) };
        assert_eq!(target.to_string(), "record news-1 in 7");
        assert_eq!(RemovalTarget::Node { id: NodeId(3) }.to_string(), "node 3");
    }

    #[test]
    fn test_failure_kind_from_error() {
        let failure = OperationFailure::new(OperationKind::Release, Some(NodeId(3)), &HostError::PermissionDenied(NodeId(3)));
        assert_eq!(failure.kind, FailureKind::ReleasePermissionDenied);

        let failure = OperationFailure::new(OperationKind::Delete, None, &HostError::OperationUnavailable("delete".into()));
        assert_eq!(failure.kind, FailureKind::OperationUnavailable);
    }
}
