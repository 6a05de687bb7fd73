use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

use super::audit::audit_locks;
use super::executor::PlanExecutor;
use super::models::{DeletionPlan, RemovalOutcome, RemovalTarget};
use super::planner::Planner;
use super::record::delete_record;
use crate::core::config::PurgeConfig;
use crate::core::context::RemovalContext;
use crate::core::error::{PurgeError, Result};
use crate::core::node::NodeId;
use crate::db::host::{ContentHost, RecordStore};


pub struct DeletionManager {
    host: Arc<dyn ContentHost>,
    // record store per owning container
    records: HashMap<NodeId, Arc<dyn RecordStore>>,
    config: PurgeConfig,
}

impl DeletionManager {
    pub fn new(host: Arc<dyn ContentHost>, config: PurgeConfig) -> Self {
        info!("Initializing DeletionManager ({:?} mode)", config.mode);
        Self {
            host,
            records: HashMap::new(),
            config,
        }
    }

    pub fn with_records(mut self, container: NodeId, records: Arc<dyn RecordStore>) -> Self {
        self.records.insert(container, records);
        self
    }

    pub fn config(&self) -> &PurgeConfig {
        &self.config
    }

    pub fn plan(&self, target: NodeId) -> Result<DeletionPlan> {
        Planner::new(self.host.as_ref(), &self.config).plan(target)
    }

    /// Dry run: plans the removal and reports foreign locks.
    pub fn check(&self, ctx: &RemovalContext<'_>, target: NodeId) -> Result<RemovalOutcome> {
        let _guard = ctx.span.enter();
        let plan = self.plan(target)?;
        let report = audit_locks(self.host.as_ref(), &plan, ctx.session, &self.config.locked_objects_key)?;
        Ok(RemovalOutcome::Audited { plan, report })
    }

    /// Plans and applies the removal without re-checking locks.
    pub async fn apply(&self, ctx: &RemovalContext<'_>, target: NodeId) -> Result<RemovalOutcome> {
        let plan = self.plan(target)?;
        let report = PlanExecutor::new(self.host.as_ref(), &self.config)
            .apply(ctx, &plan)
            .await;
        Ok(RemovalOutcome::Applied { plan, report })
    }

    pub async fn remove(
        &self,
        ctx: &RemovalContext<'_>,
        target: &RemovalTarget,
        check_only: bool,
    ) -> Result<RemovalOutcome> {
        ctx.record_target(target);
        info!("remove({}, check_only = {})", target, check_only);
        match target {
            RemovalTarget::Node { id } if check_only => self.check(ctx, *id),
            RemovalTarget::Node { id } => self.apply(ctx, *id).await,
            // records cannot hold a publish lock
            RemovalTarget::Record { .. } if check_only => Ok(RemovalOutcome::Skipped),
            RemovalTarget::Record { key, container } => {
                let Some(records) = self.records.get(container) else {
                    warn!("No record store configured for container {}", container);
                    return Err(PurgeError::InvalidTarget(format!("{} has no record store", target)));
                };
                let success = delete_record(records.as_ref(), ctx, key).await;
                Ok(RemovalOutcome::RecordDeleted { success })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::node::{LockState, Node, NodeKind};
    use crate::db::host::{RecordKey, SessionStore, StoreCopy};
    use crate::db::memory::{MemoryRecordStore, MemoryRepository, MemorySession, RecordingPresenter, RecordingTask};
    use serde_json::json;

    fn tree() -> Arc<MemoryRepository> {
        let repo = MemoryRepository::new();
        repo.insert(Node::new(1, "site", NodeKind::ReferenceFolder { start_node: None }));
        repo.insert(Node::new(2, "about", NodeKind::ReferenceFolder { start_node: None }).with_parent(1));
        repo.insert(Node::new(3, "contact", NodeKind::DocumentGroup).with_parent(1));
        repo.insert(Node::new(4, "team", NodeKind::DocumentGroup).with_parent(2).with_uid("team"));
        Arc::new(repo)
    }

    #[tokio::test]
    async fn test_check_then_apply() {
        let repo = tree();
        let manager = DeletionManager::new(repo.clone(), PurgeConfig::interactive());
        let (session, presenter, task) = (MemorySession::new(), RecordingPresenter::new(), RecordingTask::new());
        let ctx = RemovalContext::new(&session, &presenter, &task);
        let target = RemovalTarget::Node { id: NodeId(4) };

        let checked = manager.remove(&ctx, &target, true).await.unwrap();
        assert!(checked.success());
        assert!(repo.contains(NodeId(4)));

        let applied = manager.remove(&ctx, &target, false).await.unwrap();
        assert!(applied.success());
        assert!(!repo.contains(NodeId(4)));
        assert!(!repo.contains(NodeId(2)));
        assert!(repo.contains(NodeId(3)));
        assert_eq!(task.close_count(), 1);
    }

    #[tokio::test]
    async fn test_check_reports_blocked_release_target() {
        let repo = tree();
        repo.set_lock_state(NodeId(1), LockState::LockedByOther);
        let manager = DeletionManager::new(repo.clone(), PurgeConfig::interactive());
        let (session, presenter, task) = (MemorySession::new(), RecordingPresenter::new(), RecordingTask::new());
        let ctx = RemovalContext::new(&session, &presenter, &task);

        let outcome = manager.remove(&ctx, &RemovalTarget::Node { id: NodeId(4) }, true).await.unwrap();
        assert!(!outcome.success());
        assert_eq!(session.get("wfLockedObjects").unwrap(), json!([["reference_folder", "site"]]));
    }

    #[tokio::test]
    async fn test_record_paths() {
        let records = MemoryRecordStore::new();
        let key = RecordKey("event-3".to_string());
        records.insert(StoreCopy::Working, key.clone(), json!({}));
        records.insert(StoreCopy::Published, key.clone(), json!({}));

        let other = MemoryRecordStore::new();
        other.insert(StoreCopy::Published, key.clone(), json!({}));

        let manager = DeletionManager::new(tree(), PurgeConfig::interactive())
            .with_records(NodeId(3), Arc::new(records.clone()))
            .with_records(NodeId(4), Arc::new(other.clone()));
        let (session, presenter, task) = (MemorySession::new(), RecordingPresenter::new(), RecordingTask::new());
        let ctx = RemovalContext::new(&session, &presenter, &task);
        let target = RemovalTarget::Record { key: key.clone(), container: NodeId(3) };

        let skipped = manager.remove(&ctx, &target, true).await.unwrap();
        assert_eq!(skipped, RemovalOutcome::Skipped);
        assert!(records.contains(StoreCopy::Working, &key));

        let deleted = manager.remove(&ctx, &target, false).await.unwrap();
        assert_eq!(deleted, RemovalOutcome::RecordDeleted { success: true });
        assert!(!records.contains(StoreCopy::Published, &key));
        assert!(other.contains(StoreCopy::Published, &key));
    }

    #[tokio::test]
    async fn test_record_in_unknown_container_is_invalid() {
        let manager = DeletionManager::new(tree(), PurgeConfig::interactive())
            .with_records(NodeId(3), Arc::new(MemoryRecordStore::new()));
        let (session, presenter, task) = (MemorySession::new(), RecordingPresenter::new(), RecordingTask::new());
        let ctx = RemovalContext::new(&session, &presenter, &task);
        let target = RemovalTarget::Record { key: RecordKey("x".into()), container: NodeId(2) };

        let err = manager.remove(&ctx, &target, false).await.unwrap_err();
        assert!(matches!(err, PurgeError::InvalidTarget(_)));
    }

    #[tokio::test]
    async fn test_managed_mode_facade() {
        let repo = tree();
        let manager = DeletionManager::new(repo.clone(), PurgeConfig::managed());
        let plan = manager.plan(NodeId(3)).unwrap();
        assert_eq!(plan.to_delete(), &[NodeId(3)]);
        assert_eq!(plan.to_release(), &[NodeId(1)]);
    }
}
