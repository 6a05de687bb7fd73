use serde_json::json;
use tracing::{info, warn};

use super::models::{AuditReport, BlockedNode, DeletionPlan};
use crate::core::error::HostError;
use crate::db::host::{NodeQuery, SessionStore};


/// Reports every planned node held by another session's lock.
///
/// Nothing is mutated on the store. The blocked list is also written to
/// `session` under `key` as `[category, identifier]` pairs for the dialog
/// that follows a failed check.
pub fn audit_locks<Q>(
    query: &Q,
    plan: &DeletionPlan,
    session: &dyn SessionStore,
    key: &str,
) -> Result<AuditReport, HostError>
where
    Q: NodeQuery + ?Sized,
{
    let mut blocked = Vec::new();

    for id in plan.all() {
        let node = query.node(id)?;
        if node.lock.is_foreign() {
            warn!("Element {} is locked on the server by another session", id);
            blocked.push(BlockedNode {
                id,
                category: node.category(),
                identifier: node.display_identifier().to_string(),
            });
        }
    }

    store_locked_objects(session, key, &blocked);

    let ok = blocked.is_empty();
    info!("Lock audit finished: {} blocked, ok = {}", blocked.len(), ok);
    Ok(AuditReport { blocked, ok })
}


pub fn store_locked_objects(session: &dyn SessionStore, key: &str, blocked: &[BlockedNode]) {
    let pairs: Vec<_> = blocked
        .iter()
        .map(|b| json!([b.category.as_str(), b.identifier]))
        .collect();
    session.put(key, serde_json::Value::Array(pairs));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::node::{Category, LockState, Node, NodeId, NodeKind};
    use crate::db::memory::{MemoryRepository, MemorySession};
    use crate::toolkit::deletion::models::Disposition;

    fn repo() -> MemoryRepository {
        let repo = MemoryRepository::new();
        repo.insert(Node::new(1, "Media", NodeKind::MediaFolder).with_lock(LockState::LockedByOther));
        repo.insert(Node::new(2, "Logo", NodeKind::Media).with_parent(1).with_uid("logo"));
        repo.insert(Node::new(3, "Banner", NodeKind::Media).with_parent(1).with_lock(LockState::LockedBySelf));
        repo
    }

    #[test]
    fn test_foreign_locks_are_blocked_in_plan_order() {
        let repo = repo();
        repo.set_lock_state(NodeId(2), LockState::LockedByOther);
        let mut plan = DeletionPlan::new(NodeId(2));
        plan.classify(NodeId(2), Disposition::Delete);
        plan.classify(NodeId(3), Disposition::Delete);
        plan.classify(NodeId(1), Disposition::Release);

        let session = MemorySession::new();
        let report = audit_locks(&repo, &plan, &session, "wfLockedObjects").unwrap();

        assert!(!report.ok);
        let ids: Vec<_> = report.blocked.iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![NodeId(2), NodeId(1)]);
        assert_eq!(report.blocked[1].category, Category::MediaFolder);
        assert_eq!(
            session.get("wfLockedObjects").unwrap(),
            json!([["media", "logo"], ["media_folder", "Media"]])
        );
    }

    #[test]
    fn test_self_lock_does_not_block() {
        let repo = repo();
        let mut plan = DeletionPlan::new(NodeId(3));
        plan.classify(NodeId(3), Disposition::Delete);

        let session = MemorySession::new();
        let report = audit_locks(&repo, &plan, &session, "locked").unwrap();

        assert!(report.ok);
        assert!(report.blocked.is_empty());
        assert_eq!(session.get("locked").unwrap(), json!([]));
    }
}
