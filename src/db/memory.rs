

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tracing::debug;

use super::host::{
    ContentHost, NodeQuery, OperationHandle, Presenter, Progress, RecordKey, RecordSession,
    RecordStore, ReleaseOptions, SessionStore, StoreCopy, WorkflowTask,
};
use crate::core::error::HostError;
use crate::core::filter::CategoryFilter;
use crate::core::node::{LockState, Node, NodeId, ReleaseState};


#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCall {
    SetLock { id: NodeId, acquire: bool },
    Refresh(NodeId),
    BulkDelete(Vec<NodeId>),
    BulkRelease(NodeId),
}


struct Entry {
    node: Node,
    children: Vec<NodeId>,
}


#[derive(Default)]
struct Arena {
    entries: HashMap<NodeId, Entry>,
    roots: Vec<NodeId>,
    // target -> sources
    references: HashMap<NodeId, Vec<NodeId>>,
}

impl Arena {
    fn snapshot(&self, id: NodeId) -> Option<Node> {
        self.entries.get(&id).map(|entry| {
            let mut node = entry.node.clone();
            node.incoming_references = self.references.get(&id).map_or(0, Vec::len);
            node
        })
    }

    fn collect_children(&self, id: NodeId, filter: &CategoryFilter, recursive: bool, out: &mut Vec<NodeId>) {
        let Some(entry) = self.entries.get(&id) else {
            return;
        };
        for child in &entry.children {
            let Some(child_entry) = self.entries.get(child) else {
                continue;
            };
            if filter.accepts(child_entry.node.category()) {
                out.push(*child);
            }
            if recursive {
                self.collect_children(*child, filter, true, out);
            }
        }
    }

    fn subtree(&self, id: NodeId) -> Vec<NodeId> {
        let mut ids = vec![id];
        let mut i = 0;
        while i < ids.len() {
            if let Some(entry) = self.entries.get(&ids[i]) {
                ids.extend(entry.children.iter().copied());
            }
            i += 1;
        }
        ids
    }

    fn remove_subtree(&mut self, id: NodeId) {
        let parent = self.entries.get(&id).and_then(|e| e.node.parent);
        match parent.and_then(|p| self.entries.get_mut(&p)) {
            Some(parent_entry) => parent_entry.children.retain(|c| *c != id),
            None => self.roots.retain(|r| *r != id),
        }
        for removed in self.subtree(id) {
            self.entries.remove(&removed);
            self.references.remove(&removed);
            for sources in self.references.values_mut() {
                sources.retain(|s| *s != removed);
            }
        }
    }
}


/// Arena-backed content tree with scriptable host failures.
#[derive(Default)]
pub struct MemoryRepository {
    arena: RwLock<Arena>,
    denied: RwLock<HashSet<NodeId>>,
    rejected: RwLock<HashMap<NodeId, HostError>>,
    unavailable: AtomicBool,
    calls: Mutex<Vec<HostCall>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `node` as the last child of its parent. A page reference also
    /// records an incoming reference on its page.
    pub fn insert(&self, node: Node) -> NodeId {
        let id = node.id;
        let mut arena = self.arena.write();
        match node.parent {
            Some(parent) => {
                if let Some(entry) = arena.entries.get_mut(&parent) {
                    entry.children.push(id);
                }
            }
            None => arena.roots.push(id),
        }
        if let Some(page) = node.kind.referenced_page() {
            arena.references.entry(page).or_default().push(id);
        }
        arena.entries.insert(id, Entry { node, children: Vec::new() });
        id
    }

    pub fn add_reference(&self, from: NodeId, to: NodeId) {
        self.arena.write().references.entry(to).or_default().push(from);
    }

    pub fn set_lock_state(&self, id: NodeId, lock: LockState) {
        if let Some(entry) = self.arena.write().entries.get_mut(&id) {
            entry.node.lock = lock;
        }
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.arena.read().entries.contains_key(&id)
    }

    pub fn release_state(&self, id: NodeId) -> Option<ReleaseState> {
        self.arena.read().entries.get(&id).map(|e| e.node.release)
    }

    /// Bulk operations touching `id` report it as permission-denied; a
    /// release of `id` fails outright.
    pub fn deny_permission(&self, id: NodeId) {
        self.denied.write().insert(id);
    }

    pub fn reject_release(&self, id: NodeId, error: HostError) {
        self.rejected.write().insert(id, error);
    }

    pub fn set_operations_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::Relaxed);
    }

    pub fn calls(&self) -> Vec<HostCall> {
        self.calls.lock().clone()
    }

    pub fn release_calls(&self) -> Vec<NodeId> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                HostCall::BulkRelease(id) => Some(*id),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: HostCall) {
        self.calls.lock().push(call);
    }

    fn check_available(&self, operation: &str) -> Result<(), HostError> {
        if self.unavailable.load(Ordering::Relaxed) {
            return Err(HostError::OperationUnavailable(operation.to_string()));
        }
        Ok(())
    }
}

impl NodeQuery for MemoryRepository {
    fn node(&self, id: NodeId) -> Result<Node, HostError> {
        self.arena.read().snapshot(id).ok_or(HostError::NotFound(id))
    }

    fn children<'a>(
        &'a self,
        id: NodeId,
        filter: &'a CategoryFilter,
        recursive: bool,
    ) -> Result<Box<dyn Iterator<Item = NodeId> + 'a>, HostError> {
        let arena = self.arena.read();
        if !arena.entries.contains_key(&id) {
            return Err(HostError::NotFound(id));
        }
        let mut out = Vec::new();
        arena.collect_children(id, filter, recursive, &mut out);
        Ok(Box::new(out.into_iter()))
    }
}


pub struct MemoryHandle {
    result: Result<bool, HostError>,
    progress: Progress,
}

#[async_trait]
impl OperationHandle for MemoryHandle {
    async fn await_result(&mut self) -> Result<bool, HostError> {
        self.result.clone()
    }

    fn progress(&self) -> Progress {
        self.progress.clone()
    }
}

#[async_trait]
impl ContentHost for MemoryRepository {
    async fn set_lock(&self, id: NodeId, acquire: bool, _exclusive: bool) -> Result<(), HostError> {
        self.record(HostCall::SetLock { id, acquire });
        let mut arena = self.arena.write();
        let entry = arena.entries.get_mut(&id).ok_or(HostError::ElementDeleted(id))?;
        if entry.node.lock.is_foreign() {
            return Err(HostError::Locked(id));
        }
        entry.node.lock = if acquire { LockState::LockedBySelf } else { LockState::Unlocked };
        Ok(())
    }

    async fn refresh(&self, id: NodeId) -> Result<(), HostError> {
        self.record(HostCall::Refresh(id));
        if self.contains(id) {
            Ok(())
        } else {
            Err(HostError::ElementDeleted(id))
        }
    }

    async fn bulk_delete(
        &self,
        ids: &[NodeId],
        ignore_references: bool,
    ) -> Result<Box<dyn OperationHandle>, HostError> {
        self.record(HostCall::BulkDelete(ids.to_vec()));
        self.check_available("delete")?;

        let denied = self.denied.read().clone();
        let batch: HashSet<NodeId> = ids.iter().copied().collect();
        let mut progress = Progress::default();
        let mut blocked = false;
        let mut arena = self.arena.write();

        for id in ids {
            let Some(node) = arena.snapshot(*id) else {
                debug!("Element {} already gone", id);
                progress.succeeded.insert(*id);
                continue;
            };
            if node.lock.is_foreign() {
                progress.lock_failed.insert(*id);
                continue;
            }
            if denied.contains(id) {
                progress.permission_denied.insert(*id);
                continue;
            }
            if !ignore_references {
                let external = arena
                    .references
                    .get(id)
                    .is_some_and(|sources| sources.iter().any(|s| !batch.contains(s)));
                if external {
                    blocked = true;
                    continue;
                }
            }
            arena.remove_subtree(*id);
            progress.succeeded.insert(*id);
        }

        let result = !blocked && progress.lock_failed.is_empty() && progress.permission_denied.is_empty();
        Ok(Box::new(MemoryHandle { result: Ok(result), progress }))
    }

    async fn bulk_release(
        &self,
        id: NodeId,
        options: ReleaseOptions,
    ) -> Result<Box<dyn OperationHandle>, HostError> {
        self.record(HostCall::BulkRelease(id));
        self.check_available("release")?;

        if let Some(error) = self.rejected.read().get(&id) {
            return Ok(Box::new(MemoryHandle {
                result: Err(error.clone()),
                progress: Progress::default(),
            }));
        }
        if self.denied.read().contains(&id) {
            return Ok(Box::new(MemoryHandle {
                result: Err(HostError::PermissionDenied(id)),
                progress: Progress::default(),
            }));
        }

        let mut progress = Progress::default();
        let mut arena = self.arena.write();
        let targets = if options.recursive { arena.subtree(id) } else { vec![id] };
        if !arena.entries.contains_key(&id) {
            return Ok(Box::new(MemoryHandle {
                result: Err(HostError::ElementDeleted(id)),
                progress,
            }));
        }

        for target in targets {
            let Some(entry) = arena.entries.get_mut(&target) else {
                continue;
            };
            if options.new_descendants_only && target != id && entry.node.release == ReleaseState::Released {
                continue;
            }
            if entry.node.lock.is_foreign() {
                progress.lock_failed.insert(target);
                continue;
            }
            entry.node.release = ReleaseState::Released;
            progress.succeeded.insert(target);
        }

        let result = progress.lock_failed.is_empty();
        Ok(Box::new(MemoryHandle { result: Ok(result), progress }))
    }
}


#[derive(Default)]
pub struct MemorySession {
    values: Mutex<HashMap<String, serde_json::Value>>,
}

impl MemorySession {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySession {
    fn put(&self, key: &str, value: serde_json::Value) {
        self.values.lock().insert(key.to_string(), value);
    }

    fn get(&self, key: &str) -> Option<serde_json::Value> {
        self.values.lock().get(key).cloned()
    }
}


#[derive(Default)]
pub struct RecordingPresenter {
    errors: Mutex<Vec<(String, String)>>,
}

impl RecordingPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn errors(&self) -> Vec<(String, String)> {
        self.errors.lock().clone()
    }
}

impl Presenter for RecordingPresenter {
    fn show_error(&self, title: &str, body: &str) {
        self.errors.lock().push((title.to_string(), body.to_string()));
    }
}


#[derive(Default)]
pub struct RecordingTask {
    closed: AtomicUsize,
}

impl RecordingTask {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn close_count(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

impl WorkflowTask for RecordingTask {
    fn close(&self) -> Result<(), HostError> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}


#[derive(Default)]
struct RecordInner {
    copies: HashMap<StoreCopy, HashMap<RecordKey, serde_json::Value>>,
    failing_deletes: HashSet<StoreCopy>,
    failing_container: bool,
    container_calls: Vec<String>,
}


/// Working and published record copies backed by maps.
#[derive(Clone, Default)]
pub struct MemoryRecordStore {
    inner: Arc<Mutex<RecordInner>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, copy: StoreCopy, key: RecordKey, value: serde_json::Value) {
        self.inner.lock().copies.entry(copy).or_default().insert(key, value);
    }

    pub fn contains(&self, copy: StoreCopy, key: &RecordKey) -> bool {
        self.inner
            .lock()
            .copies
            .get(&copy)
            .is_some_and(|records| records.contains_key(key))
    }

    pub fn fail_deletes_in(&self, copy: StoreCopy) {
        self.inner.lock().failing_deletes.insert(copy);
    }

    pub fn fail_container_lock(&self) {
        self.inner.lock().failing_container = true;
    }

    pub fn container_calls(&self) -> Vec<String> {
        self.inner.lock().container_calls.clone()
    }
}


struct MemoryRecordSession {
    inner: Arc<Mutex<RecordInner>>,
    copy: StoreCopy,
    pending: Vec<RecordKey>,
}

#[async_trait]
impl RecordSession for MemoryRecordSession {
    async fn find(&mut self, key: &RecordKey) -> Result<Option<serde_json::Value>, HostError> {
        let inner = self.inner.lock();
        Ok(inner.copies.get(&self.copy).and_then(|records| records.get(key).cloned()))
    }

    async fn delete(&mut self, key: &RecordKey) -> Result<(), HostError> {
        let inner = self.inner.lock();
        if inner.failing_deletes.contains(&self.copy) {
            return Err(HostError::Record(format!("delete of {} refused", key)));
        }
        let present = inner
            .copies
            .get(&self.copy)
            .is_some_and(|records| records.contains_key(key));
        if !present {
            return Err(HostError::Record(format!("record {} not found", key)));
        }
        drop(inner);
        self.pending.push(key.clone());
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), HostError> {
        let mut inner = self.inner.lock();
        let records = inner.copies.entry(self.copy).or_default();
        for key in self.pending.drain(..) {
            records.remove(&key);
        }
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), HostError> {
        self.pending.clear();
        Ok(())
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn open_session(&self, copy: StoreCopy) -> Result<Box<dyn RecordSession>, HostError> {
        Ok(Box::new(MemoryRecordSession {
            inner: Arc::clone(&self.inner),
            copy,
            pending: Vec::new(),
        }))
    }

    async fn set_container_lock(&self, acquire: bool, _exclusive: bool) -> Result<(), HostError> {
        let mut inner = self.inner.lock();
        if inner.failing_container {
            return Err(HostError::Record("container locked by another session".to_string()));
        }
        inner.container_calls.push(if acquire { "lock" } else { "unlock" }.to_string());
        Ok(())
    }

    async fn save_container(&self) -> Result<(), HostError> {
        self.inner.lock().container_calls.push("save".to_string());
        Ok(())
    }
}
