use tracing::{Instrument, debug, error, info};

use crate::core::context::RemovalContext;
use crate::core::error::HostError;
use crate::db::host::{RecordKey, RecordStore, StoreCopy};


/// Deletes a data record from the working copy and the published copy.
///
/// Only a record that survives in the published copy makes this return
/// `false`; working-copy and container refresh failures are logged.
pub async fn delete_record<S>(store: &S, ctx: &RemovalContext<'_>, key: &RecordKey) -> bool
where
    S: RecordStore + ?Sized,
{
    async {
        if let Err(e) = delete_working(store, key).await {
            error!("Exception during delete of record {}: {}", key, e);
        }

        if let Err(e) = refresh_container(store).await {
            error!("Exception during delete of record {}: {}", key, e);
        }

        match delete_published(store, key).await {
            Ok(()) => {
                info!("Record {} deleted", key);
                true
            }
            Err(e) => {
                error!("Exception during delete of published record {}: {}", key, e);
                false
            }
        }
    }
    .instrument(ctx.span.clone())
    .await
}


async fn delete_working<S: RecordStore + ?Sized>(store: &S, key: &RecordKey) -> Result<(), HostError> {
    let mut session = store.open_session(StoreCopy::Working).await?;
    session.delete(key).await?;
    session.commit().await
}


// lock, save, unlock: forces the host to reload the container
async fn refresh_container<S: RecordStore + ?Sized>(store: &S) -> Result<(), HostError> {
    store.set_container_lock(true, false).await?;
    store.save_container().await?;
    store.set_container_lock(false, false).await
}


async fn delete_published<S: RecordStore + ?Sized>(store: &S, key: &RecordKey) -> Result<(), HostError> {
    let mut session = store.open_session(StoreCopy::Published).await?;
    session.rollback().await?;
    if session.find(key).await?.is_none() {
        debug!("Record {} not present in published copy", key);
        return Ok(());
    }
    session.delete(key).await?;
    session.commit().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::{MemoryRecordStore, MemorySession, RecordingPresenter, RecordingTask};
    use serde_json::json;

    struct Fixture {
        session: MemorySession,
        presenter: RecordingPresenter,
        task: RecordingTask,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                session: MemorySession::new(),
                presenter: RecordingPresenter::new(),
                task: RecordingTask::new(),
            }
        }

        fn ctx(&self) -> RemovalContext<'_> {
            RemovalContext::new(&self.session, &self.presenter, &self.task)
        }
    }

    fn key() -> RecordKey {
        RecordKey("news-17".to_string())
    }

    fn store_with_both_copies() -> MemoryRecordStore {
        let store = MemoryRecordStore::new();
        store.insert(StoreCopy::Working, key(), json!({"headline": "draft"}));
        store.insert(StoreCopy::Published, key(), json!({"headline": "live"}));
        store
    }

    #[tokio::test]
    async fn test_deletes_both_copies_and_refreshes_container() {
        let store = store_with_both_copies();
        let fx = Fixture::new();

        assert!(delete_record(&store, &fx.ctx(), &key()).await);
        assert!(!store.contains(StoreCopy::Working, &key()));
        assert!(!store.contains(StoreCopy::Published, &key()));
        assert_eq!(store.container_calls(), vec!["lock", "save", "unlock"]);
    }

    #[tokio::test]
    async fn test_working_copy_failure_is_swallowed() {
        let store = MemoryRecordStore::new();
        store.insert(StoreCopy::Published, key(), json!({}));
        let fx = Fixture::new();

        assert!(delete_record(&store, &fx.ctx(), &key()).await);
        assert!(!store.contains(StoreCopy::Published, &key()));
    }

    #[tokio::test]
    async fn test_unpublished_record_is_success() {
        let store = MemoryRecordStore::new();
        store.insert(StoreCopy::Working, key(), json!({}));
        let fx = Fixture::new();

        assert!(delete_record(&store, &fx.ctx(), &key()).await);
    }

    #[tokio::test]
    async fn test_container_refresh_failure_does_not_affect_result() {
        let store = store_with_both_copies();
        store.fail_container_lock();
        let fx = Fixture::new();

        assert!(delete_record(&store, &fx.ctx(), &key()).await);
        assert!(store.container_calls().is_empty());
    }

    #[tokio::test]
    async fn test_surviving_published_record_fails() {
        let store = store_with_both_copies();
        store.fail_deletes_in(StoreCopy::Published);
        let fx = Fixture::new();

        assert!(!delete_record(&store, &fx.ctx(), &key()).await);
        assert!(!store.contains(StoreCopy::Working, &key()));
        assert!(store.contains(StoreCopy::Published, &key()));
    }
}
