use tracing::{Instrument, debug, error, info, warn};

use super::models::{DeletionPlan, ExecutionOutcome, ExecutionReport, OperationFailure, OperationKind};
use crate::core::config::PurgeConfig;
use crate::core::context::RemovalContext;
use crate::core::error::HostError;
use crate::core::node::{NodeId, ReleaseState};
use crate::db::host::{ContentHost, Progress, ReleaseOptions};


/// Turns a plan into bulk delete/release jobs on the host.
///
/// Never fails: every host error is logged and recorded on the report.
/// Locks are not re-checked here, callers audit immediately before applying.
pub struct PlanExecutor<'a, H: ContentHost + ?Sized> {
    host: &'a H,
    permission_title: &'a str,
    permission_body: &'a str,
}

impl<'a, H: ContentHost + ?Sized> PlanExecutor<'a, H> {
    pub fn new(host: &'a H, config: &'a PurgeConfig) -> Self {
        Self {
            host,
            permission_title: &config.permission_title,
            permission_body: &config.permission_body,
        }
    }

    pub async fn apply(&self, ctx: &RemovalContext<'_>, plan: &DeletionPlan) -> ExecutionReport {
        let span = ctx.span.clone();
        async {
            let mut report = ExecutionReport::default();

            if !plan.to_delete().is_empty() {
                self.delete_phase(ctx, plan, &mut report).await;
            }
            for id in plan.to_release() {
                self.release(ctx, *id, &mut report).await;
                if let Some(start_node) = self.unreleased_start_node(*id) {
                    info!("Releasing start node {} of {}", start_node, id);
                    self.release(ctx, start_node, &mut report).await;
                }
            }

            info!("Plan applied, success = {}", report.success);
            report
        }
        .instrument(span)
        .await
    }

    async fn delete_phase(&self, ctx: &RemovalContext<'_>, plan: &DeletionPlan, report: &mut ExecutionReport) {
        let ids = plan.to_delete();
        info!("Deleting {} elements", ids.len());

        if let Err(e) = self.host.set_lock(plan.target, false, false).await {
            error!("Exception during delete of {}: {}", plan.target, e);
        }

        match self.host.bulk_delete(ids, true).await {
            Ok(mut handle) => match handle.await_result().await {
                Ok(success) => {
                    info!("Delete result: {}", success);
                    let progress = handle.progress();
                    log_progress("Deleted", &progress);
                    report.record_outcome(ExecutionOutcome::from_progress(
                        OperationKind::Delete,
                        None,
                        success,
                        progress,
                    ));
                }
                Err(e) => {
                    error!("Exception during delete of {}: {}", plan.target, e);
                    report.record_failure(OperationFailure::new(OperationKind::Delete, None, &e));
                }
            },
            Err(e) => {
                warn!("Handle for delete progress is unavailable: {}", e);
                report.record_failure(OperationFailure::new(OperationKind::Delete, None, &e));
            }
        }

        if let Err(e) = ctx.task.close() {
            error!("Closing workflow task failed: {}", e);
        }
        self.refresh(plan.target).await;
    }

    async fn release(&self, ctx: &RemovalContext<'_>, id: NodeId, report: &mut ExecutionReport) {
        let mut handle = match self.host.bulk_release(id, ReleaseOptions::new_only()).await {
            Ok(handle) => handle,
            Err(e) => {
                warn!("Handle for release progress of {} is unavailable: {}", id, e);
                self.release_failed(ctx, id, &e, report);
                return;
            }
        };

        match handle.await_result().await {
            Ok(success) => {
                info!("Release result for {}: {}", id, success);
                let progress = handle.progress();
                if !progress.succeeded.is_empty() {
                    self.refresh(id).await;
                }
                log_progress("Released", &progress);
                report.record_outcome(ExecutionOutcome::from_progress(
                    OperationKind::Release,
                    Some(id),
                    success,
                    progress,
                ));
            }
            Err(e) => {
                error!("Exception during release of {}: {}", id, e);
                self.release_failed(ctx, id, &e, report);
            }
        }
    }

    fn release_failed(
        &self,
        ctx: &RemovalContext<'_>,
        id: NodeId,
        error: &HostError,
        report: &mut ExecutionReport,
    ) {
        if error.is_permission() {
            ctx.presenter.show_error(self.permission_title, self.permission_body);
        }
        report.record_failure(OperationFailure::new(OperationKind::Release, Some(id), error));
    }

    /// Start node of a freshly released reference folder, if it is still
    /// unreleased.
    fn unreleased_start_node(&self, id: NodeId) -> Option<NodeId> {
        let start_node = match self.host.node(id) {
            Ok(node) => node.kind.start_node()?,
            Err(e) => {
                debug!("Skipping start node check for {}: {}", id, e);
                return None;
            }
        };
        match self.host.node(start_node) {
            Ok(node) if node.release != ReleaseState::Released => Some(start_node),
            Ok(_) => None,
            Err(e) => {
                warn!("Start node {} of {} could not be read: {}", start_node, id, e);
                None
            }
        }
    }

    async fn refresh(&self, id: NodeId) {
        match self.host.refresh(id).await {
            Ok(()) => {}
            Err(HostError::ElementDeleted(_)) => debug!("Element {} is gone, nothing to refresh", id),
            Err(e) => warn!("Refreshing element {} failed: {}", id, e),
        }
    }
}


fn log_progress(action: &str, progress: &Progress) {
    info!("{} elements:", action);
    for id in &progress.succeeded {
        info!("  id: {}", id);
    }
    if !progress.lock_failed.is_empty() {
        info!("Lock failed elements:");
        for id in &progress.lock_failed {
            info!("  id: {}", id);
        }
    }
    if !progress.permission_denied.is_empty() {
        info!("Missing permission elements:");
        for id in &progress.permission_denied {
            info!("  id: {}", id);
        }
    }
}
