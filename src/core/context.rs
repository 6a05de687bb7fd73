use tracing::{Span, field, info_span};
use uuid::Uuid;

use crate::db::host::{Presenter, SessionStore, WorkflowTask};


/// Collaborators and logging span for one removal request.
pub struct RemovalContext<'a> {
    pub request_id: Uuid,
    pub span: Span,
    pub session: &'a dyn SessionStore,
    pub presenter: &'a dyn Presenter,
    pub task: &'a dyn WorkflowTask,
}

impl<'a> RemovalContext<'a> {
    pub fn new(
        session: &'a dyn SessionStore,
        presenter: &'a dyn Presenter,
        task: &'a dyn WorkflowTask,
    ) -> Self {
        let request_id = Uuid::new_v4();
        Self {
            request_id,
            span: info_span!("purge", request_id = %request_id, target = field::Empty),
            session,
            presenter,
            task,
        }
    }

    /// Attaches the removal target to the request span.
    pub fn record_target(&self, target: &impl std::fmt::Display) {
        self.span.record("target", field::display(target));
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::node::NodeId;
    use crate::db::memory::{MemorySession, RecordingPresenter, RecordingTask};
    use crate::toolkit::deletion::RemovalTarget;

    #[test]
    fn test_span_carries_request_id_and_target() {
        tracing::subscriber::with_default(tracing_subscriber::registry(), || {
            let (session, presenter, task) = (MemorySession::new(), RecordingPresenter::new(), RecordingTask::new());
            let ctx = RemovalContext::new(&session, &presenter, &task);

            assert!(ctx.span.field("request_id").is_some());
            assert!(ctx.span.field("target").is_some());
            ctx.record_target(&RemovalTarget::Node { id: NodeId(4) });
        });
    }
}
