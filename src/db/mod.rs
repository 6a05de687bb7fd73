pub mod host;
pub mod memory;

pub use host::{
    ContentHost, DependentRelease, NodeQuery, OperationHandle, Presenter, Progress, RecordKey,
    RecordSession, RecordStore, ReleaseOptions, SessionStore, StoreCopy, WorkflowTask,
};
pub use memory::{
    HostCall, MemoryRecordStore, MemoryRepository, MemorySession, RecordingPresenter, RecordingTask,
};
