pub mod action;
pub mod cache;
pub mod dispatch;
pub mod event;
pub mod manager;
pub mod path;
pub mod resource;
pub mod table;
pub mod task;

#[cfg(test)]
pub(crate) mod tests_common;

use simdex_core::types::TaskId;
use thiserror::Error;

/// Routing failures that are fatal to the task being moved.
///
/// Lost move-latch races and leaf resources with no neighbours are normal
/// outcomes, not errors; they never surface here.
#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("unknown resource: {name}")]
    UnknownResource { name: String },

    #[error("path cursor advanced past the end")]
    PathExhausted,

    #[error("path for task {task} ran out before reaching its final resource")]
    PathInconsistent { task: TaskId },
}

pub use cache::{CacheProbe, IndexHandle, MemoryCacheProbe};
pub use dispatch::Dispatcher;
pub use event::LoadCompletedEvent;
pub use manager::ResourceManager;
pub use path::Path;
pub use resource::{Connection, ExecutorSignal, Resource};
pub use table::{TaskItem, TaskTable};
pub use task::{IndexEngine, Job, Task};
