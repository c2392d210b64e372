use std::sync::{Arc, Weak};

use uuid::Uuid;

use simdex_core::types::{ArtifactKey, JobId, JobType, TaskId, TaskLabel};

use crate::path::Path;

/// Source of a task's index data; exposes where its working set lives so the
/// router can ask device caches about it.
pub trait IndexEngine: Send + Sync {
    fn location(&self) -> ArtifactKey;
}

/// A submitted unit of work that routed tasks report back to.
pub struct Job {
    id: JobId,
    kind: JobType,
}

impl Job {
    pub fn new(kind: JobType) -> Arc<Self> {
        Arc::new(Self {
            id: Uuid::new_v4(),
            kind,
        })
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn kind(&self) -> JobType {
        self.kind
    }
}

/// A routable unit of work travelling across the resource graph.
///
/// Tasks are shared between tables via `Arc`; the path cursor is the only
/// mutable part and steps forward under its own atomics.
pub struct Task {
    pub id: TaskId,
    label: TaskLabel,
    path: Path,
    engine: Option<Arc<dyn IndexEngine>>,
    job: Weak<Job>,
}

impl Task {
    pub fn new(label: TaskLabel, path: Path, job: &Arc<Job>) -> Self {
        Self {
            id: Uuid::new_v4(),
            label,
            path,
            engine: None,
            job: Arc::downgrade(job),
        }
    }

    pub fn with_engine(mut self, engine: Arc<dyn IndexEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    pub fn label(&self) -> TaskLabel {
        self.label
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn engine(&self) -> Option<&Arc<dyn IndexEngine>> {
        self.engine.as_ref()
    }

    /// The owning job, if it still exists.
    pub fn job(&self) -> Option<Arc<Job>> {
        self.job.upgrade()
    }
}
