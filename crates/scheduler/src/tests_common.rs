use std::sync::Arc;

use simdex_core::types::{ArtifactKey, JobType, ResourceType, TaskLabel};

use crate::manager::ResourceManager;
use crate::path::Path;
use crate::table::TaskItem;
use crate::task::{IndexEngine, Job, Task};

/// Engine stub pinned to one artifact location.
pub struct FixedEngine {
    location: String,
}

impl FixedEngine {
    pub fn new(location: &str) -> Arc<Self> {
        Arc::new(Self {
            location: location.to_string(),
        })
    }
}

impl IndexEngine for FixedEngine {
    fn location(&self) -> ArtifactKey {
        self.location.clone()
    }
}

/// The graph most routing tests run on:
/// disk -> cpu (speed 100), cpu -> gpu0 (speed 1), cpu -> gpu1 (speed 3).
/// Only the GPUs carry executors.
pub fn make_test_graph() -> ResourceManager {
    let mut mgr = ResourceManager::new();
    mgr.add("disk", ResourceType::Disk, 0, false).unwrap();
    mgr.add("cpu", ResourceType::Cpu, 0, false).unwrap();
    mgr.add("gpu0", ResourceType::Gpu, 0, true).unwrap();
    mgr.add("gpu1", ResourceType::Gpu, 1, true).unwrap();
    mgr.link("disk", "cpu", 100).unwrap();
    mgr.link("cpu", "gpu0", 1).unwrap();
    mgr.link("cpu", "gpu1", 3).unwrap();
    mgr
}

pub fn path_of(names: &[&str]) -> Path {
    Path::new(names.iter().map(|s| s.to_string()).collect())
}

/// Default-label search task, optionally exposing an index location.
pub fn make_default_task(location: Option<&str>) -> Arc<TaskItem> {
    let job = Job::new(JobType::Search);
    let mut task = Task::new(TaskLabel::Default, Path::new(Vec::new()), &job);
    if let Some(location) = location {
        task = task.with_engine(FixedEngine::new(location));
    }
    TaskItem::new(Arc::new(task))
}

/// Specified-resource task mid-route: itinerary `names`, cursor at `start`.
pub fn make_path_task(names: &[&str], start: usize) -> Arc<TaskItem> {
    let job = Job::new(JobType::Search);
    let path = Path::with_cursor(names.iter().map(|s| s.to_string()).collect(), start);
    let task = Task::new(TaskLabel::SpecifiedResource, path, &job);
    TaskItem::new(Arc::new(task))
}
