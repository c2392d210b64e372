use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use simdex_core::types::TaskId;

use crate::task::Task;

/// Routable handle to a task: the shared task plus a one-shot move latch.
///
/// A broadcast can land the same item in several tables; the latch decides
/// which table's scheduler gets to place it next.
pub struct TaskItem {
    task: Arc<Task>,
    moved: AtomicBool,
}

impl TaskItem {
    pub fn new(task: Arc<Task>) -> Arc<Self> {
        Arc::new(Self {
            task,
            moved: AtomicBool::new(false),
        })
    }

    pub fn task(&self) -> &Arc<Task> {
        &self.task
    }

    /// Claim placement responsibility for this item.
    ///
    /// Returns true exactly once over the item's lifetime; every concurrent
    /// loser observes false without blocking.
    pub fn claim(&self) -> bool {
        self.moved
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn is_claimed(&self) -> bool {
        self.moved.load(Ordering::Acquire)
    }
}

struct TableInner {
    items: Vec<Arc<TaskItem>>,
    seen: HashSet<TaskId>,
}

/// FIFO queue of task items owned by one resource.
///
/// `put` keeps arrival order and is idempotent per task within a table, so
/// re-forwarding an already-queued item is harmless. Cross-table moves take
/// one table lock at a time.
pub struct TaskTable {
    inner: Mutex<TableInner>,
}

impl TaskTable {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(TableInner {
                items: Vec::new(),
                seen: HashSet::new(),
            }),
        }
    }

    /// Append the item. Returns false when its task is already queued here.
    pub fn put(&self, item: Arc<TaskItem>) -> bool {
        let mut inner = self.inner.lock().unwrap();
        if !inner.seen.insert(item.task().id) {
            return false;
        }
        inner.items.push(item);
        true
    }

    pub fn contains(&self, task_id: TaskId) -> bool {
        self.inner.lock().unwrap().seen.contains(&task_id)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Queued items in arrival order.
    pub fn snapshot(&self) -> Vec<Arc<TaskItem>> {
        self.inner.lock().unwrap().items.clone()
    }
}

impl Default for TaskTable {
    fn default() -> Self {
        Self::new()
    }
}
