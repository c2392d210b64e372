use std::sync::Arc;

use crate::table::TaskItem;

/// Emitted by a resource whose loader finished staging a task's data.
///
/// The scheduler policy for the task's label runs on the emitting resource's
/// thread in reaction to this event.
pub struct LoadCompletedEvent {
    pub item: Arc<TaskItem>,
}

impl LoadCompletedEvent {
    pub fn new(item: Arc<TaskItem>) -> Self {
        Self { item }
    }
}
