use std::sync::Arc;

use rand::{Rng, RngCore};
use tracing::{debug, warn};

use crate::resource::Resource;
use crate::table::TaskItem;

/// Place the item directly on a destination's task table.
pub fn push_to(item: &Arc<TaskItem>, dest: &Arc<Resource>) {
    if !dest.task_table().put(item.clone()) {
        debug!(
            "task {} already queued on {}, put skipped",
            item.task().id,
            dest.name()
        );
    }
}

/// Broadcast the item to every out-neighbour of `from`.
///
/// The item lands in several tables at once; the move latch arbitrates which
/// neighbour ends up carrying it forward.
pub fn push_all(item: &Arc<TaskItem>, from: &Resource) {
    for (neighbour, _) in from.neighbours() {
        push_to(item, &neighbour);
    }
}

/// Weighted random placement over `from`'s out-neighbours, proportional to
/// connection speed. Returns whether a placement happened.
pub fn push_random(item: &Arc<TaskItem>, from: &Resource) -> bool {
    push_random_with(item, from, &mut rand::rng())
}

/// Same as `push_random` with a caller-supplied RNG, so runs can be made
/// reproducible.
pub fn push_random_with(item: &Arc<TaskItem>, from: &Resource, rng: &mut dyn RngCore) -> bool {
    let neighbours = from.neighbours();
    if neighbours.is_empty() {
        warn!(
            "{}: random push with no out-neighbours, task {} stays put",
            from.name(),
            item.task().id
        );
        return false;
    }

    // Config validation guarantees the sum fits in u64.
    let total: u64 = neighbours.iter().map(|(_, conn)| conn.speed()).sum();

    // The upper bound is inclusive: `total` itself carries one step of
    // probability mass, matching the distribution deployed graphs were
    // tuned against. All-zero speeds degrade to the first neighbour.
    let mut remaining = rng.random_range(0..=total) as i128;
    let mut chosen = neighbours.len() - 1;
    for (idx, (_, conn)) in neighbours.iter().enumerate() {
        remaining -= conn.speed() as i128;
        if remaining <= 0 {
            chosen = idx;
            break;
        }
    }

    let (neighbour, conn) = &neighbours[chosen];
    debug!(
        "{}: task {} routed to {} (speed {} of {})",
        from.name(),
        item.task().id,
        neighbour.name(),
        conn.speed(),
        total
    );
    push_to(item, neighbour);
    true
}
