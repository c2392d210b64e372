use std::sync::{Arc, Mutex};

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::debug;

use simdex_core::types::{ResourceType, TaskLabel};

use crate::action;
use crate::cache::CacheProbe;
use crate::event::LoadCompletedEvent;
use crate::manager::ResourceManager;
use crate::resource::Resource;
use crate::table::TaskItem;
use crate::SchedulerError;

/// Routes task items in reaction to load-completed events.
///
/// The device cache probe is injected rather than reached through a global,
/// and the RNG behind weighted placement can be seeded, so deployments wire
/// the real cache while tests substitute deterministic doubles.
pub struct Dispatcher {
    res_mgr: Arc<ResourceManager>,
    cache: Arc<dyn CacheProbe>,
    rng: Option<Mutex<StdRng>>,
}

impl Dispatcher {
    pub fn new(res_mgr: Arc<ResourceManager>, cache: Arc<dyn CacheProbe>) -> Self {
        Self {
            res_mgr,
            cache,
            rng: None,
        }
    }

    /// Deterministic weighted draws for reproducible runs.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Some(Mutex::new(StdRng::seed_from_u64(seed)));
        self
    }

    pub fn resource_manager(&self) -> &Arc<ResourceManager> {
        &self.res_mgr
    }

    /// Entry point: `resource` finished loading the event's task item.
    /// Runs the policy matching the task's label.
    pub fn on_load_completed(
        &self,
        resource: &Arc<Resource>,
        event: &LoadCompletedEvent,
    ) -> Result<(), SchedulerError> {
        match event.item.task().label() {
            TaskLabel::Default => {
                self.schedule_default(resource, event);
                Ok(())
            }
            TaskLabel::SpecifiedResource => self.schedule_specified(resource, event),
        }
    }

    /// Default-label policy: cache-aware GPU routing with weighted-random
    /// fallback. Only resources without a local executor forward work.
    fn schedule_default(&self, resource: &Arc<Resource>, event: &LoadCompletedEvent) {
        if resource.has_executor() {
            return;
        }

        let item = &event.item;
        // Claim before any placement decision. A lost claim means another
        // scheduler already owns this item and it must not be placed twice.
        if !item.claim() {
            debug!("task {} already claimed, skipping", item.task().id);
            return;
        }

        if resource.kind() == ResourceType::Cpu {
            if let Some(engine) = item.task().engine() {
                let key = engine.location();
                // Lowest ordinal with a warm cache wins; reloading the
                // working set onto another device costs more than any load
                // imbalance this introduces.
                for ordinal in 0..self.res_mgr.gpu_count() as u32 {
                    if self.cache.cached_index(ordinal, &key).is_none() {
                        continue;
                    }
                    if let Some(gpu) = self.res_mgr.get_by_ordinal(ResourceType::Gpu, ordinal) {
                        debug!(
                            "task {}: cache hit for {} on {}",
                            item.task().id,
                            key,
                            gpu.name()
                        );
                        action::push_to(item, &gpu);
                        return;
                    }
                }
            }
        }

        self.push_random(item, resource);
    }

    /// Specified-resource policy: the task follows its pre-planned path one
    /// hop at a time until the final hop wakes the local executor.
    fn schedule_specified(
        &self,
        resource: &Arc<Resource>,
        event: &LoadCompletedEvent,
    ) -> Result<(), SchedulerError> {
        let item = &event.item;
        let task = item.task();

        if task.path().last() == Some(resource.name()) {
            debug!("task {} arrived at {}", task.id, resource.name());
            resource.wakeup_executor();
            return Ok(());
        }

        // Claimed for bookkeeping only. Every hop is deterministic and `put`
        // is idempotent, so the result is deliberately discarded.
        let _ = item.claim();

        let next_name = task
            .path()
            .next()
            .map_err(|_| SchedulerError::PathInconsistent { task: task.id })?;
        let next = self
            .res_mgr
            .get(&next_name)
            .ok_or(SchedulerError::UnknownResource { name: next_name })?;

        debug!(
            "task {} forwarded {} -> {}",
            task.id,
            resource.name(),
            next.name()
        );
        action::push_to(item, &next);
        Ok(())
    }

    fn push_random(&self, item: &Arc<TaskItem>, resource: &Arc<Resource>) {
        match &self.rng {
            Some(rng) => {
                action::push_random_with(item, resource, &mut *rng.lock().unwrap());
            }
            None => {
                action::push_random(item, resource);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use super::*;
    use crate::cache::MemoryCacheProbe;
    use crate::tests_common::{make_default_task, make_path_task, make_test_graph};

    fn make_dispatcher(probe: MemoryCacheProbe) -> Dispatcher {
        Dispatcher::new(Arc::new(make_test_graph()), Arc::new(probe)).with_seed(1)
    }

    #[test]
    fn test_cache_hit_routes_to_caching_gpu() {
        let probe = MemoryCacheProbe::new();
        probe.insert(1, "loc-A");
        let dispatcher = make_dispatcher(probe);
        let mgr = dispatcher.resource_manager().clone();

        let item = make_default_task(Some("loc-A"));
        let cpu = mgr.get("cpu").unwrap();
        dispatcher
            .on_load_completed(&cpu, &LoadCompletedEvent::new(item.clone()))
            .unwrap();

        assert!(mgr.get("gpu1").unwrap().task_table().contains(item.task().id));
        assert!(mgr.get("gpu0").unwrap().task_table().is_empty());
        assert!(item.is_claimed());
    }

    #[test]
    fn test_cache_hit_prefers_lowest_ordinal() {
        let probe = MemoryCacheProbe::new();
        probe.insert(0, "loc-A");
        probe.insert(1, "loc-A");
        let dispatcher = make_dispatcher(probe);
        let mgr = dispatcher.resource_manager().clone();

        let item = make_default_task(Some("loc-A"));
        let cpu = mgr.get("cpu").unwrap();
        dispatcher
            .on_load_completed(&cpu, &LoadCompletedEvent::new(item.clone()))
            .unwrap();

        assert!(mgr.get("gpu0").unwrap().task_table().contains(item.task().id));
        assert!(mgr.get("gpu1").unwrap().task_table().is_empty());
    }

    #[test]
    fn test_cache_miss_falls_back_to_weighted_random() {
        let dispatcher = make_dispatcher(MemoryCacheProbe::new());
        let mgr = dispatcher.resource_manager().clone();

        let item = make_default_task(Some("loc-B"));
        let cpu = mgr.get("cpu").unwrap();
        dispatcher
            .on_load_completed(&cpu, &LoadCompletedEvent::new(item.clone()))
            .unwrap();

        let on_gpu0 = mgr.get("gpu0").unwrap().task_table().contains(item.task().id);
        let on_gpu1 = mgr.get("gpu1").unwrap().task_table().contains(item.task().id);
        assert!(on_gpu0 ^ on_gpu1, "exactly one neighbour receives the task");
    }

    #[test]
    fn test_cache_miss_share_follows_speeds() {
        // Scenario: cpu -> gpu0 speed 1, cpu -> gpu1 speed 3. Draws are over
        // the inclusive range [0, 4], so gpu1 owns 3 of 5 equally likely
        // outcomes.
        let mut counts: HashMap<&str, u32> = HashMap::new();
        let trials: u64 = 10_000;

        for seed in 0..trials {
            let dispatcher = Dispatcher::new(
                Arc::new(make_test_graph()),
                Arc::new(MemoryCacheProbe::new()),
            )
            .with_seed(seed);
            let mgr = dispatcher.resource_manager().clone();

            let item = make_default_task(Some("loc-B"));
            let cpu = mgr.get("cpu").unwrap();
            dispatcher
                .on_load_completed(&cpu, &LoadCompletedEvent::new(item.clone()))
                .unwrap();

            for name in ["gpu0", "gpu1"] {
                if mgr.get(name).unwrap().task_table().contains(item.task().id) {
                    *counts.entry(name).or_default() += 1;
                }
            }
        }

        let gpu1_share = f64::from(counts["gpu1"]) / trials as f64;
        assert!(
            (0.57..=0.63).contains(&gpu1_share),
            "gpu1 share out of band: {gpu1_share}"
        );
    }

    #[test]
    fn test_no_engine_falls_back_to_random() {
        let probe = MemoryCacheProbe::new();
        probe.insert(0, "loc-A");
        let dispatcher = make_dispatcher(probe);
        let mgr = dispatcher.resource_manager().clone();

        let item = make_default_task(None);
        let cpu = mgr.get("cpu").unwrap();
        dispatcher
            .on_load_completed(&cpu, &LoadCompletedEvent::new(item.clone()))
            .unwrap();

        let placed = ["gpu0", "gpu1"]
            .iter()
            .filter(|name| mgr.get(name).unwrap().task_table().contains(item.task().id))
            .count();
        assert_eq!(placed, 1);
    }

    #[test]
    fn test_executor_resource_does_not_forward() {
        let dispatcher = make_dispatcher(MemoryCacheProbe::new());
        let mgr = dispatcher.resource_manager().clone();

        let item = make_default_task(Some("loc-A"));
        let gpu0 = mgr.get("gpu0").unwrap();
        dispatcher
            .on_load_completed(&gpu0, &LoadCompletedEvent::new(item.clone()))
            .unwrap();

        assert!(!item.is_claimed());
        assert!(mgr.get("gpu1").unwrap().task_table().is_empty());
    }

    #[test]
    fn test_claimed_item_is_skipped() {
        let dispatcher = make_dispatcher(MemoryCacheProbe::new());
        let mgr = dispatcher.resource_manager().clone();

        let item = make_default_task(Some("loc-A"));
        assert!(item.claim());

        let cpu = mgr.get("cpu").unwrap();
        dispatcher
            .on_load_completed(&cpu, &LoadCompletedEvent::new(item.clone()))
            .unwrap();

        assert!(mgr.get("gpu0").unwrap().task_table().is_empty());
        assert!(mgr.get("gpu1").unwrap().task_table().is_empty());
    }

    #[test]
    fn test_default_label_claim_race_places_once() {
        // Two schedulers react to the same load completion; exactly one may
        // place the item, and it lands in exactly one destination table.
        for seed in 0..50 {
            let dispatcher = Arc::new(
                Dispatcher::new(
                    Arc::new(make_test_graph()),
                    Arc::new(MemoryCacheProbe::new()),
                )
                .with_seed(seed),
            );
            let mgr = dispatcher.resource_manager().clone();
            let item = make_default_task(Some("loc-B"));
            let cpu = mgr.get("cpu").unwrap();

            std::thread::scope(|s| {
                for _ in 0..2 {
                    let dispatcher = dispatcher.clone();
                    let cpu = cpu.clone();
                    let item = item.clone();
                    s.spawn(move || {
                        dispatcher
                            .on_load_completed(&cpu, &LoadCompletedEvent::new(item))
                            .unwrap();
                    });
                }
            });

            let placed = ["gpu0", "gpu1"]
                .iter()
                .filter(|name| mgr.get(name).unwrap().task_table().contains(item.task().id))
                .count();
            assert_eq!(placed, 1);
            assert!(item.is_claimed());
        }
    }

    #[test]
    fn test_specified_label_forwards_along_path() {
        let dispatcher = make_dispatcher(MemoryCacheProbe::new());
        let mgr = dispatcher.resource_manager().clone();

        let item = make_path_task(&["disk", "cpu", "gpu0"], 1);
        let cpu = mgr.get("cpu").unwrap();
        dispatcher
            .on_load_completed(&cpu, &LoadCompletedEvent::new(item.clone()))
            .unwrap();

        assert!(mgr.get("gpu0").unwrap().task_table().contains(item.task().id));
        assert_eq!(item.task().path().position(), 2);
        assert_eq!(mgr.get("gpu0").unwrap().executor_signal().wakeups(), 0);
    }

    #[test]
    fn test_specified_label_arrival_wakes_executor_once() {
        let dispatcher = make_dispatcher(MemoryCacheProbe::new());
        let mgr = dispatcher.resource_manager().clone();

        let item = make_path_task(&["disk", "cpu", "gpu0"], 2);
        let gpu0 = mgr.get("gpu0").unwrap();
        dispatcher
            .on_load_completed(&gpu0, &LoadCompletedEvent::new(item.clone()))
            .unwrap();

        assert_eq!(gpu0.executor_signal().wakeups(), 1);
        // Arrival never re-inserts the item anywhere.
        for name in ["disk", "cpu", "gpu0", "gpu1"] {
            assert!(mgr.get(name).unwrap().task_table().is_empty());
        }
    }

    #[test]
    fn test_specified_label_unknown_resource_is_fatal() {
        let dispatcher = make_dispatcher(MemoryCacheProbe::new());
        let mgr = dispatcher.resource_manager().clone();

        let item = make_path_task(&["disk", "cpu", "gpu9"], 1);
        let cpu = mgr.get("cpu").unwrap();
        let err = dispatcher
            .on_load_completed(&cpu, &LoadCompletedEvent::new(item))
            .unwrap_err();

        assert!(matches!(
            err,
            SchedulerError::UnknownResource { name } if name == "gpu9"
        ));
    }

    #[test]
    fn test_specified_label_exhausted_path_is_fatal() {
        let dispatcher = make_dispatcher(MemoryCacheProbe::new());
        let mgr = dispatcher.resource_manager().clone();

        // Path ends on gpu0 but the event fires on cpu with the cursor
        // already parked at the end: a planner bug.
        let item = make_path_task(&["gpu0"], 0);
        let cpu = mgr.get("cpu").unwrap();
        let err = dispatcher
            .on_load_completed(&cpu, &LoadCompletedEvent::new(item))
            .unwrap_err();

        assert!(matches!(err, SchedulerError::PathInconsistent { .. }));
    }

    #[test]
    fn test_broadcast_then_claim_equals_direct_placement() {
        let dispatcher = make_dispatcher(MemoryCacheProbe::new());
        let mgr = dispatcher.resource_manager().clone();
        let cpu = mgr.get("cpu").unwrap();

        let item = make_default_task(Some("loc-B"));
        crate::action::push_all(&item, &cpu);

        // Both neighbours hold the item; whichever dequeues first claims it
        // and the other table's copy goes stale.
        assert!(mgr.get("gpu0").unwrap().task_table().contains(item.task().id));
        assert!(mgr.get("gpu1").unwrap().task_table().contains(item.task().id));
        assert!(item.claim());
        assert!(!item.claim());
    }
}
