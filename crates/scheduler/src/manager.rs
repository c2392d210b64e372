use std::collections::HashMap;
use std::sync::Arc;

use tracing::info;

use simdex_core::config::ResourceConfig;
use simdex_core::error::CoreError;
use simdex_core::types::ResourceType;

use crate::resource::{Connection, Resource};

/// Arena owner of every resource in the graph.
///
/// Registration order is stable and observable: enumeration, ordinal lookup
/// for non-GPU kinds, and `compute_resources` all follow it. Topology is
/// fixed once boot finishes; reads afterwards take no locks here.
pub struct ResourceManager {
    resources: Vec<Arc<Resource>>,
    by_name: HashMap<String, usize>,
}

impl ResourceManager {
    pub fn new() -> Self {
        Self {
            resources: Vec::new(),
            by_name: HashMap::new(),
        }
    }

    /// Build and validate the whole graph from boot configuration.
    pub fn from_config(config: &ResourceConfig) -> Result<Self, CoreError> {
        config.validate()?;

        let mut mgr = Self::new();
        for def in &config.resources {
            mgr.add(&def.name, def.kind, def.device_id, def.enable_executor)?;
        }
        for edge in &config.connections {
            mgr.link(&edge.from, &edge.to, edge.speed)?;
        }

        info!(
            "Resource graph built: {} resources, {} connections",
            mgr.resources.len(),
            config.connections.len()
        );
        Ok(mgr)
    }

    /// Register a resource. Names are unique across the graph.
    pub fn add(
        &mut self,
        name: &str,
        kind: ResourceType,
        device_id: u32,
        has_executor: bool,
    ) -> Result<Arc<Resource>, CoreError> {
        if self.by_name.contains_key(name) {
            return Err(CoreError::Config(format!(
                "duplicate resource name: {name}"
            )));
        }

        let resource = Resource::new(name, kind, device_id, has_executor);
        self.by_name.insert(name.to_string(), self.resources.len());
        self.resources.push(resource.clone());
        Ok(resource)
    }

    /// Add one directed edge from `from` to `to`.
    pub fn link(&self, from: &str, to: &str, speed: u64) -> Result<(), CoreError> {
        let from_res = self
            .get(from)
            .ok_or_else(|| CoreError::Config(format!("unknown resource: {from}")))?;
        let to_res = self
            .get(to)
            .ok_or_else(|| CoreError::Config(format!("unknown resource: {to}")))?;

        from_res.add_edge(&to_res, Connection::new(speed));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<Resource>> {
        self.by_name
            .get(name)
            .map(|&idx| self.resources[idx].clone())
    }

    /// Lookup by kind and ordinal. GPU ordinals are device ids; for other
    /// kinds the ordinal counts registration order within that kind.
    pub fn get_by_ordinal(&self, kind: ResourceType, ordinal: u32) -> Option<Arc<Resource>> {
        match kind {
            ResourceType::Gpu => self
                .resources
                .iter()
                .find(|r| r.kind() == ResourceType::Gpu && r.device_id() == ordinal)
                .cloned(),
            _ => self
                .resources
                .iter()
                .filter(|r| r.kind() == kind)
                .nth(ordinal as usize)
                .cloned(),
        }
    }

    pub fn gpu_count(&self) -> usize {
        self.resources
            .iter()
            .filter(|r| r.kind() == ResourceType::Gpu)
            .count()
    }

    /// CPU and GPU resources in registration order.
    pub fn compute_resources(&self) -> Vec<Arc<Resource>> {
        self.resources
            .iter()
            .filter(|r| matches!(r.kind(), ResourceType::Cpu | ResourceType::Gpu))
            .cloned()
            .collect()
    }
}

impl Default for ResourceManager {
    fn default() -> Self {
        Self::new()
    }
}
