use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::ResourceType;

/// Deployment mode for the resource graph.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DeployMode {
    #[default]
    Simple,
}

/// One resource to register at boot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceDef {
    pub name: String,
    pub kind: ResourceType,
    /// Device ordinal for GPU resources.
    #[serde(default)]
    pub device_id: u32,
    #[serde(default)]
    pub enable_executor: bool,
}

/// One directed edge of the resource graph, weighted by relative bandwidth.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionDef {
    pub from: String,
    pub to: String,
    pub speed: u64,
}

/// Resource graph topology and device selection, read once at boot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceConfig {
    #[serde(default)]
    pub mode: DeployMode,
    /// Comma-separated names of the resources that serve search tasks.
    #[serde(default = "default_search_resources")]
    pub search_resources: String,
    /// Device that index-build tasks are planned onto, e.g. "gpu0".
    #[serde(default = "default_index_build_device")]
    pub index_build_device: String,
    #[serde(default)]
    pub resources: Vec<ResourceDef>,
    #[serde(default)]
    pub connections: Vec<ConnectionDef>,
}

fn default_search_resources() -> String {
    "cpu".to_string()
}

fn default_index_build_device() -> String {
    "gpu0".to_string()
}

impl Default for ResourceConfig {
    fn default() -> Self {
        Self {
            mode: DeployMode::Simple,
            search_resources: default_search_resources(),
            index_build_device: default_index_build_device(),
            resources: Vec::new(),
            connections: Vec::new(),
        }
    }
}

impl ResourceConfig {
    /// Split `search_resources` into trimmed, non-empty names.
    pub fn search_resource_names(&self) -> Vec<String> {
        self.search_resources
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect()
    }

    /// Parse the GPU ordinal out of `index_build_device` ("gpu0" -> 0).
    pub fn index_build_ordinal(&self) -> Option<u32> {
        self.index_build_device
            .trim()
            .strip_prefix("gpu")
            .and_then(|n| n.parse().ok())
    }

    /// Reject topologies the router cannot run on: duplicate names, edges to
    /// unregistered resources, and per-resource outgoing speed sums that do
    /// not fit in 64 bits.
    pub fn validate(&self) -> Result<(), CoreError> {
        let mut names = HashSet::new();
        for def in &self.resources {
            if !names.insert(def.name.as_str()) {
                return Err(CoreError::Config(format!(
                    "duplicate resource name: {}",
                    def.name
                )));
            }
        }

        let mut outgoing: HashMap<&str, u64> = HashMap::new();
        for edge in &self.connections {
            for end in [&edge.from, &edge.to] {
                if !names.contains(end.as_str()) {
                    return Err(CoreError::Config(format!(
                        "connection references unknown resource: {end}"
                    )));
                }
            }
            let sum = outgoing.entry(edge.from.as_str()).or_insert(0);
            *sum = sum.checked_add(edge.speed).ok_or_else(|| {
                CoreError::Config(format!(
                    "outgoing connection speeds overflow for resource: {}",
                    edge.from
                ))
            })?;
        }

        Ok(())
    }
}

/// Top-level configuration aggregating all sub-configs.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SimdexConfig {
    #[serde(default)]
    pub resource: ResourceConfig,
}

/// Load configuration from a TOML file.
/// Falls back to defaults if the file doesn't exist.
pub fn load_config(path: &str) -> SimdexConfig {
    match std::fs::read_to_string(path) {
        Ok(contents) => match toml::from_str(&contents) {
            Ok(config) => {
                tracing::info!("Loaded config from {}", path);
                config
            }
            Err(e) => {
                tracing::warn!("Failed to parse config {}: {}, using defaults", path, e);
                SimdexConfig::default()
            }
        },
        Err(_) => {
            tracing::debug!("Config file {} not found, using defaults", path);
            SimdexConfig::default()
        }
    }
}

/// Save configuration to a TOML file.
/// Creates parent directories if they don't exist.
pub fn save_config(config: &SimdexConfig, path: &str) -> anyhow::Result<()> {
    let path = std::path::Path::new(path);

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    tracing::info!("Config saved to {:?}", path);
    Ok(())
}
