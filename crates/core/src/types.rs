use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type TaskId = Uuid;
pub type JobId = Uuid;

/// Opaque location key identifying a task's cached working set on a device.
pub type ArtifactKey = String;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    Disk,
    Cpu,
    Gpu,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum JobType {
    Search,
    Build,
}

/// Discriminator selecting how a task is routed across the resource graph.
///
/// `Default` tasks are balanced opportunistically (cache-aware, then weighted
/// random); `SpecifiedResource` tasks carry a pre-planned itinerary and are
/// forwarded hop by hop.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TaskLabel {
    Default,
    SpecifiedResource,
}

// --- Display implementations ---

impl std::fmt::Display for ResourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceType::Disk => write!(f, "disk"),
            ResourceType::Cpu => write!(f, "cpu"),
            ResourceType::Gpu => write!(f, "gpu"),
        }
    }
}

impl std::fmt::Display for JobType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobType::Search => write!(f, "search"),
            JobType::Build => write!(f, "build"),
        }
    }
}
