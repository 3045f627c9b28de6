//! Core data models for the resource report

use serde::{Deserialize, Serialize};
use std::fmt;

/// Namespace bucket used when a pod carries no namespace
pub const DEFAULT_NAMESPACE: &str = "default";

/// Node bucket used when a pod has no host IP yet
pub const UNKNOWN_NODE: &str = "Unknown";

/// Lifecycle phase of a pod as reported by the API server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PodPhase {
    Running,
    Pending,
    Succeeded,
    Failed,
    Unknown,
}

impl PodPhase {
    /// Parse the API phase string; anything unrecognised is `Unknown`
    pub fn from_api(phase: Option<&str>) -> Self {
        match phase {
            Some("Running") => Self::Running,
            Some("Pending") => Self::Pending,
            Some("Succeeded") => Self::Succeeded,
            Some("Failed") => Self::Failed,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "Running",
            Self::Pending => "Pending",
            Self::Succeeded => "Succeeded",
            Self::Failed => "Failed",
            Self::Unknown => "Unknown",
        }
    }

    /// Only running and pending pods hold or will hold cluster resources
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Running | Self::Pending)
    }
}

impl fmt::Display for PodPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resolved resource quantity
///
/// `amount` is millicores for CPU and bytes for memory; `raw` keeps the
/// quantity exactly as written in the pod spec for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceValue {
    pub amount: u64,
    pub raw: String,
}

impl ResourceValue {
    /// Build a value, treating an explicit zero as unset
    pub fn non_zero(amount: u64, raw: impl Into<String>) -> Option<Self> {
        (amount > 0).then(|| Self {
            amount,
            raw: raw.into(),
        })
    }
}

/// Resource requests and limits of one container in a pod spec
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerRecord {
    pub name: String,
    pub request_cpu: Option<ResourceValue>,
    pub request_memory: Option<ResourceValue>,
    pub limit_cpu: Option<ResourceValue>,
    pub limit_memory: Option<ResourceValue>,
}

/// Pod descriptor supplied by a pod source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodRecord {
    pub namespace: String,
    pub name: String,
    /// Host IP of the node the pod is scheduled on; empty when unscheduled
    pub host_ip: String,
    pub phase: PodPhase,
    pub containers: Vec<ContainerRecord>,
}

impl PodRecord {
    /// Namespace bucket this pod aggregates into
    pub fn namespace_key(&self) -> &str {
        if self.namespace.is_empty() {
            DEFAULT_NAMESPACE
        } else {
            &self.namespace
        }
    }

    /// Node bucket this pod aggregates into
    pub fn node_key(&self) -> &str {
        if self.host_ip.is_empty() {
            UNKNOWN_NODE
        } else {
            &self.host_ip
        }
    }

    /// Derive one sample per container, in pod-spec order
    pub fn samples(&self) -> impl Iterator<Item = ContainerResourceSample> + '_ {
        self.containers.iter().map(move |c| ContainerResourceSample {
            namespace: self.namespace.clone(),
            pod_name: self.name.clone(),
            node: self.host_ip.clone(),
            container_name: c.name.clone(),
            phase: self.phase,
            request_cpu: c.request_cpu.clone(),
            request_memory: c.request_memory.clone(),
            limit_cpu: c.limit_cpu.clone(),
            limit_memory: c.limit_memory.clone(),
        })
    }
}

/// Per-container view of a qualifying pod, consumed by the aggregator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerResourceSample {
    pub namespace: String,
    pub pod_name: String,
    pub node: String,
    pub container_name: String,
    pub phase: PodPhase,
    pub request_cpu: Option<ResourceValue>,
    pub request_memory: Option<ResourceValue>,
    pub limit_cpu: Option<ResourceValue>,
    pub limit_memory: Option<ResourceValue>,
}

impl ContainerResourceSample {
    pub fn request_cpu_millis(&self) -> u64 {
        amount(&self.request_cpu)
    }

    pub fn request_memory_bytes(&self) -> u64 {
        amount(&self.request_memory)
    }

    pub fn limit_cpu_millis(&self) -> u64 {
        amount(&self.limit_cpu)
    }

    pub fn limit_memory_bytes(&self) -> u64 {
        amount(&self.limit_memory)
    }
}

fn amount(value: &Option<ResourceValue>) -> u64 {
    value.as_ref().map_or(0, |v| v.amount)
}
