//! Pod sources
//!
//! A pod source hands the report pipeline a fully materialised list of pod
//! records. The cluster source lists pods through the Kubernetes API under a
//! bounded timeout; the file source reads a `kubectl get pods -o json` dump.

use crate::models::{ContainerRecord, PodPhase, PodRecord, ResourceValue};
use crate::quantity::{parse_cpu_millis, parse_memory_bytes, QuantityError};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Container, Pod};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use kube::api::{Api, ListParams};
use kube::Client;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Default bound on the pod listing call
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors raised while fetching pods; all of them abort the run
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to list pods: {0}")]
    Api(#[from] kube::Error),

    #[error("timed out listing pods after {0:?}")]
    Timeout(Duration),

    #[error("failed to read pod list {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse pod list {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Supplier of the pod records a report is built from
#[async_trait]
pub trait PodSource: Send + Sync {
    /// Fetch every pod in scope, in API order
    async fn list_pods(&self) -> Result<Vec<PodRecord>, SourceError>;
}

/// Lists pods from a live cluster
pub struct KubePodSource {
    client: Client,
    namespace: Option<String>,
    timeout: Duration,
}

impl KubePodSource {
    /// Create a source over all namespaces, or one when `namespace` is set
    pub fn new(client: Client, namespace: Option<String>) -> Self {
        Self {
            client,
            namespace: namespace.filter(|ns| !ns.is_empty()),
            timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }

    /// Set a custom fetch timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl PodSource for KubePodSource {
    async fn list_pods(&self) -> Result<Vec<PodRecord>, SourceError> {
        let pods: Api<Pod> = match &self.namespace {
            Some(ns) => Api::namespaced(self.client.clone(), ns),
            None => Api::all(self.client.clone()),
        };

        let list = tokio::time::timeout(self.timeout, pods.list(&ListParams::default()))
            .await
            .map_err(|_| SourceError::Timeout(self.timeout))??;

        debug!(pods = list.items.len(), "Listed pods from API server");
        Ok(list.items.iter().map(pod_record_from).collect())
    }
}

/// Reads pods from a JSON pod list on disk
pub struct FilePodSource {
    path: PathBuf,
}

#[derive(Deserialize)]
struct PodListFile {
    #[serde(default)]
    items: Vec<Pod>,
}

impl FilePodSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn parse(&self, content: &str) -> Result<Vec<PodRecord>, SourceError> {
        let list: PodListFile =
            serde_json::from_str(content).map_err(|source| SourceError::Parse {
                path: self.path.clone(),
                source,
            })?;
        Ok(list.items.iter().map(pod_record_from).collect())
    }
}

#[async_trait]
impl PodSource for FilePodSource {
    async fn list_pods(&self) -> Result<Vec<PodRecord>, SourceError> {
        let content =
            tokio::fs::read_to_string(&self.path)
                .await
                .map_err(|source| SourceError::Io {
                    path: self.path.clone(),
                    source,
                })?;
        self.parse(&content)
    }
}

/// Convert an API pod into a pod record
///
/// Only `spec.containers` are considered; init containers do not hold
/// resources for the pod's lifetime.
pub fn pod_record_from(pod: &Pod) -> PodRecord {
    let namespace = pod.metadata.namespace.clone().unwrap_or_default();
    let name = pod.metadata.name.clone().unwrap_or_default();
    let status = pod.status.as_ref();

    let containers = pod
        .spec
        .as_ref()
        .map(|spec| {
            spec.containers
                .iter()
                .map(|c| container_record_from(&namespace, &name, c))
                .collect()
        })
        .unwrap_or_default();

    PodRecord {
        host_ip: status.and_then(|s| s.host_ip.clone()).unwrap_or_default(),
        phase: PodPhase::from_api(status.and_then(|s| s.phase.as_deref())),
        namespace,
        name,
        containers,
    }
}

fn container_record_from(namespace: &str, pod: &str, container: &Container) -> ContainerRecord {
    let resources = container.resources.as_ref();
    let requests = resources.and_then(|r| r.requests.as_ref());
    let limits = resources.and_then(|r| r.limits.as_ref());

    let resolve = |list: Option<&BTreeMap<String, Quantity>>,
                   key: &str,
                   parse: fn(&str) -> Result<u64, QuantityError>| {
        let quantity = list.and_then(|l| l.get(key))?;
        match parse(&quantity.0) {
            Ok(amount) => ResourceValue::non_zero(amount, quantity.0.clone()),
            Err(err) => {
                warn!(
                    namespace = %namespace,
                    pod = %pod,
                    container = %container.name,
                    resource = %key,
                    quantity = %quantity.0,
                    error = %err,
                    "Ignoring unparseable resource quantity"
                );
                None
            }
        }
    };

    ContainerRecord {
        name: container.name.clone(),
        request_cpu: resolve(requests, "cpu", parse_cpu_millis),
        request_memory: resolve(requests, "memory", parse_memory_bytes),
        limit_cpu: resolve(limits, "cpu", parse_cpu_millis),
        limit_memory: resolve(limits, "memory", parse_memory_bytes),
    }
}
