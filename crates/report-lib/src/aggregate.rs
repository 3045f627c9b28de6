//! Single-pass resource aggregation
//!
//! One walk over the qualifying pods produces the per-namespace and per-node
//! running sums together with the per-container detail rows. Buckets are
//! accumulated in hash maps and only ordered when read back through
//! [`Aggregation::sorted_namespaces`] and [`Aggregation::sorted_nodes`].

use crate::models::{ContainerResourceSample, PodRecord};
use crate::stats::efficiency_ratio;
use serde::Serialize;
use std::collections::HashMap;
use tracing::info;

/// Pods between progress log lines
pub const PROGRESS_LOG_INTERVAL: usize = 50;

/// Placeholder rendered for a request or limit that is not set
pub const UNSET: &str = "-";

const MIB: f64 = 1024.0 * 1024.0;

/// Cluster-wide requested resources; denominators for share-of-cluster columns
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ClusterTotals {
    pub request_cpu_millis: u64,
    pub request_memory_bytes: u64,
}

/// Running request/limit sums for one bucket
///
/// Sums saturate at `u64::MAX` instead of wrapping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResourceTotals {
    pub request_cpu_millis: u64,
    pub limit_cpu_millis: u64,
    pub request_memory_bytes: u64,
    pub limit_memory_bytes: u64,
}

impl ResourceTotals {
    /// Add one container's requests and limits
    pub fn add(&mut self, sample: &ContainerResourceSample) {
        self.request_cpu_millis = self.request_cpu_millis.saturating_add(sample.request_cpu_millis());
        self.limit_cpu_millis = self.limit_cpu_millis.saturating_add(sample.limit_cpu_millis());
        self.request_memory_bytes = self
            .request_memory_bytes
            .saturating_add(sample.request_memory_bytes());
        self.limit_memory_bytes = self
            .limit_memory_bytes
            .saturating_add(sample.limit_memory_bytes());
    }

    /// Merge another bucket into this one
    pub fn merge(&mut self, other: &ResourceTotals) {
        self.request_cpu_millis = self.request_cpu_millis.saturating_add(other.request_cpu_millis);
        self.limit_cpu_millis = self.limit_cpu_millis.saturating_add(other.limit_cpu_millis);
        self.request_memory_bytes = self
            .request_memory_bytes
            .saturating_add(other.request_memory_bytes);
        self.limit_memory_bytes = self
            .limit_memory_bytes
            .saturating_add(other.limit_memory_bytes);
    }

    pub fn request_cpu_cores(&self) -> f64 {
        self.request_cpu_millis as f64 / 1000.0
    }

    pub fn limit_cpu_cores(&self) -> f64 {
        self.limit_cpu_millis as f64 / 1000.0
    }

    pub fn request_memory_mib(&self) -> f64 {
        self.request_memory_bytes as f64 / MIB
    }

    pub fn limit_memory_mib(&self) -> f64 {
        self.limit_memory_bytes as f64 / MIB
    }

    /// True when neither a CPU nor a memory limit contributed
    pub fn has_no_limits(&self) -> bool {
        self.limit_cpu_millis == 0 && self.limit_memory_bytes == 0
    }
}

/// Per-node bucket: pod count plus resource sums
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NodeTotals {
    pub pod_count: usize,
    #[serde(flatten)]
    pub resources: ResourceTotals,
}

/// One Resources-sheet row, derived from a single container
#[derive(Debug, Clone, PartialEq)]
pub struct DetailRow {
    pub namespace: String,
    pub pod: String,
    /// Raw host IP; empty for unscheduled pods
    pub node: String,
    pub container: String,
    pub status: String,
    pub request_cpu_millis: u64,
    pub request_cpu_display: String,
    pub request_memory_mib: f64,
    pub request_memory_display: String,
    pub limit_cpu_millis: u64,
    pub limit_cpu_display: String,
    pub limit_memory_mib: f64,
    pub limit_memory_display: String,
    pub cpu_efficiency: Option<f64>,
    pub memory_efficiency: Option<f64>,
    pub cpu_cluster_share: Option<f64>,
    pub memory_cluster_share: Option<f64>,
}

impl DetailRow {
    fn from_sample(sample: &ContainerResourceSample, cluster: &ClusterTotals) -> Self {
        let display = |v: &Option<crate::models::ResourceValue>| {
            v.as_ref()
                .map_or_else(|| UNSET.to_string(), |v| v.raw.clone())
        };

        let request_cpu = sample.request_cpu_millis();
        let request_memory = sample.request_memory_bytes();

        Self {
            namespace: sample.namespace.clone(),
            pod: sample.pod_name.clone(),
            node: sample.node.clone(),
            container: sample.container_name.clone(),
            status: sample.phase.to_string(),
            request_cpu_millis: request_cpu,
            request_cpu_display: display(&sample.request_cpu),
            request_memory_mib: request_memory as f64 / MIB,
            request_memory_display: display(&sample.request_memory),
            limit_cpu_millis: sample.limit_cpu_millis(),
            limit_cpu_display: display(&sample.limit_cpu),
            limit_memory_mib: sample.limit_memory_bytes() as f64 / MIB,
            limit_memory_display: display(&sample.limit_memory),
            cpu_efficiency: efficiency_ratio(request_cpu, sample.limit_cpu_millis()),
            memory_efficiency: efficiency_ratio(request_memory, sample.limit_memory_bytes()),
            cpu_cluster_share: cluster_share(request_cpu, cluster.request_cpu_millis),
            memory_cluster_share: cluster_share(request_memory, cluster.request_memory_bytes),
        }
    }
}

/// Format an efficiency percentage, one decimal place
pub fn format_efficiency(value: Option<f64>) -> String {
    value.map(|v| format!("{:.1}%", v)).unwrap_or_default()
}

/// Format a share-of-cluster percentage, two decimal places
pub fn format_share(value: Option<f64>) -> String {
    value.map(|v| format!("{:.2}%", v)).unwrap_or_default()
}

fn cluster_share(part: u64, total: u64) -> Option<f64> {
    (total > 0).then(|| part as f64 / total as f64 * 100.0)
}

/// Output of the aggregation pass
#[derive(Debug, Clone, Default)]
pub struct Aggregation {
    pub cluster: ClusterTotals,
    pub namespaces: HashMap<String, ResourceTotals>,
    pub nodes: HashMap<String, NodeTotals>,
    pub rows: Vec<DetailRow>,
    /// Pods that passed the phase filter
    pub pod_count: usize,
    pub container_count: usize,
}

impl Aggregation {
    /// Namespace buckets in lexical order
    pub fn sorted_namespaces(&self) -> Vec<(String, ResourceTotals)> {
        let mut out: Vec<_> = self
            .namespaces
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }

    /// Node buckets in lexical order
    pub fn sorted_nodes(&self) -> Vec<(String, NodeTotals)> {
        let mut out: Vec<_> = self.nodes.iter().map(|(k, v)| (k.clone(), *v)).collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }

    /// Sum of every namespace bucket
    pub fn cluster_resources(&self) -> ResourceTotals {
        let mut total = ResourceTotals::default();
        for totals in self.namespaces.values() {
            total.merge(totals);
        }
        total
    }

    /// Pod counts per node, in node order
    pub fn pod_counts(&self) -> Vec<usize> {
        self.sorted_nodes().iter().map(|(_, t)| t.pod_count).collect()
    }
}

fn qualifying(pods: &[PodRecord]) -> impl Iterator<Item = &PodRecord> {
    pods.iter().filter(|p| p.phase.is_active())
}

/// Sum requested CPU and memory over every qualifying container
pub fn compute_cluster_totals(pods: &[PodRecord]) -> ClusterTotals {
    let mut totals = ClusterTotals::default();
    for sample in qualifying(pods).flat_map(PodRecord::samples) {
        totals.request_cpu_millis = totals
            .request_cpu_millis
            .saturating_add(sample.request_cpu_millis());
        totals.request_memory_bytes = totals
            .request_memory_bytes
            .saturating_add(sample.request_memory_bytes());
    }
    totals
}

/// Aggregate pods into namespace/node buckets and detail rows
///
/// Pods are visited in input order and containers in pod-spec order, so the
/// row sequence is stable for a given input.
pub fn aggregate(pods: &[PodRecord]) -> Aggregation {
    let cluster = compute_cluster_totals(pods);
    let mut agg = Aggregation {
        cluster,
        ..Default::default()
    };

    for (i, pod) in pods.iter().enumerate() {
        if i > 0 && i % PROGRESS_LOG_INTERVAL == 0 {
            info!(
                processed = i,
                total = pods.len(),
                containers = agg.container_count,
                "Aggregation progress"
            );
        }

        if !pod.phase.is_active() {
            continue;
        }

        let mut node = NodeTotals {
            pod_count: 1,
            ..Default::default()
        };
        // Namespace buckets are created per container, so a pod without
        // containers leaves no empty bucket behind
        for sample in pod.samples() {
            agg.namespaces
                .entry(pod.namespace_key().to_string())
                .or_default()
                .add(&sample);
            node.resources.add(&sample);
            agg.rows.push(DetailRow::from_sample(&sample, &cluster));
            agg.container_count += 1;
        }

        // Folded in once per pod so multi-container pods count once
        let bucket = agg.nodes.entry(pod.node_key().to_string()).or_default();
        bucket.pod_count += node.pod_count;
        bucket.resources.merge(&node.resources);
        agg.pod_count += 1;
    }

    info!(
        pods = agg.pod_count,
        containers = agg.container_count,
        namespaces = agg.namespaces.len(),
        nodes = agg.nodes.len(),
        "Aggregation complete"
    );

    agg
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ContainerRecord, PodPhase, ResourceValue};

    const MI: u64 = 1024 * 1024;

    fn container(name: &str, req: (u64, u64), lim: (u64, u64)) -> ContainerRecord {
        ContainerRecord {
            name: name.to_string(),
            request_cpu: ResourceValue::non_zero(req.0, format!("{}m", req.0)),
            request_memory: ResourceValue::non_zero(req.1, format!("{}Mi", req.1 / MI)),
            limit_cpu: ResourceValue::non_zero(lim.0, format!("{}m", lim.0)),
            limit_memory: ResourceValue::non_zero(lim.1, format!("{}Mi", lim.1 / MI)),
        }
    }

    fn pod(
        ns: &str,
        name: &str,
        host: &str,
        phase: PodPhase,
        containers: Vec<ContainerRecord>,
    ) -> PodRecord {
        PodRecord {
            namespace: ns.to_string(),
            name: name.to_string(),
            host_ip: host.to_string(),
            phase,
            containers,
        }
    }

    fn standard(name: &str) -> PodRecord {
        pod(
            "default",
            name,
            "10.0.0.1",
            PodPhase::Running,
            vec![container("app", (100, 128 * MI), (200, 256 * MI))],
        )
    }

    #[test]
    fn test_two_pod_scenario() {
        let pods = vec![standard("a"), standard("b")];
        let agg = aggregate(&pods);

        let ns = agg.namespaces["default"];
        assert_eq!(ns.request_cpu_millis, 200);
        assert_eq!(ns.limit_cpu_millis, 400);
        assert_eq!(ns.request_memory_bytes, 2 * 128 * MI);
        assert_eq!(ns.limit_memory_bytes, 2 * 256 * MI);

        assert_eq!(agg.rows.len(), 2);
        for row in &agg.rows {
            assert_eq!(format_efficiency(row.cpu_efficiency), "50.0%");
            assert_eq!(format_efficiency(row.memory_efficiency), "50.0%");
            assert_eq!(format_share(row.cpu_cluster_share), "50.00%");
        }
        assert_eq!(agg.nodes["10.0.0.1"].pod_count, 2);
    }

    #[test]
    fn test_cluster_totals_skip_inactive_pods() {
        let mut failed = standard("failed");
        failed.phase = PodPhase::Failed;
        let mut done = standard("done");
        done.phase = PodPhase::Succeeded;
        let mut pending = standard("pending");
        pending.phase = PodPhase::Pending;

        let totals = compute_cluster_totals(&[standard("a"), failed, done, pending]);
        assert_eq!(totals.request_cpu_millis, 200);
        assert_eq!(totals.request_memory_bytes, 256 * MI);
    }

    #[test]
    fn test_inactive_pods_never_appear() {
        let mut failed = standard("failed");
        failed.phase = PodPhase::Failed;
        failed.namespace = "broken".to_string();
        failed.host_ip = "10.9.9.9".to_string();
        let mut unknown = standard("lost");
        unknown.phase = PodPhase::Unknown;

        let agg = aggregate(&[failed, unknown, standard("ok")]);
        assert!(!agg.namespaces.contains_key("broken"));
        assert!(!agg.nodes.contains_key("10.9.9.9"));
        assert_eq!(agg.rows.len(), 1);
        assert_eq!(agg.rows[0].pod, "ok");
        assert_eq!(agg.pod_count, 1);
    }

    #[test]
    fn test_node_pod_count_ignores_container_count() {
        let multi = pod(
            "web",
            "multi",
            "10.0.0.2",
            PodPhase::Running,
            vec![
                container("a", (100, MI), (0, 0)),
                container("b", (100, MI), (0, 0)),
                container("c", (100, MI), (0, 0)),
            ],
        );
        let single = pod(
            "web",
            "single",
            "10.0.0.2",
            PodPhase::Pending,
            vec![container("a", (50, MI), (0, 0))],
        );

        let agg = aggregate(&[multi, single]);
        let node = agg.nodes["10.0.0.2"];
        assert_eq!(node.pod_count, 2);
        assert_eq!(node.resources.request_cpu_millis, 350);
        assert_eq!(agg.container_count, 4);
    }

    #[test]
    fn test_namespace_and_node_sums_agree() {
        let pods = vec![
            pod(
                "a",
                "p1",
                "10.0.0.1",
                PodPhase::Running,
                vec![container("x", (120, 3 * MI), (500, 4 * MI))],
            ),
            pod(
                "b",
                "p2",
                "10.0.0.2",
                PodPhase::Running,
                vec![
                    container("x", (80, 5 * MI), (0, 0)),
                    container("y", (0, 0), (100, MI)),
                ],
            ),
            pod(
                "a",
                "p3",
                "",
                PodPhase::Pending,
                vec![container("x", (7, MI), (9, MI))],
            ),
        ];
        let agg = aggregate(&pods);

        let ns_cpu: u64 = agg.namespaces.values().map(|t| t.request_cpu_millis).sum();
        let node_cpu: u64 = agg
            .nodes
            .values()
            .map(|t| t.resources.request_cpu_millis)
            .sum();
        assert_eq!(ns_cpu, 207);
        assert_eq!(node_cpu, 207);
        assert_eq!(agg.cluster.request_cpu_millis, 207);
        assert_eq!(agg.cluster_resources().request_memory_bytes, 9 * MI);
        assert_eq!(agg.nodes["Unknown"].pod_count, 1);
    }

    #[test]
    fn test_empty_namespace_defaults() {
        let pods = vec![pod(
            "",
            "orphan",
            "",
            PodPhase::Running,
            vec![container("x", (10, MI), (20, 2 * MI))],
        )];
        let agg = aggregate(&pods);
        assert!(agg.namespaces.contains_key("default"));
        assert!(agg.nodes.contains_key("Unknown"));
        // Detail rows keep the raw values
        assert_eq!(agg.rows[0].namespace, "");
        assert_eq!(agg.rows[0].node, "");
    }

    #[test]
    fn test_unset_values_render_placeholder() {
        let pods = vec![pod(
            "ns",
            "bare",
            "10.0.0.1",
            PodPhase::Running,
            vec![container("x", (100, 0), (0, 0))],
        )];
        let agg = aggregate(&pods);
        let row = &agg.rows[0];
        assert_eq!(row.request_cpu_display, "100m");
        assert_eq!(row.request_memory_display, UNSET);
        assert_eq!(row.limit_cpu_display, UNSET);
        assert_eq!(row.limit_memory_display, UNSET);
        assert_eq!(row.limit_cpu_millis, 0);
        assert_eq!(row.cpu_efficiency, None);
        assert_eq!(row.memory_efficiency, None);
        assert_eq!(format_efficiency(row.cpu_efficiency), "");
    }

    #[test]
    fn test_cluster_share_omitted_without_requests() {
        let pods = vec![pod(
            "ns",
            "limits-only",
            "10.0.0.1",
            PodPhase::Running,
            vec![container("x", (0, 0), (100, MI))],
        )];
        let agg = aggregate(&pods);
        assert_eq!(agg.rows[0].cpu_cluster_share, None);
        assert_eq!(agg.rows[0].memory_cluster_share, None);
        assert_eq!(format_share(agg.rows[0].cpu_cluster_share), "");
    }

    #[test]
    fn test_sorted_output_is_lexical() {
        let pods: Vec<_> = ["zeta", "alpha", "mid", "Beta"]
            .iter()
            .enumerate()
            .map(|(i, ns)| {
                pod(
                    ns,
                    "p",
                    &format!("10.0.0.{}", 9 - i),
                    PodPhase::Running,
                    vec![container("x", (1, 1), (1, 1))],
                )
            })
            .collect();
        let agg = aggregate(&pods);

        let names: Vec<_> = agg.sorted_namespaces().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["Beta", "alpha", "mid", "zeta"]);

        let nodes: Vec<_> = agg.sorted_nodes().into_iter().map(|(n, _)| n).collect();
        assert_eq!(nodes, vec!["10.0.0.6", "10.0.0.7", "10.0.0.8", "10.0.0.9"]);
    }

    #[test]
    fn test_aggregation_is_deterministic() {
        let pods: Vec<_> = (0..120)
            .map(|i| {
                pod(
                    &format!("ns-{}", i % 7),
                    &format!("pod-{i}"),
                    &format!("10.0.0.{}", i % 5),
                    PodPhase::Running,
                    vec![
                        container("a", (i as u64 + 1, MI), (200, 2 * MI)),
                        container("b", (3, 0), (0, 0)),
                    ],
                )
            })
            .collect();

        let first = aggregate(&pods);
        let second = aggregate(&pods);
        assert_eq!(first.sorted_namespaces(), second.sorted_namespaces());
        assert_eq!(first.sorted_nodes(), second.sorted_nodes());
        assert_eq!(first.rows, second.rows);
        assert_eq!(first.rows[0].pod, "pod-0");
        assert_eq!(first.rows[1].container, "b");
    }

    #[test]
    fn test_huge_quantities_saturate() {
        const EI: u64 = 1 << 60;
        let huge = |name: &str| ContainerRecord {
            name: name.to_string(),
            request_memory: ResourceValue::non_zero(7 * EI, "7Ei".to_string()),
            limit_memory: ResourceValue::non_zero(7 * EI, "7Ei".to_string()),
            ..Default::default()
        };
        let pods = vec![pod(
            "big",
            "hog",
            "10.0.0.1",
            PodPhase::Running,
            vec![huge("a"), huge("b"), huge("c")],
        )];

        let agg = aggregate(&pods);
        assert_eq!(agg.cluster.request_memory_bytes, u64::MAX);

        let ns = agg.namespaces["big"];
        assert_eq!(ns.request_memory_bytes, u64::MAX);
        assert_eq!(ns.limit_memory_bytes, u64::MAX);
        assert_eq!(agg.nodes["10.0.0.1"].resources.request_memory_bytes, u64::MAX);
        assert_eq!(agg.cluster_resources().limit_memory_bytes, u64::MAX);
        assert_eq!(agg.rows.len(), 3);
    }

    #[test]
    fn test_pod_without_containers_creates_no_namespace() {
        let pods = vec![
            standard("a"),
            pod("empty", "bare", "10.0.0.2", PodPhase::Running, vec![]),
        ];
        let agg = aggregate(&pods);

        assert_eq!(agg.namespaces.len(), 1);
        assert!(!agg.namespaces.contains_key("empty"));
        // The pod still counts towards its node
        assert_eq!(agg.pod_count, 2);
        assert_eq!(agg.nodes["10.0.0.2"].pod_count, 1);
    }

    #[test]
    fn test_empty_input() {
        let agg = aggregate(&[]);
        assert!(agg.namespaces.is_empty());
        assert!(agg.nodes.is_empty());
        assert!(agg.rows.is_empty());
        assert_eq!(agg.cluster, ClusterTotals::default());
    }
}
