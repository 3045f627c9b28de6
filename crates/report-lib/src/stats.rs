//! Descriptive statistics over aggregated buckets
//!
//! Efficiency ratios, provisioning classification and node balance scoring.
//! Every ratio with a zero denominator is reported as `None` ("no data")
//! rather than NaN, infinity or a made-up percentage.

use crate::aggregate::{Aggregation, ResourceTotals};
use serde::Serialize;

/// Average efficiency below this marks a namespace over-provisioned
pub const OVER_PROVISIONED_THRESHOLD: f64 = 50.0;

/// Average efficiency above this marks a namespace under-provisioned
pub const UNDER_PROVISIONED_THRESHOLD: f64 = 80.0;

/// Namespaces without limits named individually in warnings
const NO_LIMIT_WARNINGS_SHOWN: usize = 3;

const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Per-container efficiency: request / limit × 100
///
/// Defined only when both the request and the limit are set.
pub fn efficiency_ratio(request: u64, limit: u64) -> Option<f64> {
    (request > 0 && limit > 0).then(|| request as f64 / limit as f64 * 100.0)
}

/// Aggregate efficiency: request / limit × 100, defined whenever a limit exists
///
/// A bucket with limits but no requests is genuinely 0% efficient.
pub fn utilization_ratio(request: u64, limit: u64) -> Option<f64> {
    (limit > 0).then(|| request as f64 / limit as f64 * 100.0)
}

/// Colour band for an efficiency cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EfficiencyBand {
    High,
    Medium,
    Low,
    VeryLow,
}

impl EfficiencyBand {
    pub fn from_percent(pct: f64) -> Self {
        if pct >= 80.0 {
            Self::High
        } else if pct >= 60.0 {
            Self::Medium
        } else if pct >= 40.0 {
            Self::Low
        } else {
            Self::VeryLow
        }
    }

    /// Fill colour as 0xRRGGBB
    pub fn fill_rgb(&self) -> u32 {
        match self {
            Self::High => 0xFF6B6B,
            Self::Medium => 0xFFE66D,
            Self::Low => 0x4ECDC4,
            Self::VeryLow => 0x95E1D3,
        }
    }
}

/// Human rating of a cluster-level efficiency figure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EfficiencyRating {
    UnderProvisioned,
    WellBalanced,
    OverProvisioned,
    SeverelyOverProvisioned,
}

impl EfficiencyRating {
    pub fn from_percent(pct: f64) -> Self {
        if pct >= 80.0 {
            Self::UnderProvisioned
        } else if pct >= 60.0 {
            Self::WellBalanced
        } else if pct >= 40.0 {
            Self::OverProvisioned
        } else {
            Self::SeverelyOverProvisioned
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::UnderProvisioned => "Under-provisioned",
            Self::WellBalanced => "Well-balanced",
            Self::OverProvisioned => "Over-provisioned",
            Self::SeverelyOverProvisioned => "Severely over-provisioned",
        }
    }
}

/// Provisioning bucket of a namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProvisioningClass {
    OverProvisioned,
    Balanced,
    UnderProvisioned,
}

impl ProvisioningClass {
    fn from_average(avg: f64) -> Self {
        if avg < OVER_PROVISIONED_THRESHOLD {
            Self::OverProvisioned
        } else if avg > UNDER_PROVISIONED_THRESHOLD {
            Self::UnderProvisioned
        } else {
            Self::Balanced
        }
    }
}

/// Mean of the CPU and memory ratios of a bucket
///
/// Both resources need a limit; a bucket missing either one has no data
/// and is left out of classification.
pub fn average_efficiency(totals: &ResourceTotals) -> Option<f64> {
    let cpu = utilization_ratio(totals.request_cpu_millis, totals.limit_cpu_millis)?;
    let memory = utilization_ratio(totals.request_memory_bytes, totals.limit_memory_bytes)?;
    Some((cpu + memory) / 2.0)
}

/// Classify a namespace; `None` unless both CPU and memory are limited
pub fn classify(totals: &ResourceTotals) -> Option<ProvisioningClass> {
    average_efficiency(totals).map(ProvisioningClass::from_average)
}

/// Namespace counts per provisioning bucket
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProvisioningSummary {
    pub over_provisioned: usize,
    pub balanced: usize,
    pub under_provisioned: usize,
    /// Namespaces lacking a CPU or memory limit, excluded from classification
    pub unclassified: usize,
}

impl ProvisioningSummary {
    pub fn from_namespaces<'a>(totals: impl IntoIterator<Item = &'a ResourceTotals>) -> Self {
        let mut summary = Self::default();
        for t in totals {
            match classify(t) {
                Some(ProvisioningClass::OverProvisioned) => summary.over_provisioned += 1,
                Some(ProvisioningClass::Balanced) => summary.balanced += 1,
                Some(ProvisioningClass::UnderProvisioned) => summary.under_provisioned += 1,
                None => summary.unclassified += 1,
            }
        }
        summary
    }
}

/// Cluster-wide request/limit efficiency
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ClusterEfficiency {
    pub cpu: Option<f64>,
    pub memory: Option<f64>,
}

impl ClusterEfficiency {
    pub fn from_totals(totals: &ResourceTotals) -> Self {
        Self {
            cpu: utilization_ratio(totals.request_cpu_millis, totals.limit_cpu_millis),
            memory: utilization_ratio(totals.request_memory_bytes, totals.limit_memory_bytes),
        }
    }
}

/// Arithmetic mean; 0 for an empty slice
pub fn mean(values: &[usize]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<usize>() as f64 / values.len() as f64
}

/// Population standard deviation (divisor N); 0 for an empty slice
pub fn std_dev(values: &[usize]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let avg = mean(values);
    let sum: f64 = values
        .iter()
        .map(|&v| {
            let d = v as f64 - avg;
            d * d
        })
        .sum();
    (sum / values.len() as f64).sqrt()
}

/// Evenness of the pod distribution across nodes
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct NodeBalance {
    pub node_count: usize,
    pub mean: f64,
    pub std_dev: f64,
    pub min: usize,
    pub max: usize,
    pub coefficient_of_variation: f64,
    /// 0-100, 100 is a perfectly even distribution
    pub score: f64,
}

impl NodeBalance {
    pub fn from_pod_counts(counts: &[usize]) -> Self {
        let avg = mean(counts);
        let sd = std_dev(counts);
        let cv = if avg == 0.0 { 0.0 } else { sd / avg };
        let score = if counts.len() <= 1 {
            100.0
        } else {
            (100.0 - cv * 100.0).max(0.0)
        };

        Self {
            node_count: counts.len(),
            mean: avg,
            std_dev: sd,
            min: counts.iter().copied().min().unwrap_or(0),
            max: counts.iter().copied().max().unwrap_or(0),
            coefficient_of_variation: cv,
            score,
        }
    }
}

/// Balance score of a pod distribution
pub fn balance_score(counts: &[usize]) -> f64 {
    NodeBalance::from_pod_counts(counts).score
}

/// Everything the insights sheet and the recommendation rules read
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ClusterInsights {
    pub efficiency: ClusterEfficiency,
    pub provisioning: ProvisioningSummary,
    /// CPU that could be released if limits equalled requests
    pub potential_cpu_savings_cores: f64,
    /// Memory that could be released if limits equalled requests
    pub potential_memory_savings_gib: f64,
    pub balance: NodeBalance,
}

impl ClusterInsights {
    pub fn from_aggregation(agg: &Aggregation) -> Self {
        let totals = agg.cluster_resources();
        Self {
            efficiency: ClusterEfficiency::from_totals(&totals),
            provisioning: ProvisioningSummary::from_namespaces(agg.namespaces.values()),
            potential_cpu_savings_cores: totals
                .limit_cpu_millis
                .saturating_sub(totals.request_cpu_millis) as f64
                / 1000.0,
            potential_memory_savings_gib: totals
                .limit_memory_bytes
                .saturating_sub(totals.request_memory_bytes) as f64
                / GIB,
            balance: NodeBalance::from_pod_counts(&agg.pod_counts()),
        }
    }
}

/// Data-quality warnings worth surfacing after aggregation
pub fn resource_warnings(agg: &Aggregation) -> Vec<String> {
    let mut warnings = Vec::new();

    let no_limits: Vec<String> = agg
        .sorted_namespaces()
        .into_iter()
        .filter(|(_, t)| t.has_no_limits())
        .map(|(ns, _)| ns)
        .collect();
    for ns in no_limits.iter().take(NO_LIMIT_WARNINGS_SHOWN) {
        warnings.push(format!("Namespace '{}' has no resource limits", ns));
    }
    if no_limits.len() > NO_LIMIT_WARNINGS_SHOWN {
        warnings.push(format!(
            "... and {} more namespaces without limits",
            no_limits.len() - NO_LIMIT_WARNINGS_SHOWN
        ));
    }

    if agg.nodes.len() > 1 {
        let counts = agg.pod_counts();
        let min = counts.iter().copied().min().unwrap_or(0);
        let max = counts.iter().copied().max().unwrap_or(0);
        if max > min * 2 {
            warnings.push(format!(
                "Pod distribution imbalanced: {}-{} pods per node",
                min, max
            ));
        }
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::NodeTotals;

    fn totals(req_cpu: u64, lim_cpu: u64, req_mem: u64, lim_mem: u64) -> ResourceTotals {
        ResourceTotals {
            request_cpu_millis: req_cpu,
            limit_cpu_millis: lim_cpu,
            request_memory_bytes: req_mem,
            limit_memory_bytes: lim_mem,
        }
    }

    #[test]
    fn test_efficiency_ratio_requires_both_values() {
        assert_eq!(efficiency_ratio(100, 200), Some(50.0));
        assert_eq!(efficiency_ratio(0, 200), None);
        assert_eq!(efficiency_ratio(100, 0), None);
        assert_eq!(efficiency_ratio(0, 0), None);
    }

    #[test]
    fn test_utilization_ratio_requires_limit() {
        assert_eq!(utilization_ratio(0, 200), Some(0.0));
        assert_eq!(utilization_ratio(300, 200), Some(150.0));
        assert_eq!(utilization_ratio(100, 0), None);
    }

    #[test]
    fn test_classification_buckets() {
        assert_eq!(
            classify(&totals(100, 400, 100, 400)),
            Some(ProvisioningClass::OverProvisioned)
        );
        assert_eq!(
            classify(&totals(300, 400, 240, 400)),
            Some(ProvisioningClass::Balanced)
        );
        assert_eq!(
            classify(&totals(90, 100, 100, 100)),
            Some(ProvisioningClass::UnderProvisioned)
        );
        // Boundaries are inclusive for balanced
        assert_eq!(
            classify(&totals(50, 100, 50, 100)),
            Some(ProvisioningClass::Balanced)
        );
        assert_eq!(
            classify(&totals(80, 100, 80, 100)),
            Some(ProvisioningClass::Balanced)
        );
    }

    #[test]
    fn test_classification_without_limits() {
        assert_eq!(classify(&totals(100, 0, 100, 0)), None);
        // A single limited resource is not enough to classify
        assert_eq!(classify(&totals(500, 0, 90, 100)), None);
        assert_eq!(classify(&totals(90, 100, 500, 0)), None);
        assert_eq!(average_efficiency(&totals(40, 100, 60, 100)), Some(50.0));
    }

    #[test]
    fn test_provisioning_summary() {
        let buckets = [
            totals(100, 400, 100, 400),
            totals(300, 400, 240, 400),
            totals(10, 0, 10, 0),
            totals(95, 100, 95, 100),
            totals(10, 100, 10, 100),
            totals(10, 100, 10, 0),
        ];
        let summary = ProvisioningSummary::from_namespaces(buckets.iter());
        assert_eq!(summary.over_provisioned, 2);
        assert_eq!(summary.balanced, 1);
        assert_eq!(summary.under_provisioned, 1);
        assert_eq!(summary.unclassified, 2);
    }

    #[test]
    fn test_mean_and_std_dev() {
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(std_dev(&[]), 0.0);
        assert_eq!(mean(&[2, 4, 4, 4, 5, 5, 7, 9]), 5.0);
        assert_eq!(std_dev(&[2, 4, 4, 4, 5, 5, 7, 9]), 2.0);
    }

    #[test]
    fn test_balance_score_even_distribution() {
        for n in 1..=6 {
            assert_eq!(balance_score(&vec![7; n]), 100.0);
        }
        assert_eq!(balance_score(&[]), 100.0);
        assert_eq!(balance_score(&[0, 0, 0]), 100.0);
    }

    #[test]
    fn test_balance_score_single_node() {
        assert_eq!(balance_score(&[42]), 100.0);
    }

    #[test]
    fn test_balance_score_decreases_with_spread() {
        let mut previous = balance_score(&[10, 10, 10, 10]);
        for spread in 1..=10 {
            let score = balance_score(&[10 - spread, 10, 10, 10 + spread]);
            assert!(score < previous, "spread {spread}: {score} >= {previous}");
            previous = score;
        }
    }

    #[test]
    fn test_balance_score_floors_at_zero() {
        assert_eq!(balance_score(&[0, 0, 0, 100]), 0.0);
    }

    #[test]
    fn test_node_balance_fields() {
        let balance = NodeBalance::from_pod_counts(&[2, 6]);
        assert_eq!(balance.node_count, 2);
        assert_eq!(balance.mean, 4.0);
        assert_eq!(balance.std_dev, 2.0);
        assert_eq!(balance.min, 2);
        assert_eq!(balance.max, 6);
        assert_eq!(balance.coefficient_of_variation, 0.5);
        assert_eq!(balance.score, 50.0);
    }

    #[test]
    fn test_efficiency_band_thresholds() {
        assert_eq!(EfficiencyBand::from_percent(95.0), EfficiencyBand::High);
        assert_eq!(EfficiencyBand::from_percent(80.0), EfficiencyBand::High);
        assert_eq!(EfficiencyBand::from_percent(60.0), EfficiencyBand::Medium);
        assert_eq!(EfficiencyBand::from_percent(45.5), EfficiencyBand::Low);
        assert_eq!(EfficiencyBand::from_percent(10.0), EfficiencyBand::VeryLow);
        assert_eq!(EfficiencyBand::High.fill_rgb(), 0xFF6B6B);
    }

    #[test]
    fn test_efficiency_rating() {
        assert_eq!(
            EfficiencyRating::from_percent(85.0),
            EfficiencyRating::UnderProvisioned
        );
        assert_eq!(
            EfficiencyRating::from_percent(65.0).label(),
            "Well-balanced"
        );
        assert_eq!(
            EfficiencyRating::from_percent(39.9),
            EfficiencyRating::SeverelyOverProvisioned
        );
    }

    #[test]
    fn test_cluster_insights_without_limits() {
        let mut agg = Aggregation::default();
        agg.namespaces
            .insert("a".to_string(), totals(100, 0, 1024, 0));
        let insights = ClusterInsights::from_aggregation(&agg);
        assert_eq!(insights.efficiency.cpu, None);
        assert_eq!(insights.efficiency.memory, None);
        assert_eq!(insights.potential_cpu_savings_cores, 0.0);
        assert_eq!(insights.provisioning.unclassified, 1);
    }

    #[test]
    fn test_cluster_insights_savings() {
        let mut agg = Aggregation::default();
        agg.namespaces
            .insert("a".to_string(), totals(500, 2000, GIB as u64, 3 * GIB as u64));
        let insights = ClusterInsights::from_aggregation(&agg);
        assert_eq!(insights.efficiency.cpu, Some(25.0));
        assert_eq!(insights.potential_cpu_savings_cores, 1.5);
        assert_eq!(insights.potential_memory_savings_gib, 2.0);
    }

    #[test]
    fn test_resource_warnings() {
        let mut agg = Aggregation::default();
        for ns in ["e", "d", "c", "b", "a"] {
            agg.namespaces.insert(ns.to_string(), totals(10, 0, 10, 0));
        }
        agg.namespaces
            .insert("limited".to_string(), totals(10, 20, 10, 20));
        for (node, pods) in [("n1", 1), ("n2", 5)] {
            agg.nodes.insert(
                node.to_string(),
                NodeTotals {
                    pod_count: pods,
                    ..Default::default()
                },
            );
        }

        let warnings = resource_warnings(&agg);
        assert_eq!(
            warnings,
            vec![
                "Namespace 'a' has no resource limits".to_string(),
                "Namespace 'b' has no resource limits".to_string(),
                "Namespace 'c' has no resource limits".to_string(),
                "... and 2 more namespaces without limits".to_string(),
                "Pod distribution imbalanced: 1-5 pods per node".to_string(),
            ]
        );
    }

    #[test]
    fn test_no_warnings_for_healthy_cluster() {
        let mut agg = Aggregation::default();
        agg.namespaces
            .insert("a".to_string(), totals(10, 20, 10, 20));
        assert!(resource_warnings(&agg).is_empty());
    }
}
