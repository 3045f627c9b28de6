//! Rule-based optimisation recommendations
//!
//! Each rule is an independent threshold check; every rule that fires is
//! emitted, in rule order. When none fires a single all-clear is returned.

use crate::stats::ClusterInsights;
use serde::Serialize;
use std::fmt;

/// Cluster efficiency below this suggests limits are too generous
pub const LOW_EFFICIENCY_THRESHOLD: f64 = 50.0;

/// Cluster efficiency above this suggests limits are too tight
pub const HIGH_EFFICIENCY_THRESHOLD: f64 = 80.0;

/// Balance score below this suggests uneven scheduling
pub const BALANCE_SCORE_THRESHOLD: f64 = 70.0;

/// Inputs to the recommendation rules
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecommendationInputs {
    pub cpu_efficiency: Option<f64>,
    pub memory_efficiency: Option<f64>,
    pub over_provisioned: usize,
    pub under_provisioned: usize,
    pub balance_score: f64,
}

impl From<&ClusterInsights> for RecommendationInputs {
    fn from(insights: &ClusterInsights) -> Self {
        Self {
            cpu_efficiency: insights.efficiency.cpu,
            memory_efficiency: insights.efficiency.memory,
            over_provisioned: insights.provisioning.over_provisioned,
            under_provisioned: insights.provisioning.under_provisioned,
            balance_score: insights.balance.score,
        }
    }
}

/// A single advisory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    ReduceCpuLimits,
    ReduceMemoryLimits,
    CpuThrottlingRisk,
    MemoryOomRisk,
    RightSizeOverProvisioned,
    SpreadPods,
    WellBalanced,
}

impl Recommendation {
    pub fn message(&self) -> &'static str {
        match self {
            Self::ReduceCpuLimits => "Consider reducing CPU limits - cluster is over-provisioned",
            Self::ReduceMemoryLimits => {
                "Consider reducing Memory limits - cluster is over-provisioned"
            }
            Self::CpuThrottlingRisk => "CPU limits too tight - risk of throttling",
            Self::MemoryOomRisk => "Memory limits too tight - risk of OOM kills",
            Self::RightSizeOverProvisioned => {
                "Focus on right-sizing over-provisioned namespaces first"
            }
            Self::SpreadPods => "Consider pod anti-affinity rules for better node distribution",
            Self::WellBalanced => "Cluster resource allocation looks well-balanced!",
        }
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Evaluate every rule against the inputs
///
/// An efficiency of `None` (no limits set) never triggers a rule.
pub fn generate_recommendations(inputs: &RecommendationInputs) -> Vec<Recommendation> {
    let below = |v: Option<f64>| v.is_some_and(|v| v < LOW_EFFICIENCY_THRESHOLD);
    let above = |v: Option<f64>| v.is_some_and(|v| v > HIGH_EFFICIENCY_THRESHOLD);

    let rules = [
        (below(inputs.cpu_efficiency), Recommendation::ReduceCpuLimits),
        (below(inputs.memory_efficiency), Recommendation::ReduceMemoryLimits),
        (above(inputs.cpu_efficiency), Recommendation::CpuThrottlingRisk),
        (above(inputs.memory_efficiency), Recommendation::MemoryOomRisk),
        (
            inputs.over_provisioned > inputs.under_provisioned,
            Recommendation::RightSizeOverProvisioned,
        ),
        (
            inputs.balance_score < BALANCE_SCORE_THRESHOLD,
            Recommendation::SpreadPods,
        ),
    ];

    let recs: Vec<Recommendation> = rules
        .into_iter()
        .filter_map(|(fired, rec)| fired.then_some(rec))
        .collect();

    if recs.is_empty() {
        vec![Recommendation::WellBalanced]
    } else {
        recs
    }
}
