use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::BoxFuture;
use crate::error::CoreError;

/// Throughput may fall this far below target before it counts as a breach.
const THROUGHPUT_TOLERANCE: f64 = 0.9;
/// Latency may exceed target by this factor before it counts as a breach.
const LATENCY_TOLERANCE: f64 = 1.1;

/// Performance figures collected from one cluster.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSample {
    pub cluster: String,
    #[serde(with = "crate::duration")]
    pub deployment_time: Duration,
    /// Per-slice throughput in Mbps (eMBB, URLLC, mMTC).
    pub throughput_mbps: Vec<f64>,
    /// Per-slice ping round-trip time in milliseconds.
    pub ping_rtt_ms: Vec<f64>,
    pub cpu_utilization: f64,
    pub memory_utilization: f64,
    #[serde(default)]
    pub packet_loss: f64,
    #[serde(default)]
    pub error_rate: f64,
}

/// Collects performance metrics for a named cluster.
pub trait MetricsCollector: Send + Sync {
    fn collect<'a>(&'a self, cluster: &'a str) -> BoxFuture<'a, Result<MetricsSample, CoreError>>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PerformanceThresholds {
    #[serde(with = "crate::duration")]
    pub deployment_time: Duration,
    pub throughput_mbps: Vec<f64>,
    pub ping_rtt_ms: Vec<f64>,
    pub cpu_utilization: f64,
    pub memory_utilization: f64,
}

impl Default for PerformanceThresholds {
    fn default() -> Self {
        Self {
            deployment_time: Duration::from_secs(10 * 60),
            throughput_mbps: vec![4.57, 2.77, 0.93],
            ping_rtt_ms: vec![16.1, 15.7, 6.3],
            cpu_utilization: 80.0,
            memory_utilization: 80.0,
        }
    }
}

impl PerformanceThresholds {
    /// Every threshold breached by `sample`. Empty = within thresholds.
    ///
    /// Vector targets only compare indices present on both sides.
    pub fn violations(&self, sample: &MetricsSample) -> Vec<String> {
        let mut violations = Vec::new();

        if sample.deployment_time > self.deployment_time {
            violations.push(format!(
                "deployment time {:?} exceeds {:?}",
                sample.deployment_time, self.deployment_time
            ));
        }
        if sample.cpu_utilization > self.cpu_utilization {
            violations.push(format!(
                "cpu utilization {:.1}% exceeds {:.1}%",
                sample.cpu_utilization, self.cpu_utilization
            ));
        }
        if sample.memory_utilization > self.memory_utilization {
            violations.push(format!(
                "memory utilization {:.1}% exceeds {:.1}%",
                sample.memory_utilization, self.memory_utilization
            ));
        }
        for (i, (actual, target)) in sample
            .throughput_mbps
            .iter()
            .zip(&self.throughput_mbps)
            .enumerate()
        {
            if *actual < target * THROUGHPUT_TOLERANCE {
                violations.push(format!(
                    "throughput[{i}] {actual:.2} Mbps below target {target:.2} Mbps"
                ));
            }
        }
        for (i, (actual, target)) in sample.ping_rtt_ms.iter().zip(&self.ping_rtt_ms).enumerate() {
            if *actual > target * LATENCY_TOLERANCE {
                violations.push(format!(
                    "rtt[{i}] {actual:.2} ms above target {target:.2} ms"
                ));
            }
        }

        violations
    }

    pub fn within(&self, sample: &MetricsSample) -> bool {
        self.violations(sample).is_empty()
    }
}
