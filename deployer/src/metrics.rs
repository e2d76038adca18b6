//! Rollout metrics.
//!
//! Handles are registered once per sequencer and work without an installed recorder
//! (no-op fallback), so tests need no setup.

use metrics::{
    Counter, Gauge, Histogram, counter, describe_counter, describe_gauge, describe_histogram,
    gauge, histogram,
};

/// Metric handles updated while a network is rolled out.
pub struct RolloutMetrics {
    // -- Resources --
    pub workloads_created_total: Counter,
    pub endpoints_created_total: Counter,

    // -- Key store --
    pub key_store_created_total: Counter,
    pub key_store_reused_total: Counter,

    // -- Progress --
    pub validators_created: Gauge,
    pub rollout_failures_total: Counter,
    pub rollout_duration_seconds: Histogram,
}

impl RolloutMetrics {
    pub fn new() -> Self {
        Self {
            workloads_created_total: counter!("deployer.resources_created_total", "kind" => "workload"),
            endpoints_created_total: counter!("deployer.resources_created_total", "kind" => "endpoint"),

            key_store_created_total: counter!("deployer.key_store_total", "outcome" => "created"),
            key_store_reused_total: counter!("deployer.key_store_total", "outcome" => "existing"),

            validators_created: gauge!("deployer.validators_created"),
            rollout_failures_total: counter!("deployer.rollout_failures_total"),
            rollout_duration_seconds: histogram!("deployer.rollout_duration_seconds"),
        }
    }

    /// Register HELP text for all metrics.
    ///
    /// Call once after installing a recorder.
    pub fn describe() {
        describe_counter!(
            "deployer.resources_created_total",
            "Workloads and endpoints created, by kind"
        );
        describe_counter!(
            "deployer.key_store_total",
            "Shared key store publications, by outcome"
        );
        describe_gauge!(
            "deployer.validators_created",
            "Validator workloads created in the current rollout"
        );
        describe_counter!(
            "deployer.rollout_failures_total",
            "Rollouts aborted by a failed step"
        );
        describe_histogram!(
            "deployer.rollout_duration_seconds",
            "Wall time of a rollout, including readiness waits"
        );
    }
}

impl Default for RolloutMetrics {
    fn default() -> Self {
        Self::new()
    }
}
