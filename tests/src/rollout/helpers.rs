//! Test helpers for rollout scenarios.
//!
//! Provides a cluster wrapper that records every request and can be told to reject
//! one of them, and a readiness policy that records pauses instead of sleeping.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::str::FromStr;
use std::time::Duration;

use cluster::{
    ClusterError, ClusterResourceManager, EndpointSpec, InMemoryCluster, KeyStoreOutcome,
    KeyStoreSpec, ResourceHandle, ResourceKind, WorkloadSpec,
};
use deployer::{
    BlockchainSpec, FixedDelays, ProcessorSpec, ReadinessWait, RolloutConfig, RolloutSequencer,
    WaitPoint,
};
use keys::KeyGenerator;
use rand::SeedableRng;
use rand::rngs::StdRng;
use secp256k1::Secp256k1;
use slog::{Drain, Level, Logger, o};

/// Creates a logger for integration tests.
///
/// Respects the `RUST_LOG` environment variable, defaulting to `error` so passing
/// runs stay quiet.
pub fn create_test_logger() -> Logger {
    let log_level = std::env::var("RUST_LOG")
        .ok()
        .and_then(|env_str| Level::from_str(&env_str).ok())
        .unwrap_or(Level::Error);

    let decorator = slog_term::TermDecorator::new().build();
    let drain = slog_term::FullFormat::new(decorator).build().fuse();
    let drain = slog_async::Async::new(drain)
        .build()
        .fuse()
        .filter_level(log_level)
        .fuse();

    slog::Logger::root(drain, o!())
}

/// A `pbft` network on `sawtooth` with `nodes` validators and the given processors.
pub fn network(nodes: usize, processors: &[(&str, &str)]) -> BlockchainSpec {
    let processors = processors
        .iter()
        .map(|(id, name)| {
            (
                id.to_string(),
                ProcessorSpec {
                    name: name.to_string(),
                    image: format!("registry.local/{name}:latest"),
                },
            )
        })
        .collect::<BTreeMap<_, _>>();

    BlockchainSpec {
        name: "consensource".to_string(),
        ledger: "sawtooth".to_string(),
        version: "1.0".to_string(),
        consensus: "pbft".to_string(),
        nodes,
        orchestration: "kubernetes".to_string(),
        processors,
        subscribers: None,
    }
}

/// Deterministic key generator for reproducible runs.
pub fn seeded_generator(seed: u64) -> KeyGenerator<StdRng> {
    KeyGenerator::new(Secp256k1::signing_only(), StdRng::seed_from_u64(seed))
}

/// Sequencer over `cluster` with default settings and a recording wait policy.
pub fn sequencer<C: ClusterResourceManager>(
    cluster: C,
    rollout: RolloutConfig,
) -> RolloutSequencer<C, RecordingWait> {
    let wait = RecordingWait::new(FixedDelays::from_config(&rollout));
    RolloutSequencer::new(
        rollout,
        Default::default(),
        cluster,
        wait,
        create_test_logger(),
    )
}

/// Cluster wrapper that records every create request, in order, and rejects the
/// first request naming `fail_on`.
#[derive(Debug, Default)]
pub struct FaultyCluster {
    pub inner: InMemoryCluster,
    pub fail_on: Option<(ResourceKind, String)>,
    pub requested: Vec<ResourceHandle>,
}

impl FaultyCluster {
    pub fn failing_on(kind: ResourceKind, name: impl Into<String>) -> Self {
        Self {
            fail_on: Some((kind, name.into())),
            ..Self::default()
        }
    }

    /// Names of every workload request, including a rejected one.
    pub fn requested_workloads(&self) -> Vec<&str> {
        self.requested
            .iter()
            .filter(|h| h.kind == ResourceKind::Workload)
            .map(|h| h.name.as_str())
            .collect()
    }

    fn check(&mut self, kind: ResourceKind, name: &str) -> Result<(), ClusterError> {
        self.requested.push(ResourceHandle::new(kind, name));
        match &self.fail_on {
            Some((fail_kind, fail_name)) if *fail_kind == kind && fail_name == name => {
                Err(ClusterError::Rejected {
                    kind,
                    name: name.to_string(),
                    reason: "injected failure".to_string(),
                })
            }
            _ => Ok(()),
        }
    }
}

impl ClusterResourceManager for FaultyCluster {
    fn create_shared_key_store(
        &mut self,
        spec: &KeyStoreSpec,
    ) -> Result<KeyStoreOutcome, ClusterError> {
        self.check(ResourceKind::KeyStore, &spec.name)?;
        self.inner.create_shared_key_store(spec)
    }

    fn read_shared_key_store(
        &self,
        name: &str,
    ) -> Result<Option<BTreeMap<String, String>>, ClusterError> {
        self.inner.read_shared_key_store(name)
    }

    fn create_workload(&mut self, spec: &WorkloadSpec) -> Result<ResourceHandle, ClusterError> {
        self.check(ResourceKind::Workload, &spec.name)?;
        self.inner.create_workload(spec)
    }

    fn create_endpoint(&mut self, spec: &EndpointSpec) -> Result<ResourceHandle, ClusterError> {
        self.check(ResourceKind::Endpoint, &spec.name)?;
        self.inner.create_endpoint(spec)
    }
}

/// Readiness policy that records each pause and its length without sleeping.
#[derive(Debug)]
pub struct RecordingWait {
    delays: FixedDelays,
    pub waits: Vec<(WaitPoint, Duration)>,
}

impl RecordingWait {
    pub fn new(delays: FixedDelays) -> Self {
        Self {
            delays,
            waits: Vec::new(),
        }
    }

    pub fn total(&self) -> Duration {
        self.waits.iter().map(|(_, d)| *d).sum()
    }
}

impl ReadinessWait for RecordingWait {
    fn delay_for(&self, point: WaitPoint) -> Duration {
        self.delays.delay_for(point)
    }

    fn wait(&mut self, point: WaitPoint) {
        let delay = self.delay_for(point);
        self.waits.push((point, delay));
    }
}
