//! Rollout sequencing.
//!
//! A network is brought up strictly in order:
//!
//! ```text
//! Idle ─► DistributingKeys ─► CreatingGenesis ─► CreatingFollower(1..n)
//!                                                        │
//!            Done ◄─ CreatingProcessor(p)* ◄─ SettlingBeforeProcessors
//! ```
//!
//! Each validator's workload and endpoint are created before the next node's
//! script is submitted, because a follower peers statically with every node
//! below it. The first failed cluster call moves the sequencer to `Failed` and
//! aborts the rollout. Nothing already created is rolled back.

use std::fmt;
use std::time::Instant;

use bootstrap::NodeRole;
use cluster::{
    ClusterError, ClusterResourceManager, ClusterSettings, KeyStoreOutcome, ResourceBuilder,
    ResourceHandle,
};
use keys::{KeyGenerator, KeyMaterialMap, build_key_map};
use rand::{CryptoRng, RngCore};
use serde::Serialize;
use slog::Logger;

use crate::config::{BlockchainSpec, RolloutConfig};
use crate::error::DeployError;
use crate::metrics::RolloutMetrics;
use crate::plan::RolloutPlan;
use crate::wait::{ReadinessWait, WaitPoint};

/// Where a rollout currently is.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum RolloutState {
    Idle,
    DistributingKeys,
    CreatingGenesis,
    CreatingFollower(usize),
    SettlingBeforeProcessors,
    /// Creating the processor workload with this instance name.
    CreatingProcessor(String),
    Done,
    Failed,
}

impl RolloutState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

impl fmt::Display for RolloutState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::DistributingKeys => write!(f, "key store"),
            Self::CreatingGenesis => write!(f, "node 0"),
            Self::CreatingFollower(index) => write!(f, "node {index}"),
            Self::SettlingBeforeProcessors => write!(f, "processor settle"),
            Self::CreatingProcessor(instance) => write!(f, "processor {instance}"),
            Self::Done => write!(f, "done"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// A validator created by the rollout.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DeployedNode {
    pub index: usize,
    pub role: NodeRole,
    pub workload: ResourceHandle,
    pub endpoint: ResourceHandle,
}

/// A processor created by the rollout.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DeployedProcessor {
    pub id: String,
    pub validator: usize,
    pub workload: ResourceHandle,
    pub endpoint: ResourceHandle,
}

/// Everything a successful rollout created.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RolloutResult {
    /// Outcome of publishing the key store; `None` when keys were supplied by the caller.
    pub key_store: Option<KeyStoreOutcome>,
    pub nodes: Vec<DeployedNode>,
    pub processors: Vec<DeployedProcessor>,
}

/// Drives a [`ClusterResourceManager`] through one network rollout.
///
/// # Example
///
/// ```ignore
/// let mut sequencer = RolloutSequencer::new(
///     config.rollout.clone(),
///     config.cluster.clone(),
///     ManifestDirCluster::new("out", &config.cluster.namespace, logger.clone())?,
///     FixedDelays::from_config(&config.rollout),
///     logger,
/// );
/// let result = sequencer.deploy(&config.blockchain, &mut KeyGenerator::from_os_rng())?;
/// ```
pub struct RolloutSequencer<C, W> {
    rollout: RolloutConfig,
    settings: ClusterSettings,
    cluster: C,
    wait: W,
    state: RolloutState,
    history: Vec<RolloutState>,
    metrics: RolloutMetrics,
    logger: Logger,
}

impl<C: ClusterResourceManager, W: ReadinessWait> RolloutSequencer<C, W> {
    pub fn new(
        rollout: RolloutConfig,
        settings: ClusterSettings,
        cluster: C,
        wait: W,
        logger: Logger,
    ) -> Self {
        Self {
            rollout,
            settings,
            cluster,
            wait,
            state: RolloutState::Idle,
            history: vec![RolloutState::Idle],
            metrics: RolloutMetrics::new(),
            logger,
        }
    }

    pub fn state(&self) -> &RolloutState {
        &self.state
    }

    /// Every state entered by the last run, starting with `Idle`.
    pub fn history(&self) -> &[RolloutState] {
        &self.history
    }

    pub fn cluster(&self) -> &C {
        &self.cluster
    }

    pub fn wait_policy(&self) -> &W {
        &self.wait
    }

    pub fn into_cluster(self) -> C {
        self.cluster
    }

    /// The plan [`roll_out`](Self::roll_out) would execute for `spec`.
    pub fn plan(&self, spec: &BlockchainSpec) -> Result<RolloutPlan, DeployError> {
        RolloutPlan::build(spec, &self.rollout, &self.builder(spec), &self.wait)
    }

    /// Publish key material, then roll out every validator and processor.
    ///
    /// An existing key store is reused as is. Fresh keys are only generated when
    /// the store is absent.
    pub fn deploy<R: RngCore + CryptoRng>(
        &mut self,
        spec: &BlockchainSpec,
        generator: &mut KeyGenerator<R>,
    ) -> Result<RolloutResult, DeployError> {
        self.reset();
        spec.check()?;
        let builder = self.builder(spec);
        let plan = RolloutPlan::build(spec, &self.rollout, &builder, &self.wait)?;

        let started = Instant::now();
        let result = self
            .distribute_keys(spec, &builder, generator)
            .and_then(|(_, outcome)| {
                let mut result = self.execute(&builder, &plan)?;
                result.key_store = Some(outcome);
                Ok(result)
            });
        self.finish(result, started)
    }

    /// Roll out `spec` against an already published `key_map`.
    pub fn roll_out(
        &mut self,
        spec: &BlockchainSpec,
        key_map: &KeyMaterialMap,
    ) -> Result<RolloutResult, DeployError> {
        self.reset();
        spec.check()?;
        if key_map.node_count() != spec.nodes {
            return Err(DeployError::InvalidTopology(format!(
                "key material covers {} nodes, network has {}",
                key_map.node_count(),
                spec.nodes
            )));
        }
        if key_map.consensus_name() != spec.consensus {
            return Err(DeployError::InvalidTopology(format!(
                "key material is for consensus {:?}, network uses {:?}",
                key_map.consensus_name(),
                spec.consensus
            )));
        }
        let builder = self.builder(spec);
        let plan = RolloutPlan::build(spec, &self.rollout, &builder, &self.wait)?;

        let started = Instant::now();
        let result = self.execute(&builder, &plan);
        self.finish(result, started)
    }

    fn builder(&self, spec: &BlockchainSpec) -> ResourceBuilder {
        ResourceBuilder::new(spec.network_names(), self.settings.clone())
    }

    fn distribute_keys<R: RngCore + CryptoRng>(
        &mut self,
        spec: &BlockchainSpec,
        builder: &ResourceBuilder,
        generator: &mut KeyGenerator<R>,
    ) -> Result<(KeyMaterialMap, KeyStoreOutcome), DeployError> {
        self.transition(RolloutState::DistributingKeys);
        let store_name = self.settings.key_store.clone();

        if let Some(map) = self.load_key_store(spec, &store_name, generator)? {
            return Ok((map, KeyStoreOutcome::Existing));
        }

        let key_map = build_key_map(generator, &spec.consensus, spec.nodes)?;
        let outcome = self
            .cluster
            .create_shared_key_store(&builder.key_store(key_map.entries()))
            .map_err(|source| self.stage_error(source))?;

        match outcome {
            KeyStoreOutcome::Created => {
                self.metrics.key_store_created_total.increment(1);
                slog::info!(
                    self.logger,
                    "Key store published";
                    "name" => %store_name,
                    "nodes" => key_map.node_count(),
                );
                Ok((key_map, KeyStoreOutcome::Created))
            }
            // Another writer got there first; its content wins.
            KeyStoreOutcome::Existing => {
                let map = self
                    .load_key_store(spec, &store_name, generator)?
                    .ok_or_else(|| {
                        self.stage_error(ClusterError::Rejected {
                            kind: cluster::ResourceKind::KeyStore,
                            name: store_name.clone(),
                            reason: "reported existing but could not be read".to_string(),
                        })
                    })?;
                Ok((map, KeyStoreOutcome::Existing))
            }
        }
    }

    fn load_key_store<R: RngCore + CryptoRng>(
        &mut self,
        spec: &BlockchainSpec,
        store_name: &str,
        generator: &KeyGenerator<R>,
    ) -> Result<Option<KeyMaterialMap>, DeployError> {
        let Some(data) = self
            .cluster
            .read_shared_key_store(store_name)
            .map_err(|source| self.stage_error(source))?
        else {
            return Ok(None);
        };

        let map = KeyMaterialMap::from_entries(
            generator.curve(),
            &spec.consensus,
            spec.nodes,
            &data,
        )?;
        self.metrics.key_store_reused_total.increment(1);
        slog::info!(self.logger, "Reusing existing key store"; "name" => store_name);
        Ok(Some(map))
    }

    fn execute(
        &mut self,
        builder: &ResourceBuilder,
        plan: &RolloutPlan,
    ) -> Result<RolloutResult, DeployError> {
        let mut result = RolloutResult::default();

        for step in plan.steps() {
            self.transition(match step.role {
                NodeRole::Genesis => RolloutState::CreatingGenesis,
                NodeRole::Follower(index) => RolloutState::CreatingFollower(index),
            });

            // Followers resolve peers from endpoint env vars captured at start.
            let endpoint = self
                .cluster
                .create_endpoint(&builder.validator_endpoint(step.node_index))
                .map_err(|source| self.stage_error(source))?;
            self.metrics.endpoints_created_total.increment(1);

            let workload = self
                .cluster
                .create_workload(&builder.validator_workload(step.node_index, &step.script))
                .map_err(|source| self.stage_error(source))?;
            self.metrics.workloads_created_total.increment(1);
            self.metrics.validators_created.set((step.node_index + 1) as f64);

            slog::info!(
                self.logger,
                "Validator created";
                "node" => step.node_index,
                "role" => %step.role,
                "workload" => %workload.name,
                "endpoint" => %endpoint.name,
                "wait_secs" => step.post_create_delay.as_secs(),
            );
            self.wait.wait(step.wait_point);

            result.nodes.push(DeployedNode {
                index: step.node_index,
                role: step.role,
                workload,
                endpoint,
            });
        }

        if let Some(settle) = plan.processor_settle() {
            self.transition(RolloutState::SettlingBeforeProcessors);
            slog::debug!(self.logger, "Settling before processors"; "secs" => settle.as_secs());
            self.wait.wait(WaitPoint::BeforeProcessors);

            for processor in plan.processors() {
                self.transition(RolloutState::CreatingProcessor(processor.instance.clone()));

                let spec = builder.processor_workload(
                    &processor.id,
                    &processor.instance,
                    &processor.name,
                    &processor.image,
                    processor.validator,
                );
                let endpoint = self
                    .cluster
                    .create_endpoint(&builder.processor_endpoint(&processor.instance))
                    .map_err(|source| self.stage_error(source))?;
                self.metrics.endpoints_created_total.increment(1);

                let workload = self
                    .cluster
                    .create_workload(&spec)
                    .map_err(|source| self.stage_error(source))?;
                self.metrics.workloads_created_total.increment(1);

                slog::info!(
                    self.logger,
                    "Processor created";
                    "id" => %processor.id,
                    "workload" => %workload.name,
                    "validator" => processor.validator,
                );
                result.processors.push(DeployedProcessor {
                    id: processor.id.clone(),
                    validator: processor.validator,
                    workload,
                    endpoint,
                });
            }
        }

        self.transition(RolloutState::Done);
        Ok(result)
    }

    fn finish(
        &mut self,
        result: Result<RolloutResult, DeployError>,
        started: Instant,
    ) -> Result<RolloutResult, DeployError> {
        let elapsed = started.elapsed();
        self.metrics.rollout_duration_seconds.record(elapsed.as_secs_f64());

        match result {
            Ok(result) => {
                slog::info!(
                    self.logger,
                    "Rollout complete";
                    "nodes" => result.nodes.len(),
                    "processors" => result.processors.len(),
                    "elapsed_secs" => elapsed.as_secs(),
                );
                Ok(result)
            }
            Err(e) => {
                slog::error!(
                    self.logger,
                    "Rollout aborted";
                    "stage" => %self.state,
                    "error" => %e,
                );
                self.metrics.rollout_failures_total.increment(1);
                self.transition(RolloutState::Failed);
                Err(e)
            }
        }
    }

    fn stage_error(&self, source: ClusterError) -> DeployError {
        DeployError::ResourceCreation {
            stage: self.state.clone(),
            source,
        }
    }

    fn reset(&mut self) {
        self.state = RolloutState::Idle;
        self.history = vec![RolloutState::Idle];
    }

    fn transition(&mut self, next: RolloutState) {
        slog::debug!(self.logger, "Rollout state"; "from" => %self.state, "to" => %next);
        self.history.push(next.clone());
        self.state = next;
    }
}
