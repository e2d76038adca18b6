//! Precomputed rollout order.
//!
//! Every script and every processor attachment is derived before the first cluster
//! call, so a bad node index or topology fails the rollout before anything is created.

use std::fmt;
use std::time::Duration;

use bootstrap::{BootstrapScript, NodeRole};
use cluster::ResourceBuilder;

use crate::config::{BlockchainSpec, ProcessorWiring, RolloutConfig};
use crate::error::DeployError;
use crate::wait::{ReadinessWait, WaitPoint};

/// One validator node of the rollout.
#[derive(Clone, Debug)]
pub struct RolloutStep {
    pub node_index: usize,
    pub role: NodeRole,
    pub script: BootstrapScript,
    /// Where the sequencer pauses after creating this node.
    pub wait_point: WaitPoint,
    pub post_create_delay: Duration,
}

/// One processor workload attached after the validators.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProcessorStep {
    /// Processor id from the configuration.
    pub id: String,
    /// Workload and endpoint name.
    pub instance: String,
    pub name: String,
    pub image: String,
    /// Validator the processor connects to.
    pub validator: usize,
}

/// Ordered validator steps followed by processor steps.
#[derive(Clone, Debug)]
pub struct RolloutPlan {
    steps: Vec<RolloutStep>,
    processor_settle: Option<Duration>,
    processors: Vec<ProcessorStep>,
}

impl RolloutPlan {
    /// Derive the plan for `spec`.
    ///
    /// Delays are read from `wait`, so the plan shows what the sequencer will do
    /// with the same policy.
    pub fn build<W: ReadinessWait + ?Sized>(
        spec: &BlockchainSpec,
        rollout: &RolloutConfig,
        builder: &ResourceBuilder,
        wait: &W,
    ) -> Result<Self, DeployError> {
        if spec.nodes < 1 {
            return Err(DeployError::InvalidTopology(format!(
                "node count must be at least 1, got {}",
                spec.nodes
            )));
        }

        let synthesizer = spec.synthesizer(rollout);
        let mut steps = Vec::with_capacity(spec.nodes);
        for node_index in 0..spec.nodes {
            let role = NodeRole::for_index(node_index);
            let script = synthesizer.synthesize(role, node_index, spec.nodes)?;
            let wait_point = match role {
                NodeRole::Genesis => WaitPoint::GenesisCreated,
                NodeRole::Follower(index) => WaitPoint::FollowerCreated(index),
            };
            steps.push(RolloutStep {
                node_index,
                role,
                script,
                wait_point,
                post_create_delay: wait.delay_for(wait_point),
            });
        }

        let mut processors = Vec::new();
        for (id, processor) in &spec.processors {
            let validators = match rollout.processor_wiring {
                ProcessorWiring::FirstValidator => vec![None],
                ProcessorWiring::PerValidator => (0..spec.nodes).map(Some).collect(),
            };
            for validator in validators {
                processors.push(ProcessorStep {
                    id: id.clone(),
                    instance: builder.processor_instance_name(&processor.name, validator),
                    name: processor.name.clone(),
                    image: processor.image.clone(),
                    validator: validator.unwrap_or(0),
                });
            }
        }

        // Nothing to settle for when no processor follows.
        let processor_settle =
            (!processors.is_empty()).then(|| wait.delay_for(WaitPoint::BeforeProcessors));

        Ok(Self {
            steps,
            processor_settle,
            processors,
        })
    }

    pub fn steps(&self) -> &[RolloutStep] {
        &self.steps
    }

    pub fn node_count(&self) -> usize {
        self.steps.len()
    }

    /// Pause before the first processor, `None` when there are no processors.
    pub fn processor_settle(&self) -> Option<Duration> {
        self.processor_settle
    }

    pub fn processors(&self) -> &[ProcessorStep] {
        &self.processors
    }

    /// Sum of every pause the plan implies.
    pub fn total_delay(&self) -> Duration {
        self.steps
            .iter()
            .map(|step| step.post_create_delay)
            .chain(self.processor_settle)
            .sum()
    }
}

impl fmt::Display for RolloutPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for step in &self.steps {
            writeln!(
                f,
                "node {:<3} {:<14} wait {}s",
                step.node_index,
                step.role.to_string(),
                step.post_create_delay.as_secs()
            )?;
        }
        if let Some(settle) = self.processor_settle {
            writeln!(f, "settle {}s", settle.as_secs())?;
        }
        for processor in &self.processors {
            writeln!(
                f,
                "processor {} -> {} ({}) on node {}",
                processor.id, processor.instance, processor.image, processor.validator
            )?;
        }
        write!(f, "total wait {}s", self.total_delay().as_secs())
    }
}
