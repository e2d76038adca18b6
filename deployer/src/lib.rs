//! Provisioning for permissioned PBFT ledger networks.
//!
//! Brings up an `n`-node network on a cluster in dependency order:
//!
//! - **Configuration**: [`ProvisionConfig`] loads the network description plus rollout
//!   timing and cluster placement from TOML/YAML with `BLOCKCHAIN_` env overrides.
//! - **Keys**: one secp256k1 identity per node, published once as a shared key store
//!   (see the `keys` crate).
//! - **Scripts**: each node's container runs a bootstrap script synthesized for its
//!   role (see the `bootstrap` crate).
//! - **Rollout**: [`RolloutSequencer`] creates the genesis node, then each follower,
//!   then the transaction processors, pausing between steps per a [`ReadinessWait`].
//!
//! ## Quick Start
//!
//! ```ignore
//! use deployer::{FixedDelays, ProvisionConfig, RolloutSequencer};
//! use cluster::ManifestDirCluster;
//! use keys::KeyGenerator;
//!
//! let config = ProvisionConfig::discover(".")?;
//! let cluster = ManifestDirCluster::new("manifests", &config.cluster.namespace, logger.clone())?;
//! let mut sequencer = RolloutSequencer::new(
//!     config.rollout.clone(),
//!     config.cluster.clone(),
//!     cluster,
//!     FixedDelays::from_config(&config.rollout),
//!     logger,
//! );
//! let result = sequencer.deploy(&config.blockchain, &mut KeyGenerator::from_os_rng())?;
//! ```

pub mod config;
pub mod error;
pub mod metrics;
pub mod plan;
pub mod rollout;
pub mod wait;

// Re-export main types at crate root
pub use config::{BlockchainSpec, ProcessorSpec, ProcessorWiring, ProvisionConfig, RolloutConfig};
pub use error::DeployError;
pub use metrics::RolloutMetrics;
pub use plan::{ProcessorStep, RolloutPlan, RolloutStep};
pub use rollout::{DeployedNode, DeployedProcessor, RolloutResult, RolloutSequencer, RolloutState};
pub use wait::{FixedDelays, NoWait, ReadinessWait, WaitPoint};
