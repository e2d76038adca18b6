//! Provisioning configuration.
//!
//! A single document describes the ledger network (`BlockchainSpec`, top-level keys)
//! plus optional `[rollout]` timing and `[cluster]` placement tables. It can be
//! loaded from TOML or YAML, and environment variables prefixed with `BLOCKCHAIN_`
//! override file values (nested keys use `__`, e.g. `BLOCKCHAIN_ROLLOUT__FOLLOWER_DELAY_SECS`).
//!
//! # Example TOML
//!
//! ```toml
//! name = "consensource"
//! ledger = "sawtooth"
//! version = "1.0"
//! consensus = "pbft"
//! nodes = 5
//! orchestration = "kubernetes"
//!
//! [processors.consensource]
//! name = "consensource-processor"
//! image = "target/consensource-processor:latest"
//!
//! [rollout]
//! genesis_delay_secs = 20
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use bootstrap::{EndpointNaming, ScriptSynthesizer};
use cluster::{ClusterSettings, NetworkNames};
use figment::{
    Figment, Profile, Provider,
    providers::{Env, Format, Serialized, Toml, Yaml},
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::DeployError;

/// Prefix of environment variables overriding file values.
pub const ENV_PREFIX: &str = "BLOCKCHAIN_";

/// Base name of the configuration document.
pub const CONFIG_NAME: &str = "blockchain";

/// Directories searched for the configuration document, in order.
pub const SEARCH_DIRS: &[&str] = &["config", "."];

const EXTENSIONS: &[&str] = &["toml", "yaml", "yml"];

/// A transaction processor attached after the validators are up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct ProcessorSpec {
    /// Workload name; also the processor binary run in the container.
    #[validate(length(min = 1))]
    pub name: String,
    /// Container image.
    #[validate(length(min = 1))]
    pub image: String,
}

/// The ledger network to deploy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct BlockchainSpec {
    /// Network name, prefixed to validator workload names.
    #[validate(length(min = 1))]
    pub name: String,
    /// Ledger platform (`sawtooth`); names endpoints, containers and images.
    #[validate(length(min = 1))]
    pub ledger: String,
    /// Consensus engine image tag.
    #[validate(length(min = 1))]
    pub version: String,
    /// Consensus algorithm (`pbft`); prefixes key names.
    #[validate(length(min = 1))]
    pub consensus: String,
    /// Number of validator nodes. Older documents spell the key `Nodes`.
    #[validate(range(min = 1))]
    pub nodes: usize,
    /// Orchestration platform.
    #[validate(length(min = 1))]
    pub orchestration: String,
    /// Processors keyed by id.
    pub processors: BTreeMap<String, ProcessorSpec>,
    /// Event subscribers keyed by id.
    #[serde(default)]
    pub subscribers: Option<BTreeMap<String, String>>,
}

impl BlockchainSpec {
    /// Check field constraints, including every processor entry.
    pub fn check(&self) -> Result<(), DeployError> {
        self.validate().map_err(|e| {
            if e.field_errors().contains_key("nodes") {
                DeployError::InvalidTopology(format!("node count must be at least 1, got {}", self.nodes))
            } else {
                DeployError::Configuration(e.to_string())
            }
        })?;
        for (id, processor) in &self.processors {
            processor
                .validate()
                .map_err(|e| DeployError::Configuration(format!("processor {id}: {e}")))?;
        }
        Ok(())
    }

    pub fn network_names(&self) -> NetworkNames {
        NetworkNames {
            name: self.name.clone(),
            ledger: self.ledger.clone(),
            consensus: self.consensus.clone(),
            version: self.version.clone(),
        }
    }

    pub fn endpoints(&self) -> EndpointNaming {
        EndpointNaming::new(self.ledger.clone())
    }

    /// Script synthesizer for this network's nodes.
    pub fn synthesizer(&self, rollout: &RolloutConfig) -> ScriptSynthesizer {
        ScriptSynthesizer::new(self.consensus.clone(), self.endpoints())
            .with_genesis_settle(Duration::from_secs(rollout.genesis_settle_secs))
    }
}

/// How processor workloads are wired to validators.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessorWiring {
    /// One workload per processor, connected to validator 0.
    #[default]
    FirstValidator,
    /// One workload per processor per validator.
    PerValidator,
}

/// Rollout timing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolloutConfig {
    /// Pause after creating the genesis node, for chain initialization.
    #[serde(default = "default_genesis_delay")]
    pub genesis_delay_secs: u64,
    /// Pause after creating each follower, for peer registration.
    #[serde(default = "default_follower_delay")]
    pub follower_delay_secs: u64,
    /// Pause between the last validator and the first processor.
    #[serde(default = "default_processor_settle")]
    pub processor_settle_secs: u64,
    /// Sleep inside the genesis script before the membership list is emitted.
    #[serde(default = "default_genesis_settle")]
    pub genesis_settle_secs: u64,
    #[serde(default)]
    pub processor_wiring: ProcessorWiring,
}

fn default_genesis_delay() -> u64 {
    20
}

fn default_follower_delay() -> u64 {
    5
}

fn default_processor_settle() -> u64 {
    20
}

fn default_genesis_settle() -> u64 {
    bootstrap::constants::GENESIS_SETTLE_SECS
}

impl Default for RolloutConfig {
    fn default() -> Self {
        Self {
            genesis_delay_secs: default_genesis_delay(),
            follower_delay_secs: default_follower_delay(),
            processor_settle_secs: default_processor_settle(),
            genesis_settle_secs: default_genesis_settle(),
            processor_wiring: ProcessorWiring::default(),
        }
    }
}

/// Everything a deployment reads from its configuration document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionConfig {
    pub blockchain: BlockchainSpec,
    pub rollout: RolloutConfig,
    pub cluster: ClusterSettings,
}

impl ProvisionConfig {
    /// Load from a TOML (.toml) or YAML (.yaml, .yml) file, then apply env overrides.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, DeployError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(DeployError::Configuration(format!(
                "config file not found: {}",
                path.display()
            )));
        }

        let file = match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Figment::new().merge(Toml::file(path)),
            Some("yaml" | "yml") => Figment::new().merge(Yaml::file(path)),
            Some(ext) => {
                return Err(DeployError::Configuration(format!(
                    "unsupported config file format: {ext}. Use .toml, .yaml, or .yml"
                )));
            }
            None => {
                return Err(DeployError::Configuration(
                    "config file must have an extension (.toml, .yaml, or .yml)".to_string(),
                ));
            }
        };

        let figment = normalize_legacy_keys(file)?;
        Self::from_figment(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    /// Find `blockchain.{toml,yaml,yml}` under `root/config`, then `root`, and load it.
    pub fn discover<P: AsRef<Path>>(root: P) -> Result<Self, DeployError> {
        let path = Self::locate(root.as_ref()).ok_or_else(|| {
            DeployError::Configuration(format!(
                "no {CONFIG_NAME}.toml, {CONFIG_NAME}.yaml or {CONFIG_NAME}.yml found in {}",
                SEARCH_DIRS.join(" or ")
            ))
        })?;
        Self::from_path(path)
    }

    fn locate(root: &Path) -> Option<PathBuf> {
        SEARCH_DIRS
            .iter()
            .flat_map(|dir| {
                EXTENSIONS
                    .iter()
                    .map(move |ext| root.join(dir).join(format!("{CONFIG_NAME}.{ext}")))
            })
            .find(|candidate| candidate.is_file())
    }

    fn from_figment(figment: Figment) -> Result<Self, DeployError> {
        let blockchain: BlockchainSpec = figment.extract()?;
        blockchain.check()?;

        let rollout = if figment.contains("rollout") {
            figment.extract_inner("rollout")?
        } else {
            RolloutConfig::default()
        };
        let cluster = if figment.contains("cluster") {
            figment.extract_inner("cluster")?
        } else {
            ClusterSettings::default()
        };

        Ok(Self {
            blockchain,
            rollout,
            cluster,
        })
    }
}

/// Rename legacy top-level keys in a file layer so env overrides land on the
/// same key instead of producing a duplicate field.
fn normalize_legacy_keys(file: Figment) -> Result<Figment, DeployError> {
    let mut dict = file.data()?.remove(&Profile::Default).unwrap_or_default();
    if let Some(nodes) = dict.remove("Nodes") {
        dict.entry("nodes".to_string()).or_insert(nodes);
    }
    Ok(Figment::from(Serialized::defaults(dict)))
}
