//! Deployment error types.

use bootstrap::BootstrapError;
use cluster::ClusterError;
use keys::KeyError;
use thiserror::Error;

use crate::rollout::RolloutState;

/// Errors that can abort a deployment.
#[derive(Debug, Error)]
pub enum DeployError {
    /// The configuration document is missing, malformed or incomplete.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The requested network shape cannot be deployed.
    #[error("Invalid topology: {0}")]
    InvalidTopology(String),

    /// A bootstrap script was requested for a node that does not exist.
    #[error("Script synthesis failed: {0}")]
    InvalidNodeIndex(#[source] BootstrapError),

    /// Key material could not be produced or recovered.
    #[error("Key generation failed: {0}")]
    KeyGeneration(#[source] KeyError),

    /// The cluster rejected an object; `stage` names the rollout step.
    #[error("Resource creation failed at {stage}: {source}")]
    ResourceCreation {
        stage: RolloutState,
        #[source]
        source: ClusterError,
    },
}

impl From<BootstrapError> for DeployError {
    fn from(err: BootstrapError) -> Self {
        match err {
            BootstrapError::InvalidTopology => {
                Self::InvalidTopology("node count must be at least 1".to_string())
            }
            other => Self::InvalidNodeIndex(other),
        }
    }
}

impl From<KeyError> for DeployError {
    fn from(err: KeyError) -> Self {
        match err {
            KeyError::InvalidTopology(count) => {
                Self::InvalidTopology(format!("node count must be at least 1, got {count}"))
            }
            other => Self::KeyGeneration(other),
        }
    }
}

impl From<figment::Error> for DeployError {
    fn from(err: figment::Error) -> Self {
        Self::Configuration(err.to_string())
    }
}
