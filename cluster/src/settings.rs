//! Cluster-side settings shared by every resource of a network.

use serde::{Deserialize, Serialize};

/// Where and how network resources are created.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterSettings {
    /// Namespace all objects are created in.
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Image registry prefix for ledger platform images.
    #[serde(default = "default_registry")]
    pub registry: String,

    /// Platform release tag for validator, settings, REST API and shell images.
    #[serde(default = "default_release")]
    pub release: String,

    /// Name of the shared key store.
    #[serde(default = "default_key_store")]
    pub key_store: String,
}

fn default_namespace() -> String {
    "default".to_string()
}

fn default_registry() -> String {
    "hyperledger".to_string()
}

fn default_release() -> String {
    "chime".to_string()
}

fn default_key_store() -> String {
    "keys-config".to_string()
}

impl Default for ClusterSettings {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            registry: default_registry(),
            release: default_release(),
            key_store: default_key_store(),
        }
    }
}
