//! Cluster resource management for ledger networks.
//!
//! Three kinds of object make up a deployed network:
//!
//! - a **shared key store** holding every node's key material, created once and
//!   mounted by all validator workloads as environment variables;
//! - one **workload** per validator (validator, settings processor, consensus engine,
//!   REST API and shell containers) and per transaction processor;
//! - one **network endpoint** per workload, giving it a stable discoverable name.
//!
//! [`ResourceBuilder`] describes these objects; a [`ClusterResourceManager`] backend
//! creates them. Key stores are idempotent on name collision, workloads and
//! endpoints are not.

pub mod error;
pub mod manager;
pub mod manifest;
pub mod memory;
pub mod resources;
pub mod settings;

pub use error::ClusterError;
pub use manager::{ClusterResourceManager, KeyStoreOutcome, ResourceHandle, ResourceKind};
pub use manifest::ManifestDirCluster;
pub use memory::InMemoryCluster;
pub use resources::{
    ContainerSpec, EndpointSpec, KeyStoreSpec, NetworkNames, PortSet, PortSpec, ResourceBuilder,
    WorkloadRole, WorkloadSpec,
};
pub use settings::ClusterSettings;
