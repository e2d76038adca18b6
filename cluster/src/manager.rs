//! The cluster backend contract.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ClusterError;
use crate::resources::{EndpointSpec, KeyStoreSpec, WorkloadSpec};

/// Kinds of object a backend creates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    KeyStore,
    Workload,
    Endpoint,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::KeyStore => write!(f, "key store"),
            Self::Workload => write!(f, "workload"),
            Self::Endpoint => write!(f, "endpoint"),
        }
    }
}

/// Reference to a created object.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceHandle {
    pub kind: ResourceKind,
    pub name: String,
}

impl ResourceHandle {
    pub fn new(kind: ResourceKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }
}

/// Result of publishing the shared key store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyStoreOutcome {
    /// The store was written by this call.
    Created,
    /// A store with this name was already present and was left untouched.
    Existing,
}

/// Creates network objects in a cluster.
///
/// Key stores are idempotent: publishing a name that already exists returns
/// [`KeyStoreOutcome::Existing`] and keeps the first content. Workloads and endpoints
/// fail with [`ClusterError::AlreadyExists`] on name collision.
pub trait ClusterResourceManager {
    fn create_shared_key_store(&mut self, spec: &KeyStoreSpec)
    -> Result<KeyStoreOutcome, ClusterError>;

    /// Content of the named key store, if it exists.
    fn read_shared_key_store(
        &self,
        name: &str,
    ) -> Result<Option<BTreeMap<String, String>>, ClusterError>;

    fn create_workload(&mut self, spec: &WorkloadSpec) -> Result<ResourceHandle, ClusterError>;

    fn create_endpoint(&mut self, spec: &EndpointSpec) -> Result<ResourceHandle, ClusterError>;
}

impl<T: ClusterResourceManager + ?Sized> ClusterResourceManager for &mut T {
    fn create_shared_key_store(
        &mut self,
        spec: &KeyStoreSpec,
    ) -> Result<KeyStoreOutcome, ClusterError> {
        (**self).create_shared_key_store(spec)
    }

    fn read_shared_key_store(
        &self,
        name: &str,
    ) -> Result<Option<BTreeMap<String, String>>, ClusterError> {
        (**self).read_shared_key_store(name)
    }

    fn create_workload(&mut self, spec: &WorkloadSpec) -> Result<ResourceHandle, ClusterError> {
        (**self).create_workload(spec)
    }

    fn create_endpoint(&mut self, spec: &EndpointSpec) -> Result<ResourceHandle, ClusterError> {
        (**self).create_endpoint(spec)
    }
}
