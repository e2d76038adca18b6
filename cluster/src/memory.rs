//! In-process cluster backend.

use std::collections::BTreeMap;

use crate::error::ClusterError;
use crate::manager::{ClusterResourceManager, KeyStoreOutcome, ResourceHandle, ResourceKind};
use crate::resources::{EndpointSpec, KeyStoreSpec, WorkloadSpec};

/// Keeps created objects in memory and records the order they were created in.
#[derive(Debug, Default)]
pub struct InMemoryCluster {
    key_stores: BTreeMap<String, BTreeMap<String, String>>,
    workloads: Vec<WorkloadSpec>,
    endpoints: Vec<EndpointSpec>,
    created: Vec<ResourceHandle>,
}

impl InMemoryCluster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every object created, oldest first. Reused key stores are not listed.
    pub fn created(&self) -> &[ResourceHandle] {
        &self.created
    }

    pub fn workloads(&self) -> &[WorkloadSpec] {
        &self.workloads
    }

    pub fn endpoints(&self) -> &[EndpointSpec] {
        &self.endpoints
    }

    pub fn workload(&self, name: &str) -> Option<&WorkloadSpec> {
        self.workloads.iter().find(|w| w.name == name)
    }

    pub fn endpoint(&self, name: &str) -> Option<&EndpointSpec> {
        self.endpoints.iter().find(|e| e.name == name)
    }
}

impl ClusterResourceManager for InMemoryCluster {
    fn create_shared_key_store(
        &mut self,
        spec: &KeyStoreSpec,
    ) -> Result<KeyStoreOutcome, ClusterError> {
        if self.key_stores.contains_key(&spec.name) {
            return Ok(KeyStoreOutcome::Existing);
        }
        self.key_stores.insert(spec.name.clone(), spec.data.clone());
        self.created
            .push(ResourceHandle::new(ResourceKind::KeyStore, &spec.name));
        Ok(KeyStoreOutcome::Created)
    }

    fn read_shared_key_store(
        &self,
        name: &str,
    ) -> Result<Option<BTreeMap<String, String>>, ClusterError> {
        Ok(self.key_stores.get(name).cloned())
    }

    fn create_workload(&mut self, spec: &WorkloadSpec) -> Result<ResourceHandle, ClusterError> {
        if self.workload(&spec.name).is_some() {
            return Err(ClusterError::AlreadyExists {
                kind: ResourceKind::Workload,
                name: spec.name.clone(),
            });
        }
        self.workloads.push(spec.clone());
        let handle = ResourceHandle::new(ResourceKind::Workload, &spec.name);
        self.created.push(handle.clone());
        Ok(handle)
    }

    fn create_endpoint(&mut self, spec: &EndpointSpec) -> Result<ResourceHandle, ClusterError> {
        if self.endpoint(&spec.name).is_some() {
            return Err(ClusterError::AlreadyExists {
                kind: ResourceKind::Endpoint,
                name: spec.name.clone(),
            });
        }
        self.endpoints.push(spec.clone());
        let handle = ResourceHandle::new(ResourceKind::Endpoint, &spec.name);
        self.created.push(handle.clone());
        Ok(handle)
    }
}
