//! Resource descriptions and the builder that produces them.
//!
//! Every workload and endpoint of a network comes out of [`ResourceBuilder`], keyed by
//! [`WorkloadRole`] and [`PortSet`]. Backends only translate these descriptions.

use std::collections::BTreeMap;

use bootstrap::constants::{
    AUXILIARY_HTTP_PORT, COMPONENT_PORT, CONSENSUS_PORT, NETWORK_PORT, REST_API_PORT,
};
use bootstrap::shell::SHELL;
use bootstrap::{BootstrapScript, EndpointNaming};
use serde::{Deserialize, Serialize};

use crate::settings::ClusterSettings;

/// Label selecting a workload's pods.
pub const APP_LABEL: &str = "app";

/// A named TCP port.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortSpec {
    pub name: String,
    pub port: u16,
}

impl PortSpec {
    fn new(name: impl Into<String>, port: u16) -> Self {
        Self {
            name: name.into(),
            port,
        }
    }

    /// Port named after its own number, as services expose them.
    fn numbered(port: u16) -> Self {
        Self::new(port.to_string(), port)
    }
}

/// The ports a workload kind listens on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PortSet {
    Validator,
    Processor,
}

impl PortSet {
    /// Ports declared on the workload's main container.
    pub fn container_ports(&self) -> Vec<PortSpec> {
        match self {
            Self::Validator => vec![
                PortSpec::new("processors", COMPONENT_PORT),
                PortSpec::new("consensus", CONSENSUS_PORT),
                PortSpec::new("validators", NETWORK_PORT),
            ],
            Self::Processor => vec![PortSpec::new("tcp", COMPONENT_PORT)],
        }
    }

    /// Ports exposed by the workload's endpoint.
    pub fn endpoint_ports(&self) -> Vec<PortSpec> {
        match self {
            Self::Validator => [
                COMPONENT_PORT,
                CONSENSUS_PORT,
                REST_API_PORT,
                AUXILIARY_HTTP_PORT,
                NETWORK_PORT,
            ]
            .into_iter()
            .map(PortSpec::numbered)
            .collect(),
            Self::Processor => vec![PortSpec::numbered(COMPONENT_PORT)],
        }
    }
}

/// What a workload does in the network.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkloadRole {
    /// Validator node at this index.
    Validator(usize),
    /// Transaction processor, connected to the validator at `validator`.
    Processor { id: String, validator: usize },
}

impl WorkloadRole {
    pub fn port_set(&self) -> PortSet {
        match self {
            Self::Validator(_) => PortSet::Validator,
            Self::Processor { .. } => PortSet::Processor,
        }
    }
}

/// One container of a workload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerSpec {
    pub name: String,
    pub image: String,
    pub ports: Vec<PortSpec>,
    /// Key store mounted as environment variables.
    pub env_from: Option<String>,
    /// Entrypoint followed by its arguments.
    pub command: Vec<String>,
}

/// A single-replica workload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkloadSpec {
    pub name: String,
    pub role: WorkloadRole,
    pub replicas: u32,
    pub labels: BTreeMap<String, String>,
    pub containers: Vec<ContainerSpec>,
}

impl WorkloadSpec {
    pub fn container(&self, name: &str) -> Option<&ContainerSpec> {
        self.containers.iter().find(|c| c.name == name)
    }
}

/// A stable network name in front of a workload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointSpec {
    pub name: String,
    pub selector: BTreeMap<String, String>,
    pub ports: Vec<PortSpec>,
}

/// Shared read-only key material.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyStoreSpec {
    pub name: String,
    pub data: BTreeMap<String, String>,
}

/// Identifying names of a network, taken from its blockchain description.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NetworkNames {
    pub name: String,
    pub ledger: String,
    pub consensus: String,
    pub version: String,
}

/// Produces every resource description of one network.
#[derive(Clone, Debug)]
pub struct ResourceBuilder {
    names: NetworkNames,
    endpoints: EndpointNaming,
    settings: ClusterSettings,
}

impl ResourceBuilder {
    pub fn new(names: NetworkNames, settings: ClusterSettings) -> Self {
        let endpoints = EndpointNaming::new(names.ledger.clone());
        Self {
            names,
            endpoints,
            settings,
        }
    }

    pub fn endpoints(&self) -> &EndpointNaming {
        &self.endpoints
    }

    pub fn settings(&self) -> &ClusterSettings {
        &self.settings
    }

    /// `{name}-{ledger}-{consensus}-{index}`
    pub fn validator_workload_name(&self, index: usize) -> String {
        format!(
            "{}-{}-{}-{}",
            self.names.name, self.names.ledger, self.names.consensus, index
        )
    }

    /// Name of processor `processor_name`'s workload; suffixed when one runs per validator.
    pub fn processor_instance_name(&self, processor_name: &str, validator: Option<usize>) -> String {
        match validator {
            Some(index) => format!("{processor_name}-{index}"),
            None => processor_name.to_string(),
        }
    }

    /// The shared key store carrying `data`.
    pub fn key_store(&self, data: BTreeMap<String, String>) -> KeyStoreSpec {
        KeyStoreSpec {
            name: self.settings.key_store.clone(),
            data,
        }
    }

    /// Validator workload for node `index`, running `script` at start.
    pub fn validator_workload(&self, index: usize, script: &BootstrapScript) -> WorkloadSpec {
        let ledger = &self.names.ledger;
        let consensus = &self.names.consensus;
        let engine = format!("{ledger}-{consensus}-engine");

        let containers = vec![
            ContainerSpec {
                name: format!("{ledger}-validator"),
                image: self.platform_image("validator"),
                ports: PortSet::Validator.container_ports(),
                env_from: Some(self.settings.key_store.clone()),
                command: script.container_command(),
            },
            ContainerSpec {
                name: format!("{ledger}-settings-tp"),
                image: self.platform_image("settings-tp"),
                ports: PortSet::Validator.container_ports(),
                env_from: None,
                command: shell(format!("settings-tp -vv -C tcp://$HOSTNAME:{COMPONENT_PORT}")),
            },
            ContainerSpec {
                name: engine.clone(),
                image: format!("{}/{engine}:{}", self.settings.registry, self.names.version),
                ports: Vec::new(),
                env_from: None,
                command: shell(format!(
                    "{consensus}-engine -vv --connect tcp://$HOSTNAME:{CONSENSUS_PORT}"
                )),
            },
            ContainerSpec {
                name: format!("{ledger}-rest-api"),
                image: self.platform_image("rest-api"),
                ports: vec![PortSpec::new("api", REST_API_PORT)],
                env_from: None,
                command: shell(format!(
                    "{ledger}-rest-api -vv -C tcp://$HOSTNAME:{COMPONENT_PORT} -B 0.0.0.0:{REST_API_PORT}"
                )),
            },
            ContainerSpec {
                name: format!("{ledger}-shell"),
                image: self.platform_image("shell"),
                ports: Vec::new(),
                env_from: None,
                command: shell(format!("{ledger} keygen && tail -f /dev/null")),
            },
        ];

        self.workload(
            self.validator_workload_name(index),
            WorkloadRole::Validator(index),
            containers,
        )
    }

    /// Endpoint fronting validator `index`, named by [`EndpointNaming::service_name`].
    pub fn validator_endpoint(&self, index: usize) -> EndpointSpec {
        self.endpoint(
            self.endpoints.service_name(index),
            &self.validator_workload_name(index),
            PortSet::Validator,
        )
    }

    /// Transaction processor workload connected to validator `validator`.
    pub fn processor_workload(
        &self,
        id: &str,
        instance: &str,
        processor_name: &str,
        image: &str,
        validator: usize,
    ) -> WorkloadSpec {
        let container = ContainerSpec {
            name: processor_name.to_string(),
            image: image.to_string(),
            ports: PortSet::Processor.container_ports(),
            env_from: None,
            command: shell(format!(
                "{processor_name} -v -C {}",
                self.endpoints.component_address(validator)
            )),
        };
        self.workload(
            instance.to_string(),
            WorkloadRole::Processor {
                id: id.to_string(),
                validator,
            },
            vec![container],
        )
    }

    /// Endpoint fronting a processor workload.
    pub fn processor_endpoint(&self, instance: &str) -> EndpointSpec {
        self.endpoint(instance.to_string(), instance, PortSet::Processor)
    }

    fn workload(
        &self,
        name: String,
        role: WorkloadRole,
        containers: Vec<ContainerSpec>,
    ) -> WorkloadSpec {
        WorkloadSpec {
            labels: app_labels(&name),
            name,
            role,
            replicas: 1,
            containers,
        }
    }

    fn endpoint(&self, name: String, workload: &str, ports: PortSet) -> EndpointSpec {
        EndpointSpec {
            name,
            selector: app_labels(workload),
            ports: ports.endpoint_ports(),
        }
    }

    fn platform_image(&self, component: &str) -> String {
        format!(
            "{}/{}-{}:{}",
            self.settings.registry, self.names.ledger, component, self.settings.release
        )
    }
}

fn app_labels(workload: &str) -> BTreeMap<String, String> {
    BTreeMap::from([(APP_LABEL.to_string(), workload.to_string())])
}

fn shell(script: String) -> Vec<String> {
    vec![SHELL.to_string(), "-c".to_string(), script]
}
