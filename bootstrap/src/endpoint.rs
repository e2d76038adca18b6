//! Index-to-endpoint naming.
//!
//! Nodes never reference each other by IP. Node `i` is fronted by a service named
//! `{ledger}-{i}`, and the orchestrator injects its cluster address into every
//! container as `{LEDGER}_{i}_SERVICE_HOST`.

use crate::constants::{COMPONENT_PORT, NETWORK_PORT};

/// Maps node indices to discoverable service names and addresses.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EndpointNaming {
    ledger: String,
}

impl EndpointNaming {
    pub fn new(ledger: impl Into<String>) -> Self {
        Self {
            ledger: ledger.into(),
        }
    }

    pub fn ledger(&self) -> &str {
        &self.ledger
    }

    /// Service name fronting node `index`.
    pub fn service_name(&self, index: usize) -> String {
        format!("{}-{}", self.ledger, index)
    }

    /// Environment variable carrying node `index`'s service address.
    pub fn host_variable(&self, index: usize) -> String {
        let service = self.service_name(index);
        format!("{}_SERVICE_HOST", service.to_ascii_uppercase().replace('-', "_"))
    }

    /// Peer network address of node `index`, resolved by the shell at start time.
    pub fn peer_address(&self, index: usize) -> String {
        format!("tcp://${}:{}", self.host_variable(index), NETWORK_PORT)
    }

    /// Component API address of node `index`, for transaction processors.
    pub fn component_address(&self, index: usize) -> String {
        format!("tcp://{}:{}", self.service_name(index), COMPONENT_PORT)
    }
}
