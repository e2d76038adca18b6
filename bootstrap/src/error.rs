//! Bootstrap synthesis error types.

use thiserror::Error;

use crate::role::NodeRole;

/// Errors that can occur while synthesizing a node's bootstrap script.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BootstrapError {
    /// The index does not name a node of the network.
    #[error("Invalid node index {index} for a {node_count}-node network")]
    InvalidNodeIndex { index: usize, node_count: usize },

    /// The requested role cannot be played by the node at this index.
    #[error("Invalid node index {index} for role {role}")]
    RoleMismatch { index: usize, role: NodeRole },

    /// A network needs at least one node.
    #[error("Invalid topology: node count must be at least 1")]
    InvalidTopology,
}
