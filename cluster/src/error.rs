//! Cluster error types.

use thiserror::Error;

use crate::manager::ResourceKind;

/// Errors returned by cluster backends.
#[derive(Debug, Error)]
pub enum ClusterError {
    /// An object with this name already exists.
    #[error("{kind} {name:?} already exists")]
    AlreadyExists { kind: ResourceKind, name: String },

    /// The cluster refused the object.
    #[error("{kind} {name:?} rejected: {reason}")]
    Rejected {
        kind: ResourceKind,
        name: String,
        reason: String,
    },

    /// Backend I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Manifest encoding or decoding failure.
    #[error("Manifest error: {0}")]
    Manifest(#[from] serde_json::Error),
}
