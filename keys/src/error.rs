//! Key material error types.

use thiserror::Error;

/// Errors raised while generating or distributing node keys.
#[derive(Debug, Error)]
pub enum KeyError {
    /// The randomness source could not produce bytes.
    #[error("Entropy source failure: {0}")]
    Entropy(#[from] rand::Error),

    /// A network needs at least one node.
    #[error("Invalid topology: node count must be at least 1, got {0}")]
    InvalidTopology(usize),

    /// Two node slots received the same private key.
    #[error("Duplicate key material generated for node {0}")]
    DuplicateKey(usize),

    /// A published key store lacks an entry the topology requires.
    #[error("Key store is missing entry {0:?}")]
    MissingEntry(String),

    /// A stored public key does not belong to its private key.
    #[error("Public key for node {0} does not match its private key")]
    Mismatch(usize),

    /// A stored private key is not a valid secp256k1 scalar.
    #[error("Invalid private key: {0}")]
    InvalidPrivateKey(String),
}
