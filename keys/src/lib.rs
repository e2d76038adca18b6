//! Consensus identity keys for ledger nodes.
//!
//! Every validator in a PBFT-style network is identified by a secp256k1 keypair.
//! This crate generates those pairs and lays them out as the key material map that
//! is published once to the cluster and mounted by every node:
//!
//! - [`KeyGenerator`] draws independent keypairs from an injected randomness source.
//! - [`build_key_map`] produces one pair per node index, named
//!   `{consensus}{index}priv` / `{consensus}{index}pub`.
//! - [`KeyMaterialMap::from_entries`] rebuilds the map from an already published store.

pub mod error;
pub mod generator;
pub mod material;

pub use error::KeyError;
pub use generator::{KeyGenerator, KeyPair};
pub use material::{KeyMaterialMap, build_key_map, private_key_name, public_key_name};
