//! Key material distribution across node slots.
//!
//! The map is built once per network, published as a single shared key store, and
//! mounted by every node workload as environment variables. Node `i` reads its
//! identity from `{consensus}{i}priv` / `{consensus}{i}pub`; the genesis node reads
//! every `{consensus}{i}pub` to assemble the consensus membership list.

use std::collections::{BTreeMap, HashSet};

use rand::{CryptoRng, RngCore};
use secp256k1::{Secp256k1, SignOnly};

use crate::error::KeyError;
use crate::generator::{KeyGenerator, KeyPair};

/// Name of the entry holding node `index`'s private key.
pub fn private_key_name(consensus_name: &str, index: usize) -> String {
    format!("{consensus_name}{index}priv")
}

/// Name of the entry holding node `index`'s public key.
pub fn public_key_name(consensus_name: &str, index: usize) -> String {
    format!("{consensus_name}{index}pub")
}

/// Index-ordered key material for every node of a network.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyMaterialMap {
    consensus_name: String,
    pairs: Vec<KeyPair>,
}

impl KeyMaterialMap {
    /// Consensus name used as the entry prefix.
    pub fn consensus_name(&self) -> &str {
        &self.consensus_name
    }

    /// Number of node slots covered.
    pub fn node_count(&self) -> usize {
        self.pairs.len()
    }

    /// Keypair assigned to node `index`.
    pub fn pair(&self, index: usize) -> Option<&KeyPair> {
        self.pairs.get(index)
    }

    /// Iterate `(index, pair)` in node order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &KeyPair)> {
        self.pairs.iter().enumerate()
    }

    /// Flatten into the named entries published to the shared key store.
    ///
    /// Always `2 * node_count()` entries.
    pub fn entries(&self) -> BTreeMap<String, String> {
        let mut data = BTreeMap::new();
        for (index, pair) in self.iter() {
            data.insert(
                private_key_name(&self.consensus_name, index),
                pair.private_key().to_string(),
            );
            data.insert(
                public_key_name(&self.consensus_name, index),
                pair.public_key().to_string(),
            );
        }
        data
    }

    /// Rebuild the map from an already published key store.
    ///
    /// Entries beyond `node_count` are ignored. Every public key must match the
    /// private key stored beside it.
    pub fn from_entries(
        curve: &Secp256k1<SignOnly>,
        consensus_name: &str,
        node_count: usize,
        data: &BTreeMap<String, String>,
    ) -> Result<Self, KeyError> {
        if node_count < 1 {
            return Err(KeyError::InvalidTopology(node_count));
        }

        let mut pairs = Vec::with_capacity(node_count);
        for index in 0..node_count {
            let private_key = lookup(data, private_key_name(consensus_name, index))?;
            let public_key = lookup(data, public_key_name(consensus_name, index))?;

            let pair = KeyPair::from_private_hex(curve, private_key)?;
            if pair.public_key() != public_key.as_str() {
                return Err(KeyError::Mismatch(index));
            }
            pairs.push(pair);
        }

        Ok(Self {
            consensus_name: consensus_name.to_string(),
            pairs,
        })
    }
}

fn lookup(data: &BTreeMap<String, String>, name: String) -> Result<&String, KeyError> {
    data.get(&name).ok_or(KeyError::MissingEntry(name))
}

/// Generate one fresh keypair per node slot.
///
/// Fails with [`KeyError::InvalidTopology`] when `node_count` is zero and with
/// [`KeyError::DuplicateKey`] if the generator ever hands out the same private key twice.
pub fn build_key_map<R: RngCore + CryptoRng>(
    generator: &mut KeyGenerator<R>,
    consensus_name: &str,
    node_count: usize,
) -> Result<KeyMaterialMap, KeyError> {
    if node_count < 1 {
        return Err(KeyError::InvalidTopology(node_count));
    }

    let mut seen = HashSet::with_capacity(node_count);
    let mut pairs = Vec::with_capacity(node_count);
    for index in 0..node_count {
        let pair = generator.generate()?;
        if !seen.insert(pair.private_key().to_string()) {
            return Err(KeyError::DuplicateKey(index));
        }
        pairs.push(pair);
    }

    Ok(KeyMaterialMap {
        consensus_name: consensus_name.to_string(),
        pairs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Error, SeedableRng};

    /// RNG that replays the same 32 bytes forever.
    struct StuckRng;

    impl RngCore for StuckRng {
        fn next_u32(&mut self) -> u32 {
            1
        }

        fn next_u64(&mut self) -> u64 {
            1
        }

        fn fill_bytes(&mut self, dest: &mut [u8]) {
            dest.fill(0x11);
        }

        fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), Error> {
            self.fill_bytes(dest);
            Ok(())
        }
    }

    impl CryptoRng for StuckRng {}

    fn seeded_generator(seed: u64) -> KeyGenerator<StdRng> {
        KeyGenerator::new(Secp256k1::signing_only(), StdRng::seed_from_u64(seed))
    }

    #[test]
    fn test_key_names() {
        assert_eq!(private_key_name("pbft", 0), "pbft0priv");
        assert_eq!(public_key_name("pbft", 12), "pbft12pub");
    }

    #[test]
    fn test_entry_count_and_uniqueness() {
        for node_count in 1..=8 {
            let map = build_key_map(&mut KeyGenerator::from_os_rng(), "pbft", node_count).unwrap();
            let entries = map.entries();
            assert_eq!(entries.len(), 2 * node_count);

            let privates: HashSet<_> = (0..node_count)
                .map(|i| entries[&private_key_name("pbft", i)].clone())
                .collect();
            assert_eq!(privates.len(), node_count, "private keys must be unique");
        }
    }

    #[test]
    fn test_entries_are_named_by_index() {
        let map = build_key_map(&mut seeded_generator(1), "raft", 3).unwrap();
        let names: Vec<_> = map.entries().into_keys().collect();
        assert_eq!(
            names,
            vec![
                "raft0priv", "raft0pub", "raft1priv", "raft1pub", "raft2priv", "raft2pub"
            ]
        );
    }

    #[test]
    fn test_zero_nodes_is_invalid_topology() {
        let result = build_key_map(&mut seeded_generator(2), "pbft", 0);
        assert!(matches!(result, Err(KeyError::InvalidTopology(0))));
    }

    #[test]
    fn test_repeated_key_is_rejected() {
        let mut generator = KeyGenerator::new(Secp256k1::signing_only(), StuckRng);
        let result = build_key_map(&mut generator, "pbft", 2);
        assert!(matches!(result, Err(KeyError::DuplicateKey(1))));
    }

    #[test]
    fn test_single_node_is_allowed() {
        let mut generator = KeyGenerator::new(Secp256k1::signing_only(), StuckRng);
        let map = build_key_map(&mut generator, "pbft", 1).unwrap();
        assert_eq!(map.node_count(), 1);
    }

    #[test]
    fn test_from_entries_round_trips() {
        let map = build_key_map(&mut seeded_generator(3), "pbft", 4).unwrap();
        let restored =
            KeyMaterialMap::from_entries(&Secp256k1::signing_only(), "pbft", 4, &map.entries())
                .unwrap();
        assert_eq!(restored, map);
    }

    #[test]
    fn test_from_entries_reports_missing_slot() {
        let map = build_key_map(&mut seeded_generator(4), "pbft", 2).unwrap();
        let result =
            KeyMaterialMap::from_entries(&Secp256k1::signing_only(), "pbft", 3, &map.entries());
        match result {
            Err(KeyError::MissingEntry(name)) => assert_eq!(name, "pbft2priv"),
            other => panic!("expected missing entry, got {other:?}"),
        }
    }

    #[test]
    fn test_from_entries_detects_swapped_public_key() {
        let map = build_key_map(&mut seeded_generator(5), "pbft", 2).unwrap();
        let mut data = map.entries();
        let other = data["pbft1pub"].clone();
        data.insert("pbft0pub".to_string(), other);

        let result = KeyMaterialMap::from_entries(&Secp256k1::signing_only(), "pbft", 2, &data);
        assert!(matches!(result, Err(KeyError::Mismatch(0))));
    }
}
