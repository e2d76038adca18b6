//! End-to-end rollout scenarios.
//!
//! Each test runs the sequencer against an in-process cluster and checks what was
//! requested, in which order, and what the validators were told to run.

#![cfg(test)]

use std::time::Duration;

use bootstrap::{EndpointNaming, ScriptSynthesizer};
use cluster::{
    ClusterError, ClusterResourceManager, ClusterSettings, InMemoryCluster, KeyStoreOutcome,
    ManifestDirCluster, NetworkNames, ResourceBuilder, ResourceKind,
};
use deployer::{DeployError, ProcessorWiring, RolloutConfig, RolloutState, WaitPoint};
use keys::{KeyError, KeyMaterialMap, build_key_map};
use tempfile::TempDir;

use super::helpers::{FaultyCluster, create_test_logger, network, seeded_generator, sequencer};

/// Rendered bootstrap script of the validator container of workload `name`.
fn validator_script(cluster: &InMemoryCluster, name: &str) -> String {
    let workload = cluster
        .workload(name)
        .unwrap_or_else(|| panic!("workload {name} was not created"));
    let container = workload
        .container("sawtooth-validator")
        .expect("validator container");
    assert_eq!(container.command[..2], ["bash", "-c"]);
    container.command[2].clone()
}

/// A single-node network has only a genesis node, which never peers.
#[test]
fn test_single_node_network() {
    let mut sequencer = sequencer(InMemoryCluster::new(), RolloutConfig::default());
    let result = sequencer
        .deploy(&network(1, &[("consensource", "consensource-processor")]), &mut seeded_generator(1))
        .unwrap();

    assert_eq!(result.nodes.len(), 1);
    assert_eq!(result.processors.len(), 1);

    let script = validator_script(sequencer.cluster(), "consensource-sawtooth-pbft-0");
    assert!(script.contains("sawset genesis -k /root/.sawtooth/keys/my_key.priv -o config-genesis.batch"));
    assert!(script.contains("sawset proposal create"));
    assert!(script.contains(r#"sawtooth.consensus.pbft.members=["\"$pbft0pub\""]"#));
    assert!(script.contains("sawtooth-validator -vv"));
    assert!(!script.contains("--peers"));
}

/// Five nodes: the genesis roster lists all five keys in order and node 3 peers
/// with nodes 0, 1 and 2 only.
#[test]
fn test_five_node_membership_and_peering() {
    let mut sequencer = sequencer(InMemoryCluster::new(), RolloutConfig::default());
    sequencer.deploy(&network(5, &[]), &mut seeded_generator(2)).unwrap();
    let cluster = sequencer.cluster();

    let genesis = validator_script(cluster, "consensource-sawtooth-pbft-0");
    assert!(genesis.contains(
        r#"sawtooth.consensus.pbft.members=["\"$pbft0pub\",\"$pbft1pub\",\"$pbft2pub\",\"$pbft3pub\",\"$pbft4pub\""]"#
    ));

    let node3 = validator_script(cluster, "consensource-sawtooth-pbft-3");
    let peers: Vec<_> = node3
        .lines()
        .map(|l| l.trim().trim_end_matches(" \\"))
        .filter(|l| l.starts_with("--peers "))
        .collect();
    assert_eq!(
        peers,
        vec![
            "--peers tcp://$SAWTOOTH_0_SERVICE_HOST:8800",
            "--peers tcp://$SAWTOOTH_1_SERVICE_HOST:8800",
            "--peers tcp://$SAWTOOTH_2_SERVICE_HOST:8800",
        ]
    );
    assert!(node3.contains("--endpoint tcp://$SAWTOOTH_3_SERVICE_HOST:8800"));
    assert!(node3.contains("echo $pbft3priv > /etc/sawtooth/keys/validator.priv"));
    assert!(!node3.contains("sawadm genesis"));
}

/// A rejected workload for follower 2 of 5 halts the rollout: nodes 0 and 1 stay
/// created, nothing after node 2 is requested and the error names node 2.
#[test]
fn test_failure_at_follower_two_halts_rollout() {
    let cluster = FaultyCluster::failing_on(ResourceKind::Workload, "consensource-sawtooth-pbft-2");
    let mut sequencer = sequencer(cluster, RolloutConfig::default());

    let err = sequencer
        .deploy(
            &network(5, &[("consensource", "consensource-processor")]),
            &mut seeded_generator(3),
        )
        .unwrap_err();

    match &err {
        DeployError::ResourceCreation { stage, source } => {
            assert_eq!(stage, &RolloutState::CreatingFollower(2));
            assert!(matches!(source, ClusterError::Rejected { .. }));
        }
        other => panic!("expected resource creation failure, got {other:?}"),
    }
    assert!(err.to_string().contains("node 2"));
    assert_eq!(sequencer.state(), &RolloutState::Failed);
    assert_eq!(
        sequencer.history().last(),
        Some(&RolloutState::Failed)
    );

    let cluster = sequencer.cluster();
    assert_eq!(
        cluster.requested_workloads(),
        vec![
            "consensource-sawtooth-pbft-0",
            "consensource-sawtooth-pbft-1",
            "consensource-sawtooth-pbft-2",
        ]
    );
    let created: Vec<_> = cluster.inner.workloads().iter().map(|w| w.name.as_str()).collect();
    assert_eq!(
        created,
        vec!["consensource-sawtooth-pbft-0", "consensource-sawtooth-pbft-1"]
    );
    // node 2's endpoint was published before its workload was rejected
    let endpoints: Vec<_> = cluster.inner.endpoints().iter().map(|e| e.name.as_str()).collect();
    assert_eq!(endpoints, vec!["sawtooth-0", "sawtooth-1", "sawtooth-2"]);
    assert!(cluster.inner.endpoint("sawtooth-3").is_none());
    assert!(cluster.inner.workload("consensource-processor").is_none());

    // no pause after the failed node, none before processors
    let waits: Vec<_> = sequencer.wait_policy().waits.iter().map(|(p, _)| *p).collect();
    assert_eq!(
        waits,
        vec![WaitPoint::GenesisCreated, WaitPoint::FollowerCreated(1)]
    );
}

/// A failed processor endpoint leaves every validator in place and never starts
/// the processor workload.
#[test]
fn test_failure_at_processor_keeps_validators() {
    let cluster = FaultyCluster::failing_on(ResourceKind::Endpoint, "intkey-tp");
    let mut sequencer = sequencer(cluster, RolloutConfig::default());

    let err = sequencer
        .deploy(&network(3, &[("intkey", "intkey-tp")]), &mut seeded_generator(4))
        .unwrap_err();

    assert!(err.to_string().contains("processor intkey-tp"));
    assert_eq!(sequencer.cluster().inner.workloads().len(), 3);
    assert_eq!(sequencer.cluster().inner.endpoints().len(), 3);
    assert!(sequencer.cluster().inner.workload("intkey-tp").is_none());
}

/// Creating the shared key store twice keeps the first content.
#[test]
fn test_key_store_is_idempotent() {
    let mut cluster = InMemoryCluster::new();
    let builder = ResourceBuilder::new(network(3, &[]).network_names(), ClusterSettings::default());

    let first = build_key_map(&mut seeded_generator(5), "pbft", 3).unwrap();
    let second = build_key_map(&mut seeded_generator(6), "pbft", 3).unwrap();
    assert_ne!(first, second);

    assert_eq!(
        cluster.create_shared_key_store(&builder.key_store(first.entries())).unwrap(),
        KeyStoreOutcome::Created
    );
    assert_eq!(
        cluster.create_shared_key_store(&builder.key_store(second.entries())).unwrap(),
        KeyStoreOutcome::Existing
    );
    assert_eq!(
        cluster.read_shared_key_store("keys-config").unwrap(),
        Some(first.entries())
    );
}

/// A deploy against a cluster that already holds the key store reuses it instead of
/// generating new identities.
#[test]
fn test_deploy_reuses_existing_key_store() {
    let spec = network(3, &[]);
    let published = build_key_map(&mut seeded_generator(7), "pbft", 3).unwrap();

    let mut cluster = InMemoryCluster::new();
    let builder = ResourceBuilder::new(spec.network_names(), ClusterSettings::default());
    cluster
        .create_shared_key_store(&builder.key_store(published.entries()))
        .unwrap();

    let mut sequencer = sequencer(cluster, RolloutConfig::default());
    let result = sequencer.deploy(&spec, &mut seeded_generator(8)).unwrap();

    assert_eq!(result.key_store, Some(KeyStoreOutcome::Existing));
    let stored = sequencer
        .cluster()
        .read_shared_key_store("keys-config")
        .unwrap()
        .unwrap();
    assert_eq!(stored, published.entries());

    let created_stores = sequencer
        .cluster()
        .created()
        .iter()
        .filter(|h| h.kind == ResourceKind::KeyStore)
        .count();
    assert_eq!(created_stores, 1);
}

/// An existing key store that covers fewer nodes cannot be reused.
#[test]
fn test_existing_key_store_too_small() {
    let spec = network(4, &[]);
    let published = build_key_map(&mut seeded_generator(9), "pbft", 2).unwrap();

    let mut cluster = InMemoryCluster::new();
    let builder = ResourceBuilder::new(spec.network_names(), ClusterSettings::default());
    cluster
        .create_shared_key_store(&builder.key_store(published.entries()))
        .unwrap();

    let mut sequencer = sequencer(cluster, RolloutConfig::default());
    let err = sequencer.deploy(&spec, &mut seeded_generator(10)).unwrap_err();

    assert!(matches!(
        err,
        DeployError::KeyGeneration(KeyError::MissingEntry(ref name)) if name == "pbft2priv"
    ));
    assert_eq!(sequencer.state(), &RolloutState::Failed);
    assert!(sequencer.cluster().workloads().is_empty());
}

/// Published key material round-trips through the store and matches the roster.
#[test]
fn test_published_keys_match_roster() {
    let spec = network(4, &[]);
    let mut sequencer = sequencer(InMemoryCluster::new(), RolloutConfig::default());
    sequencer.deploy(&spec, &mut seeded_generator(11)).unwrap();

    let stored = sequencer
        .cluster()
        .read_shared_key_store("keys-config")
        .unwrap()
        .unwrap();
    assert_eq!(stored.len(), 8);

    let generator = seeded_generator(0);
    let map = KeyMaterialMap::from_entries(generator.curve(), "pbft", 4, &stored).unwrap();
    let mut private_keys: Vec<_> = map.iter().map(|(_, pair)| pair.private_key()).collect();
    private_keys.sort_unstable();
    private_keys.dedup();
    assert_eq!(private_keys.len(), 4);

    let synthesizer = ScriptSynthesizer::new("pbft", EndpointNaming::new("sawtooth"));
    for index in 0..4 {
        assert!(synthesizer.membership_list(4).contains(&format!("$pbft{index}pub")));
        assert!(stored.contains_key(&format!("pbft{index}pub")));
    }
}

/// The genesis pause is longer than a follower pause, and the processor settle
/// comes after the last validator.
#[test]
fn test_wait_order_and_lengths() {
    let mut sequencer = sequencer(InMemoryCluster::new(), RolloutConfig::default());
    sequencer
        .deploy(&network(3, &[("intkey", "intkey-tp")]), &mut seeded_generator(12))
        .unwrap();

    let waits = &sequencer.wait_policy().waits;
    assert_eq!(
        waits,
        &vec![
            (WaitPoint::GenesisCreated, Duration::from_secs(20)),
            (WaitPoint::FollowerCreated(1), Duration::from_secs(5)),
            (WaitPoint::FollowerCreated(2), Duration::from_secs(5)),
            (WaitPoint::BeforeProcessors, Duration::from_secs(20)),
        ]
    );
    assert!(waits[0].1 > waits[1].1);
    assert_eq!(sequencer.wait_policy().total(), Duration::from_secs(50));
}

/// Per-validator wiring attaches one processor instance to each validator.
#[test]
fn test_per_validator_processors() {
    let rollout = RolloutConfig {
        processor_wiring: ProcessorWiring::PerValidator,
        ..RolloutConfig::default()
    };
    let mut sequencer = sequencer(InMemoryCluster::new(), rollout);
    sequencer
        .deploy(&network(3, &[("intkey", "intkey-tp")]), &mut seeded_generator(13))
        .unwrap();

    for index in 0..3 {
        let workload = sequencer
            .cluster()
            .workload(&format!("intkey-tp-{index}"))
            .unwrap();
        let command = workload.containers[0].command.join(" ");
        assert!(command.contains(&format!("-C tcp://sawtooth-{index}:4004")));
    }
}

/// A full rollout into a manifest directory writes one file per object.
#[test]
fn test_manifest_rollout() {
    let dir = TempDir::new().unwrap();
    let cluster = ManifestDirCluster::new(dir.path(), "ledger", create_test_logger()).unwrap();
    let mut sequencer = sequencer(cluster, RolloutConfig::default());
    sequencer
        .deploy(&network(2, &[("intkey", "intkey-tp")]), &mut seeded_generator(14))
        .unwrap();

    let cluster = sequencer.into_cluster();
    for (kind, name) in [
        (ResourceKind::KeyStore, "keys-config"),
        (ResourceKind::Endpoint, "sawtooth-0"),
        (ResourceKind::Workload, "consensource-sawtooth-pbft-0"),
        (ResourceKind::Endpoint, "sawtooth-1"),
        (ResourceKind::Workload, "consensource-sawtooth-pbft-1"),
        (ResourceKind::Endpoint, "intkey-tp"),
        (ResourceKind::Workload, "intkey-tp"),
    ] {
        assert!(cluster.manifest_path(kind, name).is_file(), "{kind} {name}");
    }

    let deployment: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(
            cluster.manifest_path(ResourceKind::Workload, "consensource-sawtooth-pbft-1"),
        )
        .unwrap(),
    )
    .unwrap();
    assert_eq!(deployment["metadata"]["namespace"], "ledger");
    let validator = &deployment["spec"]["template"]["spec"]["containers"][0];
    assert_eq!(validator["command"], serde_json::json!(["bash"]));
    assert_eq!(validator["args"][0], "-c");
    assert_eq!(validator["envFrom"][0]["configMapRef"]["name"], "keys-config");

    // a second rollout into the same directory reuses keys but collides on node 0
    let mut again = super::helpers::sequencer(cluster, RolloutConfig::default());
    let err = again
        .deploy(&network(2, &[]), &mut seeded_generator(15))
        .unwrap_err();
    assert!(matches!(
        err,
        DeployError::ResourceCreation {
            stage: RolloutState::CreatingGenesis,
            source: ClusterError::AlreadyExists { .. },
        }
    ));
}

/// Custom cluster settings flow into names and images.
#[test]
fn test_cluster_settings_apply() {
    let settings = ClusterSettings {
        registry: "mirror.local".to_string(),
        key_store: "ledger-keys".to_string(),
        ..ClusterSettings::default()
    };
    let builder = ResourceBuilder::new(
        NetworkNames {
            name: "consensource".to_string(),
            ledger: "sawtooth".to_string(),
            consensus: "pbft".to_string(),
            version: "1.0".to_string(),
        },
        settings.clone(),
    );
    let key_store = builder.key_store(Default::default());
    assert_eq!(key_store.name, "ledger-keys");

    let mut sequencer = deployer::RolloutSequencer::new(
        RolloutConfig::default(),
        settings,
        InMemoryCluster::new(),
        deployer::NoWait,
        create_test_logger(),
    );
    sequencer.deploy(&network(1, &[]), &mut seeded_generator(16)).unwrap();

    let workload = sequencer
        .cluster()
        .workload("consensource-sawtooth-pbft-0")
        .unwrap();
    let engine = workload.container("sawtooth-pbft-engine").unwrap();
    assert_eq!(engine.image, "mirror.local/sawtooth-pbft-engine:1.0");
    assert_eq!(
        workload.container("sawtooth-validator").unwrap().env_from.as_deref(),
        Some("ledger-keys")
    );
}
