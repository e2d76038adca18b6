//! Per-node bootstrap script synthesis.
//!
//! ## Genesis node (index 0)
//!
//! ```text
//! 1. Announce, materialize validator keys from env   (if absent)
//! 2. Create local signing key                        (if absent)
//! 3. Author genesis batch                            (if absent)
//! 4. Sleep genesis settle interval                   (service discovery)
//! 5. Author consensus config batch + membership list (if absent)
//! 6. Genesis over fresh state, or restore backup     (restart)
//! 7. Start validator
//! ```
//!
//! ## Follower node (index i > 0)
//!
//! ```text
//! 1. Announce, materialize validator keys from env   (if absent)
//! 2. Create local signing key                        (if absent)
//! 3. Start validator with --peers for nodes 0..i
//! ```
//!
//! The membership list names every node's public key in index order. It must cover
//! exactly the slots the key material map holds, otherwise a node is never admitted.

use std::time::Duration;

use keys::{private_key_name, public_key_name};

use crate::constants::{
    BACKUP_PATH, COMPONENT_PORT, CONFIG_BATCH, CONSENSUS_ALGORITHM_VERSION, CONSENSUS_PORT,
    GENESIS_BATCH, GENESIS_SETTLE_SECS, MAX_BATCHES_PER_BLOCK, MAX_PEER_CONNECTIVITY,
    NETWORK_PORT, SETTINGS_NAMESPACE, SIGNING_KEY_NAME, SIGNING_KEY_PATH, VALIDATOR_BIN,
    VALIDATOR_PRIVATE_KEY_PATH, VALIDATOR_PUBLIC_KEY_PATH,
};
use crate::endpoint::EndpointNaming;
use crate::error::BootstrapError;
use crate::role::NodeRole;
use crate::shell::{BootstrapScript, Command, Statement};

/// Builds the startup script of every node in a network.
#[derive(Clone, Debug)]
pub struct ScriptSynthesizer {
    consensus_name: String,
    endpoints: EndpointNaming,
    genesis_settle: Duration,
}

impl ScriptSynthesizer {
    pub fn new(consensus_name: impl Into<String>, endpoints: EndpointNaming) -> Self {
        Self {
            consensus_name: consensus_name.into(),
            endpoints,
            genesis_settle: Duration::from_secs(GENESIS_SETTLE_SECS),
        }
    }

    /// Override the sleep the genesis node takes before authoring the config batch.
    pub fn with_genesis_settle(mut self, settle: Duration) -> Self {
        self.genesis_settle = settle;
        self
    }

    pub fn consensus_name(&self) -> &str {
        &self.consensus_name
    }

    pub fn endpoints(&self) -> &EndpointNaming {
        &self.endpoints
    }

    /// Synthesize the script for the node at `node_index`, deriving its role.
    pub fn synthesize_node(
        &self,
        node_index: usize,
        node_count: usize,
    ) -> Result<BootstrapScript, BootstrapError> {
        self.synthesize(NodeRole::for_index(node_index), node_index, node_count)
    }

    /// Synthesize the script `role` runs as node `node_index` of `node_count`.
    pub fn synthesize(
        &self,
        role: NodeRole,
        node_index: usize,
        node_count: usize,
    ) -> Result<BootstrapScript, BootstrapError> {
        if node_count == 0 {
            return Err(BootstrapError::InvalidTopology);
        }
        if node_index >= node_count {
            return Err(BootstrapError::InvalidNodeIndex {
                index: node_index,
                node_count,
            });
        }
        if !role.matches_index(node_index) {
            return Err(BootstrapError::RoleMismatch {
                index: node_index,
                role,
            });
        }

        let mut statements = self.preamble(node_index);
        match role {
            NodeRole::Genesis => statements.extend(self.genesis_steps(node_count)),
            NodeRole::Follower(index) => statements.extend(self.follower_steps(index)),
        }
        Ok(BootstrapScript::new(statements))
    }

    /// The bracketed, quote-escaped roster of every node's public key variable.
    ///
    /// For `pbft` and two nodes: `["\"$pbft0pub\",\"$pbft1pub\""]`.
    pub fn membership_list(&self, node_count: usize) -> String {
        let members = (0..node_count)
            .map(|i| format!(r#"\"${}\""#, public_key_name(&self.consensus_name, i)))
            .collect::<Vec<_>>()
            .join(",");
        format!(r#"["{members}"]"#)
    }

    /// The settings property carrying the membership list.
    pub fn membership_setting(&self, node_count: usize) -> String {
        format!(
            "{SETTINGS_NAMESPACE}.consensus.{}.members={}",
            self.consensus_name,
            self.membership_list(node_count)
        )
    }

    /// Announce, then copy this node's keys from the environment unless already on disk.
    fn preamble(&self, node_index: usize) -> Vec<Statement> {
        vec![
            Statement::Announce(format!("Starting validator {node_index}")),
            Statement::unless_exists(
                VALIDATOR_PRIVATE_KEY_PATH,
                vec![
                    Statement::WriteVar {
                        var: private_key_name(&self.consensus_name, node_index),
                        path: VALIDATOR_PRIVATE_KEY_PATH.to_string(),
                    },
                    Statement::WriteVar {
                        var: public_key_name(&self.consensus_name, node_index),
                        path: VALIDATOR_PUBLIC_KEY_PATH.to_string(),
                    },
                ],
            ),
        ]
    }

    fn signing_key_step(&self) -> Statement {
        Statement::unless_exists(
            SIGNING_KEY_PATH,
            vec![Statement::Run(
                Command::new("sawtooth").arg("keygen").arg(SIGNING_KEY_NAME),
            )],
        )
    }

    fn genesis_steps(&self, node_count: usize) -> Vec<Statement> {
        let members = self.membership_setting(node_count);

        let genesis_batch = Command::new("sawset")
            .arg("genesis")
            .arg("-k")
            .arg(SIGNING_KEY_PATH)
            .arg("-o")
            .arg(GENESIS_BATCH);

        let config_batch = Command::new("sawset")
            .arg("proposal")
            .arg("create")
            .line(format!("-k {SIGNING_KEY_PATH}"))
            .line(format!(
                "{SETTINGS_NAMESPACE}.consensus.algorithm.name={}",
                self.consensus_name
            ))
            .line(format!(
                "{SETTINGS_NAMESPACE}.consensus.algorithm.version={CONSENSUS_ALGORITHM_VERSION}"
            ))
            .line(members.clone())
            .line(format!(
                "{SETTINGS_NAMESPACE}.publisher.max_batches_per_block={MAX_BATCHES_PER_BLOCK}"
            ))
            .line(format!("-o {CONFIG_BATCH}"));

        let initialize = Command::new("sawadm")
            .arg("genesis")
            .arg(GENESIS_BATCH)
            .arg(CONFIG_BATCH);
        let restore = Command::new("sawadm")
            .arg("blockstore")
            .arg("restore")
            .arg(BACKUP_PATH);

        vec![
            self.signing_key_step(),
            Statement::unless_exists(GENESIS_BATCH, vec![Statement::Run(genesis_batch)]),
            Statement::Sleep(self.genesis_settle.as_secs()),
            Statement::Echo(members),
            Statement::unless_exists(CONFIG_BATCH, vec![Statement::Run(config_batch)]),
            Statement::if_empty_else(
                BACKUP_PATH,
                vec![Statement::Run(initialize)],
                vec![Statement::Run(restore)],
            ),
            Statement::Run(self.validator_command(0, 0..0)),
        ]
    }

    fn follower_steps(&self, node_index: usize) -> Vec<Statement> {
        vec![
            self.signing_key_step(),
            Statement::Run(self.validator_command(node_index, 0..node_index)),
        ]
    }

    /// Validator invocation bound to this node's endpoint, statically peered with `peers`.
    fn validator_command(&self, node_index: usize, peers: impl Iterator<Item = usize>) -> Command {
        Command::new(VALIDATOR_BIN)
            .arg("-vv")
            .line(format!("--endpoint {}", self.endpoints.peer_address(node_index)))
            .line(format!("--bind component:tcp://0.0.0.0:{COMPONENT_PORT}"))
            .line(format!("--bind consensus:tcp://0.0.0.0:{CONSENSUS_PORT}"))
            .line(format!("--bind network:tcp://0.0.0.0:{NETWORK_PORT}"))
            .line("--scheduler parallel")
            .line("--peering static")
            .line(format!("--maximum-peer-connectivity {MAX_PEER_CONNECTIVITY}"))
            .lines(peers.map(|j| format!("--peers {}", self.endpoints.peer_address(j))))
    }
}
