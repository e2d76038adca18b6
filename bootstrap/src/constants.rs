//! Fixed values the validator runtime expects.

/// Validator component (transaction processor) API port.
pub const COMPONENT_PORT: u16 = 4004;

/// Consensus engine API port.
pub const CONSENSUS_PORT: u16 = 5050;

/// Validator peer network port.
pub const NETWORK_PORT: u16 = 8800;

/// REST API port.
pub const REST_API_PORT: u16 = 8008;

/// Auxiliary HTTP port exposed on validator services.
pub const AUXILIARY_HTTP_PORT: u16 = 8080;

/// Seconds the genesis node waits for service discovery before emitting peer references.
pub const GENESIS_SETTLE_SECS: u64 = 30;

/// Consensus algorithm version written into the configuration batch.
pub const CONSENSUS_ALGORITHM_VERSION: &str = "1.0";

/// Upper bound on batches per block written into the configuration batch.
pub const MAX_BATCHES_PER_BLOCK: u32 = 1200;

/// Static peering connection ceiling passed to the validator.
pub const MAX_PEER_CONNECTIVITY: u32 = 10_000;

/// Validator consensus identity, private half.
pub const VALIDATOR_PRIVATE_KEY_PATH: &str = "/etc/sawtooth/keys/validator.priv";

/// Validator consensus identity, public half.
pub const VALIDATOR_PUBLIC_KEY_PATH: &str = "/etc/sawtooth/keys/validator.pub";

/// Local signing key name passed to `sawtooth keygen`.
pub const SIGNING_KEY_NAME: &str = "my_key";

/// Local signing key authoring the genesis and proposal batches.
pub const SIGNING_KEY_PATH: &str = "/root/.sawtooth/keys/my_key.priv";

/// Genesis batch written by `sawset genesis`.
pub const GENESIS_BATCH: &str = "config-genesis.batch";

/// Consensus settings proposal batch.
pub const CONFIG_BATCH: &str = "config.batch";

/// Block store backup restored on genesis node restarts.
pub const BACKUP_PATH: &str = "/var/lib/sawtooth/backup/backupdata";

/// Validator binary.
pub const VALIDATOR_BIN: &str = "sawtooth-validator";

/// Settings namespace of the ledger's on-chain configuration.
pub const SETTINGS_NAMESPACE: &str = "sawtooth";
