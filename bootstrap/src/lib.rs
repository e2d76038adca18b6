//! Node bootstrap script synthesis.
//!
//! A validator container starts by running a single shell script passed as
//! `bash -c <script>`. This crate builds that script for node `i` of an `n`-node
//! network as an ordered list of [`Statement`]s, then renders it to text:
//!
//! - **Genesis (index 0)**: materializes its identity keys, authors the genesis and
//!   consensus configuration batches (embedding the full membership list), initializes
//!   or restores chain state and starts the validator.
//! - **Follower (index > 0)**: materializes its identity keys, creates a signing key and
//!   starts the validator statically peered with every lower-indexed node.
//!
//! Synthesis is pure; nothing runs until the script executes inside the node's container.
//!
//! ```ignore
//! let synthesizer = ScriptSynthesizer::new("pbft", EndpointNaming::new("sawtooth"));
//! let script = synthesizer.synthesize_node(3, 5)?;
//! let command = script.container_command(); // ["bash", "-c", "..."]
//! ```

pub mod constants;
pub mod endpoint;
pub mod error;
pub mod role;
pub mod shell;
pub mod synthesizer;

pub use endpoint::EndpointNaming;
pub use error::BootstrapError;
pub use role::NodeRole;
pub use shell::{BootstrapScript, Command, Condition, Statement};
pub use synthesizer::ScriptSynthesizer;
