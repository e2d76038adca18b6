//! Ledger Network Deployer Binary
//!
//! Provisions a permissioned PBFT ledger network described by a `blockchain.toml`
//! (or `.yaml`) document.
//!
//! # Usage
//!
//! Roll out the network, writing cluster manifests to a directory:
//! ```bash
//! cargo run --package deployer -- deploy --config deployer/config/blockchain.toml --out-dir manifests
//! ```
//!
//! Inspect what a node will run, or the whole rollout order:
//! ```bash
//! cargo run --package deployer -- script --node-index 3
//! cargo run --package deployer -- plan
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use slog::{Drain, Logger, o};

use cluster::{ManifestDirCluster, ResourceBuilder};
use deployer::{FixedDelays, NoWait, ProvisionConfig, ReadinessWait, RolloutPlan, RolloutSequencer};
use keys::{KeyGenerator, build_key_map};

#[derive(Parser, Debug)]
#[command(name = "deployer")]
#[command(about = "Provision a permissioned PBFT ledger network")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Publish keys and roll out every validator and processor
    Deploy {
        /// Path to the configuration file (searched for when omitted)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Directory receiving the rendered cluster manifests
        #[arg(short, long, default_value = "manifests")]
        out_dir: PathBuf,

        /// Skip the readiness pauses between steps
        #[arg(long)]
        no_wait: bool,
    },

    /// Print one node's bootstrap script
    Script {
        /// Path to the configuration file (searched for when omitted)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Node index, 0 is the genesis node
        #[arg(long)]
        node_index: usize,
    },

    /// Print the rollout order and delays
    Plan {
        /// Path to the configuration file (searched for when omitted)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Print a freshly generated key map as JSON
    Keygen {
        /// Number of nodes
        #[arg(short, long)]
        nodes: usize,

        /// Consensus name prefixing every entry
        #[arg(long, default_value = "pbft")]
        consensus: String,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();
    let logger = create_logger(&args.log_level);

    match args.command {
        Command::Deploy {
            config,
            out_dir,
            no_wait,
        } => deploy(config.as_deref(), &out_dir, no_wait, logger),
        Command::Script { config, node_index } => print_script(config.as_deref(), node_index, logger),
        Command::Plan { config } => print_plan(config.as_deref(), logger),
        Command::Keygen { nodes, consensus } => keygen(nodes, &consensus),
    }
}

/// Load the configuration from `path`, or discover it from the working directory.
fn load_config(path: Option<&Path>, logger: &Logger) -> Result<ProvisionConfig> {
    let config = match path {
        Some(path) => {
            slog::info!(logger, "Loading configuration"; "path" => %path.display());
            ProvisionConfig::from_path(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?
        }
        None => ProvisionConfig::discover(".").context("Failed to discover config")?,
    };

    slog::info!(
        logger,
        "Configuration loaded";
        "name" => %config.blockchain.name,
        "ledger" => %config.blockchain.ledger,
        "consensus" => %config.blockchain.consensus,
        "nodes" => config.blockchain.nodes,
        "processors" => config.blockchain.processors.len(),
    );
    Ok(config)
}

/// Roll the network out into a manifest directory.
fn deploy(config_path: Option<&Path>, out_dir: &Path, no_wait: bool, logger: Logger) -> Result<()> {
    let config = load_config(config_path, &logger)?;

    let cluster = ManifestDirCluster::new(
        out_dir,
        config.cluster.namespace.clone(),
        logger.new(o!("component" => "cluster")),
    )
    .with_context(|| format!("Failed to open manifest directory {}", out_dir.display()))?;

    let mut delays = FixedDelays::from_config(&config.rollout);
    let mut skip = NoWait;
    let wait: &mut dyn ReadinessWait = if no_wait { &mut skip } else { &mut delays };

    let mut sequencer = RolloutSequencer::new(
        config.rollout.clone(),
        config.cluster.clone(),
        cluster,
        wait,
        logger.new(o!("component" => "rollout")),
    );

    let plan = sequencer.plan(&config.blockchain)?;
    slog::info!(
        logger,
        "Starting rollout";
        "out_dir" => %out_dir.display(),
        "expected_wait_secs" => plan.total_delay().as_secs(),
    );

    let result = sequencer
        .deploy(&config.blockchain, &mut KeyGenerator::from_os_rng())
        .context("Rollout failed")?;

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn print_script(config_path: Option<&Path>, node_index: usize, logger: Logger) -> Result<()> {
    let config = load_config(config_path, &logger)?;
    let script = config
        .blockchain
        .synthesizer(&config.rollout)
        .synthesize_node(node_index, config.blockchain.nodes)
        .with_context(|| format!("Failed to synthesize script for node {node_index}"))?;

    println!("{script}");
    Ok(())
}

fn print_plan(config_path: Option<&Path>, logger: Logger) -> Result<()> {
    let config = load_config(config_path, &logger)?;
    let builder = ResourceBuilder::new(config.blockchain.network_names(), config.cluster.clone());
    let plan = RolloutPlan::build(
        &config.blockchain,
        &config.rollout,
        &builder,
        &FixedDelays::from_config(&config.rollout),
    )?;

    println!("{plan}");
    Ok(())
}

fn keygen(nodes: usize, consensus: &str) -> Result<()> {
    let key_map = build_key_map(&mut KeyGenerator::from_os_rng(), consensus, nodes)
        .context("Failed to generate key material")?;
    println!("{}", serde_json::to_string_pretty(&key_map.entries())?);
    Ok(())
}

fn create_logger(level: &str) -> Logger {
    use slog::Level;
    let level = match level.to_lowercase().as_str() {
        "trace" => Level::Trace,
        "debug" => Level::Debug,
        "info" => Level::Info,
        "warn" => Level::Warning,
        "error" => Level::Error,
        _ => Level::Info,
    };

    let decorator = slog_term::TermDecorator::new().stderr().build();
    let drain = slog_term::FullFormat::new(decorator).build().fuse();
    let drain = slog::LevelFilter::new(drain, level).fuse();
    let drain = slog_async::Async::new(drain).build().fuse();
    Logger::root(drain, o!("version" => env!("CARGO_PKG_VERSION")))
}
