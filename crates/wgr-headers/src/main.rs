#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;
use wgr_consensus::merkle_root_from_branch;
use wgr_core::{Hash32, NetworkParams, CHUNK_SIZE};
use wgr_headers::{load_checkpoints, verify_proven_chunk, ChainContext, ChainRegistry};

/// Header store configuration resolved from CLI/env/defaults.
#[derive(Parser, Debug)]
#[command(name = "wgr-headers", version)]
struct Config {
    /// Data directory; headers live in a per-network subdirectory
    #[arg(long = "datadir")]
    datadir: Option<PathBuf>,
    /// Network: mainnet, testnet, regtest or simnet
    #[arg(long = "network")]
    network: Option<String>,
    /// JSON checkpoints file
    #[arg(long = "checkpoints")]
    checkpoints: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List known chains
    Info,
    /// Verify and store one chunk of raw headers on the best chain
    ImportChunk {
        /// Chunk index (height / 2016)
        #[arg(long)]
        index: u64,
        /// File holding the chunk, hex or binary
        #[arg(long)]
        file: PathBuf,
        /// Skip difficulty checks; validity was proven elsewhere
        #[arg(long)]
        proven: bool,
    },
    /// Compute a merkle root from a transaction id and its branch
    VerifyProof {
        /// Transaction id (display order)
        #[arg(long)]
        leaf: String,
        /// Comma separated sibling hashes, leaf level first
        #[arg(long, default_value = "")]
        branch: String,
        /// Position of the transaction in the block
        #[arg(long)]
        index: u64,
    },
}

struct ResolvedConfig {
    headers_dir: PathBuf,
    params: NetworkParams,
}

fn resolve_config(cli: &Config) -> Result<ResolvedConfig> {
    let network = cli
        .network
        .clone()
        .or_else(|| env::var("WGR_NETWORK").ok())
        .unwrap_or_else(|| "mainnet".to_string());
    let mut params =
        NetworkParams::by_name(&network).ok_or_else(|| anyhow!("unknown network {network}"))?;
    if let Some(path) = &cli.checkpoints {
        let checkpoints = load_checkpoints(path)
            .with_context(|| format!("loading checkpoints from {}", path.display()))?;
        params = params.with_checkpoints(checkpoints);
    }

    let datadir = cli
        .datadir
        .clone()
        .or_else(|| env::var("WGR_DATADIR").ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("wgr-data"));

    Ok(ResolvedConfig {
        headers_dir: datadir.join(params.name),
        params,
    })
}

fn read_chunk(path: &Path) -> Result<Vec<u8>> {
    let raw = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let text = String::from_utf8_lossy(&raw);
    let trimmed = text.trim();
    if !trimmed.is_empty() && trimmed.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Ok(hex::decode(trimmed)?);
    }
    Ok(raw)
}

fn open_registry(cli: &Config) -> Result<ChainRegistry> {
    let cfg = resolve_config(cli)?;
    info!(network = cfg.params.name, dir = %cfg.headers_dir.display(), "opening header store");
    let ctx = Arc::new(ChainContext::with_default_difficulty(cfg.params, cfg.headers_dir));
    Ok(ChainRegistry::open(ctx)?)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    run(&Config::parse())
}

fn run(cli: &Config) -> Result<()> {
    match &cli.command {
        Command::Info => {
            let registry = open_registry(cli)?;
            let mut chains = registry.chains();
            chains.sort_by_key(|c| c.forkpoint());
            for chain in chains {
                println!(
                    "forkpoint={} height={} name={} chainwork={}",
                    chain.forkpoint(),
                    chain.height().map_or_else(|| "-".to_string(), |h| h.to_string()),
                    chain.get_name(&registry).unwrap_or_default(),
                    chain.get_chainwork(None)?,
                );
            }
        }
        Command::ImportChunk { index, file, proven } => {
            let data = read_chunk(file)?;
            let registry = open_registry(cli)?;
            let best = registry.best_chain()?;
            if *proven {
                // Proven chunks still have to link internally.
                verify_proven_chunk(registry.context().layout(), index * CHUNK_SIZE, &data)?;
            }
            if !best.connect_chunk(&registry, *index, &data, *proven) {
                bail!("chunk {index} rejected");
            }
            println!("chunk {index} stored; height {:?}", best.height());
        }
        Command::VerifyProof { leaf, branch, index } => {
            let leaf: Hash32 = leaf.parse().context("parsing leaf")?;
            let branch = branch
                .split(',')
                .filter(|s| !s.trim().is_empty())
                .map(|s| s.trim().parse::<Hash32>())
                .collect::<Result<Vec<_>, _>>()
                .context("parsing branch")?;
            println!("{}", merkle_root_from_branch(&leaf, &branch, *index)?);
        }
    }
    Ok(())
}
