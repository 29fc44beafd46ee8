//! fairlane-load — CLI load generator for the fairlane executor pool.
//!
//! Builds a pool from flags or a TOML config file, fires a burst of
//! hashing tasks round-robin across the configured tenants, waits for
//! every outcome, drains the pool, and prints the final status snapshot
//! as JSON.
//!
//! # Usage
//!
//! ```bash
//! # Defaults: 4 slots, 64 queue capacity, tenants alpha,beta,gamma
//! fairlane-load
//!
//! # Explicit sizing and a bigger burst
//! fairlane-load --pool-size 2 --queue-capacity 8 --tenants a,b --tasks 500
//!
//! # Via environment variables
//! FAIRLANE_POOL_SIZE=8 FAIRLANE_TASKS=1000 fairlane-load
//!
//! # From a config file
//! fairlane-load --config fairlane.toml
//! ```

use std::path::PathBuf;

use anyhow::Context;
use async_trait::async_trait;
use clap::Parser;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use fairlane_scheduler::{Pool, PoolConfig, TaskExecutor};

/// Load generator for the fairlane executor pool.
#[derive(Parser, Debug)]
#[command(name = "fairlane-load", version, about)]
struct Cli {
    /// Path to a TOML pool config; overrides the sizing flags below.
    #[arg(long, env = "FAIRLANE_CONFIG")]
    config: Option<PathBuf>,

    /// Number of executor slots.
    #[arg(long, env = "FAIRLANE_POOL_SIZE", default_value_t = 4)]
    pool_size: usize,

    /// Global queue capacity across all tenants.
    #[arg(long, env = "FAIRLANE_QUEUE_CAPACITY", default_value_t = 64)]
    queue_capacity: usize,

    /// Comma-separated tenant keys in round-robin order.
    #[arg(
        long,
        env = "FAIRLANE_TENANTS",
        default_value = "alpha,beta,gamma",
        value_delimiter = ','
    )]
    tenants: Vec<String>,

    /// Total number of tasks to submit, spread across the tenants.
    #[arg(long, env = "FAIRLANE_TASKS", default_value_t = 100)]
    tasks: u64,

    /// Rounds of SHA-256 hashing per task.
    #[arg(long, env = "FAIRLANE_ROUNDS", default_value_t = 10_000)]
    rounds: u32,
}

/// One hashing work unit: repeatedly digest a seed string.
struct HashJob {
    seed: String,
    rounds: u32,
}

/// Demo executor: CPU-bound SHA-256 chains, pushed onto the blocking
/// pool so slots measure real parallel work.
struct HashExecutor;

#[async_trait]
impl TaskExecutor for HashExecutor {
    type Payload = HashJob;
    type Output = String;

    async fn execute(&self, job: HashJob) -> anyhow::Result<String> {
        let digest = tokio::task::spawn_blocking(move || {
            let mut digest = job.seed.into_bytes();
            for _ in 0..job.rounds {
                digest = Sha256::digest(&digest).to_vec();
            }
            digest
        })
        .await?;
        Ok(hex(&digest))
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => PoolConfig::from_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => PoolConfig::new(cli.pool_size, cli.queue_capacity, cli.tenants.clone()),
    };

    let tenants = config.tenants.clone();
    let pool = Pool::new(config, HashExecutor)?;

    info!(tasks = cli.tasks, tenants = ?tenants, "starting load run");

    let mut handles = Vec::new();
    let mut rejected = 0u64;
    for i in 0..cli.tasks {
        let tenant = &tenants[(i as usize) % tenants.len()];
        let job = HashJob {
            seed: format!("{tenant}-{i}"),
            rounds: cli.rounds,
        };
        match pool.submit(tenant.as_str(), job).await {
            Ok(handle) => handles.push(handle),
            Err(e) => {
                rejected += 1;
                debug!(error = %e, "submission refused");
            }
        }
    }

    let mut succeeded = 0u64;
    let mut failed = 0u64;
    for outcome in futures::future::join_all(handles.into_iter().map(|h| h.outcome())).await {
        match outcome {
            Ok(_) => succeeded += 1,
            Err(_) => failed += 1,
        }
    }

    pool.shutdown(true).await;

    let status = pool.status().await;
    info!(succeeded, failed, rejected, "load run finished");
    println!("{}", serde_json::to_string_pretty(&status)?);

    Ok(())
}
