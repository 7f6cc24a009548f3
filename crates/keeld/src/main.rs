//! `keeld` — the keel load balancer daemon.
//!
//! # Usage
//!
//! ```text
//! keeld serve                                  # serve on 0.0.0.0:5000 with 3 servers
//! keeld serve -c keel.toml                     # start with a config file
//! keeld serve -l 127.0.0.1:8080 -n 5 --hasher linear
//! keeld simulate --requests 10000 --servers 3  # run the load experiments
//! keeld simulate --json                        # same, as JSON
//! ```

mod config;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use keel_http::HttpServer;
use keel_ring::{HasherKind, ServerId};
use keel_router::Balancer;
use keel_sim::{SimConfig, SimReport};
use tracing::info;

use config::CliConfig;

// -----------------------------------------------------------------------
// CLI definition
// -----------------------------------------------------------------------

#[derive(Parser)]
#[command(
    name = "keeld",
    version,
    about = "Consistent-hashing load balancer daemon"
)]
struct Cli {
    /// Path to TOML config file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP load balancer.
    Serve {
        /// Override listen address (e.g. "127.0.0.1:5000").
        #[arg(short = 'l', long)]
        listen_addr: Option<String>,

        /// Number of servers to spawn at startup.
        #[arg(short = 'n', long)]
        initial_servers: Option<usize>,

        #[command(flatten)]
        ring: RingArgs,
    },

    /// Run the load-distribution experiments and print the results.
    Simulate {
        /// Requests routed per experiment.
        #[arg(long, default_value = "10000")]
        requests: u64,

        /// Request keys are drawn from 0..=key-space.
        #[arg(long, default_value = "1000")]
        key_space: u64,

        /// RNG seed.
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Number of servers for the fixed-membership experiments.
        #[arg(long, default_value = "3")]
        servers: usize,

        /// Print the report as JSON.
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        ring: RingArgs,
    },
}

/// Ring overrides shared by both subcommands.
#[derive(clap::Args)]
struct RingArgs {
    /// Number of slots in the hash space.
    #[arg(long)]
    slots: Option<u32>,

    /// Virtual nodes per server.
    #[arg(long)]
    virtuals: Option<u32>,

    /// Hash strategy: digest, linear or linear-alt.
    #[arg(long)]
    hasher: Option<HasherKind>,
}

impl RingArgs {
    fn apply(self, config: &mut CliConfig) {
        if let Some(slots) = self.slots {
            config.ring.slot_count = slots;
        }
        if let Some(virtuals) = self.virtuals {
            config.ring.virtuals_per_server = virtuals;
        }
        if let Some(hasher) = self.hasher {
            config.ring.hasher = hasher;
        }
    }
}

// -----------------------------------------------------------------------
// Entrypoint
// -----------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = CliConfig::load(cli.config.as_deref()).context("failed to load config")?;

    setup_tracing(&config.log.level);

    match cli.command {
        Commands::Serve {
            listen_addr,
            initial_servers,
            ring,
        } => {
            // CLI args override config file values.
            if let Some(addr) = listen_addr {
                config.http.listen_addr = addr;
            }
            if let Some(n) = initial_servers {
                config.balancer.initial_servers = n;
            }
            ring.apply(&mut config);
            cmd_serve(config).await
        }
        Commands::Simulate {
            requests,
            key_space,
            seed,
            servers,
            json,
            ring,
        } => {
            ring.apply(&mut config);
            let sim = SimConfig {
                ring: config.ring,
                requests,
                key_space,
                seed,
            };
            cmd_simulate(&sim, servers, json)
        }
    }
}

/// Initialize the `tracing` subscriber with the given level filter.
///
/// Respects `RUST_LOG` env var if set, otherwise uses the config value.
fn setup_tracing(level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

// -----------------------------------------------------------------------
// keeld serve
// -----------------------------------------------------------------------

async fn cmd_serve(config: CliConfig) -> Result<()> {
    info!(
        listen_addr = %config.http.listen_addr,
        slot_count = config.ring.slot_count,
        virtuals_per_server = config.ring.virtuals_per_server,
        hasher = %config.ring.hasher,
        initial_servers = config.balancer.initial_servers,
        "starting keeld"
    );

    let balancer = Balancer::new(&config.ring).context("invalid ring configuration")?;
    if config.balancer.initial_servers > 0 {
        balancer
            .scale_up(config.balancer.initial_servers, Vec::new())
            .await
            .context("failed to spawn initial servers")?;
    }

    let server = HttpServer::new(balancer);
    server
        .serve_with_shutdown(&config.http.listen_addr, shutdown_signal())
        .await
        .context("http server failed")?;

    info!("keeld stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}

// -----------------------------------------------------------------------
// keeld simulate
// -----------------------------------------------------------------------

fn cmd_simulate(sim: &SimConfig, servers: usize, json: bool) -> Result<()> {
    let report = keel_sim::run_all(sim, servers).context("simulation failed")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(sim, servers, &report);
    }
    Ok(())
}

fn print_report(sim: &SimConfig, servers: usize, report: &SimReport) {
    println!(
        "ring: {} slots, {} virtual nodes per server, {} hasher",
        sim.ring.slot_count, sim.ring.virtuals_per_server, sim.ring.hasher
    );
    println!(
        "{} requests over keys 0..={} (seed {})",
        sim.requests, sim.key_space, sim.seed
    );

    println!("\n== Load on {servers} servers ==");
    print!("{}", report.distribution.render_bars(40));
    println!(
        "mean {:.1}, std dev {:.1}, max/mean {:.2}",
        report.distribution.mean, report.distribution.std_dev, report.distribution.imbalance
    );

    println!("\n== Average load by server count ==");
    for point in &report.scaling {
        println!(
            "N={:<3} avg {:>8.1}  std dev {:>8.1}  max/mean {:.2}",
            point.servers, point.average_load, point.report.std_dev, point.report.imbalance
        );
    }

    let recovery = &report.recovery;
    println!(
        "\n== Failure of {} replaced by {} ==",
        recovery.failed, recovery.replacement
    );
    println!("before: {}", join_ids(&recovery.members_before));
    println!("after:  {}", join_ids(&recovery.members_after));
    println!(
        "{} of {} keys remapped ({:.1}%), only affected keys moved: {}",
        recovery.keys_remapped,
        recovery.keys_checked,
        recovery.remap_fraction * 100.0,
        recovery.only_affected_keys_moved
    );

    println!("\n== Hash strategies on {servers} servers ==");
    for cmp in &report.hashers {
        println!("-- {} (max/mean {:.2})", cmp.hasher, cmp.report.imbalance);
        print!("{}", cmp.report.render_bars(40));
    }
}

fn join_ids(ids: &[ServerId]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
