//! Towermesh simulation runner
//!
//! Runs tower mesh scenarios and prints their reports.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;

use towermesh_logging::{LogConfig, TowermeshSubscriberBuilder, WorkerGuard};
use towermesh_node::TowerConfig;
use towermesh_simulation::{AnnealOptions, FloodOptions, run_anneal, run_chain, run_flood};

#[derive(Parser)]
#[command(
    name = "towermesh-sim",
    about = "Tower mesh simulation with hop-by-hop forwarding and learned routes",
    version
)]
struct Cli {
    /// Forwarding tick interval in milliseconds
    #[arg(long, global = true, default_value = "2")]
    tick_ms: u64,

    /// Tower configuration file (JSON); --tick-ms still applies
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Seconds a single packet may travel before the run fails
    #[arg(long, global = true, default_value = "30")]
    deadline_secs: u64,

    /// Print reports as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Log level
    #[arg(short, long, global = true, default_value = "warn")]
    level: String,

    /// Human-readable log output instead of JSONL
    #[arg(long, global = true)]
    pretty: bool,

    /// Also write JSONL logs to this directory
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that repeated traffic shortens trips on random topologies
    Anneal {
        #[arg(short, long, default_value = "20")]
        towers: usize,

        /// Packets per trial
        #[arg(short, long, default_value = "50")]
        packets: usize,

        #[arg(long, default_value = "5")]
        trials: usize,

        #[arg(long)]
        seed: Option<u64>,
    },

    /// Send many packets at once between random pairs
    Flood {
        #[arg(short, long, default_value = "20")]
        towers: usize,

        #[arg(short, long, default_value = "100")]
        packets: usize,

        #[arg(long)]
        seed: Option<u64>,

        /// How many of the busiest towers to list
        #[arg(long, default_value = "5")]
        top: usize,
    },

    /// Send a packet down a chain and back
    Chain {
        #[arg(short = 'n', long, default_value = "6")]
        length: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _guard = init_logging(&cli);

    let config = tower_config(&cli)?;
    let deadline = Duration::from_secs(cli.deadline_secs.max(1));

    match cli.command {
        Commands::Anneal {
            towers,
            packets,
            trials,
            seed,
        } => {
            let report = run_anneal(&AnnealOptions {
                towers,
                packets,
                trials,
                seed,
                deadline,
                config,
            })
            .await?;
            print_report(&report, cli.json)?;
            if !report.success {
                std::process::exit(1);
            }
        }
        Commands::Flood {
            towers,
            packets,
            seed,
            top,
        } => {
            let report = run_flood(&FloodOptions {
                towers,
                packets,
                seed,
                deadline,
                top,
                config,
            })
            .await?;
            print_report(&report, cli.json)?;
        }
        Commands::Chain { length } => {
            let report = run_chain(length, &config, deadline).await?;
            print_report(&report, cli.json)?;
        }
    }

    Ok(())
}

fn init_logging(cli: &Cli) -> Option<WorkerGuard> {
    let config = match &cli.log_dir {
        Some(directory) => LogConfig::simulation(directory.clone()),
        None => LogConfig::default(),
    };
    let builder = TowermeshSubscriberBuilder::new()
        .with_config(config)
        .with_level(cli.level.clone());
    if cli.pretty {
        builder.with_pretty(true).init()
    } else {
        builder.init()
    }
}

fn tower_config(cli: &Cli) -> anyhow::Result<TowerConfig> {
    let config = match &cli.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            serde_json::from_str::<TowerConfig>(&text)
                .with_context(|| format!("parsing {}", path.display()))?
        }
        None => TowerConfig::default(),
    };
    let config = config.with_tick_interval(Duration::from_millis(cli.tick_ms));
    config.validate()?;
    Ok(config)
}

fn print_report<R: Serialize + std::fmt::Display>(report: &R, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        println!("{report}");
    }
    Ok(())
}
