#![warn(missing_docs)]
//! MeshBench CLI Library
//!
//! Entry points for the two tools. Each binary doubles as its own group
//! member: the launcher re-executes itself with a hidden flag per rank,
//! and the worker half attaches to the inherited pipe mesh before
//! running the benchmark body. Results print on stdout from the rank
//! that owns them; logs go to stderr on every process.

mod config;

pub use config::*;

use clap::Parser;
use meshbench_group::{attach_worker, spawn_group};
use meshbench_latency::{LatencyReport, PingPongOptions};
use meshbench_stats::{GlobalSummary, ROOT, StatsOptions};

/// mesh-stats CLI arguments
#[derive(Parser, Debug)]
#[command(name = "mesh-stats")]
#[command(author, version, about = "Distributed min/max/average over a process group")]
pub struct StatsCli {
    /// Total element count; must divide evenly by the group size
    pub count: u64,

    /// Number of ranks to launch
    #[arg(long)]
    pub np: Option<u32>,

    /// Dataset seed for reproducible runs (random when omitted)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Gather the shards back onto the root and verify reassembly
    #[arg(long)]
    pub verify: bool,

    /// Emit the summary as JSON
    #[arg(long)]
    pub json: bool,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Internal: run as a group member (used by the launcher)
    #[arg(long, hide = true)]
    pub mesh_worker: bool,
}

/// mesh-latency CLI arguments
#[derive(Parser, Debug)]
#[command(name = "mesh-latency")]
#[command(author, version, about = "Two-party round-trip latency over a process group")]
pub struct LatencyCli {
    /// Timed round trips
    pub iterations: u64,

    /// Message size in bytes
    #[arg(default_value_t = 1)]
    pub message_size: usize,

    /// Number of ranks to launch; the benchmark runs on exactly 2
    #[arg(long)]
    pub np: Option<u32>,

    /// Untimed round trips before the clock starts
    #[arg(long)]
    pub warmup: Option<u64>,

    /// Emit the report as JSON
    #[arg(long)]
    pub json: bool,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Internal: run as a group member (used by the launcher)
    #[arg(long, hide = true)]
    pub mesh_worker: bool,
}

/// Run the statistics tool.
///
/// This is the main entry point for the `mesh-stats` binary.
pub fn run_stats() -> anyhow::Result<()> {
    run_stats_with_cli(StatsCli::parse())
}

/// Run the statistics tool with pre-parsed arguments.
pub fn run_stats_with_cli(cli: StatsCli) -> anyhow::Result<()> {
    // Handle worker mode first (group members skip launcher setup)
    if cli.mesh_worker {
        init_logging(cli.verbose);
        return stats_worker(&cli);
    }

    init_logging(cli.verbose);

    // Discover mesh.toml configuration (CLI flags override)
    let config = MeshConfig::discover().unwrap_or_default();
    let np = cli.np.unwrap_or(config.launch.np);

    let group = spawn_group(np, &forwarded_args())?;
    tracing::info!(np, count = cli.count, "statistics group launched");
    group.wait()?;
    Ok(())
}

/// Run the latency tool.
///
/// This is the main entry point for the `mesh-latency` binary.
pub fn run_latency() -> anyhow::Result<()> {
    run_latency_with_cli(LatencyCli::parse())
}

/// Run the latency tool with pre-parsed arguments.
pub fn run_latency_with_cli(cli: LatencyCli) -> anyhow::Result<()> {
    // Handle worker mode first (group members skip launcher setup)
    if cli.mesh_worker {
        init_logging(cli.verbose);
        return latency_worker(&cli);
    }

    init_logging(cli.verbose);

    let config = MeshConfig::discover().unwrap_or_default();
    let np = cli.np.unwrap_or(config.launch.np);

    let group = spawn_group(np, &forwarded_args())?;
    tracing::info!(np, iterations = cli.iterations, "latency group launched");
    group.wait()?;
    Ok(())
}

fn init_logging(verbose: bool) {
    // Logs stay on stderr; stdout is reserved for results.
    if verbose {
        tracing_subscriber::fmt()
            .with_env_filter("meshbench=debug")
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter("meshbench=info")
            .with_writer(std::io::stderr)
            .init();
    }
}

/// Original command line, minus the program name, re-issued to every rank.
fn forwarded_args() -> Vec<String> {
    std::env::args().skip(1).collect()
}

/// Run one rank of the statistics pipeline.
fn stats_worker(cli: &StatsCli) -> anyhow::Result<()> {
    // Every rank resolves the same options from identical argv and cwd.
    let config = MeshConfig::discover().unwrap_or_default();
    let (seed, options) = resolve_stats_options(cli, &config);

    let mut group = attach_worker()?;
    let dataset = if group.rank() == ROOT {
        tracing::info!(count = cli.count, "initializing dataset");
        Some(meshbench_stats::dataset::generate(cli.count, seed))
    } else {
        None
    };

    let summary = meshbench_stats::run(&mut group, cli.count, dataset.as_deref(), &options)?;
    if let Some(summary) = summary {
        print_summary(&summary, cli.json)?;
    }
    Ok(())
}

/// Run one rank of the ping-pong benchmark.
fn latency_worker(cli: &LatencyCli) -> anyhow::Result<()> {
    let config = MeshConfig::discover().unwrap_or_default();
    let options = resolve_latency_options(cli, &config);

    let mut group = attach_worker()?;
    let report = meshbench_latency::run(&mut group, &options)?;
    if let Some(report) = report {
        print_report(&report, cli.json)?;
    }
    Ok(())
}

/// Layer mesh.toml values under explicit CLI flags.
fn resolve_stats_options(cli: &StatsCli, config: &MeshConfig) -> (Option<u64>, StatsOptions) {
    let seed = cli.seed.or(config.stats.seed);
    let options = StatsOptions {
        verify: cli.verify || config.stats.verify,
    };
    (seed, options)
}

/// Layer mesh.toml values under explicit CLI flags.
fn resolve_latency_options(cli: &LatencyCli, config: &MeshConfig) -> PingPongOptions {
    // The clap default for message size is 1; any other value was passed
    // explicitly and wins over mesh.toml.
    let message_size = if cli.message_size != 1 {
        cli.message_size
    } else {
        config.latency.message_size
    };
    PingPongOptions {
        iterations: cli.iterations,
        message_size,
        warmup: cli.warmup.unwrap_or(config.latency.warmup),
    }
}

fn print_summary(summary: &GlobalSummary, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(summary)?);
        return Ok(());
    }
    println!("--- Global Statistics ---");
    println!("Elements: {}", summary.count);
    println!("Minimum:  {:.2}", summary.min);
    println!("Maximum:  {:.2}", summary.max);
    println!("Average:  {:.2}", summary.avg);
    Ok(())
}

fn print_report(report: &LatencyReport, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }
    println!(
        "{} byte message transmitted {} times.",
        report.message_size, report.iterations
    );
    println!(
        "Average round-trip latency: {:.2} microseconds",
        report.avg_rtt_us
    );
    println!(
        "Estimated one-way latency: {:.2} microseconds",
        report.one_way_us
    );
    Ok(())
}
