use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use arq_lab_abstract::{Protocol, RunConfig};
use arq_lab_simulator::{Driver, RunReport, scenario_runner};

#[derive(Parser, Debug)]
#[command(author, version, about = "Headless ARQ link-protocol simulator")]
struct Args {
    /// Protocol variant to run.
    #[arg(long, default_value = "stop-and-wait")]
    protocol: Protocol,

    /// Number of data frames to deliver.
    #[arg(long, default_value_t = 10)]
    frames: u32,

    /// Sender window size (forced to 1 for stop-and-wait).
    #[arg(long, default_value_t = 4)]
    window: u32,

    /// Schedule the next transmission of this frame to be dropped
    /// (repeatable).
    #[arg(long = "lose", value_name = "SEQ")]
    lose: Vec<u32>,

    /// One-way channel transit time in ms.
    #[arg(long)]
    transit_ms: Option<u64>,

    /// Pause between successive sends of a windowed batch, in ms.
    #[arg(long)]
    stagger_ms: Option<u64>,

    /// Retransmission timeout in ms.
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Random per-frame loss probability, on top of scheduled losses.
    #[arg(long)]
    loss_rate: Option<f64>,

    /// Seed for the random loss model.
    #[arg(long)]
    seed: Option<u64>,

    /// Run a TOML scenario instead of an ad-hoc simulation.
    #[arg(long)]
    scenario: Option<PathBuf>,

    /// Write a JSON trace of the finished run.
    #[arg(long)]
    trace_out: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();
    info!("arq-lab-sim-cli starting…");

    let report = if let Some(path) = &args.scenario {
        let scenario = scenario_runner::load_scenario(path)?;
        scenario_runner::run_scenario(&scenario)?
    } else {
        run_ad_hoc(&args)?
    };

    print_summary(&report);

    if let Some(path) = &args.trace_out {
        write_trace(path, &report)?;
    }
    Ok(())
}

fn run_ad_hoc(args: &Args) -> Result<RunReport> {
    let mut config = RunConfig::new(args.protocol, args.frames, args.window);
    if let Some(v) = args.transit_ms {
        config.timing.transit_ms = v;
    }
    if let Some(v) = args.stagger_ms {
        config.timing.stagger_ms = v;
    }
    if let Some(v) = args.timeout_ms {
        config.timing.timeout_ms = v;
    }
    if let Some(v) = args.loss_rate {
        config.channel.loss_rate = v;
    }
    if let Some(v) = args.seed {
        config.channel.seed = v;
    }

    let mut driver = Driver::new();
    driver.start(config).context("invalid run configuration")?;
    for seq in &args.lose {
        driver
            .schedule_loss(*seq)
            .with_context(|| format!("cannot schedule loss for frame {seq}"))?;
    }
    Ok(driver.run_to_completion()?)
}

fn print_summary(report: &RunReport) {
    println!(
        "{} run {:?}: {} frames delivered in {} ms ({} frame transmissions, {} acks)",
        report.config.protocol,
        report.outcome,
        report.delivered.len(),
        report.duration_ms,
        report.frame_transmissions,
        report.ack_count,
    );
    println!("delivery order: {:?}", report.delivered);
}

fn write_trace(path: &Path, report: &RunReport) -> Result<()> {
    let data = serde_json::to_vec_pretty(report).context("failed to serialize run trace")?;
    fs::write(path, &data)
        .with_context(|| format!("failed to write trace file {}", path.display()))?;
    info!(path = %path.display(), "trace written");
    Ok(())
}
