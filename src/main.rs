use clap::Parser;
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use env_logger::Env;
use log::info;
use std::fs;
use std::path::PathBuf;

use pcdsim::config_loader::{self, CliOverrides};
use pcdsim::{orchestrator, report};

/// Simulator for proactive content distribution in Named Data Networking
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the scenario YAML file
    #[arg(short, long)]
    config: PathBuf,

    /// Output directory for reports
    #[arg(short, long, default_value = "pcdsim_output")]
    output: PathBuf,

    /// Seed for the nonce generator (overrides the scenario)
    #[arg(long)]
    seed: Option<u64>,

    /// Simulated run length, e.g. "60s" or "2m" (overrides the scenario)
    #[arg(long)]
    stop_time: Option<String>,

    /// Log filter; RUST_LOG takes precedence
    #[arg(long)]
    log_level: Option<String>,

    /// Write only the text report
    #[arg(long)]
    text_only: bool,
}

impl Args {
    fn log_filter(&self) -> &str {
        self.log_level.as_deref().unwrap_or("info")
    }
}

fn main() -> Result<()> {
    // Initialize error handling
    color_eyre::install()?;

    // Parse command-line arguments
    let args = Args::parse();

    // Initialize logging before the scenario is read so load-time warnings are shown
    env_logger::Builder::from_env(Env::default().default_filter_or(args.log_filter())).init();

    info!("Starting pcdsim");
    info!("Scenario file: {:?}", args.config);
    info!("Output directory: {:?}", args.output);

    let mut config = config_loader::load_config(&args.config)?;

    let overrides = CliOverrides {
        seed: args.seed,
        stop_time: args.stop_time.clone(),
    };
    config_loader::apply_overrides(&mut config, &overrides)?;

    let result = orchestrator::run_scenario(&config)?;

    fs::create_dir_all(&args.output)
        .wrap_err_with(|| format!("Failed to create output directory '{}'", args.output.display()))?;

    if !args.text_only {
        report::generate_json_report(&result, &args.output.join("report.json"))?;
    }
    report::generate_text_report(&result, &args.output.join("report.txt"))?;

    info!(
        "Simulation completed: {} distribution(s), shared flag {}",
        result.distribution_count(),
        match result.shared_flag.set_at {
            Some(at) => format!("raised at {}s", at),
            None => "never raised".to_string(),
        }
    );
    Ok(())
}
