use std::io::Write;
use std::path::PathBuf;
use std::process;

use anyhow::Result;
use clap::Parser;

use coldstart::aws::{self, LambdaPlatform, XrayBackend};
use coldstart::config;
use coldstart::display::StatusLine;
use coldstart::logging;
use coldstart::sampler::{ReportFormat, Sampler};
use coldstart::types::{FailurePolicy, SampleCount};

#[derive(Parser)]
#[command(name = "coldstart", version, about = "Measure AWS Lambda cold-start phases from X-Ray traces")]
struct Cli {
    /// Name or ARN of the function to benchmark
    function: String,

    /// Number of samples
    #[arg(short, long, default_value_t = 3, allow_negative_numbers = true)]
    times: i64,

    /// What to do when a sample fails [default: abort, or `on_error` from the config file]
    #[arg(long, value_enum)]
    on_error: Option<FailurePolicy>,

    /// Print a JSON report instead of the table
    #[arg(long)]
    json: bool,

    /// AWS region (defaults to the SDK provider chain)
    #[arg(long)]
    region: Option<String>,

    /// Config file [default: <config dir>/coldstart/config.toml]
    #[arg(long)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose)?;

    // Reject bad input before any client exists.
    let times = SampleCount::new(cli.times)?;
    let mut settings = config::load_settings(cli.config.as_deref())?;
    if let Some(policy) = cli.on_error {
        settings.on_error = policy;
    }
    if cli.region.is_some() {
        settings.region = cli.region.clone();
    }

    let sdk_config = aws::load_sdk_config(settings.region.clone()).await;
    let platform = LambdaPlatform::new(&sdk_config);
    let traces = XrayBackend::new(&sdk_config);

    let format = if cli.json {
        ReportFormat::Json
    } else {
        ReportFormat::Table
    };

    let mut status = StatusLine::new();
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let sampler = Sampler::new(&platform, &traces, &settings);
    let result = sampler
        .run(&cli.function, times, settings.on_error, format, &mut out, &mut status)
        .await;
    status.clear();
    out.flush()?;

    result?;
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{:#}", err);
        process::exit(1);
    }
}
