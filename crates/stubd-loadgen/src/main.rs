use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use stubd_loadgen::{LoadConfig, LoadGenerator};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "stubd-loadgen")]
#[command(author, version, about = "Generate HTTP load against a stubd endpoint")]
struct Args {
    /// Load configuration file
    #[arg(long, default_value = "conf.json")]
    conf: PathBuf,

    /// Where to write the JSON report
    #[arg(long, default_value = "report.json")]
    report: PathBuf,

    /// Log level (RUST_LOG overrides)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(args.log_level.to_ascii_lowercase()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = LoadConfig::from_file(&args.conf)
        .with_context(|| format!("failed to load {}", args.conf.display()))?;
    let generator = LoadGenerator::new(&config).context("failed to create HTTP client")?;

    info!("Starting load test...");
    let report = generator.run().await;

    info!("Generating report...");
    println!("{}", report.to_json());
    report
        .write_to(&args.report)
        .with_context(|| format!("failed to write {}", args.report.display()))?;
    Ok(())
}
