use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tether::build_from_config;
use wayfinder_agent::Task;
use wayfinder_common::observability::{LogConfig, LogFormat, init_logging};
use wayfinder_config::{WayfinderConfig, WayfinderConfigLoader};
mod tether;

const DEFAULT_CONFIG: &str = "wayfinder.yaml";

/// Complete a natural-language task in a live browser.
#[derive(Debug, Parser)]
#[command(name = "wayfinder", version)]
struct Cli {
    /// YAML config file; `wayfinder.yaml` is read when present.
    #[arg(long, env = "WAYFINDER_CONFIG")]
    config: Option<PathBuf>,

    /// Page to start from; defaults to the configured home page.
    #[arg(long)]
    url: Option<String>,

    /// Override the successful-action cap.
    #[arg(long)]
    max_iterations: Option<u32>,

    #[arg(long)]
    headless: bool,

    /// Write JSON log lines instead of text.
    #[arg(long)]
    json_logs: bool,

    /// What the agent should do.
    task: String,
}

fn load_config(cli: &Cli) -> Result<WayfinderConfig> {
    let loader = match &cli.config {
        Some(path) => WayfinderConfigLoader::new().with_file(path),
        None => WayfinderConfigLoader::new().with_optional_file(DEFAULT_CONFIG),
    };
    let mut cfg = loader.load()?;

    if let Some(n) = cli.max_iterations {
        cfg.agent.max_iterations = n;
    }
    if cli.headless {
        cfg.browser.headless = true;
    }
    if cli.json_logs {
        cfg.logging.format = LogFormat::Json;
    }
    Ok(cfg)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1) Load config (CLI flags win over env, env over file)
    let cfg = load_config(&cli)?;

    let log_path = init_logging(LogConfig {
        log_dir: cfg.logging.dir.clone(),
        emit_stderr: cfg.logging.stderr,
        format: cfg.logging.format,
        ..LogConfig::default()
    })?;
    tracing::debug!(target: "wayfinder.app", log = %log_path.display(), "logging initialised");

    let tether = build_from_config(&cfg).await?;
    let start_url = cli.url.unwrap_or_else(|| cfg.agent.home_url.clone());
    let report = tether
        .orchestrator
        .run(&tether.connector, Task::new(cli.task, start_url))
        .await?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
