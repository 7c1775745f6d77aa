use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod config;
mod counter;
mod detect;
mod pipeline;
mod report;
mod track;
mod video;

use config::Config;
use pipeline::RunOptions;

#[derive(Parser, Debug)]
#[command(name = "countline", about = "Count vehicles crossing a line in a video")]
struct Cli {
    /// Input video file
    input: PathBuf,

    /// Config file (default: config.toml when present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output video path (default: sibling of the input)
    #[arg(long)]
    output: Option<PathBuf>,

    /// Disable the preview window
    #[arg(long)]
    headless: bool,

    /// Write counting events as JSON lines to this file
    #[arg(long)]
    log_json: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("countline=debug".parse()?))
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_flag = Arc::clone(&shutdown);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("shutdown signal received");
            shutdown_flag.store(true, Ordering::Relaxed);
        }
    });

    let options = RunOptions {
        input: cli.input,
        output: cli.output,
        headless: cli.headless,
        log_json: cli.log_json,
        config,
    };

    let summary =
        tokio::task::spawn_blocking(move || pipeline::run(options, shutdown.as_ref())).await??;

    tracing::info!(
        total = summary.total_count,
        frames = summary.frames,
        output = %summary.output_path.display(),
        "processing complete"
    );

    Ok(())
}
