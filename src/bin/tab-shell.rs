//! Runs the tab shell and waits for a renderer host to connect.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use tab_shell::Shell;

/// Multi-tab browsing shell.
#[derive(Debug, Parser)]
#[command(name = "tab-shell", version, about)]
struct Args {
    /// Configuration file (defaults to config.json in the working directory).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Port the renderer host connects to. 0 picks a free port.
    #[arg(long, default_value_t = 0)]
    port: u16,

    /// Home address: a URL or a file path.
    #[arg(long, default_value = "about:blank")]
    home: String,

    /// Abandon initial loads after this many milliseconds.
    #[arg(long)]
    load_timeout_ms: Option<u64>,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Shell stopped");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> tab_shell::Result<()> {
    let mut builder = Shell::builder().port(args.port).home_address(args.home);
    if let Some(config) = args.config {
        builder = builder.config_file(config);
    }
    if let Some(ms) = args.load_timeout_ms {
        builder = builder.load_timeout(Duration::from_millis(ms));
    }

    let shell = builder.bind().await?;
    info!(url = %shell.ws_url(), "Waiting for renderer host");
    shell.run().await
}
