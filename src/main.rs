use std::process;

use clap::Parser;
use snapsolve::Cli;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    // Logs go to stderr so the markdown answer on stdout stays clean.
    // RUST_LOG overrides the default "warn" level.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();
}

#[tokio::main]
async fn main() {
    init_tracing();
    tracing::debug!(version = snapsolve::VERSION, "Starting snapsolve");

    let cli = Cli::parse();
    if let Err(e) = cli.execute().await {
        eprintln!("Error: {e}");
        for cause in e.chain().skip(1) {
            eprintln!("  Caused by: {cause}");
        }
        process::exit(1);
    }
}
