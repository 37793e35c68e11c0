mod app;
mod cli;
mod config;
mod notify;
mod server;

use clap::Parser;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = cli::Args::parse();

    if let Some(cli::Commands::Scan(scan_args)) = &args.command {
        return app::scan(scan_args).await;
    }

    app::run(args).await
}
