use clap::{Args as ClapArgs, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "toolwatch", about = "Behavioral security monitor for AI agent tool activity")]
pub struct Args {
    /// Path to config.toml (defaults to ./config.toml when present)
    #[arg(long)]
    pub config: Option<String>,

    /// Override the tool-call log path
    #[arg(long)]
    pub source: Option<String>,

    /// Override the listen address for the alert feed
    #[arg(long)]
    pub listen: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// One-shot session risk assessment of a tool-call log
    Scan(ScanArgs),
}

#[derive(Debug, ClapArgs)]
pub struct ScanArgs {
    /// JSONL file of tool calls to assess
    #[arg(long)]
    pub file: String,

    /// Output format: text or json
    #[arg(long, default_value = "text")]
    pub format: String,
}
