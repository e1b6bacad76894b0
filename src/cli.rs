//! CLI argument parsing.
//!
//! Supports two subcommands: `run` for the full optimization loop and
//! `evaluate` for a single evaluation round.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// prompt-refine - iterative classification prompt optimization
#[derive(Parser, Debug)]
#[command(name = "prompt-refine")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable debug logging
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the full optimization loop
    Run(RunArgs),

    /// Run a single evaluation round without optimization
    Evaluate(EvaluateArgs),
}

#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Number of optimization iterations (overrides the config file)
    #[arg(long)]
    pub max_iterations: Option<usize>,

    /// Model used for the critique phase; reasoning-capable by default
    #[arg(long, default_value = "us.anthropic.claude-3-7-sonnet-20250219-v1:0")]
    pub critique_model: String,
}

#[derive(Args, Debug)]
pub struct EvaluateArgs {
    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(Args, Debug)]
pub struct CommonArgs {
    /// Model identifier passed to the inference gateway
    #[arg(long, default_value = "us.amazon.nova-pro-v1:0")]
    pub model: String,

    /// JSON file with the prompt template and test cases
    #[arg(long)]
    pub test_file: PathBuf,

    /// Directory for result artifacts
    #[arg(long, default_value = "results")]
    pub results_dir: PathBuf,

    /// Maximum in-flight inference calls (overrides the config file)
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Gateway backend: "http" or "mock"
    #[arg(long, default_value = "http")]
    pub gateway: String,

    /// Override the inference endpoint base URL
    #[arg(long)]
    pub endpoint: Option<String>,
}
