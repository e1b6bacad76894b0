//! prompt-refine - iterative classification prompt optimization
//!
//! Evaluates a classification prompt template against a labelled test
//! corpus, asks a reasoning model to critique the failures, rewrites the
//! template, and repeats.

mod cli;
mod config;
mod corpus;
mod critique;
mod evaluation;
mod extract;
mod gateway;
mod optimizer;
mod output;
mod results;
mod rewrite;
mod scoring;
mod template;

use std::sync::Arc;

use anyhow::{bail, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands, CommonArgs};
use config::RunConfig;
use gateway::converse::ConverseGateway;
use gateway::mock::MockGateway;
use gateway::InferenceGateway;
use optimizer::Optimizer;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Run(args) => {
            let mut config = load_config(&args.common);
            if let Some(max_iterations) = args.max_iterations {
                config.max_iterations = max_iterations;
            }

            let data = corpus::load(&args.common.test_file)?;
            println!("Loaded {} test cases", data.test_cases.len());
            output::print_run_config(
                &args.common.model,
                &args.critique_model,
                &args.common.test_file,
                &args.common.results_dir,
                &config,
            );

            let gateway = build_gateway(&args.common, &args.common.model)?;
            let critique_gateway = build_gateway(&args.common, &args.critique_model)?;
            let mut optimizer =
                Optimizer::new(config, gateway, critique_gateway, &args.common.results_dir);
            optimizer.run(&data).await?;
        }
        Commands::Evaluate(args) => {
            let config = load_config(&args.common);

            let data = corpus::load(&args.common.test_file)?;
            println!("Loaded {} test cases", data.test_cases.len());

            let gateway = build_gateway(&args.common, &args.common.model)?;
            optimizer::run_single_evaluation(&config, gateway, &data, &args.common.results_dir)
                .await?;
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose {
        "prompt_refine=debug"
    } else {
        "prompt_refine=info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(common: &CommonArgs) -> RunConfig {
    let mut config = RunConfig::load_or_default();
    if let Some(concurrency) = common.concurrency {
        config.concurrency = concurrency;
    }
    config
}

fn build_gateway(common: &CommonArgs, model: &str) -> Result<Arc<dyn InferenceGateway>> {
    match common.gateway.as_str() {
        "http" => {
            let gateway = ConverseGateway::from_env(model, common.endpoint.as_deref())?;
            Ok(Arc::new(gateway))
        }
        "mock" => Ok(Arc::new(MockGateway::canned())),
        other => bail!("Unknown gateway: {} (expected \"http\" or \"mock\")", other),
    }
}
