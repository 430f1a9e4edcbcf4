use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::Level;

mod aggregate;
mod catalog;
mod config;
mod error;
mod evaluation;
mod models;
mod output;
mod parser;
mod report;
mod runner;
mod telemetry;

use crate::config::Config;
use crate::error::ConfigError;
use crate::evaluation::{Credential, RemoteEvaluator};
use crate::models::ResultSet;
use crate::output::OutputFormat;
use crate::runner::Runner;

/// Run AI evaluators over a dataset and summarize the scores per system prompt
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the JSON evaluation configuration
    #[arg(long = "config")]
    config_path: PathBuf,

    /// Where to write the summary report
    #[arg(long = "summary")]
    summary_path: Option<PathBuf>,

    /// Summary format: markdown or json
    #[arg(short, long, default_value = "markdown")]
    format: OutputFormat,

    /// Summarize a previously stored results file instead of running the evaluation
    #[arg(long = "results")]
    results_path: Option<PathBuf>,

    /// Base URL of the evaluation service
    #[arg(long, env = "AI_EVALUATE_ENDPOINT")]
    endpoint: Option<String>,

    /// Environment variable holding the bearer token for the evaluation service
    #[arg(long, default_value = "AI_EVALUATE_TOKEN")]
    credential_env: String,

    /// Verbose output - log each step at debug level
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    telemetry::init_tracing(args.json_logs, level);

    let config = Config::from_file(&args.config_path)?;
    let show_raw_output = config.show_raw_output;

    let results = match &args.results_path {
        Some(path) => ResultSet::from_file(path)?,
        None => {
            let endpoint = args.endpoint.clone().ok_or(ConfigError::NoEndpoint)?;
            let credential = Credential::from_env(&args.credential_env);
            let backend = RemoteEvaluator::new(endpoint, credential);
            Runner::new(config, backend).run_evaluation().await?
        }
    };

    if let Some(summary_path) = &args.summary_path {
        let summary_path = std::path::absolute(summary_path)?;
        runner::write_summary(&results, &summary_path, args.format, show_raw_output)?;
    }

    Ok(())
}
