use crate::catalog::{self, AmbientParams, RougeType};
use crate::config::Config;
use crate::evaluation::{EvaluationBackend, EvaluationRequest};
use crate::models::ResultSet;
use crate::output::{self, OutputFormat};
use crate::report;
use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

/// Main runner that orchestrates one evaluation run
pub struct Runner<B> {
    config: Config,
    backend: B,
}

impl<B: EvaluationBackend> Runner<B> {
    /// Create a new runner with the given configuration and backend
    pub fn new(config: Config, backend: B) -> Self {
        Self { config, backend }
    }

    /// Instantiate the configured evaluators, run them and store the raw results
    pub async fn run_evaluation(&self) -> Result<ResultSet> {
        let ambient = AmbientParams {
            credential: self.backend.credential().is_some(),
            model_config: Some(&self.config.ai_model_configuration),
            azure_ai_project: self.config.azure_ai_project.as_ref(),
            // Single fixed subtype until evaluators take their own options
            rouge_type: RougeType::RougeL,
        };
        let evaluators = catalog::hydrate_evaluators(&self.config.evaluators, &ambient)?;

        info!(
            evaluators = evaluators.len(),
            data = %self.config.data.display(),
            "Running evaluation"
        );

        let request = EvaluationRequest::new(&self.config, evaluators);
        let results = self
            .backend
            .evaluate(&request)
            .await
            .context("Evaluation failed")?;

        info!(rows = results.rows.len(), "Evaluation finished");
        if let Some(studio_url) = &results.studio_url {
            info!(%studio_url, "Evaluation results logged");
        }

        self.store_results_if_configured(&results)?;

        Ok(results)
    }

    /// Store raw results if an output path is configured
    fn store_results_if_configured(&self, results: &ResultSet) -> Result<()> {
        if let Some(output_path) = &self.config.output_path {
            let json_content = serde_json::to_string_pretty(results)
                .context("Failed to serialize results to JSON")?;
            write_file(output_path, &json_content)?;
            info!(path = %output_path.display(), "Results stored");
        }
        Ok(())
    }
}

/// Summarize a result set and write the rendered report to `summary_path`
pub fn write_summary(
    results: &ResultSet,
    summary_path: &Path,
    format: OutputFormat,
    show_raw_output: bool,
) -> Result<()> {
    let report = report::summarize(results).context("Failed to summarize evaluation results")?;
    let rendered = output::render(&report, format, show_raw_output)?;
    write_file(summary_path, &rendered)?;
    info!(path = %summary_path.display(), "Summary written");
    Ok(())
}

/// Write a file, creating its parent directory first
fn write_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    std::fs::write(path, content).with_context(|| format!("Failed to write: {}", path.display()))
}
