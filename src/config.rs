use crate::catalog::EvaluatorKind;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Key in `evaluator_config` that applies to every evaluator
const DEFAULT_EVALUATOR_CONFIG: &str = "default";

/// `type` tag accepted on an Azure OpenAI model configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum AzureOpenAiType {
    #[serde(rename = "azure_openai")]
    AzureOpenAi,
}

/// `type` tag accepted on an OpenAI model configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum OpenAiType {
    #[serde(rename = "openai")]
    OpenAi,
}

/// Azure OpenAI deployment used by model-graded evaluators
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AzureOpenAiModelConfiguration {
    pub azure_endpoint: String,
    pub azure_deployment: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<AzureOpenAiType>,
}

/// OpenAI model used by model-graded evaluators
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct OpenAiModelConfiguration {
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<OpenAiType>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ModelConfiguration {
    AzureOpenAi(AzureOpenAiModelConfiguration),
    OpenAi(OpenAiModelConfiguration),
}

/// Project that safety evaluators run against and results are logged to
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AzureAiProject {
    pub subscription_id: String,
    pub resource_group_name: String,
    pub project_name: String,
}

/// Per-evaluator overrides passed through to the evaluation service
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EvaluatorConfig {
    /// Evaluator argument name to dataset column reference
    #[serde(default)]
    pub column_mapping: BTreeMap<String, String>,
}

/// Configuration for one evaluation run
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// JSONL dataset, relative to the config file unless absolute
    pub data: PathBuf,
    /// Model used by model-graded evaluators
    pub ai_model_configuration: ModelConfiguration,
    /// Logical evaluator name to catalog identifier
    pub evaluators: BTreeMap<String, EvaluatorKind>,
    #[serde(default)]
    pub evaluation_name: Option<String>,
    #[serde(default)]
    pub evaluator_config: Option<BTreeMap<String, EvaluatorConfig>>,
    #[serde(default)]
    pub azure_ai_project: Option<AzureAiProject>,
    /// Where to store the raw results, relative to the config file unless absolute
    #[serde(default)]
    pub output_path: Option<PathBuf>,
    /// Include each evaluator's full output in the summary
    #[serde(default = "default_show_raw_output")]
    pub show_raw_output: bool,
}

fn default_show_raw_output() -> bool {
    true
}

impl Config {
    /// Load configuration from a JSON file and resolve its relative paths
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let mut config: Config =
            serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;

        let absolute = std::path::absolute(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let base_dir = absolute.parent().unwrap_or(Path::new("/"));
        config.resolve_paths(base_dir);

        Ok(config)
    }

    /// Checks serde cannot express on its own
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(overrides) = &self.evaluator_config {
            for name in overrides.keys() {
                if name != DEFAULT_EVALUATOR_CONFIG && !self.evaluators.contains_key(name) {
                    return Err(ConfigError::UnknownEvaluatorConfig(name.clone()));
                }
            }
        }
        Ok(())
    }

    fn resolve_paths(&mut self, base_dir: &Path) {
        self.data = resolve(base_dir, &self.data);
        if let Some(output_path) = &self.output_path {
            self.output_path = Some(resolve(base_dir, output_path));
        }
    }
}

fn resolve(base_dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}
