use crate::catalog::EvaluatorDeclaration;
use crate::config::{Config, EvaluatorConfig};
use crate::error::EvaluationError;
use crate::models::ResultSet;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Already-resolved bearer credential. Never logged.
#[derive(Clone)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Read the credential from `var`, treating unset or empty as absent
    pub fn from_env(var: &str) -> Option<Self> {
        std::env::var(var)
            .ok()
            .filter(|token| !token.is_empty())
            .map(Self::new)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// Everything the evaluation service needs for one run
#[derive(Debug, Clone)]
pub struct EvaluationRequest {
    pub data: PathBuf,
    pub evaluators: Vec<EvaluatorDeclaration>,
    pub evaluation_name: Option<String>,
    pub evaluator_config: Option<BTreeMap<String, EvaluatorConfig>>,
}

impl EvaluationRequest {
    pub fn new(config: &Config, evaluators: Vec<EvaluatorDeclaration>) -> Self {
        Self {
            data: config.data.clone(),
            evaluators,
            evaluation_name: config.evaluation_name.clone(),
            evaluator_config: config.evaluator_config.clone(),
        }
    }
}

/// Runs evaluators over a dataset and returns the flat results
pub trait EvaluationBackend {
    /// Credential forwarded to evaluators that need one
    fn credential(&self) -> Option<&Credential>;

    fn evaluate(
        &self,
        request: &EvaluationRequest,
    ) -> impl Future<Output = Result<ResultSet, EvaluationError>> + Send;
}

/// Read a JSONL dataset, skipping blank lines
pub fn load_dataset(path: &Path) -> Result<Vec<Value>, EvaluationError> {
    let content = std::fs::read_to_string(path).map_err(|source| EvaluationError::Dataset {
        path: path.to_path_buf(),
        source,
    })?;

    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            serde_json::from_str(line).map_err(|source| EvaluationError::DatasetLine {
                path: path.to_path_buf(),
                line: index + 1,
                source,
            })
        })
        .collect()
}

#[derive(Serialize)]
struct RemoteRequest<'a> {
    data: Vec<Value>,
    evaluators: &'a [EvaluatorDeclaration],
    #[serde(skip_serializing_if = "Option::is_none")]
    evaluation_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    evaluator_config: Option<&'a BTreeMap<String, EvaluatorConfig>>,
}

/// Evaluation service reached over HTTP
pub struct RemoteEvaluator {
    client: reqwest::Client,
    endpoint: String,
    credential: Option<Credential>,
}

impl RemoteEvaluator {
    pub fn new(endpoint: impl Into<String>, credential: Option<Credential>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            credential,
        }
    }

    fn evaluate_url(&self) -> String {
        format!("{}/evaluate", self.endpoint.trim_end_matches('/'))
    }
}

impl EvaluationBackend for RemoteEvaluator {
    fn credential(&self) -> Option<&Credential> {
        self.credential.as_ref()
    }

    async fn evaluate(&self, request: &EvaluationRequest) -> Result<ResultSet, EvaluationError> {
        let data = load_dataset(&request.data)?;
        debug!(rows = data.len(), url = %self.evaluate_url(), "Sending evaluation request");

        let body = RemoteRequest {
            data,
            evaluators: &request.evaluators,
            evaluation_name: request.evaluation_name.as_deref(),
            evaluator_config: request.evaluator_config.as_ref(),
        };

        let mut builder = self.client.post(self.evaluate_url()).json(&body);
        if let Some(credential) = &self.credential {
            builder = builder.bearer_auth(&credential.0);
        }

        let response = builder.send().await?;
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(EvaluationError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        Ok(serde_json::from_str(&text)?)
    }
}
