//! Error taxonomy for configuration, result parsing, aggregation and the
//! evaluation call.

use std::path::PathBuf;
use thiserror::Error;

/// Configuration failed to load or validate. Raised before any evaluation runs.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("evaluator_config entry '{0}' does not name a declared evaluator")]
    UnknownEvaluatorConfig(String),

    #[error("Evaluator '{evaluator}' ({kind}) requires {param}, which is not available")]
    MissingParameter {
        evaluator: String,
        kind: &'static str,
        param: &'static str,
    },

    #[error("No evaluation endpoint configured; pass --endpoint or --results")]
    NoEndpoint,
}

/// A result row does not have the expected shape.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Output key '{0}' is not of the form outputs.<evaluator>.<value>")]
    MalformedOutputKey(String),

    #[error("Missing required input '{0}'")]
    MissingInput(&'static str),

    #[error("Invalid description input: {0}")]
    InvalidDescription(String),
}

/// Failure while turning a result set into a report model.
#[derive(Error, Debug, PartialEq)]
pub enum SummaryError {
    #[error("Row {row}: {source}")]
    Row {
        row: usize,
        #[source]
        source: ParseError,
    },

    #[error("Row {row}: evaluator '{evaluator}' produced no numeric score")]
    MissingScore { row: usize, evaluator: String },
}

/// Failure raised by the evaluation collaborator. Never retried.
#[derive(Error, Debug)]
pub enum EvaluationError {
    #[error("Failed to read dataset {}: {source}", path.display())]
    Dataset {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON on line {line} of dataset {}: {source}", path.display())]
    DatasetLine {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("Evaluation request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Evaluation service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to decode evaluation results: {0}")]
    Decode(#[from] serde_json::Error),
}
