use crate::error::{ParseError, SummaryError};
use crate::models::{FlatRow, ParsedRow};
use serde_json::Value;
use tracing::debug;

const INPUTS_PREFIX: &str = "inputs.";
const OUTPUTS_PREFIX: &str = "outputs.";

/// Split a flat result row into inputs and per-evaluator outputs
pub fn parse_row(row: &FlatRow) -> Result<ParsedRow, ParseError> {
    let mut parsed = ParsedRow::default();

    for (key, value) in row {
        if let Some(field) = key.strip_prefix(INPUTS_PREFIX) {
            parsed.inputs.insert(field.to_string(), input_text(value));
        } else if let Some(rest) = key.strip_prefix(OUTPUTS_PREFIX) {
            let (evaluator, value_name) =
                split_output_key(rest).ok_or_else(|| ParseError::MalformedOutputKey(key.clone()))?;
            parsed.insert_output(evaluator, value_name, value.clone());
        } else {
            debug!(key = %key, "Ignoring result column outside inputs/outputs");
        }
    }

    Ok(parsed)
}

/// Parse every row, tagging failures with the row index
pub fn parse_rows(rows: &[FlatRow]) -> Result<Vec<ParsedRow>, SummaryError> {
    rows.iter()
        .enumerate()
        .map(|(row, flat)| parse_row(flat).map_err(|source| SummaryError::Row { row, source }))
        .collect()
}

/// `<evaluator>.<value>`, both parts non-empty and no further dots
fn split_output_key(rest: &str) -> Option<(&str, &str)> {
    let (evaluator, value_name) = rest.split_once('.')?;
    if evaluator.is_empty() || value_name.is_empty() || value_name.contains('.') {
        return None;
    }
    Some((evaluator, value_name))
}

fn input_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
