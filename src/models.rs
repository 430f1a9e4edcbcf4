use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// One raw result row: `inputs.<field>` and `outputs.<evaluator>.<value>` keys
/// in the order the evaluation service emitted them.
pub type FlatRow = Map<String, Value>;

/// Raw output of one evaluation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultSet {
    /// Flat per-line results
    pub rows: Vec<FlatRow>,
    /// Aggregate metrics computed by the evaluation service
    #[serde(default)]
    pub metrics: BTreeMap<String, f64>,
    /// Link to the hosted run, when the run was logged to a project
    #[serde(default)]
    pub studio_url: Option<String>,
}

impl ResultSet {
    /// Load a result set previously written by an evaluation run
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read results file: {}", path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse results file: {}", path.display()))
    }
}

/// A flat row split into its dataset inputs and per-evaluator outputs
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParsedRow {
    pub inputs: BTreeMap<String, String>,
    /// Evaluator name to an object of value name to value, both in emission order
    pub outputs: Map<String, Value>,
}

impl ParsedRow {
    /// Record `value_name` under `evaluator`, creating the evaluator entry on first use
    pub fn insert_output(&mut self, evaluator: &str, value_name: &str, value: Value) {
        let entry = self
            .outputs
            .entry(evaluator)
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(values) = entry {
            values.insert(value_name.to_string(), value);
        }
    }

    /// Values produced by `evaluator`
    pub fn output(&self, evaluator: &str) -> Option<&Map<String, Value>> {
        self.outputs.get(evaluator).and_then(Value::as_object)
    }

    /// Evaluator names in the order they first appeared in the row
    pub fn evaluator_names(&self) -> Vec<String> {
        self.outputs.keys().cloned().collect()
    }
}

/// A labelled condition under test: the system prompt name and its content
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Variant {
    pub name: String,
    pub value: String,
}

/// A parsed row tagged with its variant and the numeric score per evaluator
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredRow {
    #[serde(flatten)]
    pub row: ParsedRow,
    pub variant: Variant,
    pub eval_scores: BTreeMap<String, f64>,
}

/// All rows sharing one (query, ground truth) pair
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestCase {
    pub query: String,
    pub ground_truth: String,
    pub rows: Vec<ScoredRow>,
}

/// Everything the report renderer gets to see
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportModel {
    pub variants: BTreeSet<Variant>,
    pub test_cases: Vec<TestCase>,
    /// Variant name to evaluator name to mean score
    pub average_eval_scores: BTreeMap<String, BTreeMap<String, f64>>,
    /// Evaluator column order, taken from the first result row
    pub evaluator_names: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_result_set_from_file() {
        let content = json!({
            "rows": [{"inputs.query": "Q", "outputs.F1ScoreEvaluator.f1_score": 0.5}],
            "metrics": {"F1ScoreEvaluator.f1_score": 0.5},
            "studio_url": "https://ai.azure.com/run/1"
        });
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "{}", content).unwrap();

        let results = ResultSet::from_file(temp_file.path()).unwrap();
        assert_eq!(results.rows.len(), 1);
        assert_eq!(results.metrics["F1ScoreEvaluator.f1_score"], 0.5);
        assert_eq!(results.studio_url.as_deref(), Some("https://ai.azure.com/run/1"));
    }

    #[test]
    fn test_result_set_optional_fields() {
        let results: ResultSet = serde_json::from_str(r#"{"rows": []}"#).unwrap();
        assert!(results.metrics.is_empty());
        assert!(results.studio_url.is_none());
    }

    #[test]
    fn test_result_set_preserves_column_order() {
        let results: ResultSet = serde_json::from_str(
            r#"{"rows": [{"outputs.b.x": 1, "outputs.a.y": 2, "inputs.query": "Q"}]}"#,
        )
        .unwrap();
        let keys: Vec<&String> = results.rows[0].keys().collect();
        assert_eq!(keys, ["outputs.b.x", "outputs.a.y", "inputs.query"]);
    }

    #[test]
    fn test_insert_output_groups_by_evaluator() {
        let mut row = ParsedRow::default();
        row.insert_output("Coherence", "coherence", json!(4.0));
        row.insert_output("Fluency", "fluency", json!(3));
        row.insert_output("Coherence", "reason", json!("ok"));

        assert_eq!(row.evaluator_names(), ["Coherence", "Fluency"]);
        assert_eq!(row.output("Coherence").map(Map::len), Some(2));
        assert_eq!(row.output("Missing"), None);
    }

    #[test]
    fn test_outputs_serialize_as_mapping() {
        let mut row = ParsedRow::default();
        row.insert_output("Coherence", "coherence", json!(4.0));
        row.insert_output("Coherence", "reason", json!("ok"));

        let value = serde_json::to_value(&row).unwrap();
        assert_eq!(
            value["outputs"],
            json!({"Coherence": {"coherence": 4.0, "reason": "ok"}})
        );
    }

    #[test]
    fn test_result_set_missing_file() {
        let err = ResultSet::from_file(Path::new("/nonexistent/results.json")).unwrap_err();
        assert!(err.to_string().contains("Failed to read results file"));
    }
}
