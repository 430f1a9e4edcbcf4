use crate::error::{ParseError, SummaryError};
use crate::models::{ParsedRow, ScoredRow, TestCase, Variant};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Rows grouped by test case and variant, with per-variant mean scores
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Aggregation {
    pub variants: BTreeSet<Variant>,
    pub test_cases: Vec<TestCase>,
    pub averages: BTreeMap<String, BTreeMap<String, f64>>,
}

/// The JSON object carried by the `description` input
#[derive(Deserialize)]
struct Description {
    context: DescriptionContext,
}

#[derive(Deserialize)]
struct DescriptionContext {
    #[serde(rename = "system-prompt")]
    system_prompt: String,
}

/// Group rows by (query, ground truth) and average each evaluator's score per
/// variant name.
pub fn aggregate(rows: Vec<ParsedRow>) -> Result<Aggregation, SummaryError> {
    let mut variants = BTreeSet::new();
    let mut test_cases: Vec<TestCase> = Vec::new();
    let mut case_index: HashMap<(String, String), usize> = HashMap::new();
    let mut accumulated: BTreeMap<String, BTreeMap<String, Vec<f64>>> = BTreeMap::new();

    for (index, row) in rows.into_iter().enumerate() {
        let at_row = |source| SummaryError::Row { row: index, source };

        let variant = resolve_variant(&row).map_err(at_row)?;
        let eval_scores = score_row(&row, index)?;
        let query = required_input(&row, "query").map_err(at_row)?.to_string();
        let ground_truth = required_input(&row, "ground_truth").map_err(at_row)?.to_string();

        for (evaluator, score) in &eval_scores {
            accumulated
                .entry(variant.name.clone())
                .or_default()
                .entry(evaluator.clone())
                .or_default()
                .push(*score);
        }
        variants.insert(variant.clone());

        let slot = *case_index
            .entry((query.clone(), ground_truth.clone()))
            .or_insert_with(|| {
                test_cases.push(TestCase {
                    query,
                    ground_truth,
                    rows: Vec::new(),
                });
                test_cases.len() - 1
            });
        test_cases[slot].rows.push(ScoredRow {
            row,
            variant,
            eval_scores,
        });
    }

    let averages = accumulated
        .into_iter()
        .map(|(variant, per_evaluator)| {
            let means = per_evaluator
                .into_iter()
                .map(|(evaluator, scores)| (evaluator, mean(&scores)))
                .collect();
            (variant, means)
        })
        .collect();

    Ok(Aggregation {
        variants,
        test_cases,
        averages,
    })
}

fn required_input<'a>(row: &'a ParsedRow, field: &'static str) -> Result<&'a str, ParseError> {
    row.inputs
        .get(field)
        .map(String::as_str)
        .ok_or(ParseError::MissingInput(field))
}

fn resolve_variant(row: &ParsedRow) -> Result<Variant, ParseError> {
    let description = required_input(row, "description")?;
    let decoded: Description = serde_json::from_str(description)
        .map_err(|e| ParseError::InvalidDescription(e.to_string()))?;
    let value = required_input(row, "context")?;

    Ok(Variant {
        name: decoded.context.system_prompt,
        value: value.to_string(),
    })
}

fn score_row(row: &ParsedRow, index: usize) -> Result<BTreeMap<String, f64>, SummaryError> {
    row.outputs
        .iter()
        .map(|(evaluator, values)| {
            values
                .as_object()
                .and_then(first_numeric)
                .map(|score| (evaluator.clone(), score))
                .ok_or_else(|| SummaryError::MissingScore {
                    row: index,
                    evaluator: evaluator.clone(),
                })
        })
        .collect()
}

/// The first integer or float among an evaluator's values
fn first_numeric(values: &Map<String, Value>) -> Option<f64> {
    values.values().find_map(Value::as_f64)
}

fn mean(scores: &[f64]) -> f64 {
    scores.iter().sum::<f64>() / scores.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_row;
    use serde_json::json;

    fn row(query: &str, ground_truth: &str, variant: &str, outputs: Value) -> ParsedRow {
        let mut flat = Map::new();
        flat.insert("inputs.query".into(), json!(query));
        flat.insert("inputs.ground_truth".into(), json!(ground_truth));
        flat.insert(
            "inputs.description".into(),
            json!(json!({"context": {"system-prompt": variant}}).to_string()),
        );
        flat.insert("inputs.context".into(), json!(format!("You are {variant}")));
        if let Value::Object(outputs) = outputs {
            for (key, value) in outputs {
                flat.insert(format!("outputs.{key}"), value);
            }
        }
        parse_row(&flat).unwrap()
    }

    #[test]
    fn test_score_ignores_non_numeric_values() {
        let rows = vec![row(
            "Q",
            "A",
            "baseline",
            json!({"CoherenceEvaluator.reason": "ok", "CoherenceEvaluator.coherence": 4.0}),
        )];

        let aggregation = aggregate(rows).unwrap();
        let scored = &aggregation.test_cases[0].rows[0];
        assert_eq!(scored.eval_scores["CoherenceEvaluator"], 4.0);
        assert_eq!(scored.eval_scores.len(), 1);
    }

    #[test]
    fn test_first_numeric_value_wins() {
        let rows = vec![row(
            "Q",
            "A",
            "baseline",
            json!({"Eval.score": 2, "Eval.threshold": 3}),
        )];

        let aggregation = aggregate(rows).unwrap();
        assert_eq!(aggregation.test_cases[0].rows[0].eval_scores["Eval"], 2.0);
    }

    #[test]
    fn test_rows_group_by_test_case_in_input_order() {
        let rows = vec![
            row("Q", "A", "baseline", json!({"Eval.score": 1})),
            row("Other", "A", "baseline", json!({"Eval.score": 1})),
            row("Q", "A", "experiment", json!({"Eval.score": 5})),
        ];

        let aggregation = aggregate(rows).unwrap();
        assert_eq!(aggregation.test_cases.len(), 2);

        let first = &aggregation.test_cases[0];
        assert_eq!((first.query.as_str(), first.ground_truth.as_str()), ("Q", "A"));
        assert_eq!(first.rows.len(), 2);
        assert_eq!(first.rows[0].variant.name, "baseline");
        assert_eq!(first.rows[1].variant.name, "experiment");
        assert_eq!(aggregation.test_cases[1].query, "Other");
    }

    #[test]
    fn test_ground_truth_distinguishes_test_cases() {
        let rows = vec![
            row("Q", "A", "baseline", json!({"Eval.score": 1})),
            row("Q", "B", "baseline", json!({"Eval.score": 1})),
        ];

        let aggregation = aggregate(rows).unwrap();
        assert_eq!(aggregation.test_cases.len(), 2);
    }

    #[test]
    fn test_variants_are_deduplicated() {
        let rows = vec![
            row("Q1", "A", "baseline", json!({})),
            row("Q2", "A", "baseline", json!({})),
            row("Q1", "A", "experiment", json!({})),
        ];

        let aggregation = aggregate(rows).unwrap();
        let names: Vec<&str> = aggregation.variants.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, ["baseline", "experiment"]);
        assert!(aggregation.averages.is_empty());
    }

    #[test]
    fn test_average_per_variant_across_test_cases() {
        let rows = vec![
            row("Q1", "A", "baseline", json!({"CoherenceEvaluator.coherence": 2.0})),
            row("Q2", "A", "baseline", json!({"CoherenceEvaluator.coherence": 3.0})),
            row("Q3", "A", "baseline", json!({"CoherenceEvaluator.coherence": 4.0})),
            row("Q1", "A", "experiment", json!({"CoherenceEvaluator.coherence": 5})),
        ];

        let aggregation = aggregate(rows).unwrap();
        assert_eq!(aggregation.averages["baseline"]["CoherenceEvaluator"], 3.0);
        assert_eq!(aggregation.averages["experiment"]["CoherenceEvaluator"], 5.0);
    }

    #[test]
    fn test_average_independent_of_row_order() {
        let build = || {
            vec![
                row("Q1", "A", "baseline", json!({"Eval.score": 1.5})),
                row("Q2", "A", "baseline", json!({"Eval.score": 4})),
                row("Q3", "A", "baseline", json!({"Eval.score": 2.5})),
            ]
        };
        let forward = aggregate(build()).unwrap();
        let mut reversed_rows = build();
        reversed_rows.reverse();
        let reversed = aggregate(reversed_rows).unwrap();

        assert_eq!(forward.averages, reversed.averages);
        assert_eq!(forward.variants, reversed.variants);
    }

    #[test]
    fn test_absent_evaluator_is_not_zero() {
        let rows = vec![
            row("Q1", "A", "baseline", json!({"Fluency.score": 4})),
            row("Q1", "A", "experiment", json!({"Coherence.score": 2})),
        ];

        let aggregation = aggregate(rows).unwrap();
        assert!(!aggregation.averages["baseline"].contains_key("Coherence"));
        assert!(!aggregation.averages["experiment"].contains_key("Fluency"));
    }

    #[test]
    fn test_missing_score() {
        let rows = vec![row(
            "Q",
            "A",
            "baseline",
            json!({"X.reason": "no number here", "X.label": "pass"}),
        )];

        assert_eq!(
            aggregate(rows),
            Err(SummaryError::MissingScore {
                row: 0,
                evaluator: "X".into()
            })
        );
    }

    #[test]
    fn test_boolean_is_not_a_score() {
        let rows = vec![row("Q", "A", "baseline", json!({"X.passed": true}))];
        assert!(matches!(aggregate(rows), Err(SummaryError::MissingScore { .. })));
    }

    #[test]
    fn test_invalid_description_json() {
        let mut bad = row("Q", "A", "baseline", json!({"Eval.score": 1}));
        bad.inputs.insert("description".into(), "not json".into());

        let err = aggregate(vec![bad]).unwrap_err();
        assert!(matches!(
            err,
            SummaryError::Row {
                row: 0,
                source: ParseError::InvalidDescription(_)
            }
        ));
    }

    #[test]
    fn test_description_without_variant_name() {
        let mut bad = row("Q", "A", "baseline", json!({}));
        bad.inputs
            .insert("description".into(), r#"{"context": {}}"#.into());

        assert!(matches!(
            aggregate(vec![bad]),
            Err(SummaryError::Row {
                source: ParseError::InvalidDescription(_),
                ..
            })
        ));
    }

    #[test]
    fn test_missing_required_inputs() {
        for field in ["description", "context", "query", "ground_truth"] {
            let mut bad = row("Q", "A", "baseline", json!({}));
            bad.inputs.remove(field);
            let err = aggregate(vec![bad]).unwrap_err();
            assert_eq!(
                err,
                SummaryError::Row {
                    row: 0,
                    source: ParseError::MissingInput(field)
                }
            );
        }
    }

    #[test]
    fn test_variant_value_is_context_input() {
        let rows = vec![row("Q", "A", "baseline", json!({}))];
        let aggregation = aggregate(rows).unwrap();
        let variant = aggregation.variants.iter().next().unwrap();
        assert_eq!(variant.value, "You are baseline");
    }
}
