use crate::aggregate::{Aggregation, aggregate};
use crate::error::SummaryError;
use crate::models::{ReportModel, ResultSet};
use crate::parser::parse_rows;
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// Parse, aggregate and assemble the report model for a result set
pub fn summarize(results: &ResultSet) -> Result<ReportModel, SummaryError> {
    let rows = parse_rows(&results.rows)?;
    // Column order comes from the first row only; see `build_report`.
    let evaluator_names = rows
        .first()
        .map(|row| row.evaluator_names())
        .unwrap_or_default();
    let aggregation = aggregate(rows)?;

    debug!(
        test_cases = aggregation.test_cases.len(),
        variants = aggregation.variants.len(),
        "Aggregated evaluation results"
    );

    Ok(build_report(aggregation, evaluator_names))
}

/// Assemble the report model.
///
/// `evaluator_names` fixes the display order of evaluator columns and is
/// expected to come from the first result row. An evaluator that only shows
/// up in later rows is still averaged but gets no column; this is logged
/// rather than silently widened to the union of all rows.
pub fn build_report(aggregation: Aggregation, evaluator_names: Vec<String>) -> ReportModel {
    let unlisted: BTreeSet<&str> = aggregation
        .test_cases
        .iter()
        .flat_map(|case| case.rows.iter())
        .flat_map(|row| row.eval_scores.keys())
        .map(String::as_str)
        .filter(|name| !evaluator_names.iter().any(|listed| listed.as_str() == *name))
        .collect();

    if !unlisted.is_empty() {
        warn!(
            evaluators = ?unlisted,
            "Evaluators missing from the first result row are omitted from the report columns"
        );
    }

    ReportModel {
        variants: aggregation.variants,
        test_cases: aggregation.test_cases,
        average_eval_scores: aggregation.averages,
        evaluator_names,
    }
}
