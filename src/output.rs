use crate::models::{ReportModel, ScoredRow, TestCase};
use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt::Write;

/// Output format options
#[derive(Debug, Clone, Copy, Default, ValueEnum, Serialize, Deserialize)]
pub enum OutputFormat {
    #[default]
    Markdown,
    Json,
}

/// What a report renderer is given: the report model plus the raw-output flag
#[derive(Serialize)]
struct RenderContext<'a> {
    #[serde(flatten)]
    report: &'a ReportModel,
    show_raw_output: bool,
}

/// Render the report in the specified format
pub fn render(report: &ReportModel, format: OutputFormat, show_raw_output: bool) -> Result<String> {
    match format {
        OutputFormat::Markdown => Ok(render_markdown(report, show_raw_output)),
        OutputFormat::Json => render_json(report, show_raw_output),
    }
}

fn render_json(report: &ReportModel, show_raw_output: bool) -> Result<String> {
    let context = RenderContext {
        report,
        show_raw_output,
    };
    serde_json::to_string_pretty(&context).context("Failed to serialize report to JSON")
}

fn render_markdown(report: &ReportModel, show_raw_output: bool) -> String {
    let mut out = String::new();
    out.push_str("# Evaluation Summary\n\n");

    if report.test_cases.is_empty() {
        out.push_str("No results.\n");
        return out;
    }

    write_averages(&mut out, report);
    write_variants(&mut out, report);

    out.push_str("## Test cases\n\n");
    for (index, case) in report.test_cases.iter().enumerate() {
        write_test_case(&mut out, report, index + 1, case, show_raw_output);
    }

    out
}

fn write_averages(out: &mut String, report: &ReportModel) {
    out.push_str("## Average scores\n\n");
    write_header(out, &report.evaluator_names);

    let mut names: Vec<&str> = report.variants.iter().map(|v| v.name.as_str()).collect();
    names.dedup();
    for name in names {
        let averages = report.average_eval_scores.get(name);
        let cells = report
            .evaluator_names
            .iter()
            .map(|evaluator| format_score(averages.and_then(|a| a.get(evaluator)).copied()));
        write_row(out, name, cells);
    }
    out.push('\n');
}

fn write_variants(out: &mut String, report: &ReportModel) {
    out.push_str("## Variants\n\n");
    for variant in &report.variants {
        let _ = writeln!(out, "<details>\n<summary>{}</summary>\n", variant.name);
        let _ = writeln!(out, "```\n{}\n```\n</details>\n", variant.value);
    }
}

fn write_test_case(
    out: &mut String,
    report: &ReportModel,
    number: usize,
    case: &TestCase,
    show_raw_output: bool,
) {
    let _ = writeln!(out, "### {}. {}\n", number, single_line(&case.query));
    let _ = writeln!(out, "**Ground truth:** {}\n", single_line(&case.ground_truth));

    write_header(out, &report.evaluator_names);
    for row in &case.rows {
        let cells = report
            .evaluator_names
            .iter()
            .map(|evaluator| format_score(row.eval_scores.get(evaluator).copied()));
        write_row(out, &row.variant.name, cells);
    }
    out.push('\n');

    if show_raw_output {
        for row in &case.rows {
            write_raw_output(out, row);
        }
    }
}

fn write_raw_output(out: &mut String, row: &ScoredRow) {
    let pretty = serde_json::to_string_pretty(&row.row.outputs).unwrap_or_default();

    let _ = writeln!(
        out,
        "<details>\n<summary>Raw output: {}</summary>\n\n```json\n{}\n```\n</details>\n",
        row.variant.name, pretty
    );
}

fn write_header(out: &mut String, evaluator_names: &[String]) {
    out.push_str("| Variant |");
    for name in evaluator_names {
        let _ = write!(out, " {} |", table_cell(name));
    }
    out.push_str("\n| --- |");
    for _ in evaluator_names {
        out.push_str(" ---: |");
    }
    out.push('\n');
}

fn write_row(out: &mut String, label: &str, cells: impl Iterator<Item = String>) {
    let _ = write!(out, "| {} |", table_cell(label));
    for cell in cells {
        let _ = write!(out, " {} |", cell);
    }
    out.push('\n');
}

fn format_score(score: Option<f64>) -> String {
    match score {
        Some(score) => format!("{:.2}", score),
        None => "n/a".to_string(),
    }
}

fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn table_cell(text: &str) -> String {
    single_line(text).replace('|', "\\|")
}
