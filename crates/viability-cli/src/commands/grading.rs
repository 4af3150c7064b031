use clap::Args;
use serde_json::Value;
use std::time::Instant;

use viability_core::grading::grade_investment;
use viability_core::metrics::analyze_investment;
use viability_core::report::evaluate_investment;
use viability_core::types::with_metadata;

use super::analysis::{build_input, AnalysisArgs};

#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct GradeArgs {
    #[command(flatten)]
    pub analysis: AnalysisArgs,
}

#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct ReportArgs {
    #[command(flatten)]
    pub analysis: AnalysisArgs,
}

pub fn run_grade(args: GradeArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let input = build_input(&args.analysis)?;
    let start = Instant::now();
    let analysis = analyze_investment(&input)?;
    let grade = grade_investment(&analysis.result, input.initial_investment);
    let envelope = with_metadata(
        "Scale-aware banded scoring with risk-premium haircut",
        &input,
        analysis.warnings,
        start.elapsed().as_micros() as u64,
        grade,
    );
    Ok(serde_json::to_value(envelope)?)
}

pub fn run_report(args: ReportArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let input = build_input(&args.analysis)?;
    let start = Instant::now();
    let analysis = analyze_investment(&input)?;
    let evaluation = evaluate_investment(&input, &analysis.result);
    let envelope = with_metadata(
        "Narrative evaluation over eight metric assessments",
        &input,
        analysis.warnings,
        start.elapsed().as_micros() as u64,
        evaluation,
    );
    Ok(serde_json::to_value(envelope)?)
}
