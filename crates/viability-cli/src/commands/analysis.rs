use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;
use std::time::Instant;

use viability_core::metrics::analyze_investment;
use viability_core::projection::{build_dscr_schedule, project_cash_flows};
use viability_core::types::{with_metadata, InvestmentInput, ScenarioType};

use crate::input;

/// Arguments describing one investment record. Piped stdin JSON takes
/// precedence over `--input`, which takes precedence over individual flags.
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct AnalysisArgs {
    /// Path to a JSON or YAML input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Capital outlay at year 0, KRW
    #[arg(long)]
    pub initial_investment: Option<Decimal>,

    /// Year-1 revenue, KRW
    #[arg(long)]
    pub annual_revenue: Option<Decimal>,

    /// Annual revenue growth, percent
    #[arg(long, default_value = "0")]
    pub revenue_growth_rate: Decimal,

    /// Operating profit as a share of revenue, percent
    #[arg(long, default_value = "0")]
    pub operating_profit_rate: Decimal,

    /// Corporate tax rate, percent
    #[arg(long, default_value = "0")]
    pub tax_rate: Decimal,

    /// Discount rate, percent
    #[arg(long, default_value = "0")]
    pub discount_rate: Decimal,

    /// Policy (subsidized) loan amount, KRW
    #[arg(long, default_value = "0")]
    pub policy_loan_amount: Decimal,

    /// Policy loan interest rate, percent
    #[arg(long, default_value = "0")]
    pub policy_loan_rate: Decimal,

    /// Policy loan grace period, years
    #[arg(long, default_value = "0")]
    pub grace_period: u32,

    /// Policy loan repayment period, years
    #[arg(long, default_value = "0")]
    pub repayment_period: u32,

    /// Other debt amount, KRW
    #[arg(long, default_value = "0")]
    pub other_debt_amount: Decimal,

    /// Other debt interest rate, percent
    #[arg(long, default_value = "0")]
    pub other_debt_rate: Decimal,

    /// Other debt grace period, years
    #[arg(long, default_value = "0")]
    pub other_debt_grace_period: u32,

    /// Other debt repayment period, years
    #[arg(long, default_value = "0")]
    pub other_debt_repayment_period: u32,

    /// Projection horizon, years
    #[arg(long)]
    pub analysis_years: Option<u32>,

    /// Demand scenario: pessimistic, base, or optimistic
    #[arg(long, default_value = "base")]
    pub scenario: String,
}

/// Resolve the investment record from stdin, file, or flags.
pub fn build_input(args: &AnalysisArgs) -> Result<InvestmentInput, Box<dyn std::error::Error>> {
    if let Some(value) = input::read_stdin()? {
        return Ok(serde_json::from_value(value)?);
    }

    if let Some(ref path) = args.input {
        return input::read_input(path);
    }

    let initial_investment = args
        .initial_investment
        .ok_or("Missing --initial-investment (or provide --input / piped JSON)")?;
    let annual_revenue = args
        .annual_revenue
        .ok_or("Missing --annual-revenue (or provide --input / piped JSON)")?;
    let analysis_years = args
        .analysis_years
        .ok_or("Missing --analysis-years (or provide --input / piped JSON)")?;

    let scenario_type = match args.scenario.to_lowercase().as_str() {
        "pessimistic" => ScenarioType::Pessimistic,
        "base" => ScenarioType::Base,
        "optimistic" => ScenarioType::Optimistic,
        other => return Err(format!("Unknown scenario '{other}'").into()),
    };

    Ok(InvestmentInput {
        initial_investment,
        annual_revenue,
        revenue_growth_rate: args.revenue_growth_rate,
        operating_profit_rate: args.operating_profit_rate,
        tax_rate: args.tax_rate,
        discount_rate: args.discount_rate,
        policy_loan_amount: args.policy_loan_amount,
        policy_loan_rate: args.policy_loan_rate,
        grace_period: args.grace_period,
        repayment_period: args.repayment_period,
        other_debt_amount: args.other_debt_amount,
        other_debt_rate: args.other_debt_rate,
        other_debt_grace_period: args.other_debt_grace_period,
        other_debt_repayment_period: args.other_debt_repayment_period,
        analysis_years,
        scenario_type,
    })
}

pub fn run_analyze(args: AnalysisArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let input = build_input(&args)?;
    let output = analyze_investment(&input)?;
    Ok(serde_json::to_value(output)?)
}

pub fn run_cash_flows(args: AnalysisArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let input = build_input(&args)?;
    let start = Instant::now();
    let rows = project_cash_flows(&input);
    let envelope = with_metadata(
        "Year-by-year cash-flow projection",
        &input,
        vec![],
        start.elapsed().as_micros() as u64,
        rows,
    );
    Ok(serde_json::to_value(envelope)?)
}

pub fn run_dscr(args: AnalysisArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let input = build_input(&args)?;
    let start = Instant::now();
    let rows = build_dscr_schedule(&input);
    let envelope = with_metadata(
        "Debt-service coverage schedule (scenario-adjusted)",
        &input,
        vec![],
        start.elapsed().as_micros() as u64,
        rows,
    );
    Ok(serde_json::to_value(envelope)?)
}
