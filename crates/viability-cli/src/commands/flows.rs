use clap::Args;
use rust_decimal::Decimal;
use serde_json::{json, Value};

use viability_core::metrics::{calculate_irr, calculate_npv};

use crate::input;

/// Arguments for NPV over a raw flow series: year 0 first (normally the
/// outlay, negative), then one entry per projection year.
#[derive(Args)]
pub struct NpvArgs {
    /// Path to a JSON or YAML file with {"flows": [...], "rate": ...}
    #[arg(long)]
    pub input: Option<String>,

    /// Flow series, year 0 first (comma-separated, e.g. "-1000,300,400,500")
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub flows: Option<Vec<Decimal>>,

    /// Discount rate, percent
    #[arg(long)]
    pub rate: Option<Decimal>,
}

/// Arguments for IRR over a raw flow series
#[derive(Args)]
pub struct IrrArgs {
    /// Path to a JSON or YAML file with {"flows": [...]}
    #[arg(long)]
    pub input: Option<String>,

    /// Flow series, year 0 first (comma-separated)
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub flows: Option<Vec<Decimal>>,

    /// Newton fallback seed, percent
    #[arg(long, default_value = "10")]
    pub guess: Decimal,
}

#[derive(serde::Deserialize)]
struct FlowSeriesInput {
    flows: Vec<Decimal>,
    rate: Option<Decimal>,
    guess: Option<Decimal>,
}

fn resolve_series(
    input_path: &Option<String>,
    flows_flag: Option<Vec<Decimal>>,
) -> Result<FlowSeriesInput, Box<dyn std::error::Error>> {
    if let Some(value) = input::read_stdin()? {
        return Ok(serde_json::from_value(value)?);
    }

    if let Some(path) = input_path {
        return input::read_input(path);
    }

    let flows = flows_flag.ok_or("Missing --flows (or provide --input / piped JSON)")?;
    Ok(FlowSeriesInput {
        flows,
        rate: None,
        guess: None,
    })
}

pub fn run_npv(args: NpvArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let series = resolve_series(&args.input, args.flows)?;
    if series.flows.is_empty() {
        return Err("Flow series is empty".into());
    }
    let rate = args
        .rate
        .or(series.rate)
        .ok_or("Missing --rate (or a \"rate\" field in the input)")?;

    let npv = calculate_npv(&series.flows, rate);
    Ok(json!({
        "npv": npv,
        "discountRate": rate,
        "periods": series.flows.len() - 1,
    }))
}

pub fn run_irr(args: IrrArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let series = resolve_series(&args.input, args.flows)?;
    if series.flows.is_empty() {
        return Err("Flow series is empty".into());
    }
    let guess = series.guess.unwrap_or(args.guess);

    let irr = calculate_irr(&series.flows, guess);
    // Residual NPV at the reported rate, for inspection
    let residual = calculate_npv(&series.flows, irr);
    Ok(json!({
        "irr": irr,
        "guess": guess,
        "residualNpv": residual,
    }))
}
