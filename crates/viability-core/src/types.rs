use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// All monetary values, in KRW. Wraps Decimal to prevent accidental f64 usage.
pub type Money = Decimal;

/// Rates expressed in percent (10 = 10%), matching the intake contract of the
/// diagnosis form layer. Converted to fractions at each computation boundary.
pub type Rate = Decimal;

/// Discrete metric scores and composites on a 0-100 scale
pub type Score = Decimal;

/// Year fractions or counts
pub type Years = Decimal;

/// One hundred million KRW (억), the unit the scale tiers are defined in
pub const HUNDRED_MILLION: Decimal = dec!(100000000);

/// Demand scenario applied to the DSCR schedule
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScenarioType {
    Pessimistic,
    #[default]
    Base,
    Optimistic,
}

impl ScenarioType {
    /// Fixed multiplier applied to every year's DSCR
    pub fn dscr_adjustment(&self) -> Decimal {
        match self {
            ScenarioType::Pessimistic => dec!(0.8),
            ScenarioType::Base => dec!(1.0),
            ScenarioType::Optimistic => dec!(1.2),
        }
    }
}

/// Immutable assumption set for one analysis request. All rate fields are in
/// percent; loan periods are whole years. The engine does not reject records
/// where `grace_period + repayment_period` exceeds `analysis_years`; the
/// schedule simply yields zero payments beyond term, and the analysis envelope
/// carries a warning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvestmentInput {
    /// Capital outlay at year 0 (positive)
    pub initial_investment: Money,
    /// Year-1 revenue; grows geometrically thereafter
    pub annual_revenue: Money,
    pub revenue_growth_rate: Rate,
    pub operating_profit_rate: Rate,
    pub tax_rate: Rate,
    pub discount_rate: Rate,
    /// Primary (policy / subsidized) loan
    pub policy_loan_amount: Money,
    pub policy_loan_rate: Rate,
    pub grace_period: u32,
    pub repayment_period: u32,
    /// Secondary loan, structurally identical but independent
    pub other_debt_amount: Money,
    pub other_debt_rate: Rate,
    pub other_debt_grace_period: u32,
    pub other_debt_repayment_period: u32,
    /// Projection horizon in years
    pub analysis_years: u32,
    pub scenario_type: ScenarioType,
}

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "rust_decimal_128bit".to_string(),
        },
    }
}
