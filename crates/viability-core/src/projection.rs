use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::types::{InvestmentInput, Money, Rate};

/// Depreciation is a flat fraction of the initial investment, charged every
/// projection year. Deliberately not tied to an asset life.
pub const DEPRECIATION_RATE: Decimal = dec!(0.10);

const PERCENT: Decimal = dec!(100);

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One year's debt service for a single loan
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebtPayment {
    pub principal: Money,
    pub interest: Money,
    pub remaining_balance: Money,
}

/// One row of the projected cash-flow table. Year 0 holds the negative
/// initial investment with every accounting field zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CashFlow {
    pub year: u32,
    pub revenue: Money,
    pub cost: Money,
    pub ebit: Money,
    pub tax: Money,
    pub net_income: Money,
    pub depreciation: Money,
    /// Combined principal across both loans
    pub loan_principal: Money,
    /// Combined interest across both loans
    pub loan_interest: Money,
    pub net_cash_flow: Money,
    pub cumulative_cash_flow: Money,
    pub present_value: Money,
    pub cumulative_pv: Money,
    /// Return on invested capital, percent
    pub roic: Rate,
    pub fcf: Money,
    pub discounted_fcf: Money,
}

/// One row (years 1..N) of the debt-service coverage schedule
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DscrYearDetail {
    pub year: u32,
    pub revenue: Money,
    pub operating_profit: Money,
    pub policy_loan: DebtPayment,
    pub other_debt: DebtPayment,
    pub total_debt_service: Money,
    /// Operating profit over total debt service, scenario-adjusted.
    /// Zero (not infinity) when no debt service is due.
    pub dscr: Decimal,
    /// Phase flags keyed to the policy loan's grace/repayment windows
    pub is_grace_period: bool,
    pub is_repayment_period: bool,
    pub is_post_repayment: bool,
    /// The scenario multiplier that was applied to `dscr`
    pub scenario_adjustment: Decimal,
}

// ---------------------------------------------------------------------------
// Loan amortization
// ---------------------------------------------------------------------------

/// Build a full straight-line amortization schedule for one loan, indexed by
/// year (element 0 = year 1), over the whole analysis horizon.
///
/// The balance is carried forward as an explicit ledger: interest-only during
/// the grace period, equal principal installments with interest charged on the
/// start-of-year balance during the repayment period, zeros after full term.
/// For straight-line amortization this is arithmetically identical to
/// recomputing `amount - installment * (k - 1)` from scratch each year.
pub fn build_loan_schedule(
    amount: Money,
    rate_pct: Rate,
    grace_years: u32,
    repayment_years: u32,
    horizon_years: u32,
) -> Vec<DebtPayment> {
    let mut schedule = Vec::with_capacity(horizon_years as usize);
    if amount <= Decimal::ZERO {
        schedule.resize(horizon_years as usize, DebtPayment::default());
        return schedule;
    }

    let rate = rate_pct / PERCENT;
    let installment = if repayment_years > 0 {
        amount / Decimal::from(repayment_years)
    } else {
        Decimal::ZERO
    };
    let term_end = grace_years.saturating_add(repayment_years);
    let mut balance = amount;

    for year in 1..=horizon_years {
        let payment = if year <= grace_years {
            DebtPayment {
                principal: Decimal::ZERO,
                interest: amount * rate,
                remaining_balance: balance,
            }
        } else if year <= term_end && repayment_years > 0 {
            let interest = balance * rate;
            balance -= installment;
            DebtPayment {
                principal: installment,
                interest,
                remaining_balance: balance,
            }
        } else {
            balance = Decimal::ZERO;
            DebtPayment::default()
        };
        schedule.push(payment);
    }

    schedule
}

// ---------------------------------------------------------------------------
// Cash-flow projection
// ---------------------------------------------------------------------------

/// Project the year-by-year cash-flow table, length `analysis_years + 1`.
/// Total function: pathological inputs degrade to minimal-length sequences.
pub fn project_cash_flows(input: &InvestmentInput) -> Vec<CashFlow> {
    let years = input.analysis_years;
    let mut rows = Vec::with_capacity(years as usize + 1);

    // Year 0: the sole negative seed for payback and NPV
    rows.push(CashFlow {
        year: 0,
        revenue: Decimal::ZERO,
        cost: Decimal::ZERO,
        ebit: Decimal::ZERO,
        tax: Decimal::ZERO,
        net_income: Decimal::ZERO,
        depreciation: Decimal::ZERO,
        loan_principal: Decimal::ZERO,
        loan_interest: Decimal::ZERO,
        net_cash_flow: -input.initial_investment,
        cumulative_cash_flow: -input.initial_investment,
        present_value: -input.initial_investment,
        cumulative_pv: -input.initial_investment,
        roic: Decimal::ZERO,
        fcf: Decimal::ZERO,
        discounted_fcf: Decimal::ZERO,
    });

    let growth = input.revenue_growth_rate / PERCENT;
    let op_rate = input.operating_profit_rate / PERCENT;
    let tax_rate = input.tax_rate / PERCENT;
    let discount = input.discount_rate / PERCENT;
    let depreciation = input.initial_investment * DEPRECIATION_RATE;

    let policy = build_loan_schedule(
        input.policy_loan_amount,
        input.policy_loan_rate,
        input.grace_period,
        input.repayment_period,
        years,
    );
    let other = build_loan_schedule(
        input.other_debt_amount,
        input.other_debt_rate,
        input.other_debt_grace_period,
        input.other_debt_repayment_period,
        years,
    );

    let mut cumulative = -input.initial_investment;
    let mut cumulative_pv = -input.initial_investment;
    let one_plus_g = Decimal::ONE + growth;
    let one_plus_d = Decimal::ONE + discount;
    let mut revenue = input.annual_revenue;
    let mut discount_factor = Decimal::ONE;

    for year in 1..=years {
        let idx = (year - 1) as usize;
        if year > 1 {
            revenue *= one_plus_g;
        }
        discount_factor *= one_plus_d;
        let operating_profit = revenue * op_rate;
        let cost = revenue - operating_profit;

        let total_principal = policy[idx].principal + other[idx].principal;
        let total_interest = policy[idx].interest + other[idx].interest;

        let ebit = operating_profit - total_interest;
        let tax = (ebit * tax_rate).max(Decimal::ZERO);
        let net_income = ebit - tax;

        let net_cash_flow = net_income + depreciation - total_principal;
        cumulative += net_cash_flow;

        let present_value = if discount_factor.is_zero() {
            Decimal::ZERO
        } else {
            net_cash_flow / discount_factor
        };
        cumulative_pv += present_value;

        let invested_capital = input.initial_investment
            + policy[idx].remaining_balance
            + other[idx].remaining_balance;
        let roic = if invested_capital.is_zero() {
            Decimal::ZERO
        } else {
            net_income / invested_capital * PERCENT
        };

        let fcf =
            operating_profit * (Decimal::ONE - tax_rate) + depreciation - total_principal;
        let discounted_fcf = if discount_factor.is_zero() {
            Decimal::ZERO
        } else {
            fcf / discount_factor
        };

        rows.push(CashFlow {
            year,
            revenue,
            cost,
            ebit,
            tax,
            net_income,
            depreciation,
            loan_principal: total_principal,
            loan_interest: total_interest,
            net_cash_flow,
            cumulative_cash_flow: cumulative,
            present_value,
            cumulative_pv,
            roic,
            fcf,
            discounted_fcf,
        });
    }

    rows
}

// ---------------------------------------------------------------------------
// DSCR schedule
// ---------------------------------------------------------------------------

/// Build the per-year debt-service coverage schedule (years 1..N), with the
/// scenario adjustment already applied to every `dscr` value.
pub fn build_dscr_schedule(input: &InvestmentInput) -> Vec<DscrYearDetail> {
    let years = input.analysis_years;
    let growth = input.revenue_growth_rate / PERCENT;
    let op_rate = input.operating_profit_rate / PERCENT;
    let adjustment = input.scenario_type.dscr_adjustment();

    let policy = build_loan_schedule(
        input.policy_loan_amount,
        input.policy_loan_rate,
        input.grace_period,
        input.repayment_period,
        years,
    );
    let other = build_loan_schedule(
        input.other_debt_amount,
        input.other_debt_rate,
        input.other_debt_grace_period,
        input.other_debt_repayment_period,
        years,
    );

    let policy_term_end = input.grace_period.saturating_add(input.repayment_period);
    let mut schedule = Vec::with_capacity(years as usize);
    let one_plus_g = Decimal::ONE + growth;
    let mut revenue = input.annual_revenue;

    for year in 1..=years {
        let idx = (year - 1) as usize;
        if year > 1 {
            revenue *= one_plus_g;
        }
        let operating_profit = revenue * op_rate;

        let total_debt_service = policy[idx].principal
            + policy[idx].interest
            + other[idx].principal
            + other[idx].interest;

        let dscr = if total_debt_service.is_zero() {
            Decimal::ZERO
        } else {
            operating_profit / total_debt_service * adjustment
        };

        schedule.push(DscrYearDetail {
            year,
            revenue,
            operating_profit,
            policy_loan: policy[idx].clone(),
            other_debt: other[idx].clone(),
            total_debt_service,
            dscr,
            is_grace_period: year <= input.grace_period,
            is_repayment_period: year > input.grace_period && year <= policy_term_end,
            is_post_repayment: year > policy_term_end,
            scenario_adjustment: adjustment,
        });
    }

    schedule
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ScenarioType;

    fn debt_free_input() -> InvestmentInput {
        InvestmentInput {
            initial_investment: dec!(1000000000),
            annual_revenue: dec!(500000000),
            revenue_growth_rate: dec!(10),
            operating_profit_rate: dec!(20),
            tax_rate: dec!(22),
            discount_rate: dec!(8),
            policy_loan_amount: Decimal::ZERO,
            policy_loan_rate: Decimal::ZERO,
            grace_period: 0,
            repayment_period: 0,
            other_debt_amount: Decimal::ZERO,
            other_debt_rate: Decimal::ZERO,
            other_debt_grace_period: 0,
            other_debt_repayment_period: 0,
            analysis_years: 5,
            scenario_type: ScenarioType::Base,
        }
    }

    #[test]
    fn test_loan_schedule_grace_then_straight_line() {
        // 1000 at 5%, 2y grace, 4y repayment, 10y horizon
        let sched = build_loan_schedule(dec!(1000), dec!(5), 2, 4, 10);
        assert_eq!(sched.len(), 10);

        // Grace years: interest only on the full amount
        assert_eq!(sched[0].principal, Decimal::ZERO);
        assert_eq!(sched[0].interest, dec!(50));
        assert_eq!(sched[0].remaining_balance, dec!(1000));
        assert_eq!(sched[1].interest, dec!(50));

        // Year 3: first installment, interest on start-of-year balance
        assert_eq!(sched[2].principal, dec!(250));
        assert_eq!(sched[2].interest, dec!(50));
        assert_eq!(sched[2].remaining_balance, dec!(750));

        // Year 4: interest on 750
        assert_eq!(sched[3].interest, dec!(37.50));
        assert_eq!(sched[3].remaining_balance, dec!(500));

        // Year 6: final installment clears the balance
        assert_eq!(sched[5].remaining_balance, Decimal::ZERO);

        // Post-term years are all zeros
        for p in &sched[6..] {
            assert_eq!(*p, DebtPayment::default());
        }
    }

    #[test]
    fn test_loan_schedule_principal_conservation() {
        let sched = build_loan_schedule(dec!(700000000), dec!(3.5), 3, 7, 15);
        let total_principal: Decimal = sched.iter().map(|p| p.principal).sum();
        assert!((total_principal - dec!(700000000)).abs() < dec!(0.01));
    }

    #[test]
    fn test_loan_schedule_matches_closed_form() {
        // Ledger balance must equal amount - installment*(k-1) at the start
        // of each repayment year (the stateless closed form).
        let amount = dec!(1000);
        let sched = build_loan_schedule(amount, dec!(4), 1, 5, 10);
        let installment = amount / dec!(5);
        for k in 1..=5u32 {
            let year = 1 + k; // repayment years 2..=6
            let start_balance = amount - installment * Decimal::from(k - 1);
            let row = &sched[(year - 1) as usize];
            assert_eq!(row.interest, start_balance * dec!(0.04));
            assert_eq!(row.remaining_balance, start_balance - installment);
        }
    }

    #[test]
    fn test_zero_amount_yields_empty_payments() {
        let sched = build_loan_schedule(Decimal::ZERO, dec!(5), 1, 3, 6);
        assert!(sched.iter().all(|p| *p == DebtPayment::default()));
    }

    #[test]
    fn test_zero_repayment_period_goes_straight_to_zeros() {
        let sched = build_loan_schedule(dec!(1000), dec!(5), 2, 0, 5);
        assert_eq!(sched[1].interest, dec!(50));
        assert_eq!(sched[2], DebtPayment::default());
    }

    #[test]
    fn test_projection_year_zero_seed() {
        let rows = project_cash_flows(&debt_free_input());
        assert_eq!(rows.len(), 6);
        let y0 = &rows[0];
        assert_eq!(y0.net_cash_flow, dec!(-1000000000));
        assert_eq!(y0.cumulative_cash_flow, dec!(-1000000000));
        assert_eq!(y0.cumulative_pv, dec!(-1000000000));
        assert_eq!(y0.revenue, Decimal::ZERO);
        assert_eq!(y0.net_income, Decimal::ZERO);
    }

    #[test]
    fn test_projection_year_one_accounting() {
        let rows = project_cash_flows(&debt_free_input());
        let y1 = &rows[1];
        // Revenue = 500M (growth applies from year 2)
        assert_eq!(y1.revenue, dec!(500000000));
        // Operating profit 20% => EBIT with no interest = 100M
        assert_eq!(y1.ebit, dec!(100000000));
        // Tax 22% = 22M; net income = 78M
        assert_eq!(y1.tax, dec!(22000000));
        assert_eq!(y1.net_income, dec!(78000000));
        // Depreciation = 10% of 1000M
        assert_eq!(y1.depreciation, dec!(100000000));
        // No debt: NCF = 78M + 100M
        assert_eq!(y1.net_cash_flow, dec!(178000000));
    }

    #[test]
    fn test_projection_geometric_revenue() {
        let rows = project_cash_flows(&debt_free_input());
        assert_eq!(rows[2].revenue, dec!(550000000));
        assert_eq!(rows[3].revenue, dec!(605000000));
    }

    #[test]
    fn test_cumulative_bookkeeping_invariant() {
        let mut input = debt_free_input();
        input.policy_loan_amount = dec!(400000000);
        input.policy_loan_rate = dec!(3);
        input.grace_period = 1;
        input.repayment_period = 3;
        let rows = project_cash_flows(&input);
        for w in rows.windows(2) {
            assert_eq!(
                w[1].cumulative_cash_flow,
                w[0].cumulative_cash_flow + w[1].net_cash_flow
            );
            assert_eq!(w[1].cumulative_pv, w[0].cumulative_pv + w[1].present_value);
        }
    }

    #[test]
    fn test_tax_floored_at_zero() {
        let mut input = debt_free_input();
        input.operating_profit_rate = dec!(1);
        input.policy_loan_amount = dec!(2000000000);
        input.policy_loan_rate = dec!(10);
        input.grace_period = 5;
        input.repayment_period = 0;
        let rows = project_cash_flows(&input);
        // Interest 200M swamps 5M operating profit: EBIT negative, tax zero
        assert!(rows[1].ebit < Decimal::ZERO);
        assert_eq!(rows[1].tax, Decimal::ZERO);
        assert_eq!(rows[1].net_income, rows[1].ebit);
    }

    #[test]
    fn test_zero_years_degrades_to_seed_only() {
        let mut input = debt_free_input();
        input.analysis_years = 0;
        let rows = project_cash_flows(&input);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].net_cash_flow, dec!(-1000000000));
    }

    #[test]
    fn test_dscr_schedule_no_debt_is_zero() {
        let sched = build_dscr_schedule(&debt_free_input());
        assert_eq!(sched.len(), 5);
        for row in &sched {
            assert_eq!(row.total_debt_service, Decimal::ZERO);
            assert_eq!(row.dscr, Decimal::ZERO);
        }
    }

    #[test]
    fn test_dscr_phases_and_scenario() {
        let mut input = debt_free_input();
        input.policy_loan_amount = dec!(500000000);
        input.policy_loan_rate = dec!(4);
        input.grace_period = 1;
        input.repayment_period = 2;
        input.analysis_years = 5;
        input.scenario_type = ScenarioType::Pessimistic;

        let sched = build_dscr_schedule(&input);
        assert!(sched[0].is_grace_period);
        assert!(sched[1].is_repayment_period);
        assert!(sched[2].is_repayment_period);
        assert!(sched[3].is_post_repayment);

        // Year 1: debt service = interest only = 20M; OP = 100M
        // Base DSCR 5.0, pessimistic 0.8x => 4.0
        assert_eq!(sched[0].total_debt_service, dec!(20000000));
        assert_eq!(sched[0].dscr, dec!(4.0));
        assert_eq!(sched[0].scenario_adjustment, dec!(0.8));
    }
}
