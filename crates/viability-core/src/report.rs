use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::grading::{
    band_score, band_score_ascending, grade_investment, GradeLetter, InvestmentGrade,
    InvestmentScale, ScaleProfile,
};
use crate::metrics::{average_dscr, InvestmentResult, RISK_FREE_RATE_PCT};
use crate::types::{InvestmentInput, Money, Rate, Score, HUNDRED_MILLION};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One metric's independent five-band assessment with prose
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricAssessment {
    /// One of {100, 80, 60, 40, 20}
    pub score: Score,
    pub analysis: String,
    pub recommendation: String,
}

/// The eight narrative sub-assessments
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationMetrics {
    pub npv: MetricAssessment,
    pub irr: MetricAssessment,
    pub dscr: MetricAssessment,
    pub payback: MetricAssessment,
    pub profitability: MetricAssessment,
    pub stability: MetricAssessment,
    pub growth: MetricAssessment,
    pub risk: MetricAssessment,
}

/// The boundary artifact handed to the (external) report templating layer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Evaluation {
    pub overall_grade: InvestmentGrade,
    pub metrics: EvaluationMetrics,
    /// 0-100
    pub confidence: Score,
    /// Multi-section formatted recommendation
    pub recommendation: String,
    pub scale_analysis: ScaleProfile,
    pub timestamp: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Narrative threshold tables
// ---------------------------------------------------------------------------
// These are tuned for prose, not scoring, and are deliberately different
// numbers from the grading engine's tables. Do not merge the two.

/// Scale-relative NPV thresholds for the narrative bands, KRW
pub fn npv_narrative_thresholds(scale: InvestmentScale) -> [Money; 4] {
    let h = HUNDRED_MILLION;
    match scale {
        InvestmentScale::Micro => [h * dec!(8), h * dec!(4), h * dec!(1.5), Decimal::ZERO],
        InvestmentScale::Small => [h * dec!(16), h * dec!(8), h * dec!(4), Decimal::ZERO],
        InvestmentScale::Medium => [h * dec!(25), h * dec!(12), h * dec!(6), Decimal::ZERO],
        InvestmentScale::Large => [h * dec!(40), h * dec!(20), h * dec!(8), Decimal::ZERO],
        InvestmentScale::Mega => [h * dec!(60), h * dec!(30), h * dec!(15), Decimal::ZERO],
    }
}

/// IRR narrative thresholds, percent
fn irr_narrative_thresholds(scale: InvestmentScale) -> [Rate; 4] {
    match scale {
        InvestmentScale::Micro => [dec!(14), dec!(9), dec!(7), dec!(4)],
        InvestmentScale::Small => [dec!(16), dec!(11), dec!(9), dec!(5)],
        InvestmentScale::Medium => [dec!(18), dec!(14), dec!(11), dec!(7)],
        InvestmentScale::Large => [dec!(20), dec!(16), dec!(13), dec!(9)],
        InvestmentScale::Mega => [dec!(22), dec!(18), dec!(16), dec!(11)],
    }
}

const DSCR_NARRATIVE: [Decimal; 4] = [dec!(2.5), dec!(1.8), dec!(1.3), dec!(1.0)];
const PAYBACK_NARRATIVE: [Decimal; 4] = [dec!(3.5), dec!(5), dec!(7), dec!(9)];
const PI_NARRATIVE: [Decimal; 4] = [dec!(1.5), dec!(1.2), dec!(1.05), dec!(1.0)];
const GROWTH_NARRATIVE: [Decimal; 4] = [dec!(15), dec!(10), dec!(5), dec!(0)];

/// Confidence weights over the eight sub-scores, summing to 100
const CONFIDENCE_WEIGHTS: [Decimal; 8] = [
    dec!(20), // npv
    dec!(15), // irr
    dec!(15), // dscr
    dec!(10), // payback
    dec!(10), // profitability
    dec!(10), // stability
    dec!(10), // growth
    dec!(10), // risk
];

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Assemble the full narrative evaluation: grade, eight prose assessments,
/// confidence score, and the formatted recommendation. Pure templating over
/// already-computed numbers; no new decisions are made here.
pub fn evaluate_investment(input: &InvestmentInput, result: &InvestmentResult) -> Evaluation {
    let grade = grade_investment(result, input.initial_investment);
    let scale = grade.scale.scale;
    let avg_dscr = average_dscr(&result.dscr_schedule);

    let metrics = EvaluationMetrics {
        npv: assess_npv(result.npv, scale),
        irr: assess_irr(result.irr, scale),
        dscr: assess_dscr(avg_dscr, result),
        payback: assess_payback(result, input.analysis_years),
        profitability: assess_profitability(result.profitability_index),
        stability: assess_stability(result, avg_dscr),
        growth: assess_growth(input.revenue_growth_rate, result.average_roi),
        risk: assess_risk(result.risk_adjusted_return, &grade.scale),
    };

    let confidence = confidence_score(&metrics, grade.grade);
    let recommendation = build_recommendation(input, result, &grade, &metrics, confidence);
    let scale_analysis = grade.scale.clone();

    Evaluation {
        overall_grade: grade,
        metrics,
        confidence,
        recommendation,
        scale_analysis,
        timestamp: Utc::now(),
    }
}

// ---------------------------------------------------------------------------
// Sub-assessments
// ---------------------------------------------------------------------------

fn assess_npv(npv: Money, scale: InvestmentScale) -> MetricAssessment {
    let score = band_score(npv, &npv_narrative_thresholds(scale));
    let in_100m = npv / HUNDRED_MILLION;
    let (analysis, recommendation) = if score >= dec!(80) {
        (
            format!("Net present value of {in_100m:.1} hundred-million KRW comfortably exceeds what a {scale}-scale project needs to create value."),
            "Value creation is solid; lock in the financing assumptions that drive it.".to_string(),
        )
    } else if score >= dec!(60) {
        (
            format!("Net present value of {in_100m:.1} hundred-million KRW is positive but modest for a {scale}-scale project."),
            "Test the revenue growth assumption; NPV turns quickly on it.".to_string(),
        )
    } else if score >= dec!(40) {
        (
            format!("Net present value of {in_100m:.1} hundred-million KRW barely clears zero."),
            "Negotiate the outlay or financing cost down before committing.".to_string(),
        )
    } else {
        (
            format!("Net present value of {in_100m:.1} hundred-million KRW is negative: the project destroys value at the stated discount rate."),
            "Do not proceed on these assumptions.".to_string(),
        )
    };
    MetricAssessment { score, analysis, recommendation }
}

fn assess_irr(irr: Rate, scale: InvestmentScale) -> MetricAssessment {
    let score = band_score(irr, &irr_narrative_thresholds(scale));
    let (analysis, recommendation) = if score >= dec!(80) {
        (
            format!("Internal rate of return of {irr:.1}% is strong for a {scale}-scale project."),
            "Returns clear the hurdle with margin; sensitivity-check only the downside case.".to_string(),
        )
    } else if score >= dec!(40) {
        (
            format!("Internal rate of return of {irr:.1}% sits near the hurdle for a {scale}-scale project."),
            "A small cost overrun erases the spread; fix contingency before start.".to_string(),
        )
    } else {
        (
            format!("Internal rate of return of {irr:.1}% is below the hurdle for this scale."),
            "The return does not compensate the capital committed.".to_string(),
        )
    };
    MetricAssessment { score, analysis, recommendation }
}

fn assess_dscr(avg_dscr: Decimal, result: &InvestmentResult) -> MetricAssessment {
    let has_debt = result
        .dscr_schedule
        .iter()
        .any(|d| d.total_debt_service > Decimal::ZERO);
    if !has_debt {
        return MetricAssessment {
            score: dec!(100),
            analysis: "No debt service is scheduled; coverage is not a constraint.".to_string(),
            recommendation: "Debt-free structure; coverage risk does not apply.".to_string(),
        };
    }
    let score = band_score(avg_dscr, &DSCR_NARRATIVE);
    let (analysis, recommendation) = if score >= dec!(80) {
        (
            format!("Average debt-service coverage of {avg_dscr:.2}x leaves ample headroom over lender expectations."),
            "Coverage is comfortable; no restructuring needed.".to_string(),
        )
    } else if score >= dec!(40) {
        (
            format!("Average debt-service coverage of {avg_dscr:.2}x is workable but thin in the repayment years."),
            "Extend the grace period or repayment term to lift the thin years.".to_string(),
        )
    } else {
        (
            format!("Average debt-service coverage of {avg_dscr:.2}x signals distress: operating profit does not cover scheduled service."),
            "Restructure the debt before any capital is drawn.".to_string(),
        )
    };
    MetricAssessment { score, analysis, recommendation }
}

fn assess_payback(result: &InvestmentResult, analysis_years: u32) -> MetricAssessment {
    let payback = result.payback_period;
    let never = payback >= Decimal::from(analysis_years.saturating_add(1));
    let score = if never {
        dec!(20)
    } else {
        band_score_ascending(payback, &PAYBACK_NARRATIVE)
    };
    let (analysis, recommendation) = if never {
        (
            format!("The discounted outlay is not recovered within the {analysis_years}-year horizon."),
            "Either the horizon is too short for this asset or the project does not pay back; extend the analysis before judging.".to_string(),
        )
    } else if score >= dec!(80) {
        (
            format!("Discounted payback of {payback:.1} years is fast."),
            "Early recovery de-risks the downstream years.".to_string(),
        )
    } else if score >= dec!(40) {
        (
            format!("Discounted payback of {payback:.1} years is acceptable but leaves capital exposed for most of the horizon."),
            "Front-load revenue where contractually possible.".to_string(),
        )
    } else {
        (
            format!("Discounted payback of {payback:.1} years is slow for the horizon analyzed."),
            "Capital stays at risk too long; reconsider the phasing of the outlay.".to_string(),
        )
    };
    MetricAssessment { score, analysis, recommendation }
}

fn assess_profitability(pi: Decimal) -> MetricAssessment {
    let score = band_score(pi, &PI_NARRATIVE);
    let (analysis, recommendation) = if score >= dec!(80) {
        (
            format!("Profitability index of {pi:.2} means each unit of capital returns well above itself in present value."),
            "Capital efficiency is high; the project competes well for funding.".to_string(),
        )
    } else if score >= dec!(40) {
        (
            format!("Profitability index of {pi:.2} is just above break-even."),
            "Efficiency is marginal; compare against alternative uses of the capital.".to_string(),
        )
    } else {
        (
            format!("Profitability index of {pi:.2} is below 1: present value returned is less than capital invested."),
            "The capital is better deployed elsewhere.".to_string(),
        )
    };
    MetricAssessment { score, analysis, recommendation }
}

fn assess_stability(result: &InvestmentResult, avg_dscr: Decimal) -> MetricAssessment {
    // Stability reads the weakest serviced year, not the average
    let min_dscr = result
        .dscr_schedule
        .iter()
        .filter(|d| d.total_debt_service > Decimal::ZERO)
        .map(|d| d.dscr)
        .min();

    match min_dscr {
        None => MetricAssessment {
            score: dec!(100),
            analysis: "With no scheduled debt service the cash-flow structure has no coverage cliff.".to_string(),
            recommendation: "Stability is driven only by revenue; stress the growth assumption instead.".to_string(),
        },
        Some(min) => {
            let score = band_score(min, &DSCR_NARRATIVE);
            let (analysis, recommendation) = if score >= dec!(80) {
                (
                    format!("The weakest serviced year still covers {min:.2}x (average {avg_dscr:.2}x); the structure is stable."),
                    "No single year threatens the schedule.".to_string(),
                )
            } else if score >= dec!(40) {
                (
                    format!("The weakest serviced year covers only {min:.2}x against an average of {avg_dscr:.2}x."),
                    "Smooth the repayment profile to protect the weakest year.".to_string(),
                )
            } else {
                (
                    format!("At {min:.2}x the weakest year cannot carry its debt service."),
                    "The schedule fails in at least one year; restructure before committing.".to_string(),
                )
            };
            MetricAssessment { score, analysis, recommendation }
        }
    }
}

fn assess_growth(revenue_growth_pct: Rate, average_roi: Rate) -> MetricAssessment {
    let score = band_score(revenue_growth_pct, &GROWTH_NARRATIVE);
    let (analysis, recommendation) = if score >= dec!(80) {
        (
            format!("Assumed revenue growth of {revenue_growth_pct:.1}% per year compounds into an average ROI of {average_roi:.1}%."),
            "Growth drives the case; validate it against the order book.".to_string(),
        )
    } else if score >= dec!(40) {
        (
            format!("Revenue growth of {revenue_growth_pct:.1}% per year is conservative; average ROI settles at {average_roi:.1}%."),
            "Upside exists if growth outperforms the assumption.".to_string(),
        )
    } else {
        (
            format!("Revenue is assumed flat or shrinking ({revenue_growth_pct:.1}% per year)."),
            "Without growth the case rests entirely on margin; verify the cost base.".to_string(),
        )
    };
    MetricAssessment { score, analysis, recommendation }
}

fn assess_risk(risk_adjusted_return: Rate, profile: &ScaleProfile) -> MetricAssessment {
    // Spread of the risk-adjusted return over the tier's minimum IRR
    let spread = risk_adjusted_return - profile.min_irr;
    let score = if spread >= dec!(5) {
        dec!(100)
    } else if spread >= dec!(2) {
        dec!(80)
    } else if spread >= Decimal::ZERO {
        dec!(60)
    } else if spread >= dec!(-3) {
        dec!(40)
    } else {
        dec!(20)
    };
    let (analysis, recommendation) = if score >= dec!(80) {
        (
            format!("After the {RISK_FREE_RATE_PCT}% risk-free deduction the return still beats the tier minimum by {spread:.1} points."),
            "Risk-adjusted compensation is adequate for this scale.".to_string(),
        )
    } else if score >= dec!(40) {
        (
            format!("The risk-adjusted return sits within {spread:.1} points of the tier minimum."),
            "Thin risk compensation; any assumption slippage turns it negative.".to_string(),
        )
    } else {
        (
            format!("The risk-adjusted return trails the tier minimum by {:.1} points.", -spread),
            "The investor is not paid for the risk taken at this scale.".to_string(),
        )
    };
    MetricAssessment { score, analysis, recommendation }
}

// ---------------------------------------------------------------------------
// Confidence and recommendation assembly
// ---------------------------------------------------------------------------

/// Weighted average of the eight sub-scores plus a grade bonus/penalty
/// (AA +10, A +5, B 0, C -5, D -10), clamped to [0, 100]
fn confidence_score(metrics: &EvaluationMetrics, grade: GradeLetter) -> Score {
    let scores = [
        metrics.npv.score,
        metrics.irr.score,
        metrics.dscr.score,
        metrics.payback.score,
        metrics.profitability.score,
        metrics.stability.score,
        metrics.growth.score,
        metrics.risk.score,
    ];
    let weighted: Decimal = scores
        .iter()
        .zip(CONFIDENCE_WEIGHTS.iter())
        .map(|(s, w)| s * w)
        .sum::<Decimal>()
        / dec!(100);

    let bonus = match grade {
        GradeLetter::AA => dec!(10),
        GradeLetter::A => dec!(5),
        GradeLetter::B => Decimal::ZERO,
        GradeLetter::C => dec!(-5),
        GradeLetter::D => dec!(-10),
    };

    (weighted + bonus).max(Decimal::ZERO).min(dec!(100))
}

fn build_recommendation(
    input: &InvestmentInput,
    result: &InvestmentResult,
    grade: &InvestmentGrade,
    metrics: &EvaluationMetrics,
    confidence: Score,
) -> String {
    let mut sections: Vec<String> = Vec::new();

    sections.push(format!(
        "== Overall Assessment ==\nGrade {} ({:.1}/100 risk-adjusted, confidence {:.0}%). {}\n{}",
        grade.grade, grade.risk_adjusted_score, confidence, grade.description, grade.scale.description,
    ));

    let assessments: [(&str, &MetricAssessment); 8] = [
        ("NPV", &metrics.npv),
        ("IRR", &metrics.irr),
        ("DSCR", &metrics.dscr),
        ("Payback", &metrics.payback),
        ("Profitability", &metrics.profitability),
        ("Stability", &metrics.stability),
        ("Growth", &metrics.growth),
        ("Risk", &metrics.risk),
    ];

    let strengths: Vec<String> = assessments
        .iter()
        .filter(|(_, m)| m.score >= dec!(80))
        .map(|(name, m)| format!("- {}: {}", name, m.analysis))
        .collect();
    if !strengths.is_empty() {
        sections.push(format!("== Strengths ==\n{}", strengths.join("\n")));
    }

    let concerns: Vec<String> = assessments
        .iter()
        .filter(|(_, m)| m.score <= dec!(40))
        .map(|(name, m)| format!("- {}: {}", name, m.analysis))
        .collect();
    if !concerns.is_empty() {
        sections.push(format!("== Concerns ==\n{}", concerns.join("\n")));
    }

    let actions: Vec<String> = assessments
        .iter()
        .filter(|(_, m)| m.score < dec!(80))
        .map(|(name, m)| format!("- {}: {}", name, m.recommendation))
        .collect();
    if !actions.is_empty() {
        sections.push(format!("== Action Items ==\n{}", actions.join("\n")));
    }

    sections.push(format!(
        "== Key Figures ==\n- NPV: {:.0} KRW at {}% discount\n- IRR: {:.2}%\n- Discounted payback: {:.1} years over a {}-year horizon\n- Decision: {}",
        result.npv,
        input.discount_rate,
        result.irr,
        result.payback_period,
        input.analysis_years,
        grade.recommendation,
    ));

    sections.join("\n\n")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
