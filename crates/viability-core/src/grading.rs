use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::metrics::{average_dscr, InvestmentResult};
use crate::types::{Money, Rate, Score, Years, HUNDRED_MILLION};

// ---------------------------------------------------------------------------
// Scale classification
// ---------------------------------------------------------------------------

/// Investment scale tier, classified purely by the absolute size of the
/// initial outlay (hundred-million KRW bands).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvestmentScale {
    Micro,
    Small,
    Medium,
    Large,
    Mega,
}

impl std::fmt::Display for InvestmentScale {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Micro => "micro",
            Self::Small => "small",
            Self::Medium => "medium",
            Self::Large => "large",
            Self::Mega => "mega",
        };
        write!(f, "{}", s)
    }
}

/// Tier metadata: risk premium and the acceptance bars the tier is held to.
/// Larger investments clear higher return bars but are allowed longer
/// payback horizons.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScaleProfile {
    pub scale: InvestmentScale,
    /// Haircut applied to the composite score, fraction (0.05 - 0.18)
    pub risk_premium: Decimal,
    /// Minimum acceptable IRR, percent
    pub min_irr: Rate,
    /// Minimum acceptable average DSCR
    pub min_dscr: Decimal,
    /// Maximum acceptable discounted payback, years
    pub max_payback: Years,
    pub description: String,
}

/// Classify by absolute investment size. Lower band bounds are inclusive:
/// exactly 25억 is small, exactly 100억 is mega.
pub fn classify_scale(initial_investment: Money) -> ScaleProfile {
    let in_100m = initial_investment / HUNDRED_MILLION;

    let (scale, risk_premium, min_irr, min_dscr, max_payback, description) =
        if in_100m < dec!(25) {
            (
                InvestmentScale::Micro,
                dec!(0.05),
                dec!(8),
                dec!(1.2),
                dec!(5),
                "Micro investment (under 2.5B KRW): lenient return bar, short recovery expected",
            )
        } else if in_100m < dec!(50) {
            (
                InvestmentScale::Small,
                dec!(0.08),
                dec!(10),
                dec!(1.3),
                dec!(6),
                "Small investment (2.5B-5B KRW): moderate return bar",
            )
        } else if in_100m < dec!(75) {
            (
                InvestmentScale::Medium,
                dec!(0.10),
                dec!(12),
                dec!(1.5),
                dec!(7),
                "Medium investment (5B-7.5B KRW): firm return and coverage bars",
            )
        } else if in_100m < dec!(100) {
            (
                InvestmentScale::Large,
                dec!(0.15),
                dec!(15),
                dec!(1.8),
                dec!(8),
                "Large investment (7.5B-10B KRW): strict bars, extended horizon tolerated",
            )
        } else {
            (
                InvestmentScale::Mega,
                dec!(0.18),
                dec!(18),
                dec!(2.0),
                dec!(10),
                "Mega investment (10B KRW and above): strictest bars, longest horizon tolerated",
            )
        };

    ScaleProfile {
        scale,
        risk_premium,
        min_irr,
        min_dscr,
        max_payback,
        description: description.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Per-metric discrete scoring tables
// ---------------------------------------------------------------------------
// Each table maps a continuous value onto one of five scores
// {100, 80, 60, 40, 20} via ordered threshold bands (min <= value < max).
// These are the *scoring* tables; the narrative reporter carries its own,
// numerically different, prose-tuned tables. Keep them separate.

/// NPV score thresholds in KRW, descending (>= t0 -> 100 ... >= t3 -> 40)
pub fn scale_npv_ranges(scale: InvestmentScale) -> [Money; 4] {
    let h = HUNDRED_MILLION;
    match scale {
        InvestmentScale::Micro => [h * dec!(10), h * dec!(5), h * dec!(2), Decimal::ZERO],
        InvestmentScale::Small => [h * dec!(20), h * dec!(10), h * dec!(5), Decimal::ZERO],
        InvestmentScale::Medium => [h * dec!(30), h * dec!(15), h * dec!(7.5), Decimal::ZERO],
        InvestmentScale::Large => [h * dec!(50), h * dec!(25), h * dec!(10), Decimal::ZERO],
        InvestmentScale::Mega => [h * dec!(80), h * dec!(40), h * dec!(20), Decimal::ZERO],
    }
}

/// IRR score thresholds in percent, descending
pub fn scale_irr_ranges(scale: InvestmentScale) -> [Rate; 4] {
    match scale {
        InvestmentScale::Micro => [dec!(15), dec!(10), dec!(8), dec!(5)],
        InvestmentScale::Small => [dec!(18), dec!(12), dec!(10), dec!(6)],
        InvestmentScale::Medium => [dec!(20), dec!(15), dec!(12), dec!(8)],
        InvestmentScale::Large => [dec!(22), dec!(18), dec!(15), dec!(10)],
        InvestmentScale::Mega => [dec!(25), dec!(20), dec!(18), dec!(12)],
    }
}

/// DSCR score thresholds (ratio), descending
pub fn scale_dscr_ranges(scale: InvestmentScale) -> [Decimal; 4] {
    match scale {
        InvestmentScale::Micro => [dec!(2.0), dec!(1.5), dec!(1.2), dec!(1.0)],
        InvestmentScale::Small => [dec!(2.2), dec!(1.7), dec!(1.3), dec!(1.0)],
        InvestmentScale::Medium => [dec!(2.5), dec!(2.0), dec!(1.5), dec!(1.2)],
        InvestmentScale::Large => [dec!(3.0), dec!(2.2), dec!(1.8), dec!(1.3)],
        InvestmentScale::Mega => [dec!(3.0), dec!(2.5), dec!(2.0), dec!(1.5)],
    }
}

/// Payback score thresholds in years, ascending (<= t0 -> 100 ... <= t3 -> 40)
pub fn scale_payback_ranges(scale: InvestmentScale) -> [Years; 4] {
    match scale {
        InvestmentScale::Micro => [dec!(3), dec!(4), dec!(5), dec!(7)],
        InvestmentScale::Small => [dec!(3.5), dec!(4.5), dec!(6), dec!(8)],
        InvestmentScale::Medium => [dec!(4), dec!(5), dec!(7), dec!(9)],
        InvestmentScale::Large => [dec!(4.5), dec!(6), dec!(8), dec!(10)],
        InvestmentScale::Mega => [dec!(5), dec!(7), dec!(10), dec!(12)],
    }
}

/// Map a higher-is-better value onto the five-band score ladder
pub fn band_score(value: Decimal, thresholds: &[Decimal; 4]) -> Score {
    if value >= thresholds[0] {
        dec!(100)
    } else if value >= thresholds[1] {
        dec!(80)
    } else if value >= thresholds[2] {
        dec!(60)
    } else if value >= thresholds[3] {
        dec!(40)
    } else {
        dec!(20)
    }
}

/// Map a lower-is-better value (payback years) onto the score ladder
pub fn band_score_ascending(value: Decimal, thresholds: &[Decimal; 4]) -> Score {
    if value <= thresholds[0] {
        dec!(100)
    } else if value <= thresholds[1] {
        dec!(80)
    } else if value <= thresholds[2] {
        dec!(60)
    } else if value <= thresholds[3] {
        dec!(40)
    } else {
        dec!(20)
    }
}

// ---------------------------------------------------------------------------
// Weights
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricWeights {
    pub npv: Decimal,
    pub irr: Decimal,
    pub dscr: Decimal,
    pub payback: Decimal,
}

const BASE_WEIGHTS: MetricWeightsRaw = MetricWeightsRaw {
    npv: dec!(30),
    irr: dec!(25),
    dscr: dec!(25),
    payback: dec!(20),
};

struct MetricWeightsRaw {
    npv: Decimal,
    irr: Decimal,
    dscr: Decimal,
    payback: Decimal,
}

/// Per-tier emphasis multipliers applied to the base weights before
/// renormalization. Mega-scale leans on coverage (DSCR x1.4) and relaxes
/// payback (x0.9).
fn scale_weight_multipliers(scale: InvestmentScale) -> MetricWeightsRaw {
    match scale {
        InvestmentScale::Micro => MetricWeightsRaw {
            npv: dec!(1.0),
            irr: dec!(1.1),
            dscr: dec!(0.9),
            payback: dec!(1.1),
        },
        InvestmentScale::Small => MetricWeightsRaw {
            npv: dec!(1.0),
            irr: dec!(1.05),
            dscr: dec!(1.0),
            payback: dec!(1.05),
        },
        InvestmentScale::Medium => MetricWeightsRaw {
            npv: dec!(1.0),
            irr: dec!(1.0),
            dscr: dec!(1.1),
            payback: dec!(1.0),
        },
        InvestmentScale::Large => MetricWeightsRaw {
            npv: dec!(1.05),
            irr: dec!(0.95),
            dscr: dec!(1.3),
            payback: dec!(0.95),
        },
        InvestmentScale::Mega => MetricWeightsRaw {
            npv: dec!(1.1),
            irr: dec!(0.9),
            dscr: dec!(1.4),
            payback: dec!(0.9),
        },
    }
}

/// Base weights scaled by tier multipliers, renormalized to sum to 100
pub fn scale_weights(scale: InvestmentScale) -> MetricWeights {
    let m = scale_weight_multipliers(scale);
    let npv = BASE_WEIGHTS.npv * m.npv;
    let irr = BASE_WEIGHTS.irr * m.irr;
    let dscr = BASE_WEIGHTS.dscr * m.dscr;
    let payback = BASE_WEIGHTS.payback * m.payback;
    let total = npv + irr + dscr + payback;
    if total.is_zero() {
        return MetricWeights {
            npv: dec!(25),
            irr: dec!(25),
            dscr: dec!(25),
            payback: dec!(25),
        };
    }
    let scale_to_100 = dec!(100) / total;
    MetricWeights {
        npv: npv * scale_to_100,
        irr: irr * scale_to_100,
        dscr: dscr * scale_to_100,
        payback: payback * scale_to_100,
    }
}

// ---------------------------------------------------------------------------
// Letter grade
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GradeLetter {
    AA,
    A,
    B,
    C,
    D,
}

impl std::fmt::Display for GradeLetter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::AA => "AA",
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::D => "D",
        };
        write!(f, "{}", s)
    }
}

impl GradeLetter {
    fn from_adjusted_score(score: Score) -> Self {
        if score >= dec!(90) {
            Self::AA
        } else if score >= dec!(80) {
            Self::A
        } else if score >= dec!(60) {
            Self::B
        } else if score >= dec!(40) {
            Self::C
        } else {
            Self::D
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            Self::AA => "#1d4ed8",
            Self::A => "#059669",
            Self::B => "#d97706",
            Self::C => "#ea580c",
            Self::D => "#dc2626",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::AA => "Outstanding viability across every metric",
            Self::A => "Strong viability with minor caveats",
            Self::B => "Acceptable viability; monitor the weaker metrics",
            Self::C => "Marginal viability; restructuring recommended before proceeding",
            Self::D => "Not viable under the stated assumptions",
        }
    }

    pub fn recommendation(&self) -> &'static str {
        match self {
            Self::AA => "Proceed. The investment clears every bar for its scale with room to spare.",
            Self::A => "Proceed with standard monitoring of debt service and revenue assumptions.",
            Self::B => "Proceed only with mitigations for the below-bar metrics and a contingency plan.",
            Self::C => "Defer. Rework financing terms or scale before committing capital.",
            Self::D => "Reject. The projected cash flows do not support the outlay.",
        }
    }
}

// ---------------------------------------------------------------------------
// Grade assembly
// ---------------------------------------------------------------------------

/// Discrete sub-scores that feed the composite
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricScores {
    pub npv: Score,
    pub irr: Score,
    pub dscr: Score,
    pub payback: Score,
}

/// Deterministic grade for one analyzed investment. Never mutated once
/// computed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvestmentGrade {
    pub grade: GradeLetter,
    /// Weighted composite before the risk haircut, 0-100
    pub score: Score,
    /// Composite x (1 - risk premium); the letter grade is cut from this
    pub risk_adjusted_score: Score,
    pub metric_scores: MetricScores,
    pub weights: MetricWeights,
    pub color: String,
    pub description: String,
    pub recommendation: String,
    pub scale: ScaleProfile,
}

/// Grade an analyzed investment by its absolute scale tier. The average DSCR
/// feeding the score excludes years with no debt service.
pub fn grade_investment(result: &InvestmentResult, initial_investment: Money) -> InvestmentGrade {
    let profile = classify_scale(initial_investment);
    let avg_dscr = average_dscr(&result.dscr_schedule);

    let metric_scores = MetricScores {
        npv: band_score(result.npv, &scale_npv_ranges(profile.scale)),
        irr: band_score(result.irr, &scale_irr_ranges(profile.scale)),
        dscr: band_score(avg_dscr, &scale_dscr_ranges(profile.scale)),
        payback: band_score_ascending(
            result.payback_period,
            &scale_payback_ranges(profile.scale),
        ),
    };

    let weights = scale_weights(profile.scale);
    let score = (weights.npv * metric_scores.npv
        + weights.irr * metric_scores.irr
        + weights.dscr * metric_scores.dscr
        + weights.payback * metric_scores.payback)
        / dec!(100);

    let risk_adjusted_score = score * (Decimal::ONE - profile.risk_premium);
    let grade = GradeLetter::from_adjusted_score(risk_adjusted_score);

    InvestmentGrade {
        grade,
        score,
        risk_adjusted_score,
        metric_scores,
        weights,
        color: grade.color().to_string(),
        description: grade.description().to_string(),
        recommendation: grade.recommendation().to_string(),
        scale: profile,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_boundaries_inclusive() {
        // Exactly 25억 is small, not micro
        assert_eq!(
            classify_scale(dec!(2500000000)).scale,
            InvestmentScale::Small
        );
        assert_eq!(
            classify_scale(dec!(2499999999)).scale,
            InvestmentScale::Micro
        );
        // Exactly 100억 is mega
        assert_eq!(
            classify_scale(dec!(10000000000)).scale,
            InvestmentScale::Mega
        );
        assert_eq!(
            classify_scale(dec!(9999999999)).scale,
            InvestmentScale::Large
        );
        assert_eq!(classify_scale(dec!(5000000000)).scale, InvestmentScale::Medium);
        assert_eq!(classify_scale(dec!(7500000000)).scale, InvestmentScale::Large);
    }

    #[test]
    fn test_risk_premium_monotone_in_scale() {
        let tiers = [
            dec!(1000000000),
            dec!(3000000000),
            dec!(6000000000),
            dec!(8000000000),
            dec!(20000000000),
        ];
        let premiums: Vec<Decimal> =
            tiers.iter().map(|i| classify_scale(*i).risk_premium).collect();
        assert!(premiums.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(premiums[0], dec!(0.05));
        assert_eq!(premiums[4], dec!(0.18));
    }

    #[test]
    fn test_acceptance_bars_monotone() {
        let scales = [
            InvestmentScale::Micro,
            InvestmentScale::Small,
            InvestmentScale::Medium,
            InvestmentScale::Large,
            InvestmentScale::Mega,
        ];
        for w in scales.windows(2) {
            let a = classify_scale_for(w[0]);
            let b = classify_scale_for(w[1]);
            assert!(a.min_irr < b.min_irr);
            assert!(a.min_dscr <= b.min_dscr);
            assert!(a.max_payback < b.max_payback);
        }
    }

    fn classify_scale_for(scale: InvestmentScale) -> ScaleProfile {
        let amount = match scale {
            InvestmentScale::Micro => dec!(1000000000),
            InvestmentScale::Small => dec!(3000000000),
            InvestmentScale::Medium => dec!(6000000000),
            InvestmentScale::Large => dec!(8000000000),
            InvestmentScale::Mega => dec!(15000000000),
        };
        classify_scale(amount)
    }

    #[test]
    fn test_band_score_boundary_inclusivity() {
        let thresholds = [dec!(15), dec!(10), dec!(8), dec!(5)];
        assert_eq!(band_score(dec!(15), &thresholds), dec!(100));
        assert_eq!(band_score(dec!(14.999), &thresholds), dec!(80));
        assert_eq!(band_score(dec!(10), &thresholds), dec!(80));
        assert_eq!(band_score(dec!(5), &thresholds), dec!(40));
        assert_eq!(band_score(dec!(4.999), &thresholds), dec!(20));
    }

    #[test]
    fn test_band_score_ascending_payback() {
        let thresholds = [dec!(3), dec!(4), dec!(5), dec!(7)];
        assert_eq!(band_score_ascending(dec!(3), &thresholds), dec!(100));
        assert_eq!(band_score_ascending(dec!(3.5), &thresholds), dec!(80));
        assert_eq!(band_score_ascending(dec!(7), &thresholds), dec!(40));
        assert_eq!(band_score_ascending(dec!(7.01), &thresholds), dec!(20));
    }

    #[test]
    fn test_weights_renormalize_to_100() {
        for scale in [
            InvestmentScale::Micro,
            InvestmentScale::Small,
            InvestmentScale::Medium,
            InvestmentScale::Large,
            InvestmentScale::Mega,
        ] {
            let w = scale_weights(scale);
            let total = w.npv + w.irr + w.dscr + w.payback;
            assert!(
                (total - dec!(100)).abs() < dec!(0.0000001),
                "{scale}: weights sum to {total}"
            );
        }
    }

    #[test]
    fn test_mega_emphasizes_dscr() {
        let micro = scale_weights(InvestmentScale::Micro);
        let mega = scale_weights(InvestmentScale::Mega);
        assert!(mega.dscr > micro.dscr);
        assert!(mega.payback < micro.payback);
    }

    #[test]
    fn test_grade_letter_cuts() {
        assert_eq!(GradeLetter::from_adjusted_score(dec!(90)), GradeLetter::AA);
        assert_eq!(GradeLetter::from_adjusted_score(dec!(89.99)), GradeLetter::A);
        assert_eq!(GradeLetter::from_adjusted_score(dec!(80)), GradeLetter::A);
        assert_eq!(GradeLetter::from_adjusted_score(dec!(60)), GradeLetter::B);
        assert_eq!(GradeLetter::from_adjusted_score(dec!(40)), GradeLetter::C);
        assert_eq!(GradeLetter::from_adjusted_score(dec!(39.99)), GradeLetter::D);
    }
}
