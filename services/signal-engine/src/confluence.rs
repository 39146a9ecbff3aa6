//! Confluence scoring - aggregates indicator evidence into one score
//!
//! Each evidence dimension contributes zero or more weighted factors.
//! Positive weight favors long, negative favors short; every factor
//! is capped per kind so no single input can saturate the score. The
//! full factor list is retained so downstream consumers can explain
//! the decision, not just read a number.

use crate::config::ScoringConfig;
use crate::evidence::{DivergenceKind, Evidence, LevelKind};
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

/// Closed set of factor kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactorKind {
    OversoldExtreme,
    OverboughtExtreme,
    BullishDivergence,
    BearishDivergence,
    SupportProximity,
    ResistanceProximity,
    VolatilitySqueeze,
    GoldenPocket,
    ChartPattern,
}

impl FactorKind {
    /// Squeeze says "expansion imminent" without picking a side.
    fn is_direction_neutral(&self) -> bool {
        matches!(self, FactorKind::VolatilitySqueeze)
    }
}

/// One weighted piece of evidence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfluenceFactor {
    pub kind: FactorKind,
    /// Signed weight: positive favors long, negative favors short
    pub weight: f64,
    pub detail: String,
}

/// Score plus the factor breakdown behind it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfluenceResult {
    /// Clamped to [0, 100]
    pub score: f64,
    /// Factors ranked by weight magnitude, strongest first
    pub factors: Vec<ConfluenceFactor>,
    /// Sum of positive directional weights
    pub bullish_weight: f64,
    /// Sum of negative directional weight magnitudes
    pub bearish_weight: f64,
    /// Sum of direction-neutral weights
    pub neutral_weight: f64,
}

impl ConfluenceResult {
    /// Net directional leaning; positive favors long.
    pub fn net_weight(&self) -> f64 {
        self.bullish_weight - self.bearish_weight
    }
}

/// Interpretation bands over the 0-100 score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreBand {
    Excellent,
    Strong,
    Moderate,
    Weak,
    VeryWeak,
}

impl ScoreBand {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScoreBand::Excellent => "excellent",
            ScoreBand::Strong => "strong",
            ScoreBand::Moderate => "moderate",
            ScoreBand::Weak => "weak",
            ScoreBand::VeryWeak => "very weak",
        }
    }
}

/// Map a score to its band. The five bands partition [0, 100] with
/// no gaps or overlaps.
pub fn interpret(score: f64) -> ScoreBand {
    if score >= 85.0 {
        ScoreBand::Excellent
    } else if score >= 75.0 {
        ScoreBand::Strong
    } else if score >= 55.0 {
        ScoreBand::Moderate
    } else if score >= 35.0 {
        ScoreBand::Weak
    } else {
        ScoreBand::VeryWeak
    }
}

/// Score one evidence set.
///
/// The score measures conviction: 50 baseline plus the absolute net
/// of bullish-vs-bearish weight (conflicting evidence cancels) plus
/// direction-neutral weight, bounded so the total added contribution
/// never exceeds the configured cap.
pub fn score_evidence(evidence: &Evidence, config: &ScoringConfig) -> ConfluenceResult {
    let mut factors = Vec::new();

    collect_oscillator_factors(evidence, config, &mut factors);
    collect_level_factors(evidence, config, &mut factors);
    collect_volatility_factors(evidence, config, &mut factors);
    collect_fibonacci_factors(evidence, config, &mut factors);
    collect_pattern_factors(evidence, config, &mut factors);

    let mut bullish = 0.0;
    let mut bearish = 0.0;
    let mut neutral = 0.0;
    for factor in &factors {
        if factor.kind.is_direction_neutral() {
            neutral += factor.weight.abs();
        } else if factor.weight >= 0.0 {
            bullish += factor.weight;
        } else {
            bearish += factor.weight.abs();
        }
    }

    let conviction = (bullish - bearish).abs();
    let total = (conviction + neutral).min(config.max_total_contribution);
    let score = (50.0 + total).clamp(0.0, 100.0);

    factors.sort_by(|a, b| {
        b.weight
            .abs()
            .partial_cmp(&a.weight.abs())
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    ConfluenceResult {
        score,
        factors,
        bullish_weight: bullish,
        bearish_weight: bearish,
        neutral_weight: neutral,
    }
}

fn collect_oscillator_factors(
    evidence: &Evidence,
    config: &ScoringConfig,
    factors: &mut Vec<ConfluenceFactor>,
) {
    let Some(osc) = &evidence.oscillator else {
        return;
    };

    let oversold_distance = (config.rsi_oversold - osc.value).max(0.0);
    if oversold_distance > 0.0 || osc.oversold {
        let weight = (config.oscillator_weight_per_point * oversold_distance)
            .max(config.oscillator_weight_per_point)
            .min(config.oscillator_weight_cap);
        factors.push(ConfluenceFactor {
            kind: FactorKind::OversoldExtreme,
            weight,
            detail: format!("oscillator {:.1} below {:.0}", osc.value, config.rsi_oversold),
        });
    }

    let overbought_distance = (osc.value - config.rsi_overbought).max(0.0);
    if overbought_distance > 0.0 || osc.overbought {
        let weight = (config.oscillator_weight_per_point * overbought_distance)
            .max(config.oscillator_weight_per_point)
            .min(config.oscillator_weight_cap);
        factors.push(ConfluenceFactor {
            kind: FactorKind::OverboughtExtreme,
            weight: -weight,
            detail: format!("oscillator {:.1} above {:.0}", osc.value, config.rsi_overbought),
        });
    }

    if let Some(divergence) = &osc.divergence {
        let magnitude = if divergence.confirmed {
            config.divergence_confirmed_weight
        } else {
            config.divergence_unconfirmed_weight
        };
        let (kind, weight) = match divergence.kind {
            DivergenceKind::Bullish => (FactorKind::BullishDivergence, magnitude),
            DivergenceKind::Bearish => (FactorKind::BearishDivergence, -magnitude),
        };
        factors.push(ConfluenceFactor {
            kind,
            weight,
            detail: if divergence.confirmed {
                "confirmed divergence".to_string()
            } else {
                "unconfirmed divergence".to_string()
            },
        });
    }
}

fn collect_level_factors(
    evidence: &Evidence,
    config: &ScoringConfig,
    factors: &mut Vec<ConfluenceFactor>,
) {
    let current = match evidence.current_price.to_f64() {
        Some(p) if p > 0.0 => p,
        _ => return,
    };

    for level in &evidence.levels {
        if level.strength < config.min_level_strength {
            continue;
        }
        let Some(price) = level.price.to_f64() else {
            continue;
        };
        let distance_pct = (current - price).abs() / current * 100.0;
        if distance_pct > config.level_proximity_pct {
            continue;
        }
        let weight = (level.strength / 10.0).min(config.level_weight_cap);
        let (kind, weight) = match level.kind {
            LevelKind::Support => (FactorKind::SupportProximity, weight),
            LevelKind::Resistance => (FactorKind::ResistanceProximity, -weight),
        };
        factors.push(ConfluenceFactor {
            kind,
            weight,
            detail: format!(
                "{} at {} ({:.2}% away, strength {:.0})",
                match level.kind {
                    LevelKind::Support => "support",
                    LevelKind::Resistance => "resistance",
                },
                level.price,
                distance_pct,
                level.strength
            ),
        });
    }
}

fn collect_volatility_factors(
    evidence: &Evidence,
    config: &ScoringConfig,
    factors: &mut Vec<ConfluenceFactor>,
) {
    let Some(vol) = &evidence.volatility else {
        return;
    };
    if vol.squeeze {
        factors.push(ConfluenceFactor {
            kind: FactorKind::VolatilitySqueeze,
            weight: config.squeeze_weight,
            detail: format!("volatility squeeze at percentile {:.0}", vol.percentile),
        });
    }
}

fn collect_fibonacci_factors(
    evidence: &Evidence,
    config: &ScoringConfig,
    factors: &mut Vec<ConfluenceFactor>,
) {
    let Some(fib) = &evidence.fibonacci else {
        return;
    };
    if fib.golden_pocket.contains(evidence.current_price) {
        let weight = match fib.leg {
            crate::evidence::FibLeg::Up => config.golden_pocket_weight,
            crate::evidence::FibLeg::Down => -config.golden_pocket_weight,
        };
        factors.push(ConfluenceFactor {
            kind: FactorKind::GoldenPocket,
            weight,
            detail: format!(
                "price in golden pocket {}-{}",
                fib.golden_pocket.low, fib.golden_pocket.high
            ),
        });
    }
}

fn collect_pattern_factors(
    evidence: &Evidence,
    config: &ScoringConfig,
    factors: &mut Vec<ConfluenceFactor>,
) {
    for pattern in &evidence.patterns {
        let Some(bullish) = pattern.kind.is_bullish() else {
            continue;
        };
        let magnitude = (pattern.confidence / 10.0 * pattern.kind.structural_multiplier())
            .min(config.pattern_weight_cap);
        let weight = if bullish { magnitude } else { -magnitude };
        factors.push(ConfluenceFactor {
            kind: FactorKind::ChartPattern,
            weight,
            detail: format!(
                "{} (confidence {:.0})",
                pattern.kind.display_name(),
                pattern.confidence
            ),
        });
    }
}
