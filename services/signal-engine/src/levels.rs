//! Level calculation - direction, entry, stop-loss and take-profit
//!
//! Direction comes first: a score below the confluence gate or a net
//! weight inside the deadband yields neutral and no levels at all.
//! Stops anchor to structural levels when one qualifies, falling back
//! to a fixed percentage offset; targets prefer the nearest opposing
//! structural level that still clears the minimum reward:risk.

use crate::config::{RiskConfig, ScoringConfig};
use crate::confluence::ConfluenceResult;
use crate::error::{EngineError, Result};
use crate::evidence::{Evidence, LevelKind};
use crate::risk;
use crate::signal::Direction;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Determine trade direction from the confluence result.
pub fn determine_direction(result: &ConfluenceResult, config: &ScoringConfig) -> Direction {
    if result.score < config.min_confluence_score {
        return Direction::Neutral;
    }
    let net = result.net_weight();
    if net > config.direction_deadband {
        Direction::Long
    } else if net < -config.direction_deadband {
        Direction::Short
    } else {
        Direction::Neutral
    }
}

/// Entry, stop-loss and take-profit for one signal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalLevels {
    pub entry: Decimal,
    pub stop_loss: Decimal,
    pub take_profit: Decimal,
}

impl SignalLevels {
    /// |take-profit − entry| ÷ |entry − stop-loss|
    pub fn risk_reward(&self) -> Decimal {
        let risk = (self.entry - self.stop_loss).abs();
        if risk <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        (self.take_profit - self.entry).abs() / risk
    }

    /// Directional ordering invariant. A violation is a logic defect,
    /// not a market condition, so it surfaces as an error.
    pub fn ensure_ordered(&self, direction: Direction) -> Result<()> {
        let ordered = match direction {
            Direction::Long => self.stop_loss < self.entry && self.entry < self.take_profit,
            Direction::Short => self.take_profit < self.entry && self.entry < self.stop_loss,
            Direction::Neutral => false,
        };
        if ordered {
            Ok(())
        } else {
            Err(EngineError::InvalidLevels {
                direction,
                entry: self.entry,
                stop_loss: self.stop_loss,
                take_profit: self.take_profit,
            })
        }
    }
}

/// Compute levels for a decided direction (market-entry model: entry
/// is the current price).
pub fn calculate_levels(
    direction: Direction,
    evidence: &Evidence,
    config: &RiskConfig,
) -> Result<SignalLevels> {
    if direction == Direction::Neutral {
        return Err(EngineError::InvalidEvidence(
            "cannot compute levels for a neutral direction".to_string(),
        ));
    }
    let entry = evidence.current_price;
    if entry <= Decimal::ZERO {
        return Err(EngineError::InvalidEvidence(format!(
            "non-positive current price {entry}"
        )));
    }

    let stop_loss = structural_stop(direction, entry, evidence, config)
        .unwrap_or_else(|| fallback_stop(direction, entry, config));
    let take_profit = structural_target(direction, entry, stop_loss, evidence, config)
        .unwrap_or_else(|| {
            risk::take_profit_for(config, direction, entry, stop_loss, config.target_risk_reward)
        });

    let levels = SignalLevels {
        entry,
        stop_loss,
        take_profit,
    };
    levels.ensure_ordered(direction)?;
    Ok(levels)
}

/// Nearest qualifying structural level on the protective side, ranked
/// by strength-weighted proximity.
fn structural_stop(
    direction: Direction,
    entry: Decimal,
    evidence: &Evidence,
    config: &RiskConfig,
) -> Option<Decimal> {
    let hundred = Decimal::from(100);
    let mut best: Option<(f64, Decimal)> = None;

    for level in &evidence.levels {
        let protective = match direction {
            Direction::Long => level.kind == LevelKind::Support && level.price < entry,
            Direction::Short => level.kind == LevelKind::Resistance && level.price > entry,
            Direction::Neutral => false,
        };
        if !protective {
            continue;
        }
        let distance_pct = (entry - level.price).abs() / entry * hundred;
        if distance_pct <= Decimal::ZERO || distance_pct > config.max_stop_distance_pct {
            continue;
        }
        let Some(distance) = distance_pct.to_f64() else {
            continue;
        };
        let rank = level.strength / distance;
        if best.map_or(true, |(r, _)| rank > r) {
            best = Some((rank, level.price));
        }
    }

    best.map(|(_, price)| price)
}

fn fallback_stop(direction: Direction, entry: Decimal, config: &RiskConfig) -> Decimal {
    let offset = entry * config.stop_fallback_pct / Decimal::from(100);
    match direction {
        Direction::Long | Direction::Neutral => entry - offset,
        Direction::Short => entry + offset,
    }
}

/// Nearest opposing structural level that still clears the minimum
/// reward:risk.
fn structural_target(
    direction: Direction,
    entry: Decimal,
    stop_loss: Decimal,
    evidence: &Evidence,
    config: &RiskConfig,
) -> Option<Decimal> {
    let risk_distance = (entry - stop_loss).abs();
    if risk_distance <= Decimal::ZERO {
        return None;
    }

    let candidates = evidence.levels.iter().filter(|level| match direction {
        Direction::Long => level.kind == LevelKind::Resistance && level.price > entry,
        Direction::Short => level.kind == LevelKind::Support && level.price < entry,
        Direction::Neutral => false,
    });

    let mut best: Option<Decimal> = None;
    for level in candidates {
        let reward = (level.price - entry).abs();
        if reward / risk_distance < config.min_risk_reward {
            continue;
        }
        let closer = match best {
            None => true,
            Some(current) => (level.price - entry).abs() < (current - entry).abs(),
        };
        if closer {
            best = Some(level.price);
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::confluence::ConfluenceResult;
    use crate::evidence::{StructuralLevel, Timeframe};

    fn result_with(score: f64, bullish: f64, bearish: f64) -> ConfluenceResult {
        ConfluenceResult {
            score,
            factors: vec![],
            bullish_weight: bullish,
            bearish_weight: bearish,
            neutral_weight: 0.0,
        }
    }

    fn evidence_at(price: i64) -> Evidence {
        Evidence::new("BTCUSDT", Timeframe::Hour4, Decimal::from(price))
    }

    #[test]
    fn test_direction_gate_on_score() {
        let scoring = ScoringConfig::default();
        assert_eq!(
            determine_direction(&result_with(69.9, 30.0, 0.0), &scoring),
            Direction::Neutral
        );
        assert_eq!(
            determine_direction(&result_with(70.0, 30.0, 0.0), &scoring),
            Direction::Long
        );
    }

    #[test]
    fn test_direction_deadband() {
        let scoring = ScoringConfig::default();
        // Net +4 sits inside the default deadband of 5
        assert_eq!(
            determine_direction(&result_with(80.0, 12.0, 8.0), &scoring),
            Direction::Neutral
        );
        assert_eq!(
            determine_direction(&result_with(80.0, 8.0, 20.0), &scoring),
            Direction::Short
        );
    }

    #[test]
    fn test_fallback_levels_long() {
        let levels =
            calculate_levels(Direction::Long, &evidence_at(50_000), &RiskConfig::default())
                .unwrap();
        // 3% fallback stop, 2:1 ratio target
        assert_eq!(levels.entry, Decimal::from(50_000));
        assert_eq!(levels.stop_loss, Decimal::from(48_500));
        assert_eq!(levels.take_profit, Decimal::from(53_000));
        assert_eq!(levels.risk_reward(), Decimal::from(2));
    }

    #[test]
    fn test_fallback_levels_short_ordering() {
        let levels =
            calculate_levels(Direction::Short, &evidence_at(50_000), &RiskConfig::default())
                .unwrap();
        assert!(levels.take_profit < levels.entry);
        assert!(levels.entry < levels.stop_loss);
        assert!(levels.risk_reward() >= Decimal::from(2));
    }

    #[test]
    fn test_structural_stop_preferred_over_fallback() {
        let evidence = evidence_at(50_000).with_levels(vec![StructuralLevel {
            price: Decimal::from(49_000),
            kind: LevelKind::Support,
            strength: 85.0,
        }]);
        let levels =
            calculate_levels(Direction::Long, &evidence, &RiskConfig::default()).unwrap();
        assert_eq!(levels.stop_loss, Decimal::from(49_000));
    }

    #[test]
    fn test_strength_weighted_proximity_picks_stop() {
        // The nearer, stronger support wins over the distant one
        let evidence = evidence_at(50_000).with_levels(vec![
            StructuralLevel {
                price: Decimal::from(46_000),
                kind: LevelKind::Support,
                strength: 90.0,
            },
            StructuralLevel {
                price: Decimal::from(49_200),
                kind: LevelKind::Support,
                strength: 70.0,
            },
        ]);
        let levels =
            calculate_levels(Direction::Long, &evidence, &RiskConfig::default()).unwrap();
        assert_eq!(levels.stop_loss, Decimal::from(49_200));
    }

    #[test]
    fn test_distant_support_falls_back() {
        // 20% away exceeds the 10% stop ceiling
        let evidence = evidence_at(50_000).with_levels(vec![StructuralLevel {
            price: Decimal::from(40_000),
            kind: LevelKind::Support,
            strength: 95.0,
        }]);
        let levels =
            calculate_levels(Direction::Long, &evidence, &RiskConfig::default()).unwrap();
        assert_eq!(levels.stop_loss, Decimal::from(48_500));
    }

    #[test]
    fn test_structural_target_must_clear_min_ratio() {
        let evidence = evidence_at(50_000).with_levels(vec![
            StructuralLevel {
                price: Decimal::from(49_000),
                kind: LevelKind::Support,
                strength: 85.0,
            },
            // Reward 500 vs risk 1000: fails 2:1, ignored
            StructuralLevel {
                price: Decimal::from(50_500),
                kind: LevelKind::Resistance,
                strength: 80.0,
            },
            // Reward 3000 vs risk 1000: qualifies
            StructuralLevel {
                price: Decimal::from(53_000),
                kind: LevelKind::Resistance,
                strength: 75.0,
            },
        ]);
        let levels =
            calculate_levels(Direction::Long, &evidence, &RiskConfig::default()).unwrap();
        assert_eq!(levels.take_profit, Decimal::from(53_000));
        assert!(levels.risk_reward() >= Decimal::from(2));
    }

    #[test]
    fn test_degenerate_config_surfaces_invariant_error() {
        // Zero fallback offset collapses stop and target onto entry
        let mut config = RiskConfig::default();
        config.stop_fallback_pct = Decimal::ZERO;
        let err = calculate_levels(Direction::Long, &evidence_at(50_000), &config).unwrap_err();
        assert!(matches!(err, EngineError::InvalidLevels { .. }));
    }

    #[test]
    fn test_ensure_ordered_rejects_crossed_levels() {
        let levels = SignalLevels {
            entry: Decimal::from(50_000),
            stop_loss: Decimal::from(51_000),
            take_profit: Decimal::from(54_000),
        };
        assert!(levels.ensure_ordered(Direction::Long).is_err());
        let levels = SignalLevels {
            entry: Decimal::from(50_000),
            stop_loss: Decimal::from(48_000),
            take_profit: Decimal::from(54_000),
        };
        assert!(levels.ensure_ordered(Direction::Long).is_ok());
    }
}
