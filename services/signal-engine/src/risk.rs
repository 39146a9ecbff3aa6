//! Risk validation - position sizing and capital-protection checks
//!
//! Every function here is pure and stateless: inputs in, structured
//! result out. Validation failures are values carrying human-readable
//! warnings, never errors, because callers must still receive a
//! result they can display.

use crate::config::RiskConfig;
use crate::evidence::StructuralLevel;
use crate::signal::Direction;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Account state supplied by the external risk/account context
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountContext {
    pub balance: Decimal,
    /// Risk per trade as % of balance
    pub risk_pct: Decimal,
    pub leverage: Decimal,
}

impl Default for AccountContext {
    fn default() -> Self {
        Self {
            balance: Decimal::from(10_000),
            risk_pct: Decimal::ONE, // 1%
            leverage: Decimal::from(10),
        }
    }
}

/// Position sizing result; recomputed per request, never stored
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskValidation {
    pub valid: bool,
    pub position_size: Decimal,
    pub risk_amount: Decimal,
    pub leverage: Decimal,
    pub required_capital: Decimal,
    pub warnings: Vec<String>,
}

/// Size a position so that a stop-out loses exactly `risk_pct` of
/// the balance.
pub fn size_position(
    config: &RiskConfig,
    balance: Decimal,
    entry: Decimal,
    stop_loss: Decimal,
    risk_pct: Decimal,
    leverage: Decimal,
) -> RiskValidation {
    let mut warnings = Vec::new();
    let mut valid = true;

    if risk_pct <= Decimal::ZERO || risk_pct > config.max_risk_pct {
        warnings.push(format!(
            "risk {}% outside allowed range (0, {}%]",
            risk_pct, config.max_risk_pct
        ));
        valid = false;
    }
    if leverage < Decimal::ONE || leverage > config.max_leverage {
        warnings.push(format!(
            "leverage {}x outside allowed range [1, {}x]",
            leverage, config.max_leverage
        ));
        valid = false;
    }

    let per_unit_risk = (entry - stop_loss).abs();
    if per_unit_risk <= Decimal::ZERO {
        warnings.push("stop-loss distance from entry is zero".to_string());
        return RiskValidation {
            valid: false,
            position_size: Decimal::ZERO,
            risk_amount: Decimal::ZERO,
            leverage,
            required_capital: Decimal::ZERO,
            warnings,
        };
    }

    let risk_amount = balance * risk_pct / Decimal::from(100);
    let position_size = risk_amount / per_unit_risk;
    let effective_leverage = leverage.max(Decimal::ONE);
    let required_capital = position_size * entry / effective_leverage;

    if required_capital > balance {
        warnings.push(format!(
            "required capital {} exceeds balance {}",
            required_capital.round_dp(2),
            balance
        ));
        valid = false;
    }

    RiskValidation {
        valid,
        position_size,
        risk_amount,
        leverage,
        required_capital,
        warnings,
    }
}

/// Stop-loss placement assessment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopAssessment {
    pub valid: bool,
    /// Stop distance as % of entry
    pub distance_pct: Decimal,
    pub warnings: Vec<String>,
}

/// Validate a stop-loss against directional geometry, the per-unit
/// risk ceiling, and (when levels are supplied) structural anchoring.
pub fn validate_stop_loss(
    config: &RiskConfig,
    direction: Direction,
    entry: Decimal,
    stop_loss: Decimal,
    levels: &[StructuralLevel],
) -> StopAssessment {
    let mut warnings = Vec::new();
    let mut valid = true;

    let wrong_side = match direction {
        Direction::Long => stop_loss >= entry,
        Direction::Short => stop_loss <= entry,
        Direction::Neutral => false,
    };
    if wrong_side {
        warnings.push(format!(
            "stop-loss {} on the wrong side of entry {} for a {} trade",
            stop_loss,
            entry,
            direction.as_str()
        ));
        valid = false;
    }

    let distance_pct = if entry > Decimal::ZERO {
        (entry - stop_loss).abs() / entry * Decimal::from(100)
    } else {
        Decimal::ZERO
    };
    if distance_pct > config.max_stop_distance_pct {
        warnings.push(format!(
            "stop distance {}% exceeds {}% ceiling",
            distance_pct.round_dp(2),
            config.max_stop_distance_pct
        ));
        valid = false;
    }

    // Structural anchoring is advisory only
    if !levels.is_empty() && entry > Decimal::ZERO {
        let anchored = levels.iter().any(|level| {
            (level.price - stop_loss).abs() / entry * Decimal::from(100) <= config.stop_anchor_pct
        });
        if !anchored {
            warnings.push("stop-loss is not anchored near a structural level".to_string());
        }
    }

    StopAssessment {
        valid,
        distance_pct,
        warnings,
    }
}

/// Ratio-derived take-profit. The requested ratio is floored at the
/// configured minimum reward:risk.
pub fn take_profit_for(
    config: &RiskConfig,
    direction: Direction,
    entry: Decimal,
    stop_loss: Decimal,
    ratio: Decimal,
) -> Decimal {
    let ratio = ratio.max(config.min_risk_reward);
    let risk_distance = (entry - stop_loss).abs();
    match direction {
        Direction::Long | Direction::Neutral => entry + ratio * risk_distance,
        Direction::Short => entry - ratio * risk_distance,
    }
}

/// Breakeven recommendation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakevenAdvice {
    pub move_to_breakeven: bool,
    /// Unrealized gain as % of the original risk distance
    pub gain_pct_of_risk: Decimal,
}

/// Check whether the stop should ratchet to entry. One-way: never
/// recommends moving a stop that already sits at or past entry.
pub fn breakeven_check(
    config: &RiskConfig,
    direction: Direction,
    entry: Decimal,
    current_price: Decimal,
    stop_loss: Decimal,
) -> BreakevenAdvice {
    let risk_distance = (entry - stop_loss).abs();
    if risk_distance <= Decimal::ZERO || direction == Direction::Neutral {
        return BreakevenAdvice {
            move_to_breakeven: false,
            gain_pct_of_risk: Decimal::ZERO,
        };
    }

    let gain = match direction {
        Direction::Long => current_price - entry,
        Direction::Short => entry - current_price,
        Direction::Neutral => Decimal::ZERO,
    };
    let gain_pct_of_risk = gain / risk_distance * Decimal::from(100);

    let stop_already_at_entry = match direction {
        Direction::Long => stop_loss >= entry,
        Direction::Short => stop_loss <= entry,
        Direction::Neutral => true,
    };

    BreakevenAdvice {
        move_to_breakeven: gain_pct_of_risk >= config.breakeven_threshold_pct
            && !stop_already_at_entry,
        gain_pct_of_risk,
    }
}

/// Losing-streak assessment; flags are advisory, never enforced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreakAssessment {
    pub consecutive_losses: u32,
    pub drawdown_pct: Decimal,
    pub should_pause: bool,
    pub emergency_stop: bool,
}

/// Count trailing consecutive losses and cumulative drawdown over an
/// ordered (oldest first) sequence of trade P&Ls.
pub fn assess_losing_streak(
    config: &RiskConfig,
    trade_pnls: &[Decimal],
    initial_balance: Decimal,
    current_balance: Decimal,
) -> StreakAssessment {
    let consecutive_losses = trade_pnls
        .iter()
        .rev()
        .take_while(|pnl| **pnl < Decimal::ZERO)
        .count() as u32;

    let drawdown_pct = if initial_balance > Decimal::ZERO {
        ((initial_balance - current_balance) / initial_balance * Decimal::from(100))
            .max(Decimal::ZERO)
    } else {
        Decimal::ZERO
    };

    StreakAssessment {
        consecutive_losses,
        drawdown_pct,
        should_pause: consecutive_losses >= config.pause_after_losses,
        emergency_stop: drawdown_pct >= config.emergency_drawdown_pct,
    }
}
