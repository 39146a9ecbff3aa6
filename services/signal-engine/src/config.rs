//! Engine configuration
//!
//! Single source of truth for decision thresholds, organized into
//! layers: scoring, risk, filters, and cache sizing. Every field has
//! a documented default; a [`ConfigUpdate`] overlay applies partial
//! changes at runtime.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Confluence scoring thresholds and per-factor weight caps
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Oscillator overbought threshold
    pub rsi_overbought: f64,
    /// Oscillator oversold threshold
    pub rsi_oversold: f64,
    /// Weight added per point the oscillator sits beyond its threshold
    pub oscillator_weight_per_point: f64,
    /// Cap on the oscillator-extreme factor
    pub oscillator_weight_cap: f64,
    /// Weight of a confirmed divergence
    pub divergence_confirmed_weight: f64,
    /// Weight of an unconfirmed divergence
    pub divergence_unconfirmed_weight: f64,
    /// Max distance from a structural level, as % of current price,
    /// for it to count as "nearby"
    pub level_proximity_pct: f64,
    /// Minimum level strength for a proximity factor
    pub min_level_strength: f64,
    /// Cap on a single level-proximity factor
    pub level_weight_cap: f64,
    /// Fixed weight of a volatility squeeze (direction-neutral)
    pub squeeze_weight: f64,
    /// Fixed weight when price sits in the golden pocket
    pub golden_pocket_weight: f64,
    /// Cap on a single chart-pattern factor
    pub pattern_weight_cap: f64,
    /// Bound on the total contribution added to the 50 baseline
    pub max_total_contribution: f64,
    /// Minimum score for a directional call
    pub min_confluence_score: f64,
    /// Net weight magnitude below which direction stays neutral
    pub direction_deadband: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            rsi_overbought: 70.0,
            rsi_oversold: 30.0,
            oscillator_weight_per_point: 0.8,
            oscillator_weight_cap: 15.0,
            divergence_confirmed_weight: 20.0,
            divergence_unconfirmed_weight: 10.0,
            level_proximity_pct: 1.5,
            min_level_strength: 60.0,
            level_weight_cap: 10.0,
            squeeze_weight: 8.0,
            golden_pocket_weight: 12.0,
            pattern_weight_cap: 15.0,
            max_total_contribution: 50.0,
            min_confluence_score: 70.0,
            direction_deadband: 5.0,
        }
    }
}

/// Capital-protection thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskConfig {
    /// Max risk per trade as % of balance
    pub max_risk_pct: Decimal,
    /// Max allowed leverage
    pub max_leverage: Decimal,
    /// Ceiling on stop-loss distance as % of entry
    pub max_stop_distance_pct: Decimal,
    /// Floor on reward:risk for any recommended trade
    pub min_risk_reward: Decimal,
    /// Target reward:risk used for ratio-derived take-profits
    pub target_risk_reward: Decimal,
    /// Stop offset (% of entry) when no structural level qualifies
    pub stop_fallback_pct: Decimal,
    /// Distance (% of entry) within which a stop counts as anchored
    /// to a structural level
    pub stop_anchor_pct: Decimal,
    /// Unrealized gain, as % of the original risk distance, that
    /// triggers a move-stop-to-breakeven recommendation
    pub breakeven_threshold_pct: Decimal,
    /// Consecutive losses before a pause is recommended
    pub pause_after_losses: u32,
    /// Drawdown % that raises the emergency-stop flag
    pub emergency_drawdown_pct: Decimal,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            max_risk_pct: Decimal::from(2),           // 2%
            max_leverage: Decimal::from(20),          // 20x
            max_stop_distance_pct: Decimal::from(10), // 10%
            min_risk_reward: Decimal::from(2),        // 2:1
            target_risk_reward: Decimal::from(2),
            stop_fallback_pct: Decimal::from(3),      // 3%
            stop_anchor_pct: Decimal::ONE,            // 1%
            breakeven_threshold_pct: Decimal::from(40),
            pause_after_losses: 3,
            emergency_drawdown_pct: Decimal::from(20),
        }
    }
}

/// Quality-filter thresholds applied after risk validation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Volatility percentile above which expanding volatility is
    /// considered untradeable
    pub extreme_volatility_pct: f64,
    /// Stricter secondary oscillator ceiling
    pub rsi_extreme_high: f64,
    /// Stricter secondary oscillator floor
    pub rsi_extreme_low: f64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            extreme_volatility_pct: 90.0,
            rsi_extreme_high: 85.0,
            rsi_extreme_low: 15.0,
        }
    }
}

/// Sizing/TTL settings for the caller-owned signal cache
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    pub max_size: usize,
    pub ttl_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            max_size: 1000,
            ttl_secs: 300, // 5 minutes
        }
    }
}

/// Complete engine configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    pub scoring: ScoringConfig,
    pub risk: RiskConfig,
    pub filters: FilterConfig,
    pub cache: CacheSettings,
}

/// Partial config overlay; unset fields leave the current value alone
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigUpdate {
    pub min_confluence_score: Option<f64>,
    pub min_risk_reward: Option<Decimal>,
    pub max_risk_per_trade: Option<Decimal>,
    pub max_leverage: Option<Decimal>,
    pub rsi_overbought: Option<f64>,
    pub rsi_oversold: Option<f64>,
    pub breakeven_threshold_pct: Option<Decimal>,
    pub pause_after_losses: Option<u32>,
    pub emergency_drawdown_pct: Option<Decimal>,
    pub cache_max_size: Option<usize>,
    pub cache_ttl_secs: Option<u64>,
}

impl EngineConfig {
    /// Apply a partial update in place.
    pub fn apply(&mut self, update: ConfigUpdate) {
        if let Some(v) = update.min_confluence_score {
            self.scoring.min_confluence_score = v;
        }
        if let Some(v) = update.min_risk_reward {
            self.risk.min_risk_reward = v;
        }
        if let Some(v) = update.max_risk_per_trade {
            self.risk.max_risk_pct = v;
        }
        if let Some(v) = update.max_leverage {
            self.risk.max_leverage = v;
        }
        if let Some(v) = update.rsi_overbought {
            self.scoring.rsi_overbought = v;
        }
        if let Some(v) = update.rsi_oversold {
            self.scoring.rsi_oversold = v;
        }
        if let Some(v) = update.breakeven_threshold_pct {
            self.risk.breakeven_threshold_pct = v;
        }
        if let Some(v) = update.pause_after_losses {
            self.risk.pause_after_losses = v;
        }
        if let Some(v) = update.emergency_drawdown_pct {
            self.risk.emergency_drawdown_pct = v;
        }
        if let Some(v) = update.cache_max_size {
            self.cache.max_size = v;
        }
        if let Some(v) = update.cache_ttl_secs {
            self.cache.ttl_secs = v;
        }
    }
}

/// Named configuration profiles
pub mod presets {
    use super::*;

    /// Higher gates, tighter risk: fewer but cleaner signals.
    pub fn conservative() -> EngineConfig {
        let mut config = EngineConfig::default();
        config.scoring.min_confluence_score = 80.0;
        config.risk.max_risk_pct = Decimal::ONE;
        config.risk.max_leverage = Decimal::from(5);
        config.risk.min_risk_reward = Decimal::from(3);
        config.risk.target_risk_reward = Decimal::from(3);
        config.risk.pause_after_losses = 2;
        config
    }

    /// The documented defaults.
    pub fn balanced() -> EngineConfig {
        EngineConfig::default()
    }

    /// Lower gates, wider risk ceilings: more signals through.
    pub fn aggressive() -> EngineConfig {
        let mut config = EngineConfig::default();
        config.scoring.min_confluence_score = 60.0;
        config.risk.max_risk_pct = Decimal::from(3);
        config.filters.extreme_volatility_pct = 95.0;
        config
    }
}
