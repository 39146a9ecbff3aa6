//! Advisory alerts attached to valid signals
//!
//! Alerts never change a signal's classification; they flag
//! conditions the operator should weigh before acting, and are
//! generated independently of the pass/fail quality filters.

use crate::config::EngineConfig;
use crate::confluence::{interpret, ConfluenceResult, ScoreBand};
use crate::evidence::Evidence;
use crate::levels::SignalLevels;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// How far inside the overbought/oversold thresholds the oscillator
/// can sit before a near-extreme advisory fires
const RSI_NEAR_EXTREME_MARGIN: f64 = 5.0;
/// Volatility percentile considered elevated (but not extreme)
const ELEVATED_VOLATILITY_PCT: f64 = 75.0;
/// Stop distance (% of entry) considered wide
const WIDE_STOP_PCT: u32 = 5;

/// Alert severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    Info,
    Warning,
    Critical,
}

impl AlertSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertSeverity::Info => "info",
            AlertSeverity::Warning => "warning",
            AlertSeverity::Critical => "critical",
        }
    }
}

/// One advisory attached to a signal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub severity: AlertSeverity,
    pub code: String,
    pub message: String,
}

impl Alert {
    pub fn info(code: &str, message: String) -> Self {
        Self {
            severity: AlertSeverity::Info,
            code: code.to_string(),
            message,
        }
    }

    pub fn warning(code: &str, message: String) -> Self {
        Self {
            severity: AlertSeverity::Warning,
            code: code.to_string(),
            message,
        }
    }
}

/// Generate the advisory set for a signal that passed all filters.
pub fn advisory_alerts(
    evidence: &Evidence,
    confluence: &ConfluenceResult,
    levels: &SignalLevels,
    config: &EngineConfig,
) -> Vec<Alert> {
    let mut alerts = Vec::new();

    if interpret(confluence.score) == ScoreBand::Moderate {
        alerts.push(Alert::info(
            "confluence_moderate",
            format!("confluence {:.1} is only moderate", confluence.score),
        ));
    }

    if let Some(osc) = &evidence.oscillator {
        let near_high = osc.value >= config.scoring.rsi_overbought - RSI_NEAR_EXTREME_MARGIN;
        let near_low = osc.value <= config.scoring.rsi_oversold + RSI_NEAR_EXTREME_MARGIN;
        if near_high || near_low {
            alerts.push(Alert::warning(
                "rsi_near_extreme",
                format!("oscillator {:.1} is near an extreme", osc.value),
            ));
        }
    }

    if let Some(vol) = &evidence.volatility {
        if vol.percentile >= ELEVATED_VOLATILITY_PCT {
            alerts.push(Alert::warning(
                "volatility_elevated",
                format!("volatility percentile {:.0} is elevated", vol.percentile),
            ));
        }
    }

    if levels.entry > Decimal::ZERO {
        let stop_distance_pct =
            (levels.entry - levels.stop_loss).abs() / levels.entry * Decimal::from(100);
        if stop_distance_pct > Decimal::from(WIDE_STOP_PCT) {
            alerts.push(Alert::info(
                "wide_stop",
                format!("stop sits {}% from entry", stop_distance_pct.round_dp(1)),
            ));
        }
    }

    alerts
}
