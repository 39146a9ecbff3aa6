//! Trade signals - terminal output of the decision engine

use crate::alerts::Alert;
use crate::confluence::ConfluenceFactor;
use crate::evidence::Timeframe;
use crate::levels::SignalLevels;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Terminal signal classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalType {
    /// All checks passed; levels and sizing attached
    Valid,
    /// No decisive direction
    Neutral,
    /// Risk validation failed
    Rejected,
    /// One or more quality filters failed
    Filtered,
}

/// Trade direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Long,
    Short,
    Neutral,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Long => "long",
            Direction::Short => "short",
            Direction::Neutral => "neutral",
        }
    }
}

/// A complete trade recommendation. Constructed once per evaluation
/// and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub signal_type: SignalType,
    pub direction: Direction,
    pub current_price: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub levels: Option<SignalLevels>,
    pub confluence_score: f64,
    pub factors: Vec<ConfluenceFactor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk_reward: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position_size: Option<Decimal>,
    /// Short operator-facing verdict: "ENTRY", "WAIT" or "AVOID"
    pub message: String,
    /// Structured reasons behind a non-valid outcome
    pub reasons: Vec<String>,
    /// Non-fatal advisories attached to valid signals
    pub alerts: Vec<Alert>,
    pub generated_at: DateTime<Utc>,
    #[serde(flatten)]
    pub metadata: serde_json::Value,
}

impl Signal {
    fn base(
        symbol: String,
        timeframe: Timeframe,
        signal_type: SignalType,
        direction: Direction,
        current_price: Decimal,
        confluence_score: f64,
        message: &str,
    ) -> Self {
        Self {
            symbol,
            timeframe,
            signal_type,
            direction,
            current_price,
            levels: None,
            confluence_score,
            factors: Vec::new(),
            risk_reward: None,
            position_size: None,
            message: message.to_string(),
            reasons: Vec::new(),
            alerts: Vec::new(),
            generated_at: Utc::now(),
            metadata: serde_json::json!({}),
        }
    }

    /// No decisive direction: wait.
    pub fn neutral(
        symbol: String,
        timeframe: Timeframe,
        current_price: Decimal,
        confluence_score: f64,
    ) -> Self {
        let mut signal = Self::base(
            symbol,
            timeframe,
            SignalType::Neutral,
            Direction::Neutral,
            current_price,
            confluence_score,
            "WAIT",
        );
        signal.reasons.push("no decisive direction".to_string());
        signal
    }

    /// Risk validation failed: avoid the trade.
    pub fn rejected(
        symbol: String,
        timeframe: Timeframe,
        direction: Direction,
        current_price: Decimal,
        confluence_score: f64,
        reasons: Vec<String>,
    ) -> Self {
        let mut signal = Self::base(
            symbol,
            timeframe,
            SignalType::Rejected,
            direction,
            current_price,
            confluence_score,
            "AVOID",
        );
        signal.reasons = reasons;
        signal
    }

    /// Quality filters failed: wait, with every failing reason listed.
    pub fn filtered(
        symbol: String,
        timeframe: Timeframe,
        direction: Direction,
        current_price: Decimal,
        confluence_score: f64,
        reasons: Vec<String>,
    ) -> Self {
        let mut signal = Self::base(
            symbol,
            timeframe,
            SignalType::Filtered,
            direction,
            current_price,
            confluence_score,
            "WAIT",
        );
        signal.reasons = reasons;
        signal
    }

    /// All checks passed.
    pub fn valid(
        symbol: String,
        timeframe: Timeframe,
        direction: Direction,
        current_price: Decimal,
        confluence_score: f64,
        levels: SignalLevels,
    ) -> Self {
        let risk_reward = levels.risk_reward();
        let mut signal = Self::base(
            symbol,
            timeframe,
            SignalType::Valid,
            direction,
            current_price,
            confluence_score,
            "ENTRY",
        );
        signal.risk_reward = Some(risk_reward);
        signal.levels = Some(levels);
        signal
    }

    pub fn with_factors(mut self, factors: Vec<ConfluenceFactor>) -> Self {
        self.factors = factors;
        self
    }

    pub fn with_position_size(mut self, size: Decimal) -> Self {
        self.position_size = Some(size);
        self
    }

    pub fn with_alerts(mut self, alerts: Vec<Alert>) -> Self {
        self.alerts = alerts;
        self
    }

    pub fn with_metadata(mut self, key: &str, value: serde_json::Value) -> Self {
        if let Some(obj) = self.metadata.as_object_mut() {
            obj.insert(key.to_string(), value);
        }
        self
    }

    /// A signal worth acting on.
    pub fn is_actionable(&self) -> bool {
        self.signal_type == SignalType::Valid && self.direction != Direction::Neutral
    }
}
