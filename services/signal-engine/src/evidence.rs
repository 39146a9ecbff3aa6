//! Technical evidence consumed by the decision engine.
//!
//! Evidence is produced by an external technical-analysis provider
//! and is immutable per evaluation. Indicator outputs are modeled as
//! tagged optional sub-records so every scorer rule has an explicit
//! presence check instead of ad hoc truthiness.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Supported chart timeframes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Timeframe {
    Minute1,
    Minute5,
    Minute15,
    Minute30,
    Hour1,
    Hour4,
    Day1,
    Week1,
}

impl Timeframe {
    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::Minute1 => "1m",
            Timeframe::Minute5 => "5m",
            Timeframe::Minute15 => "15m",
            Timeframe::Minute30 => "30m",
            Timeframe::Hour1 => "1h",
            Timeframe::Hour4 => "4h",
            Timeframe::Day1 => "1d",
            Timeframe::Week1 => "1w",
        }
    }
}

/// Oscillator divergence direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DivergenceKind {
    Bullish,
    Bearish,
}

/// Price/oscillator divergence detected upstream
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Divergence {
    pub kind: DivergenceKind,
    /// Whether the divergence has been confirmed by a follow-through bar
    pub confirmed: bool,
}

/// Oscillator reading (RSI-style, 0-100)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OscillatorReading {
    pub value: f64,
    /// Provider's own overbought flag
    pub overbought: bool,
    /// Provider's own oversold flag
    pub oversold: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub divergence: Option<Divergence>,
}

/// Structural level kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LevelKind {
    Support,
    Resistance,
}

/// A support or resistance level with a 0-100 strength rating
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuralLevel {
    pub price: Decimal,
    pub kind: LevelKind,
    pub strength: f64,
}

/// BBWP-style volatility percentile (0-100 vs its own history)
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct VolatilityReading {
    pub percentile: f64,
    /// Extreme compression
    pub squeeze: bool,
    /// Active expansion
    pub expansion: bool,
}

/// Inclusive price band
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PriceBand {
    pub low: Decimal,
    pub high: Decimal,
}

impl PriceBand {
    pub fn contains(&self, price: Decimal) -> bool {
        price >= self.low && price <= self.high
    }
}

/// Direction of the price leg the retracement is measured against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FibLeg {
    Up,
    Down,
}

/// Single Fibonacci level
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FibLevel {
    pub ratio: f64,
    pub price: Decimal,
}

/// Fibonacci retracement/extension set for the active leg
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FibonacciLevels {
    pub retracements: Vec<FibLevel>,
    pub extensions: Vec<FibLevel>,
    /// The 0.618-0.65 retracement band
    pub golden_pocket: PriceBand,
    pub leg: FibLeg,
}

/// Detected chart pattern kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    HeadAndShoulders,
    InverseHeadAndShoulders,
    DoubleTop,
    DoubleBottom,
    AscendingTriangle,
    DescendingTriangle,
    SymmetricalTriangle,
    BullFlag,
    BearFlag,
    RisingWedge,
    FallingWedge,
}

impl PatternKind {
    /// Directional bias, if the pattern has one.
    /// Symmetrical triangles resolve either way and carry none.
    pub fn is_bullish(&self) -> Option<bool> {
        match self {
            PatternKind::InverseHeadAndShoulders
            | PatternKind::DoubleBottom
            | PatternKind::AscendingTriangle
            | PatternKind::BullFlag
            | PatternKind::FallingWedge => Some(true),
            PatternKind::HeadAndShoulders
            | PatternKind::DoubleTop
            | PatternKind::DescendingTriangle
            | PatternKind::BearFlag
            | PatternKind::RisingWedge => Some(false),
            PatternKind::SymmetricalTriangle => None,
        }
    }

    /// Structurally significant reversal patterns carry more weight
    /// than simple continuation shapes.
    pub fn structural_multiplier(&self) -> f64 {
        match self {
            PatternKind::HeadAndShoulders
            | PatternKind::InverseHeadAndShoulders
            | PatternKind::DoubleTop
            | PatternKind::DoubleBottom => 1.5,
            PatternKind::BullFlag
            | PatternKind::BearFlag
            | PatternKind::RisingWedge
            | PatternKind::FallingWedge => 1.2,
            PatternKind::AscendingTriangle
            | PatternKind::DescendingTriangle
            | PatternKind::SymmetricalTriangle => 1.0,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            PatternKind::HeadAndShoulders => "Head and Shoulders",
            PatternKind::InverseHeadAndShoulders => "Inverse Head and Shoulders",
            PatternKind::DoubleTop => "Double Top",
            PatternKind::DoubleBottom => "Double Bottom",
            PatternKind::AscendingTriangle => "Ascending Triangle",
            PatternKind::DescendingTriangle => "Descending Triangle",
            PatternKind::SymmetricalTriangle => "Symmetrical Triangle",
            PatternKind::BullFlag => "Bull Flag",
            PatternKind::BearFlag => "Bear Flag",
            PatternKind::RisingWedge => "Rising Wedge",
            PatternKind::FallingWedge => "Falling Wedge",
        }
    }
}

/// A detected chart pattern with detection confidence (0-100)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartPattern {
    pub kind: PatternKind,
    pub confidence: f64,
}

/// Complete evidence set for one symbol/timeframe evaluation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Evidence {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub current_price: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oscillator: Option<OscillatorReading>,
    #[serde(default)]
    pub levels: Vec<StructuralLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volatility: Option<VolatilityReading>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fibonacci: Option<FibonacciLevels>,
    #[serde(default)]
    pub patterns: Vec<ChartPattern>,
}

impl Evidence {
    pub fn new(symbol: impl Into<String>, timeframe: Timeframe, current_price: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            timeframe,
            current_price,
            oscillator: None,
            levels: Vec::new(),
            volatility: None,
            fibonacci: None,
            patterns: Vec::new(),
        }
    }

    pub fn with_oscillator(mut self, oscillator: OscillatorReading) -> Self {
        self.oscillator = Some(oscillator);
        self
    }

    pub fn with_levels(mut self, levels: Vec<StructuralLevel>) -> Self {
        self.levels = levels;
        self
    }

    pub fn with_volatility(mut self, volatility: VolatilityReading) -> Self {
        self.volatility = Some(volatility);
        self
    }

    pub fn with_fibonacci(mut self, fibonacci: FibonacciLevels) -> Self {
        self.fibonacci = Some(fibonacci);
        self
    }

    pub fn with_patterns(mut self, patterns: Vec<ChartPattern>) -> Self {
        self.patterns = patterns;
        self
    }
}
