//! Signal decision engine for discretionary crypto-futures trading.
//!
//! Converts externally computed technical-indicator evidence into
//! risk-bounded trade recommendations: confluence scoring, direction
//! and level calculation, risk validation, quality filters, and
//! terminal signal classification. All outputs are advisory; data
//! retrieval, transport and persistence live outside this crate.

pub mod alerts;
pub mod config;
pub mod confluence;
pub mod engine;
pub mod error;
pub mod evidence;
pub mod levels;
pub mod risk;
pub mod signal;
pub mod stats;

// Re-export main types for convenience
pub use alerts::{Alert, AlertSeverity};
pub use config::{presets, CacheSettings, ConfigUpdate, EngineConfig, FilterConfig, RiskConfig, ScoringConfig};
pub use confluence::{interpret, score_evidence, ConfluenceFactor, ConfluenceResult, FactorKind, ScoreBand};
pub use engine::{signal_cache_key, BulkOptions, BulkOutcome, EvidenceProvider, SignalCache, SignalEngine};
pub use error::{EngineError, Result};
pub use evidence::{
    ChartPattern, Divergence, DivergenceKind, Evidence, FibLeg, FibLevel, FibonacciLevels,
    LevelKind, OscillatorReading, PatternKind, PriceBand, StructuralLevel, Timeframe,
    VolatilityReading,
};
pub use levels::{calculate_levels, determine_direction, SignalLevels};
pub use risk::{
    assess_losing_streak, breakeven_check, size_position, take_profit_for, validate_stop_loss,
    AccountContext, BreakevenAdvice, RiskValidation, StopAssessment, StreakAssessment,
};
pub use signal::{Direction, Signal, SignalType};
pub use stats::RunningStats;
