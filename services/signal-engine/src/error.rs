//! Error types for the decision engine
//!
//! Only defects and upstream failures are errors here. Rejection
//! outcomes (failed risk validation, failed filters) are first-class
//! signal states, not errors.

use crate::signal::Direction;
use rust_decimal::Decimal;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A mis-ordered level pair is a logic defect, never silently
    /// corrected.
    #[error("mis-ordered levels for {direction:?}: stop={stop_loss} entry={entry} target={take_profit}")]
    InvalidLevels {
        direction: Direction,
        entry: Decimal,
        stop_loss: Decimal,
        take_profit: Decimal,
    },

    #[error("invalid evidence: {0}")]
    InvalidEvidence(String),

    /// Evidence-provider failure, passed through unchanged; retry
    /// policy belongs to the provider.
    #[error(transparent)]
    Upstream(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;
