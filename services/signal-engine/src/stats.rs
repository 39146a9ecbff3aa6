//! Running statistics over terminal signals
//!
//! Process-wide accumulator updated exactly once per terminal signal;
//! reset only by explicit operator action.

use crate::signal::{Direction, Signal, SignalType};
use serde::Serialize;

/// Counter set exposed via the engine's stats query
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunningStats {
    pub signals_generated: u64,
    pub signals_valid: u64,
    pub signals_neutral: u64,
    pub signals_rejected: u64,
    pub signals_filtered: u64,
    pub long_count: u64,
    pub short_count: u64,
    pub neutral_count: u64,
    /// Confluence scores bucketed by decade: [0-9], [10-19], ... [90-100]
    pub score_histogram: [u64; 10],
}

impl RunningStats {
    /// Record one terminal signal.
    pub fn record(&mut self, signal: &Signal) {
        self.signals_generated += 1;
        match signal.signal_type {
            SignalType::Valid => self.signals_valid += 1,
            SignalType::Neutral => self.signals_neutral += 1,
            SignalType::Rejected => self.signals_rejected += 1,
            SignalType::Filtered => self.signals_filtered += 1,
        }
        match signal.direction {
            Direction::Long => self.long_count += 1,
            Direction::Short => self.short_count += 1,
            Direction::Neutral => self.neutral_count += 1,
        }
        let bucket = ((signal.confluence_score / 10.0) as usize).min(9);
        self.score_histogram[bucket] += 1;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
