//! Signal engine - single evaluation pipeline for all signals
//!
//! Stages: scoring → direction check → level calculation → risk
//! validation → quality filters → classification. Rejections and
//! filter failures are terminal signal states; only level-invariant
//! violations and upstream provider failures surface as errors.

use crate::alerts::{advisory_alerts, Alert};
use crate::config::{ConfigUpdate, EngineConfig};
use crate::confluence::score_evidence;
use crate::error::Result;
use crate::evidence::{Evidence, Timeframe};
use crate::levels::{calculate_levels, determine_direction, SignalLevels};
use crate::risk::{self, AccountContext};
use crate::signal::{Direction, Signal};
use crate::stats::RunningStats;
use async_trait::async_trait;
use bounded_cache::Cache;
use std::sync::{Mutex, RwLock};
use std::time::Duration;
use tracing::{debug, info};

/// Upstream technical-analysis seam. The engine never fetches data
/// itself; callers await the provider before (or via) evaluation.
#[async_trait]
pub trait EvidenceProvider: Send + Sync {
    async fn fetch_evidence(&self, symbol: &str, timeframe: Timeframe)
        -> anyhow::Result<Evidence>;
}

/// Caller-owned memoization cache for terminal signals, keyed by
/// symbol+timeframe
pub type SignalCache = Cache<String, Signal>;

/// Canonical cache key for one symbol/timeframe pair.
pub fn signal_cache_key(symbol: &str, timeframe: Timeframe) -> String {
    format!("{}:{}", symbol.to_uppercase(), timeframe.as_str())
}

/// Output filtering for bulk evaluation
#[derive(Debug, Clone, Default)]
pub struct BulkOptions {
    /// Keep only VALID signals
    pub valid_only: bool,
    /// Keep only signals at or above this confluence score
    pub min_confluence: Option<f64>,
}

/// Per-symbol result of a bulk evaluation. Upstream errors are kept,
/// unchanged, alongside the signals that made the cut.
#[derive(Debug)]
pub struct BulkOutcome {
    pub symbol: String,
    pub outcome: Result<Signal>,
}

struct FilterFailure {
    code: &'static str,
    reason: String,
}

/// The decision engine. Stateless per call except for running stats;
/// safe for concurrent callers.
pub struct SignalEngine {
    config: RwLock<EngineConfig>,
    stats: Mutex<RunningStats>,
}

impl SignalEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config: RwLock::new(config),
            stats: Mutex::new(RunningStats::default()),
        }
    }

    /// Evaluate one evidence set into a terminal signal.
    pub fn evaluate(&self, evidence: &Evidence, account: &AccountContext) -> Result<Signal> {
        // Snapshot so a concurrent update never tears one evaluation
        let config = self.config_snapshot();

        if evidence.current_price <= rust_decimal::Decimal::ZERO {
            return Err(crate::error::EngineError::InvalidEvidence(format!(
                "non-positive current price {} for {}",
                evidence.current_price, evidence.symbol
            )));
        }

        let confluence = score_evidence(evidence, &config.scoring);
        let direction = determine_direction(&confluence, &config.scoring);

        if direction == Direction::Neutral {
            let signal = Signal::neutral(
                evidence.symbol.clone(),
                evidence.timeframe,
                evidence.current_price,
                confluence.score,
            )
            .with_factors(confluence.factors);
            return Ok(self.finish(signal));
        }

        // Invariant violations propagate; they are defects, not outcomes
        let levels = calculate_levels(direction, evidence, &config.risk)?;

        let sizing = risk::size_position(
            &config.risk,
            account.balance,
            levels.entry,
            levels.stop_loss,
            account.risk_pct,
            account.leverage,
        );
        let stop_check = risk::validate_stop_loss(
            &config.risk,
            direction,
            levels.entry,
            levels.stop_loss,
            &evidence.levels,
        );
        if !sizing.valid || !stop_check.valid {
            let mut reasons = sizing.warnings;
            if !stop_check.valid {
                reasons.extend(stop_check.warnings);
            }
            let signal = Signal::rejected(
                evidence.symbol.clone(),
                evidence.timeframe,
                direction,
                evidence.current_price,
                confluence.score,
                reasons,
            )
            .with_factors(confluence.factors);
            return Ok(self.finish(signal));
        }

        let failures = run_filters(evidence, &levels, &config);
        if !failures.is_empty() {
            let reasons = failures.into_iter().map(|f| f.reason).collect();
            let signal = Signal::filtered(
                evidence.symbol.clone(),
                evidence.timeframe,
                direction,
                evidence.current_price,
                confluence.score,
                reasons,
            )
            .with_factors(confluence.factors);
            return Ok(self.finish(signal));
        }

        let mut alerts = advisory_alerts(evidence, &confluence, &levels, &config);
        // Anchoring advisories from the stop check ride along
        alerts.extend(
            stop_check
                .warnings
                .into_iter()
                .map(|w| Alert::warning("stop_placement", w)),
        );

        let signal = Signal::valid(
            evidence.symbol.clone(),
            evidence.timeframe,
            direction,
            evidence.current_price,
            confluence.score,
            levels,
        )
        .with_factors(confluence.factors)
        .with_position_size(sizing.position_size)
        .with_alerts(alerts);
        Ok(self.finish(signal))
    }

    /// Evaluate many symbols independently; no cross-symbol coupling.
    pub async fn bulk_evaluate(
        &self,
        symbols: &[String],
        timeframe: Timeframe,
        provider: &dyn EvidenceProvider,
        account: &AccountContext,
        options: &BulkOptions,
    ) -> Vec<BulkOutcome> {
        let mut outcomes = Vec::with_capacity(symbols.len());
        for symbol in symbols {
            let outcome = match provider.fetch_evidence(symbol, timeframe).await {
                Ok(evidence) => self.evaluate(&evidence, account),
                Err(e) => Err(e.into()),
            };
            match &outcome {
                Ok(signal) => {
                    if options.valid_only && !signal.is_actionable() {
                        continue;
                    }
                    if let Some(min) = options.min_confluence {
                        if signal.confluence_score < min {
                            continue;
                        }
                    }
                }
                Err(_) => {}
            }
            outcomes.push(BulkOutcome {
                symbol: symbol.clone(),
                outcome,
            });
        }
        outcomes
    }

    /// Snapshot of the running statistics.
    pub fn stats(&self) -> RunningStats {
        self.lock_stats().clone()
    }

    /// Explicit operator reset.
    pub fn reset_stats(&self) {
        self.lock_stats().reset();
    }

    /// Apply a partial configuration update.
    pub fn update_config(&self, update: ConfigUpdate) {
        let mut config = self.config.write().unwrap_or_else(|e| e.into_inner());
        config.apply(update);
        info!(
            min_confluence_score = config.scoring.min_confluence_score,
            min_risk_reward = %config.risk.min_risk_reward,
            "engine config updated"
        );
    }

    pub fn config_snapshot(&self) -> EngineConfig {
        self.config.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Push the configured cache sizing onto a caller-owned cache.
    pub fn apply_cache_settings(&self, cache: &SignalCache) {
        let settings = self.config_snapshot().cache;
        cache.set_max_size(settings.max_size);
        cache.set_default_ttl(Duration::from_secs(settings.ttl_secs));
    }

    /// Record a terminal signal exactly once, with a trace of the
    /// outcome.
    fn finish(&self, signal: Signal) -> Signal {
        self.lock_stats().record(&signal);
        match signal.signal_type {
            crate::signal::SignalType::Valid => info!(
                symbol = %signal.symbol,
                direction = signal.direction.as_str(),
                score = signal.confluence_score,
                "valid signal generated"
            ),
            _ => debug!(
                symbol = %signal.symbol,
                signal_type = ?signal.signal_type,
                score = signal.confluence_score,
                reasons = ?signal.reasons,
                "signal classified"
            ),
        }
        signal
    }

    fn lock_stats(&self) -> std::sync::MutexGuard<'_, RunningStats> {
        self.stats.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for SignalEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

/// Quality filters, evaluated exhaustively so the caller sees every
/// failing reason at once.
fn run_filters(
    evidence: &Evidence,
    levels: &SignalLevels,
    config: &EngineConfig,
) -> Vec<FilterFailure> {
    let mut failures = Vec::new();

    if let Some(vol) = &evidence.volatility {
        if vol.percentile > config.filters.extreme_volatility_pct && vol.expansion {
            failures.push(FilterFailure {
                code: "extreme_volatility",
                reason: format!(
                    "extreme_volatility: percentile {:.0} with expansion underway",
                    vol.percentile
                ),
            });
        }
    }

    if let Some(osc) = &evidence.oscillator {
        if osc.value >= config.filters.rsi_extreme_high
            || osc.value <= config.filters.rsi_extreme_low
        {
            failures.push(FilterFailure {
                code: "rsi_extreme",
                reason: format!("rsi_extreme: oscillator at {:.1}", osc.value),
            });
        }
    }

    let achieved = levels.risk_reward();
    if achieved < config.risk.min_risk_reward {
        failures.push(FilterFailure {
            code: "insufficient_risk_reward",
            reason: format!(
                "insufficient_risk_reward: {} below minimum {}",
                achieved.round_dp(2),
                config.risk.min_risk_reward
            ),
        });
    }

    failures
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evidence::{
        Divergence, DivergenceKind, LevelKind, OscillatorReading, StructuralLevel,
        VolatilityReading,
    };
    use crate::signal::SignalType;
    use rust_decimal::Decimal;

    fn bullish_evidence() -> Evidence {
        Evidence::new("BTCUSDT", Timeframe::Hour4, Decimal::from(50_000))
            .with_oscillator(OscillatorReading {
                value: 25.0,
                overbought: false,
                oversold: true,
                divergence: Some(Divergence {
                    kind: DivergenceKind::Bullish,
                    confirmed: true,
                }),
            })
            .with_levels(vec![StructuralLevel {
                price: Decimal::from(49_500),
                kind: LevelKind::Support,
                strength: 80.0,
            }])
    }

    fn bearish_evidence() -> Evidence {
        Evidence::new("ETHUSDT", Timeframe::Hour4, Decimal::from(3_000))
            .with_oscillator(OscillatorReading {
                value: 78.0,
                overbought: true,
                oversold: false,
                divergence: Some(Divergence {
                    kind: DivergenceKind::Bearish,
                    confirmed: true,
                }),
            })
            .with_levels(vec![StructuralLevel {
                price: Decimal::from(3_030),
                kind: LevelKind::Resistance,
                strength: 85.0,
            }])
    }

    #[test]
    fn test_valid_long_pipeline() {
        let engine = SignalEngine::default();
        let signal = engine
            .evaluate(&bullish_evidence(), &AccountContext::default())
            .unwrap();

        assert_eq!(signal.signal_type, SignalType::Valid);
        assert_eq!(signal.direction, Direction::Long);
        let levels = signal.levels.as_ref().unwrap();
        assert!(levels.stop_loss < levels.entry);
        assert!(levels.entry < levels.take_profit);
        assert!(signal.risk_reward.unwrap() >= Decimal::from(2));
        assert!(signal.position_size.is_some());
        assert!(!signal.factors.is_empty());
    }

    #[test]
    fn test_valid_short_pipeline() {
        let engine = SignalEngine::default();
        let signal = engine
            .evaluate(&bearish_evidence(), &AccountContext::default())
            .unwrap();

        assert_eq!(signal.signal_type, SignalType::Valid);
        assert_eq!(signal.direction, Direction::Short);
        let levels = signal.levels.as_ref().unwrap();
        assert!(levels.take_profit < levels.entry);
        assert!(levels.entry < levels.stop_loss);
        assert!(signal.risk_reward.unwrap() >= Decimal::from(2));
    }

    #[test]
    fn test_weak_evidence_goes_neutral() {
        let engine = SignalEngine::default();
        let evidence = Evidence::new("BTCUSDT", Timeframe::Hour1, Decimal::from(50_000));
        let signal = engine
            .evaluate(&evidence, &AccountContext::default())
            .unwrap();

        assert_eq!(signal.signal_type, SignalType::Neutral);
        assert_eq!(signal.direction, Direction::Neutral);
        assert_eq!(signal.message, "WAIT");
        assert!(signal.levels.is_none());
    }

    #[test]
    fn test_bad_account_rejected_with_reason() {
        let engine = SignalEngine::default();
        let account = AccountContext {
            balance: Decimal::from(1000),
            risk_pct: Decimal::from(10), // above the 2% cap
            leverage: Decimal::from(10),
        };
        let signal = engine.evaluate(&bullish_evidence(), &account).unwrap();

        assert_eq!(signal.signal_type, SignalType::Rejected);
        assert_eq!(signal.message, "AVOID");
        assert!(!signal.reasons.is_empty());
    }

    #[test]
    fn test_extreme_volatility_filtered() {
        let engine = SignalEngine::default();
        let evidence = bullish_evidence().with_volatility(VolatilityReading {
            percentile: 95.0,
            squeeze: false,
            expansion: true,
        });
        let signal = engine
            .evaluate(&evidence, &AccountContext::default())
            .unwrap();

        assert_eq!(signal.signal_type, SignalType::Filtered);
        assert_eq!(signal.message, "WAIT");
        assert!(signal
            .reasons
            .iter()
            .any(|r| r.contains("extreme_volatility")));
    }

    #[test]
    fn test_filters_report_every_failure() {
        // Oscillator beyond the secondary extreme AND extreme
        // volatility: both reasons must appear
        let mut evidence = bullish_evidence().with_volatility(VolatilityReading {
            percentile: 95.0,
            squeeze: false,
            expansion: true,
        });
        evidence.oscillator.as_mut().unwrap().value = 10.0;
        let engine = SignalEngine::default();
        let signal = engine
            .evaluate(&evidence, &AccountContext::default())
            .unwrap();

        assert_eq!(signal.signal_type, SignalType::Filtered);
        assert!(signal
            .reasons
            .iter()
            .any(|r| r.contains("extreme_volatility")));
        assert!(signal.reasons.iter().any(|r| r.contains("rsi_extreme")));
    }

    #[test]
    fn test_insufficient_risk_reward_reason() {
        // entry=50000, stop=49000 (risk 1000), target=50500 (reward 500)
        let levels = SignalLevels {
            entry: Decimal::from(50_000),
            stop_loss: Decimal::from(49_000),
            take_profit: Decimal::from(50_500),
        };
        let evidence = Evidence::new("BTCUSDT", Timeframe::Hour1, Decimal::from(50_000));
        let failures = run_filters(&evidence, &levels, &EngineConfig::default());

        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].code, "insufficient_risk_reward");
        assert!(failures[0].reason.contains("insufficient_risk_reward"));
    }

    #[test]
    fn test_non_positive_price_is_a_defect() {
        let engine = SignalEngine::default();
        let evidence = Evidence::new("BTCUSDT", Timeframe::Hour1, Decimal::ZERO);
        assert!(engine
            .evaluate(&evidence, &AccountContext::default())
            .is_err());
        // Defects do not count as terminal signals
        assert_eq!(engine.stats().signals_generated, 0);
    }

    #[test]
    fn test_stats_updated_once_per_evaluation() {
        let engine = SignalEngine::default();
        let account = AccountContext::default();
        for _ in 0..3 {
            engine.evaluate(&bullish_evidence(), &account).unwrap();
        }
        let neutral = Evidence::new("SOLUSDT", Timeframe::Hour1, Decimal::from(150));
        engine.evaluate(&neutral, &account).unwrap();

        let stats = engine.stats();
        assert_eq!(stats.signals_generated, 4);
        assert_eq!(stats.signals_valid, 3);
        assert_eq!(stats.signals_neutral, 1);
        assert_eq!(
            stats.long_count + stats.short_count + stats.neutral_count,
            4
        );

        engine.reset_stats();
        assert_eq!(engine.stats().signals_generated, 0);
    }

    #[test]
    fn test_update_config_raises_gate() {
        let engine = SignalEngine::default();
        engine.update_config(ConfigUpdate {
            min_confluence_score: Some(99.0),
            ..Default::default()
        });
        // Evidence that was a valid long now fails the gate
        let signal = engine
            .evaluate(&bullish_evidence(), &AccountContext::default())
            .unwrap();
        assert_eq!(signal.signal_type, SignalType::Neutral);
    }

    #[test]
    fn test_apply_cache_settings() {
        let engine = SignalEngine::default();
        engine.update_config(ConfigUpdate {
            cache_max_size: Some(2),
            ..Default::default()
        });
        let cache = SignalCache::new(bounded_cache::CacheConfig::default());
        engine.apply_cache_settings(&cache);

        let signal = engine
            .evaluate(&bullish_evidence(), &AccountContext::default())
            .unwrap();
        for symbol in ["A", "B", "C"] {
            cache.set(
                signal_cache_key(symbol, Timeframe::Hour4),
                signal.clone(),
                None,
            );
        }
        assert_eq!(cache.len(), 2);
    }

    struct StubProvider;

    #[async_trait]
    impl EvidenceProvider for StubProvider {
        async fn fetch_evidence(
            &self,
            symbol: &str,
            timeframe: Timeframe,
        ) -> anyhow::Result<Evidence> {
            if symbol == "BADUSDT" {
                anyhow::bail!("feed unavailable for {symbol}");
            }
            Ok(
                Evidence::new(symbol, timeframe, Decimal::from(50_000)).with_oscillator(
                    OscillatorReading {
                        value: 25.0,
                        overbought: false,
                        oversold: true,
                        divergence: Some(Divergence {
                            kind: DivergenceKind::Bullish,
                            confirmed: true,
                        }),
                    },
                ),
            )
        }
    }

    #[tokio::test]
    async fn test_bulk_evaluate_independent_outcomes() {
        let engine = SignalEngine::default();
        let symbols = vec![
            "BTCUSDT".to_string(),
            "BADUSDT".to_string(),
            "ETHUSDT".to_string(),
        ];
        let outcomes = engine
            .bulk_evaluate(
                &symbols,
                Timeframe::Hour4,
                &StubProvider,
                &AccountContext::default(),
                &BulkOptions::default(),
            )
            .await;

        assert_eq!(outcomes.len(), 3);
        assert!(outcomes[0].outcome.is_ok());
        assert!(outcomes[1].outcome.is_err());
        assert!(outcomes[2].outcome.is_ok());
    }

    #[tokio::test]
    async fn test_bulk_valid_only_drops_non_actionable() {
        let engine = SignalEngine::default();
        let symbols = vec!["BTCUSDT".to_string(), "BADUSDT".to_string()];
        let outcomes = engine
            .bulk_evaluate(
                &symbols,
                Timeframe::Hour4,
                &StubProvider,
                &AccountContext::default(),
                &BulkOptions {
                    valid_only: true,
                    min_confluence: None,
                },
            )
            .await;

        // The stub's good evidence is a valid long; the error is kept
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().any(|o| o.outcome.is_err()));
    }

    #[test]
    fn test_cache_key_is_normalized() {
        assert_eq!(
            signal_cache_key("btcusdt", Timeframe::Hour4),
            "BTCUSDT:4h"
        );
    }
}
