//! Signal engine state.
//!
//! Owns one [`SeriesBuffer`] and one cached [`SignalResult`] per instrument.
//! Results are swapped as whole `Arc`s, readers never observe a partial update.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use tracing::{debug, info, warn};

use super::config::{EngineConfig, ThresholdConfig};
use super::ranking::{rank, strong_alerts, SignalFilter, SortDirection, SortKey};
use super::series::SeriesBuffer;
use super::signal::SignalResult;
use super::types::{InstrumentId, Observation, ObservationMessage, TickerUpdate};
use crate::error::{Result, SignalError};

/// Per-instrument series and latest classification
#[derive(Debug, Clone)]
struct InstrumentState {
    series: SeriesBuffer,
    change_24h: Option<f64>,
    result: Option<Arc<SignalResult>>,
}

impl InstrumentState {
    fn new(capacity: usize) -> Self {
        Self {
            series: SeriesBuffer::new(capacity),
            change_24h: None,
            result: None,
        }
    }

    fn evaluate(&self, instrument: &InstrumentId, config: &EngineConfig) -> Option<SignalResult> {
        SignalResult::evaluate(
            instrument.clone(),
            &self.series,
            self.change_24h,
            &config.thresholds,
            config.macd_signal,
        )
    }
}

/// Point-in-time view of every instrument's result, in first-seen order
#[derive(Debug, Clone, Default)]
pub struct SignalSnapshot {
    pub results: Vec<Arc<SignalResult>>,
    pub thresholds: ThresholdConfig,
}

impl SignalSnapshot {
    pub fn board(&self, key: SortKey, direction: SortDirection, filter: SignalFilter) -> Vec<Arc<SignalResult>> {
        rank(self.results.iter().cloned(), key, direction, filter)
    }

    pub fn alerts(&self) -> Vec<Arc<SignalResult>> {
        strong_alerts(self.results.iter().cloned())
    }
}

/// Explicit context for ingestion, classification and ranking
#[derive(Debug, Clone)]
pub struct SignalEngine {
    config: EngineConfig,
    instruments: IndexMap<InstrumentId, InstrumentState>,
}

impl SignalEngine {
    /// Create an engine, validating thresholds when the config requires it
    pub fn new(config: EngineConfig) -> Result<Self> {
        if config.validate_thresholds {
            config.thresholds.validate()?;
        }

        Ok(Self {
            config,
            instruments: IndexMap::new(),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn thresholds(&self) -> &ThresholdConfig {
        &self.config.thresholds
    }

    /// Ingest a wire message, defaulting a missing time to now
    pub fn ingest(&mut self, message: ObservationMessage) -> Result<Arc<SignalResult>> {
        self.ingest_at(message, Utc::now())
    }

    pub fn ingest_at(
        &mut self,
        message: ObservationMessage,
        time_received: DateTime<Utc>,
    ) -> Result<Arc<SignalResult>> {
        let TickerUpdate {
            instrument,
            observation,
            change_24h,
        } = message.into_update(time_received).inspect_err(|error| {
            warn!(%error, "rejected observation");
        })?;

        self.push_observation(instrument, observation, change_24h)
    }

    /// Append a validated observation and recompute that instrument only
    ///
    /// Invalid observations are rejected before touching the series. A missing
    /// `change_24h` keeps the last reported value.
    pub fn push_observation(
        &mut self,
        instrument: InstrumentId,
        observation: Observation,
        change_24h: Option<f64>,
    ) -> Result<Arc<SignalResult>> {
        if let Err(error) = observation.validate(&instrument) {
            warn!(%error, "rejected observation");
            return Err(error);
        }

        let capacity = self.config.series_capacity;
        let state = self
            .instruments
            .entry(instrument.clone())
            .or_insert_with(|| InstrumentState::new(capacity));

        if let Some(evicted) = state.series.append(observation) {
            debug!(
                instrument = %instrument,
                evicted_time = %evicted.time,
                "series at capacity, evicted oldest observation"
            );
        }
        if change_24h.is_some() {
            state.change_24h = change_24h;
        }

        let result = state
            .evaluate(&instrument, &self.config)
            .map(Arc::new)
            .ok_or_else(|| {
                SignalError::invalid_observation(instrument.as_str(), "series empty after append")
            })?;

        Self::log_transition(state.result.as_deref(), &result);
        state.result = Some(Arc::clone(&result));

        Ok(result)
    }

    /// Replace thresholds and recompute every tracked instrument
    pub fn set_thresholds(&mut self, thresholds: ThresholdConfig) -> Result<()> {
        if self.config.validate_thresholds {
            if let Err(error) = thresholds.validate() {
                warn!(%error, "rejected threshold update");
                return Err(error);
            }
        }

        info!(?thresholds, "thresholds updated, recomputing all instruments");
        self.config.thresholds = thresholds;
        self.recompute_all();
        Ok(())
    }

    fn recompute_all(&mut self) {
        let config = self.config;
        for (instrument, state) in self.instruments.iter_mut() {
            let Some(result) = state.evaluate(instrument, &config) else {
                continue;
            };
            Self::log_transition(state.result.as_deref(), &result);
            state.result = Some(Arc::new(result));
        }
        debug!(instruments = self.instruments.len(), "recompute complete");
    }

    fn log_transition(previous: Option<&SignalResult>, current: &SignalResult) {
        match previous {
            Some(previous) if previous.label != current.label => info!(
                instrument = %current.instrument,
                from = %previous.label,
                to = %current.label,
                "signal changed"
            ),
            Some(_) => debug!(
                instrument = %current.instrument,
                label = %current.label,
                "signal recomputed"
            ),
            None => info!(
                instrument = %current.instrument,
                label = %current.label,
                "signal initialised"
            ),
        }
    }

    /// Recompute a result without storing it
    pub fn evaluate(&self, instrument: &InstrumentId) -> Option<SignalResult> {
        self.instruments
            .get(instrument)
            .and_then(|state| state.evaluate(instrument, &self.config))
    }

    pub fn result(&self, instrument: &InstrumentId) -> Option<Arc<SignalResult>> {
        self.instruments
            .get(instrument)
            .and_then(|state| state.result.clone())
    }

    /// Current results in first-seen instrument order
    pub fn results(&self) -> Vec<Arc<SignalResult>> {
        self.instruments
            .values()
            .filter_map(|state| state.result.clone())
            .collect()
    }

    /// Oldest-first copy of an instrument's series
    pub fn series(&self, instrument: &InstrumentId) -> Option<Vec<Observation>> {
        self.instruments
            .get(instrument)
            .map(|state| state.series.to_vec())
    }

    pub fn instruments(&self) -> impl Iterator<Item = &InstrumentId> {
        self.instruments.keys()
    }

    pub fn snapshot(&self) -> SignalSnapshot {
        SignalSnapshot {
            results: self.results(),
            thresholds: self.config.thresholds,
        }
    }

    pub fn board(&self, key: SortKey, direction: SortDirection, filter: SignalFilter) -> Vec<Arc<SignalResult>> {
        rank(self.results(), key, direction, filter)
    }
}
