/// Core data types for price observations
///
/// These types match the JSON feed format consumed by the signal engine.
/// Upstream tickers frequently send prices as decimal strings, so the wire
/// envelope parses [`Decimal`] and converts to `f64` once at the boundary.
use crate::error::{Result, SignalError};
use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Instrument identifier (e.g., "BTC", "ETH")
///
/// Normalised to upper case so "btc" and "BTC" address the same series.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
pub struct InstrumentId(SmolStr);

impl InstrumentId {
    pub fn new(symbol: impl AsRef<str>) -> Self {
        Self(SmolStr::new(symbol.as_ref().trim().to_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl std::fmt::Display for InstrumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

impl From<&str> for InstrumentId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// A single recorded price/volume observation
///
/// Immutable once appended to a [`SeriesBuffer`](super::series::SeriesBuffer).
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct Observation {
    pub time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Observation {
    pub fn new(time: DateTime<Utc>, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            time,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Observation where open, high and low all equal the close
    pub fn from_close(time: DateTime<Utc>, close: f64, volume: f64) -> Self {
        Self::new(time, close, close, close, close, volume)
    }

    /// Check the observation is admissible to a series
    pub fn validate(&self, instrument: &InstrumentId) -> Result<()> {
        let reject = |reason: &str| Err(SignalError::invalid_observation(instrument.as_str(), reason));

        let prices = [self.open, self.high, self.low, self.close];
        if prices.iter().any(|p| !p.is_finite()) || !self.volume.is_finite() {
            return reject("non-finite price or volume");
        }
        if self.close <= 0.0 {
            return reject("close price must be positive");
        }
        if self.open <= 0.0 || self.low <= 0.0 {
            return reject("open and low prices must be positive");
        }
        if self.high < self.low {
            return reject("high price below low price");
        }
        if self.volume < 0.0 {
            return reject("negative volume");
        }

        Ok(())
    }
}

/// Observation envelope received from the external data-acquisition component
///
/// Only `close` is mandatory. Missing `open`/`high`/`low` default to the close,
/// missing `volume` to zero and missing `time` to the receive time.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ObservationMessage {
    pub instrument: String,
    #[serde(default)]
    pub time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub open: Option<Decimal>,
    #[serde(default)]
    pub high: Option<Decimal>,
    #[serde(default)]
    pub low: Option<Decimal>,
    #[serde(default)]
    pub close: Option<Decimal>,
    #[serde(default)]
    pub volume: Option<Decimal>,
    /// 24h change in percent, when the upstream ticker reports one
    #[serde(default)]
    pub change_24h: Option<Decimal>,
}

/// Validated observation ready for ingestion
#[derive(Debug, Clone, PartialEq)]
pub struct TickerUpdate {
    pub instrument: InstrumentId,
    pub observation: Observation,
    pub change_24h: Option<f64>,
}

impl ObservationMessage {
    /// Convert the wire envelope into a validated [`TickerUpdate`]
    pub fn into_update(self, time_received: DateTime<Utc>) -> Result<TickerUpdate> {
        if self.instrument.trim().is_empty() {
            return Err(SignalError::invalid_observation("<empty>", "missing instrument"));
        }
        let instrument = InstrumentId::new(&self.instrument);

        let to_f64 = |field: &str, value: Decimal| {
            value.to_f64().ok_or_else(|| {
                SignalError::invalid_observation(
                    instrument.as_str(),
                    format!("{field} is not representable as f64"),
                )
            })
        };

        let close = match self.close {
            Some(close) => to_f64("close", close)?,
            None => {
                return Err(SignalError::invalid_observation(
                    instrument.as_str(),
                    "missing close price",
                ))
            }
        };
        let open = self.open.map(|v| to_f64("open", v)).transpose()?.unwrap_or(close);
        let high = self.high.map(|v| to_f64("high", v)).transpose()?.unwrap_or(close);
        let low = self.low.map(|v| to_f64("low", v)).transpose()?.unwrap_or(close);
        let volume = self.volume.map(|v| to_f64("volume", v)).transpose()?.unwrap_or(0.0);
        let change_24h = self
            .change_24h
            .map(|v| to_f64("change_24h", v))
            .transpose()?;

        let observation = Observation::new(
            self.time.unwrap_or(time_received),
            open,
            high,
            low,
            close,
            volume,
        );
        observation.validate(&instrument)?;

        Ok(TickerUpdate {
            instrument,
            observation,
            change_24h,
        })
    }
}
