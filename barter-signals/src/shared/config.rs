//! Threshold and engine configuration

use serde::{Deserialize, Serialize};

use super::indicators::MacdSignalMode;
use super::series::DEFAULT_SERIES_CAPACITY;
use crate::error::{Result, SignalError};

/// Oscillator thresholds and indicator periods used by the classifier
///
/// Ordering between overbought and oversold bounds is not enforced on
/// construction. Call [`ThresholdConfig::validate`] to opt in.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ThresholdConfig {
    pub rsi_overbought: f64,
    pub rsi_oversold: f64,
    pub cci_overbought: f64,
    pub cci_oversold: f64,
    pub rsi_period: usize,
    pub cci_period: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            rsi_overbought: 70.0,
            rsi_oversold: 30.0,
            cci_overbought: 100.0,
            cci_oversold: -100.0,
            rsi_period: 14,
            cci_period: 20,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
        }
    }
}

impl ThresholdConfig {
    /// Set RSI overbought and oversold bounds
    pub fn with_rsi_bounds(mut self, overbought: f64, oversold: f64) -> Self {
        self.rsi_overbought = overbought;
        self.rsi_oversold = oversold;
        self
    }

    /// Set CCI overbought and oversold bounds
    pub fn with_cci_bounds(mut self, overbought: f64, oversold: f64) -> Self {
        self.cci_overbought = overbought;
        self.cci_oversold = oversold;
        self
    }

    pub fn with_rsi_period(mut self, period: usize) -> Self {
        self.rsi_period = period;
        self
    }

    pub fn with_cci_period(mut self, period: usize) -> Self {
        self.cci_period = period;
        self
    }

    /// Set MACD fast, slow and signal periods
    pub fn with_macd_periods(mut self, fast: usize, slow: usize, signal: usize) -> Self {
        self.macd_fast = fast;
        self.macd_slow = slow;
        self.macd_signal = signal;
        self
    }

    /// Check ordering and period invariants
    pub fn validate(&self) -> Result<()> {
        let bounds = [
            self.rsi_overbought,
            self.rsi_oversold,
            self.cci_overbought,
            self.cci_oversold,
        ];
        if bounds.iter().any(|b| !b.is_finite()) {
            return Err(SignalError::InvalidThresholds(
                "thresholds must be finite".to_string(),
            ));
        }
        if self.rsi_overbought <= self.rsi_oversold {
            return Err(SignalError::InvalidThresholds(format!(
                "rsi_overbought {} must exceed rsi_oversold {}",
                self.rsi_overbought, self.rsi_oversold
            )));
        }
        if self.cci_overbought <= self.cci_oversold {
            return Err(SignalError::InvalidThresholds(format!(
                "cci_overbought {} must exceed cci_oversold {}",
                self.cci_overbought, self.cci_oversold
            )));
        }

        let periods = [
            ("rsi_period", self.rsi_period),
            ("cci_period", self.cci_period),
            ("macd_fast", self.macd_fast),
            ("macd_slow", self.macd_slow),
            ("macd_signal", self.macd_signal),
        ];
        if let Some((name, _)) = periods.iter().find(|(_, period)| *period == 0) {
            return Err(SignalError::InvalidThresholds(format!(
                "{name} must be positive"
            )));
        }
        if self.macd_fast >= self.macd_slow {
            return Err(SignalError::InvalidThresholds(format!(
                "macd_fast {} must be shorter than macd_slow {}",
                self.macd_fast, self.macd_slow
            )));
        }

        Ok(())
    }
}

/// Configuration for a [`SignalEngine`](super::state::SignalEngine)
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Observations retained per instrument, fixed for the series lifetime
    pub series_capacity: usize,
    pub thresholds: ThresholdConfig,
    pub macd_signal: MacdSignalMode,
    /// Reject threshold updates that fail [`ThresholdConfig::validate`]
    pub validate_thresholds: bool,
    /// Maximum feed command channel buffer size
    pub channel_buffer_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            series_capacity: DEFAULT_SERIES_CAPACITY,
            thresholds: ThresholdConfig::default(),
            macd_signal: MacdSignalMode::default(),
            validate_thresholds: false,
            channel_buffer_size: 1000,
        }
    }
}

impl EngineConfig {
    pub fn with_series_capacity(mut self, capacity: usize) -> Self {
        self.series_capacity = capacity;
        self
    }

    pub fn with_thresholds(mut self, thresholds: ThresholdConfig) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn with_macd_signal(mut self, mode: MacdSignalMode) -> Self {
        self.macd_signal = mode;
        self
    }

    /// Enable threshold validation on construction and on every update
    pub fn with_validate_thresholds(mut self, validate: bool) -> Self {
        self.validate_thresholds = validate;
        self
    }

    pub fn with_channel_buffer_size(mut self, size: usize) -> Self {
        self.channel_buffer_size = size;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_defaults() {
        let config = ThresholdConfig::default();
        assert_eq!(
            (config.rsi_overbought, config.rsi_oversold),
            (70.0, 30.0)
        );
        assert_eq!(
            (config.cci_overbought, config.cci_oversold),
            (100.0, -100.0)
        );
        assert_eq!((config.rsi_period, config.cci_period), (14, 20));
        assert_eq!(
            (config.macd_fast, config.macd_slow, config.macd_signal),
            (12, 26, 9)
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_threshold_partial_json_takes_defaults() {
        let config: ThresholdConfig =
            serde_json::from_str(r#"{"rsi_oversold": 25, "cci_period": 10}"#).unwrap();
        assert_eq!(config.rsi_oversold, 25.0);
        assert_eq!(config.cci_period, 10);
        assert_eq!(config.rsi_overbought, 70.0);
        assert_eq!(config.macd_slow, 26);
    }

    #[test]
    fn test_threshold_validate() {
        struct TestCase {
            input: ThresholdConfig,
            expected_ok: bool,
        }

        let tests = vec![
            TestCase {
                // TC0: defaults
                input: ThresholdConfig::default(),
                expected_ok: true,
            },
            TestCase {
                // TC1: inverted RSI bounds
                input: ThresholdConfig::default().with_rsi_bounds(30.0, 70.0),
                expected_ok: false,
            },
            TestCase {
                // TC2: equal CCI bounds
                input: ThresholdConfig::default().with_cci_bounds(0.0, 0.0),
                expected_ok: false,
            },
            TestCase {
                // TC3: zero RSI period
                input: ThresholdConfig::default().with_rsi_period(0),
                expected_ok: false,
            },
            TestCase {
                // TC4: fast MACD period not shorter than slow
                input: ThresholdConfig::default().with_macd_periods(26, 12, 9),
                expected_ok: false,
            },
            TestCase {
                // TC5: non-finite bound
                input: ThresholdConfig::default().with_rsi_bounds(f64::NAN, 30.0),
                expected_ok: false,
            },
            TestCase {
                // TC6: tightened but ordered bounds
                input: ThresholdConfig::default()
                    .with_rsi_bounds(60.0, 40.0)
                    .with_cci_bounds(50.0, -50.0),
                expected_ok: true,
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            let actual = test.input.validate();
            assert_eq!(actual.is_ok(), test.expected_ok, "TC{} failed", index);
            if let Err(error) = actual {
                assert!(
                    matches!(error, SignalError::InvalidThresholds(_)),
                    "TC{} failed",
                    index
                );
            }
        }
    }

    #[test]
    fn test_engine_config_builder() {
        let config = EngineConfig::default()
            .with_series_capacity(20)
            .with_macd_signal(MacdSignalMode::Rolling)
            .with_validate_thresholds(true);

        assert_eq!(config.series_capacity, 20);
        assert_eq!(config.macd_signal, MacdSignalMode::Rolling);
        assert!(config.validate_thresholds);
        assert_eq!(config.thresholds, ThresholdConfig::default());
    }
}
