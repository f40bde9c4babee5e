use serde::{Deserialize, Serialize};
use thiserror::Error;

/// All errors generated in `barter-signals`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Error)]
pub enum SignalError {
    #[error("invalid observation for {instrument}: {reason}")]
    InvalidObservation { instrument: String, reason: String },

    #[error("invalid ThresholdConfig: {0}")]
    InvalidThresholds(String),

    #[error("failed to parse feed command: {0}")]
    Parse(String),
}

impl SignalError {
    pub fn invalid_observation(instrument: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidObservation {
            instrument: instrument.into(),
            reason: reason.into(),
        }
    }

    /// Determine if the error rejects a single observation while leaving the series intact.
    #[allow(clippy::match_like_matches_macro)]
    pub fn is_observation_rejection(&self) -> bool {
        match self {
            SignalError::InvalidObservation { .. } => true,
            _ => false,
        }
    }
}

impl From<serde_json::Error> for SignalError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SignalError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_error_is_observation_rejection() {
        struct TestCase {
            input: SignalError,
            expected: bool,
        }

        let tests = vec![
            TestCase {
                // TC0: rejection w/ SignalError::InvalidObservation
                input: SignalError::invalid_observation("BTC", "missing close price"),
                expected: true,
            },
            TestCase {
                // TC1: not a rejection w/ SignalError::InvalidThresholds
                input: SignalError::InvalidThresholds("rsi_oversold >= rsi_overbought".to_string()),
                expected: false,
            },
            TestCase {
                // TC2: not a rejection w/ SignalError::Parse
                input: SignalError::Parse("expected value at line 1 column 1".to_string()),
                expected: false,
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            let actual = test.input.is_observation_rejection();
            assert_eq!(actual, test.expected, "TC{} failed", index);
        }
    }

    #[test]
    fn test_from_serde_json_error() {
        let error = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        assert!(matches!(SignalError::from(error), SignalError::Parse(_)));
    }
}
