//! RSI, EMA/MACD, CCI and OBV calculation functions
//!
//! All functions are pure and never fail: insufficient history and
//! non-finite intermediate results resolve to a documented neutral value.

use serde::{Deserialize, Serialize};

/// RSI returned while fewer than `period + 1` closes are available
pub const RSI_NEUTRAL: f64 = 50.0;

/// Maximum number of leading points blended into an EMA
pub const EMA_MAX_DEPTH: usize = 50;

/// Lambert's constant scaling the CCI mean deviation
const CCI_CONSTANT: f64 = 0.015;

/// MACD line, signal line and histogram
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize, Serialize)]
pub struct Macd {
    pub macd: f64,
    pub signal: f64,
    pub histogram: f64,
}

impl Macd {
    pub fn new(macd: f64, signal: f64) -> Self {
        Self {
            macd,
            signal,
            histogram: macd - signal,
        }
    }

    pub fn is_bullish(&self) -> bool {
        self.macd > self.signal
    }

    pub fn is_bearish(&self) -> bool {
        self.macd < self.signal
    }
}

/// How the MACD signal line is derived
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MacdSignalMode {
    /// EMA of the single current MACD value (equals the MACD line)
    #[default]
    Scalar,
    /// EMA over the MACD line evaluated at every prefix of the series
    Rolling,
}

#[inline]
fn finite_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}

/// Relative Strength Index over the last `period` price changes
///
/// Returns a value in `[0, 100]`. Fewer than `period + 1` closes yield 50,
/// zero average loss yields 100.
pub fn calc_rsi(closes: &[f64], period: usize) -> f64 {
    if period == 0 || closes.len() <= period {
        return RSI_NEUTRAL;
    }

    let recent = &closes[closes.len() - period - 1..];
    let (gains, losses) = recent
        .windows(2)
        .map(|w| w[1] - w[0])
        .fold((0.0, 0.0), |(gains, losses), change| {
            if change > 0.0 {
                (gains + change, losses)
            } else {
                (gains, losses - change)
            }
        });

    let avg_gain = gains / period as f64;
    let avg_loss = losses / period as f64;

    if avg_loss == 0.0 {
        return 100.0;
    }

    let rs = avg_gain / avg_loss;
    finite_or(100.0 - (100.0 / (1.0 + rs)), RSI_NEUTRAL).clamp(0.0, 100.0)
}

/// Exponential moving average seeded with the first value
///
/// Only the first [`EMA_MAX_DEPTH`] points are blended. Empty input yields 0.
pub fn calc_ema(values: &[f64], period: usize) -> f64 {
    let Some(&seed) = values.first() else {
        return 0.0;
    };

    let k = 2.0 / (period as f64 + 1.0);
    let ema = values
        .iter()
        .take(EMA_MAX_DEPTH)
        .skip(1)
        .fold(seed, |ema, value| value * k + ema * (1.0 - k));

    finite_or(ema, 0.0)
}

/// MACD with the signal line derived from the scalar MACD value
pub fn calc_macd(closes: &[f64], fast: usize, slow: usize, signal: usize) -> Macd {
    let macd_line = calc_ema(closes, fast) - calc_ema(closes, slow);
    let signal_line = calc_ema(&[macd_line], signal);
    Macd::new(macd_line, signal_line)
}

/// MACD with the signal line taken as an EMA over the MACD line series
pub fn calc_macd_rolling(closes: &[f64], fast: usize, slow: usize, signal: usize) -> Macd {
    let macd_series: Vec<f64> = (1..=closes.len())
        .map(|end| calc_ema(&closes[..end], fast) - calc_ema(&closes[..end], slow))
        .collect();

    let macd_line = macd_series.last().copied().unwrap_or(0.0);
    let start = macd_series.len().saturating_sub(EMA_MAX_DEPTH);
    let signal_line = calc_ema(&macd_series[start..], signal);
    Macd::new(macd_line, signal_line)
}

/// Dispatch on [`MacdSignalMode`]
pub fn calc_macd_with_mode(
    closes: &[f64],
    fast: usize,
    slow: usize,
    signal: usize,
    mode: MacdSignalMode,
) -> Macd {
    match mode {
        MacdSignalMode::Scalar => calc_macd(closes, fast, slow, signal),
        MacdSignalMode::Rolling => calc_macd_rolling(closes, fast, slow, signal),
    }
}

/// Commodity Channel Index over the last `period` typical prices
///
/// Fewer than `period` points, or a zero mean deviation, yield 0.
pub fn calc_cci(highs: &[f64], lows: &[f64], closes: &[f64], period: usize) -> f64 {
    let len = highs.len().min(lows.len()).min(closes.len());
    if period == 0 || len < period {
        return 0.0;
    }

    let typical: Vec<f64> = (0..len)
        .map(|i| (highs[i] + lows[i] + closes[i]) / 3.0)
        .collect();
    let window = &typical[len - period..];

    let sma = window.iter().sum::<f64>() / period as f64;
    let mean_deviation = window.iter().map(|tp| (tp - sma).abs()).sum::<f64>() / period as f64;

    let cci = (typical[len - 1] - sma) / (CCI_CONSTANT * mean_deviation);
    finite_or(cci, 0.0)
}

/// On-Balance Volume, accumulated oldest to newest
pub fn calc_obv(closes: &[f64], volumes: &[f64]) -> f64 {
    let obv = closes
        .windows(2)
        .zip(volumes.iter().skip(1))
        .fold(0.0, |obv, (w, volume)| {
            if w[1] > w[0] {
                obv + volume
            } else if w[1] < w[0] {
                obv - volume
            } else {
                obv
            }
        });

    finite_or(obv, 0.0)
}
