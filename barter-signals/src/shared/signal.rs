//! Signal classification
//!
//! Reduces an [`IndicatorSnapshot`] and a [`ThresholdConfig`] to a
//! [`SignalLabel`] plus the ordered list of sub-conditions that held.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::config::ThresholdConfig;
use super::indicators::{calc_cci, calc_macd_with_mode, calc_obv, calc_rsi, Macd, MacdSignalMode};
use super::patterns::{
    classify_donchian, classify_fib, classify_pattern, CandlePattern, DonchianPosition, FibLevel,
};
use super::series::SeriesBuffer;
use super::types::InstrumentId;
use crate::error::SignalError;

/// RSI midpoint separating the BUY and SELL half-planes
pub const RSI_MIDPOINT: f64 = 50.0;

/// CCI magnitude backing the looser BUY/SELL rules
pub const CCI_BIAS: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalLabel {
    StrongBuy,
    Buy,
    Hold,
    Sell,
    StrongSell,
}

impl SignalLabel {
    pub const ALL: [SignalLabel; 5] = [
        SignalLabel::StrongBuy,
        SignalLabel::Buy,
        SignalLabel::Hold,
        SignalLabel::Sell,
        SignalLabel::StrongSell,
    ];

    /// Sort ordinal, STRONG_SELL lowest
    pub fn strength(&self) -> u8 {
        match self {
            SignalLabel::StrongSell => 0,
            SignalLabel::Sell => 1,
            SignalLabel::Hold => 2,
            SignalLabel::Buy => 3,
            SignalLabel::StrongBuy => 4,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SignalLabel::StrongBuy => "STRONG_BUY",
            SignalLabel::Buy => "BUY",
            SignalLabel::Hold => "HOLD",
            SignalLabel::Sell => "SELL",
            SignalLabel::StrongSell => "STRONG_SELL",
        }
    }

    pub fn is_strong(&self) -> bool {
        matches!(self, SignalLabel::StrongBuy | SignalLabel::StrongSell)
    }
}

impl fmt::Display for SignalLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for SignalLabel {
    type Err = SignalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalised = s.trim().to_uppercase().replace('-', "_");
        SignalLabel::ALL
            .into_iter()
            .find(|label| label.as_str() == normalised)
            .ok_or_else(|| SignalError::Parse(format!("unknown signal label: {s}")))
    }
}

/// Indicator values derived from one instrument's series
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize, Serialize)]
pub struct IndicatorSnapshot {
    pub rsi: f64,
    pub macd: Macd,
    pub cci: f64,
    pub obv: f64,
    pub fib_level: FibLevel,
    pub donchian: DonchianPosition,
    pub pattern: CandlePattern,
}

impl IndicatorSnapshot {
    pub fn compute(
        series: &SeriesBuffer,
        thresholds: &ThresholdConfig,
        macd_mode: MacdSignalMode,
    ) -> Self {
        let closes = series.closes();
        let highs = series.highs();
        let lows = series.lows();

        let (fib_level, donchian, pattern) = match series.window_candle() {
            Some(candle) => (
                classify_fib(candle.price, candle.high, candle.low),
                classify_donchian(candle.price, candle.high, candle.low),
                classify_pattern(&candle),
            ),
            None => Default::default(),
        };

        Self {
            rsi: calc_rsi(&closes, thresholds.rsi_period),
            macd: calc_macd_with_mode(
                &closes,
                thresholds.macd_fast,
                thresholds.macd_slow,
                thresholds.macd_signal,
                macd_mode,
            ),
            cci: calc_cci(&highs, &lows, &closes, thresholds.cci_period),
            obv: calc_obv(&closes, &series.volumes()),
            fib_level,
            donchian,
            pattern,
        }
    }
}

/// Sub-conditions recorded as reasons, listed in evaluation order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Condition {
    RsiOversold,
    RsiOverbought,
    RsiBelowMidpoint,
    RsiAboveMidpoint,
    MacdAboveSignal,
    MacdBelowSignal,
    CciOversold,
    CciOverbought,
    CciBelowBias,
    CciAboveBias,
}

impl Condition {
    const ORDER: [Condition; 10] = [
        Condition::RsiOversold,
        Condition::RsiOverbought,
        Condition::RsiBelowMidpoint,
        Condition::RsiAboveMidpoint,
        Condition::MacdAboveSignal,
        Condition::MacdBelowSignal,
        Condition::CciOversold,
        Condition::CciOverbought,
        Condition::CciBelowBias,
        Condition::CciAboveBias,
    ];

    fn holds(&self, s: &IndicatorSnapshot, t: &ThresholdConfig) -> bool {
        match self {
            Condition::RsiOversold => s.rsi < t.rsi_oversold,
            Condition::RsiOverbought => s.rsi > t.rsi_overbought,
            Condition::RsiBelowMidpoint => s.rsi < RSI_MIDPOINT,
            Condition::RsiAboveMidpoint => s.rsi > RSI_MIDPOINT,
            Condition::MacdAboveSignal => s.macd.is_bullish(),
            Condition::MacdBelowSignal => s.macd.is_bearish(),
            Condition::CciOversold => s.cci < t.cci_oversold,
            Condition::CciOverbought => s.cci > t.cci_overbought,
            Condition::CciBelowBias => s.cci < -CCI_BIAS,
            Condition::CciAboveBias => s.cci > CCI_BIAS,
        }
    }

    fn describe(&self, s: &IndicatorSnapshot, t: &ThresholdConfig) -> String {
        match self {
            Condition::RsiOversold => format!("RSI {:.2} < oversold {}", s.rsi, t.rsi_oversold),
            Condition::RsiOverbought => {
                format!("RSI {:.2} > overbought {}", s.rsi, t.rsi_overbought)
            }
            Condition::RsiBelowMidpoint => format!("RSI {:.2} < {}", s.rsi, RSI_MIDPOINT),
            Condition::RsiAboveMidpoint => format!("RSI {:.2} > {}", s.rsi, RSI_MIDPOINT),
            Condition::MacdAboveSignal => {
                format!("MACD {:.4} > signal {:.4}", s.macd.macd, s.macd.signal)
            }
            Condition::MacdBelowSignal => {
                format!("MACD {:.4} < signal {:.4}", s.macd.macd, s.macd.signal)
            }
            Condition::CciOversold => format!("CCI {:.2} < oversold {}", s.cci, t.cci_oversold),
            Condition::CciOverbought => {
                format!("CCI {:.2} > overbought {}", s.cci, t.cci_overbought)
            }
            Condition::CciBelowBias => format!("CCI {:.2} < -{}", s.cci, CCI_BIAS),
            Condition::CciAboveBias => format!("CCI {:.2} > {}", s.cci, CCI_BIAS),
        }
    }
}

/// Classify a snapshot, first matching rule wins
///
/// Reasons list every sub-condition that held, in fixed evaluation order,
/// regardless of which rule produced the label.
pub fn classify(snapshot: &IndicatorSnapshot, thresholds: &ThresholdConfig) -> (SignalLabel, Vec<String>) {
    let held = |c: Condition| c.holds(snapshot, thresholds);

    let label = if held(Condition::RsiOversold)
        && held(Condition::MacdAboveSignal)
        && held(Condition::CciOversold)
    {
        SignalLabel::StrongBuy
    } else if held(Condition::RsiOverbought)
        && held(Condition::MacdBelowSignal)
        && held(Condition::CciOverbought)
    {
        SignalLabel::StrongSell
    } else if held(Condition::RsiBelowMidpoint)
        && (held(Condition::MacdAboveSignal) || held(Condition::CciBelowBias))
    {
        SignalLabel::Buy
    } else if held(Condition::RsiAboveMidpoint)
        && (held(Condition::MacdBelowSignal) || held(Condition::CciAboveBias))
    {
        SignalLabel::Sell
    } else {
        SignalLabel::Hold
    };

    let reasons = Condition::ORDER
        .iter()
        .filter(|c| held(**c))
        .map(|c| c.describe(snapshot, thresholds))
        .collect();

    (label, reasons)
}

/// Classification of one instrument, replaced wholesale on every recompute
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SignalResult {
    pub instrument: InstrumentId,
    /// Latest close
    pub price: f64,
    /// 24h change in percent, as reported upstream
    pub change_24h: Option<f64>,
    /// Time of the newest observation in the series
    pub as_of: DateTime<Utc>,
    pub snapshot: IndicatorSnapshot,
    pub label: SignalLabel,
    pub reasons: Vec<String>,
}

impl SignalResult {
    /// Evaluate the series, `None` when it holds no observations
    pub fn evaluate(
        instrument: InstrumentId,
        series: &SeriesBuffer,
        change_24h: Option<f64>,
        thresholds: &ThresholdConfig,
        macd_mode: MacdSignalMode,
    ) -> Option<Self> {
        let latest = series.last()?;
        let snapshot = IndicatorSnapshot::compute(series, thresholds, macd_mode);
        let (label, reasons) = classify(&snapshot, thresholds);

        Some(Self {
            instrument,
            price: latest.close,
            change_24h,
            as_of: latest.time,
            snapshot,
            label,
            reasons,
        })
    }
}
