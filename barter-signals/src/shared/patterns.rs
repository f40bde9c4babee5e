//! Price-level, channel and candle pattern classification
//!
//! Patterns are heuristics over the window candle `(price, open, high, low)`.
//! Rules overlap, so evaluation order is part of the contract: the first
//! matching rule in [`PATTERN_RULES`] wins.

use serde::{Deserialize, Serialize};

use super::series::WindowCandle;

/// Golden-ratio retracement depth
pub const FIB_RETRACEMENT: f64 = 0.618;

/// Fraction of the channel high above which price is an upper breakout
pub const DONCHIAN_UPPER_BAND: f64 = 0.98;

/// Multiple of the channel low below which price is a lower breakout
pub const DONCHIAN_LOWER_BAND: f64 = 1.02;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FibLevel {
    SupportProximate,
    #[default]
    None,
}

impl FibLevel {
    pub fn label(&self) -> &'static str {
        match self {
            FibLevel::SupportProximate => "FIB-SUPPORT",
            FibLevel::None => "-",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DonchianPosition {
    UpperBreakout,
    LowerBreakout,
    #[default]
    None,
}

impl DonchianPosition {
    pub fn label(&self) -> &'static str {
        match self {
            DonchianPosition::UpperBreakout => "UPPER-BREAKOUT",
            DonchianPosition::LowerBreakout => "LOWER-BREAKOUT",
            DonchianPosition::None => "-",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CandlePattern {
    BullishCandle,
    CupWithHandle,
    InverseHeadAndShoulders,
    DoubleBottom,
    BullFlag,
    Pennant,
    #[default]
    None,
}

impl CandlePattern {
    pub fn label(&self) -> &'static str {
        match self {
            CandlePattern::BullishCandle => "BULLISH-CANDLE",
            CandlePattern::CupWithHandle => "CUP-WITH-HANDLE",
            CandlePattern::InverseHeadAndShoulders => "INVERSE-H&S",
            CandlePattern::DoubleBottom => "DOUBLE-BOTTOM",
            CandlePattern::BullFlag => "BULL-FLAG",
            CandlePattern::Pennant => "PENNANT",
            CandlePattern::None => "-",
        }
    }
}

/// Ratios derived from a window candle that the pattern rules inspect
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CandleRatios {
    /// (price - open) / open
    pub body: f64,
    /// (high - low) / low
    pub range: f64,
    /// (open - low) / open, depth of the dip below the open
    pub dip: f64,
    /// (high - price) / high, distance below the high
    pub from_high: f64,
    /// (price - low) / (high - low), 0.5 for a zero-range candle
    pub close_position: f64,
}

impl CandleRatios {
    /// `None` when any price is non-positive or non-finite
    pub fn from_candle(candle: &WindowCandle) -> Option<Self> {
        let WindowCandle {
            open,
            high,
            low,
            price,
        } = *candle;

        let prices = [open, high, low, price];
        if prices.iter().any(|p| !p.is_finite() || *p <= 0.0) {
            return None;
        }

        let span = high - low;
        let close_position = if span > 0.0 {
            ((price - low) / span).clamp(0.0, 1.0)
        } else {
            0.5
        };

        Some(Self {
            body: (price - open) / open,
            range: span / low,
            dip: (open - low) / open,
            from_high: (high - price) / high,
            close_position,
        })
    }
}

pub type PatternRule = (CandlePattern, fn(&CandleRatios) -> bool);

/// Ordered pattern rules, first match wins
pub const PATTERN_RULES: &[PatternRule] = &[
    // Strong green candle closing in the upper fifth of its range
    (CandlePattern::BullishCandle, |r| {
        r.body > 0.03 && r.close_position > 0.8
    }),
    // Deep range recovered to just under the prior high
    (CandlePattern::CupWithHandle, |r| {
        r.range > 0.05 && r.from_high > 0.0 && r.from_high < 0.02 && r.body > 0.0
    }),
    // Sharp dip well below the open, closing back above it
    (CandlePattern::InverseHeadAndShoulders, |r| {
        r.dip > 0.04 && r.body > 0.0
    }),
    // Dip below the open, recovered to mid-range
    (CandlePattern::DoubleBottom, |r| {
        r.dip > 0.02 && (0.4..=0.7).contains(&r.close_position)
    }),
    // Small gain inside a tight range, holding the upper part
    (CandlePattern::BullFlag, |r| {
        r.body > 0.0 && r.body <= 0.01 && r.range < 0.03 && r.close_position > 0.6
    }),
    // Converged range
    (CandlePattern::Pennant, |r| r.range < 0.015),
];

/// Classify the window candle against [`PATTERN_RULES`]
pub fn classify_pattern(candle: &WindowCandle) -> CandlePattern {
    let Some(ratios) = CandleRatios::from_candle(candle) else {
        return CandlePattern::None;
    };

    PATTERN_RULES
        .iter()
        .find(|(_, matches)| matches(&ratios))
        .map(|(pattern, _)| *pattern)
        .unwrap_or_default()
}

/// Price at the 61.8% retracement of the `[low, high]` range
pub fn fib_retracement(high: f64, low: f64) -> f64 {
    high - (high - low) * FIB_RETRACEMENT
}

pub fn classify_fib(price: f64, high: f64, low: f64) -> FibLevel {
    if price <= fib_retracement(high, low) {
        FibLevel::SupportProximate
    } else {
        FibLevel::None
    }
}

pub fn classify_donchian(price: f64, high: f64, low: f64) -> DonchianPosition {
    if price > high * DONCHIAN_UPPER_BAND {
        DonchianPosition::UpperBreakout
    } else if price < low * DONCHIAN_LOWER_BAND {
        DonchianPosition::LowerBreakout
    } else {
        DonchianPosition::None
    }
}
