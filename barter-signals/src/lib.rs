/// Barter Signals - Indicator & Signal Classification Library
///
/// This library turns per-instrument price/volume series into technical
/// indicators and a discrete trading signal:
/// - signal-monitor: headless board fed by JSON-lines observations
///
/// The library includes:
/// - Bounded rolling series per instrument
/// - RSI, EMA/MACD, CCI and OBV calculations
/// - Fibonacci, Donchian and candle pattern classification
/// - Threshold-driven signal classifier with an ordered reason trail
/// - Stable ranking and filtering of results
/// - Feed driver applying commands in arrival order
pub mod error;
pub mod shared;

pub use error::{Result, SignalError};

// Re-export commonly used types for convenience
pub use shared::types::{InstrumentId, Observation, ObservationMessage, TickerUpdate};

pub use shared::config::{EngineConfig, ThresholdConfig};
pub use shared::series::{SeriesBuffer, WindowCandle, DEFAULT_SERIES_CAPACITY};

pub use shared::indicators::{
    calc_cci, calc_ema, calc_macd, calc_macd_rolling, calc_macd_with_mode, calc_obv, calc_rsi,
    Macd, MacdSignalMode,
};
pub use shared::patterns::{
    classify_donchian, classify_fib, classify_pattern, CandlePattern, DonchianPosition, FibLevel,
};

pub use shared::signal::{classify, IndicatorSnapshot, SignalLabel, SignalResult};
pub use shared::ranking::{
    filter_results, rank, sort_results, strong_alerts, SignalFilter, SortDirection, SortKey,
    SortState,
};

// Signal engine and feed driver
pub use shared::feed::{apply_command, forward_lines, parse_feed_command, spawn_signal_feed, FeedCommand};
pub use shared::state::{SignalEngine, SignalSnapshot};
