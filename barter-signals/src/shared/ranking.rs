//! Sorting and filtering of per-instrument signal results
//!
//! Sorting is stable: entries comparing equal keep their collection order, so
//! re-sorting after a partial update never reorders untouched rows.

use std::borrow::Borrow;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::signal::{SignalLabel, SignalResult};
use crate::error::SignalError;

/// Column a board can be ordered by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    Symbol,
    Price,
    Change24h,
    Rsi,
    Macd,
    Cci,
    Signal,
}

impl SortKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::Symbol => "symbol",
            SortKey::Price => "price",
            SortKey::Change24h => "change_24h",
            SortKey::Rsi => "rsi",
            SortKey::Macd => "macd",
            SortKey::Cci => "cci",
            SortKey::Signal => "signal",
        }
    }

    /// Ascending comparison of two results on this key
    ///
    /// Numeric keys use a total order (NaN sorts above every number) and a
    /// missing 24h change sorts below any reported value.
    pub fn compare(&self, a: &SignalResult, b: &SignalResult) -> Ordering {
        match self {
            SortKey::Symbol => a.instrument.as_str().cmp(b.instrument.as_str()),
            SortKey::Signal => a.label.strength().cmp(&b.label.strength()),
            SortKey::Price => a.price.total_cmp(&b.price),
            SortKey::Change24h => match (a.change_24h, b.change_24h) {
                (Some(a), Some(b)) => a.total_cmp(&b),
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Less,
                (Some(_), None) => Ordering::Greater,
            },
            SortKey::Rsi => a.snapshot.rsi.total_cmp(&b.snapshot.rsi),
            SortKey::Macd => a.snapshot.macd.macd.total_cmp(&b.snapshot.macd.macd),
            SortKey::Cci => a.snapshot.cci.total_cmp(&b.snapshot.cci),
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for SortKey {
    type Err = SignalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "symbol" => Ok(SortKey::Symbol),
            "price" => Ok(SortKey::Price),
            "change_24h" | "change24h" | "change" => Ok(SortKey::Change24h),
            "rsi" => Ok(SortKey::Rsi),
            "macd" => Ok(SortKey::Macd),
            "cci" => Ok(SortKey::Cci),
            "signal" => Ok(SortKey::Signal),
            _ => Err(SignalError::Parse(format!("unknown sort key: {s}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn reverse(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }
}

impl FromStr for SortDirection {
    type Err = SignalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "asc" | "ascending" => Ok(SortDirection::Ascending),
            "desc" | "descending" => Ok(SortDirection::Descending),
            _ => Err(SignalError::Parse(format!("unknown sort direction: {s}"))),
        }
    }
}

/// Column sort state where each key remembers its own direction
///
/// Selecting a key for the first time sorts ascending; selecting it again
/// flips that key's direction.
#[derive(Debug, Clone, Default)]
pub struct SortState {
    directions: HashMap<SortKey, SortDirection>,
    active: Option<(SortKey, SortDirection)>,
}

impl SortState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Select a key, returning the direction to sort by
    pub fn select(&mut self, key: SortKey) -> SortDirection {
        let direction = match self.directions.get(&key) {
            Some(previous) => previous.reverse(),
            None => SortDirection::Ascending,
        };
        self.directions.insert(key, direction);
        self.active = Some((key, direction));
        direction
    }

    /// Most recently selected key and direction
    pub fn active(&self) -> Option<(SortKey, SortDirection)> {
        self.active
    }
}

/// Result filter for the board view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignalFilter {
    #[default]
    All,
    Only(SignalLabel),
}

impl SignalFilter {
    pub fn matches(&self, result: &SignalResult) -> bool {
        match self {
            SignalFilter::All => true,
            SignalFilter::Only(label) => result.label == *label,
        }
    }
}

impl FromStr for SignalFilter {
    type Err = SignalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("ALL") {
            return Ok(SignalFilter::All);
        }
        s.parse().map(SignalFilter::Only)
    }
}

/// Stable in-place sort
pub fn sort_results<R: Borrow<SignalResult>>(results: &mut [R], key: SortKey, direction: SortDirection) {
    match direction {
        SortDirection::Ascending => {
            results.sort_by(|a, b| key.compare(a.borrow(), b.borrow()))
        }
        SortDirection::Descending => {
            results.sort_by(|a, b| key.compare(b.borrow(), a.borrow()))
        }
    }
}

pub fn filter_results<R: Borrow<SignalResult>>(results: impl IntoIterator<Item = R>, filter: SignalFilter) -> Vec<R> {
    results
        .into_iter()
        .filter(|result| filter.matches(result.borrow()))
        .collect()
}

/// STRONG_BUY and STRONG_SELL results, in collection order
pub fn strong_alerts<R: Borrow<SignalResult>>(results: impl IntoIterator<Item = R>) -> Vec<R> {
    results
        .into_iter()
        .filter(|result| result.borrow().label.is_strong())
        .collect()
}

/// Filter then stable sort
pub fn rank<R: Borrow<SignalResult>>(
    results: impl IntoIterator<Item = R>,
    key: SortKey,
    direction: SortDirection,
    filter: SignalFilter,
) -> Vec<R> {
    let mut ranked = filter_results(results, filter);
    sort_results(&mut ranked, key, direction);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::indicators::Macd;
    use crate::shared::signal::IndicatorSnapshot;
    use crate::shared::types::InstrumentId;
    use chrono::{TimeZone, Utc};

    fn result(symbol: &str, price: f64, rsi: f64, label: SignalLabel) -> SignalResult {
        SignalResult {
            instrument: InstrumentId::new(symbol),
            price,
            change_24h: None,
            as_of: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            snapshot: IndicatorSnapshot {
                rsi,
                macd: Macd::new(0.0, 0.0),
                ..Default::default()
            },
            label,
            reasons: vec![],
        }
    }

    fn symbols<R: Borrow<SignalResult>>(results: &[R]) -> Vec<&str> {
        results.iter().map(|r| r.borrow().instrument.as_str()).collect()
    }

    #[test]
    fn test_sort_by_signal_strength() {
        let mut results = vec![
            result("HOLD", 1.0, 50.0, SignalLabel::Hold),
            result("SB", 1.0, 50.0, SignalLabel::StrongBuy),
            result("SS", 1.0, 50.0, SignalLabel::StrongSell),
            result("B", 1.0, 50.0, SignalLabel::Buy),
            result("S", 1.0, 50.0, SignalLabel::Sell),
        ];

        sort_results(&mut results, SortKey::Signal, SortDirection::Descending);
        assert_eq!(symbols(&results), vec!["SB", "B", "HOLD", "S", "SS"]);
    }

    #[test]
    fn test_sort_is_stable_for_equal_keys() {
        let mut results = vec![
            result("A", 100.0, 40.0, SignalLabel::Hold),
            result("B", 200.0, 60.0, SignalLabel::Hold),
            result("C", 100.0, 40.0, SignalLabel::Hold),
            result("D", 300.0, 60.0, SignalLabel::Hold),
            result("E", 100.0, 40.0, SignalLabel::Hold),
        ];

        sort_results(&mut results, SortKey::Rsi, SortDirection::Descending);
        assert_eq!(symbols(&results), vec!["B", "D", "A", "C", "E"]);

        sort_results(&mut results, SortKey::Rsi, SortDirection::Ascending);
        assert_eq!(symbols(&results), vec!["A", "C", "E", "B", "D"]);
    }

    #[test]
    fn test_sort_with_nan_is_total_order() {
        let mut results = vec![
            result("NAN", f64::NAN, f64::NAN, SignalLabel::Hold),
            result("HIGH", 3.0, 70.0, SignalLabel::Hold),
            result("NAN2", f64::NAN, f64::NAN, SignalLabel::Hold),
            result("LOW", 1.0, 20.0, SignalLabel::Hold),
            result("MID", 2.0, 50.0, SignalLabel::Hold),
        ];

        sort_results(&mut results, SortKey::Rsi, SortDirection::Ascending);
        assert_eq!(symbols(&results), vec!["LOW", "MID", "HIGH", "NAN", "NAN2"]);

        sort_results(&mut results, SortKey::Price, SortDirection::Descending);
        assert_eq!(symbols(&results), vec!["NAN", "NAN2", "HIGH", "MID", "LOW"]);

        // Comparisons stay consistent in both directions
        for a in &results {
            for b in &results {
                assert_eq!(
                    SortKey::Rsi.compare(a, b),
                    SortKey::Rsi.compare(b, a).reverse()
                );
            }
        }
    }

    #[test]
    fn test_sort_missing_change_below_reported() {
        let with_change = |symbol: &str, change: Option<f64>| SignalResult {
            change_24h: change,
            ..result(symbol, 1.0, 50.0, SignalLabel::Hold)
        };
        let mut results = vec![
            with_change("UP", Some(4.5)),
            with_change("NONE", None),
            with_change("DOWN", Some(-2.0)),
            with_change("NONE2", None),
        ];

        sort_results(&mut results, SortKey::Change24h, SortDirection::Ascending);
        assert_eq!(symbols(&results), vec!["NONE", "NONE2", "DOWN", "UP"]);
    }

    #[test]
    fn test_sort_state_toggles_per_key() {
        let mut state = SortState::new();
        assert_eq!(state.active(), None);

        assert_eq!(state.select(SortKey::Price), SortDirection::Ascending);
        assert_eq!(state.select(SortKey::Price), SortDirection::Descending);
        assert_eq!(state.select(SortKey::Rsi), SortDirection::Ascending);
        // Price keeps its own direction while another column is active
        assert_eq!(state.select(SortKey::Price), SortDirection::Ascending);
        assert_eq!(state.active(), Some((SortKey::Price, SortDirection::Ascending)));
    }

    #[test]
    fn test_filter_and_alerts() {
        let results = vec![
            result("BTC", 1.0, 20.0, SignalLabel::StrongBuy),
            result("ETH", 1.0, 45.0, SignalLabel::Buy),
            result("XRP", 1.0, 80.0, SignalLabel::StrongSell),
        ];

        let buys = filter_results(&results, SignalFilter::Only(SignalLabel::Buy));
        assert_eq!(symbols(&buys), vec!["ETH"]);

        let all = filter_results(&results, SignalFilter::All);
        assert_eq!(all.len(), 3);

        let alerts = strong_alerts(&results);
        assert_eq!(symbols(&alerts), vec!["BTC", "XRP"]);
    }

    #[test]
    fn test_rank_filters_then_sorts() {
        let results = vec![
            result("LOW", 10.0, 45.0, SignalLabel::Buy),
            result("SKIP", 99.0, 60.0, SignalLabel::Sell),
            result("HIGH", 30.0, 40.0, SignalLabel::Buy),
        ];

        let ranked = rank(
            &results,
            SortKey::Price,
            SortDirection::Descending,
            SignalFilter::Only(SignalLabel::Buy),
        );
        assert_eq!(symbols(&ranked), vec!["HIGH", "LOW"]);
    }

    #[test]
    fn test_parse_keys_and_filters() {
        struct TestCase {
            input: &'static str,
            expected: Option<SortKey>,
        }

        let tests = vec![
            TestCase {
                // TC0: lower case
                input: "rsi",
                expected: Some(SortKey::Rsi),
            },
            TestCase {
                // TC1: dashboard column alias
                input: "change24h",
                expected: Some(SortKey::Change24h),
            },
            TestCase {
                // TC2: upper case with whitespace
                input: " SIGNAL ",
                expected: Some(SortKey::Signal),
            },
            TestCase {
                // TC3: unknown column
                input: "volume",
                expected: None,
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            let actual = test.input.parse::<SortKey>().ok();
            assert_eq!(actual, test.expected, "TC{} failed", index);
        }

        assert_eq!("ALL".parse::<SignalFilter>().unwrap(), SignalFilter::All);
        assert_eq!(
            "STRONG_BUY".parse::<SignalFilter>().unwrap(),
            SignalFilter::Only(SignalLabel::StrongBuy)
        );
        assert!("NOPE".parse::<SignalFilter>().is_err());
        assert_eq!("desc".parse::<SortDirection>().unwrap(), SortDirection::Descending);
    }
}
