//! Bounded rolling window of observations for a single instrument.
//!
//! Append-only with FIFO eviction once capacity is reached. Readers receive
//! copies, never a mutable view of recorded history.

use std::collections::VecDeque;

use super::types::Observation;

/// Default number of observations retained per instrument
pub const DEFAULT_SERIES_CAPACITY: usize = 100;

/// Aggregate candle spanning the whole window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowCandle {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub price: f64,
}

/// Ring buffer storing the N most recent observations
#[derive(Debug, Clone)]
pub struct SeriesBuffer {
    observations: VecDeque<Observation>,
    capacity: usize,
}

impl SeriesBuffer {
    /// Create a buffer holding at most `capacity` observations (minimum 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            observations: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append to the tail, returning the evicted head when over capacity
    pub fn append(&mut self, observation: Observation) -> Option<Observation> {
        let evicted = if self.observations.len() >= self.capacity {
            self.observations.pop_front()
        } else {
            None
        };
        self.observations.push_back(observation);
        evicted
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Oldest-first copy of the current window
    pub fn to_vec(&self) -> Vec<Observation> {
        self.observations.iter().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Observation> {
        self.observations.iter()
    }

    pub fn first(&self) -> Option<&Observation> {
        self.observations.front()
    }

    pub fn last(&self) -> Option<&Observation> {
        self.observations.back()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.observations.iter().map(|o| o.close).collect()
    }

    pub fn highs(&self) -> Vec<f64> {
        self.observations.iter().map(|o| o.high).collect()
    }

    pub fn lows(&self) -> Vec<f64> {
        self.observations.iter().map(|o| o.low).collect()
    }

    pub fn volumes(&self) -> Vec<f64> {
        self.observations.iter().map(|o| o.volume).collect()
    }

    /// Highest high in the window
    pub fn range_high(&self) -> Option<f64> {
        self.observations.iter().map(|o| o.high).reduce(f64::max)
    }

    /// Lowest low in the window
    pub fn range_low(&self) -> Option<f64> {
        self.observations.iter().map(|o| o.low).reduce(f64::min)
    }

    /// First open, highest high, lowest low and latest close of the window
    pub fn window_candle(&self) -> Option<WindowCandle> {
        Some(WindowCandle {
            open: self.first()?.open,
            high: self.range_high()?,
            low: self.range_low()?,
            price: self.last()?.close,
        })
    }
}

impl Default for SeriesBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_SERIES_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn obs(i: i64, close: f64) -> Observation {
        let time = Utc.timestamp_opt(1_700_000_000 + i, 0).unwrap();
        Observation::new(time, close, close + 1.0, close - 1.0, close, 10.0)
    }

    #[test]
    fn test_series_buffer_ring_behavior() {
        let mut buffer = SeriesBuffer::new(20);

        let inserted: Vec<Observation> = (0..25).map(|i| obs(i, 100.0 + i as f64)).collect();
        let evicted: Vec<Observation> = inserted
            .iter()
            .filter_map(|o| buffer.append(*o))
            .collect();

        assert_eq!(buffer.len(), 20);
        assert_eq!(evicted, inserted[..5].to_vec());
        assert_eq!(buffer.to_vec()[0], inserted[5]);
        assert_eq!(buffer.last(), Some(&inserted[24]));
    }

    #[test]
    fn test_to_vec_is_a_copy() {
        let mut buffer = SeriesBuffer::new(3);
        buffer.append(obs(0, 100.0));

        let mut copy = buffer.to_vec();
        copy[0].close = 1.0;
        copy.push(obs(1, 2.0));

        assert_eq!(buffer.len(), 1);
        assert_eq!(buffer.first().map(|o| o.close), Some(100.0));
    }

    #[test]
    fn test_zero_capacity_clamped() {
        let mut buffer = SeriesBuffer::new(0);
        assert_eq!(buffer.capacity(), 1);
        buffer.append(obs(0, 1.0));
        buffer.append(obs(1, 2.0));
        assert_eq!(buffer.closes(), vec![2.0]);
    }

    #[test]
    fn test_window_candle() {
        let mut buffer = SeriesBuffer::new(10);
        assert!(buffer.window_candle().is_none());

        buffer.append(obs(0, 100.0));
        buffer.append(obs(1, 120.0));
        buffer.append(obs(2, 110.0));

        let candle = buffer.window_candle().unwrap();
        assert_eq!(candle.open, 100.0);
        assert_eq!(candle.high, 121.0);
        assert_eq!(candle.low, 99.0);
        assert_eq!(candle.price, 110.0);
    }
}
