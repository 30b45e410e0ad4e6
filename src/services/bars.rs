//! Tick-to-bar aggregation.
//!
//! Buckets live ticks into OHLC bars at one-minute and one-hour resolutions
//! with bounded retention, so the UI can chart a session without a separate
//! historical feed. Trades are overlaid client-side by timestamp match.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::types::DataTick;

/// One OHLC bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OhlcBar {
    /// Bucket start, seconds since epoch.
    pub time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl OhlcBar {
    fn new(time: i64, price: f64) -> Self {
        Self {
            time,
            open: price,
            high: price,
            low: price,
            close: price,
        }
    }

    fn update(&mut self, price: f64) {
        self.high = self.high.max(price);
        self.low = self.low.min(price);
        self.close = price;
    }
}

/// Chart range selector for the klines endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BarRange {
    OneHour,
    OneDay,
    OneWeek,
}

impl BarRange {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "1h" => Some(BarRange::OneHour),
            "1d" => Some(BarRange::OneDay),
            "1w" => Some(BarRange::OneWeek),
            _ => None,
        }
    }

    fn duration_seconds(&self) -> i64 {
        match self {
            BarRange::OneHour => 3600,
            BarRange::OneDay => 86_400,
            BarRange::OneWeek => 7 * 86_400,
        }
    }
}

/// Fixed-size series of bars at one resolution.
#[derive(Debug)]
struct BarSeries {
    bucket_seconds: i64,
    bars: VecDeque<OhlcBar>,
    max_bars: usize,
}

impl BarSeries {
    fn new(bucket_seconds: i64, max_bars: usize) -> Self {
        Self {
            bucket_seconds,
            bars: VecDeque::with_capacity(max_bars),
            max_bars,
        }
    }

    fn add_price(&mut self, price: f64, timestamp_ms: i64) {
        let bucket_time = (timestamp_ms / 1000) / self.bucket_seconds * self.bucket_seconds;

        if let Some(last) = self.bars.back_mut() {
            if last.time == bucket_time {
                last.update(price);
                return;
            }
        }

        self.bars.push_back(OhlcBar::new(bucket_time, price));
        while self.bars.len() > self.max_bars {
            self.bars.pop_front();
        }
    }

    fn bars_since(&self, start_time: i64) -> Vec<OhlcBar> {
        self.bars
            .iter()
            .filter(|b| b.time >= start_time)
            .copied()
            .collect()
    }
}

#[derive(Debug)]
struct SymbolBars {
    one_minute: BarSeries,
    one_hour: BarSeries,
}

impl Default for SymbolBars {
    fn default() -> Self {
        Self {
            // 24h of minute bars, ~3 weeks of hour bars.
            one_minute: BarSeries::new(60, 1_440),
            one_hour: BarSeries::new(3_600, 512),
        }
    }
}

/// Per-symbol OHLC bar store fed by the session tick loop.
#[derive(Default)]
pub struct BarStore {
    data: DashMap<String, SymbolBars>,
}

impl BarStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one tick into every resolution.
    pub fn record_tick(&self, tick: &DataTick) {
        let mut entry = self.data.entry(tick.symbol.clone()).or_default();
        entry.one_minute.add_price(tick.price, tick.timestamp);
        entry.one_hour.add_price(tick.price, tick.timestamp);
    }

    /// Bars for a symbol over the requested range, minute bars for an hour,
    /// hour bars beyond that.
    pub fn bars(&self, symbol: &str, range: BarRange) -> Vec<OhlcBar> {
        let Some(entry) = self.data.get(symbol) else {
            return Vec::new();
        };

        let now = chrono::Utc::now().timestamp();
        let start_time = now - range.duration_seconds();

        match range {
            BarRange::OneHour => entry.one_minute.bars_since(start_time),
            BarRange::OneDay | BarRange::OneWeek => entry.one_hour.bars_since(start_time),
        }
    }

    /// Drop all bars (on fresh session start).
    pub fn clear(&self) {
        self.data.clear();
    }
}
