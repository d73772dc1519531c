use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::domain::Bar;

/// Ordered OHLCV series with a timestamp index.
///
/// Bars are sorted ascending by timestamp at construction (stable sort, so
/// duplicate timestamps keep their input order) and immutable afterwards.
#[derive(Debug, Clone)]
pub struct MarketSeries {
    bars: Vec<Bar>,
    // Timestamp -> index of the FIRST bar at that timestamp, so range
    // queries never skip duplicates.
    index: BTreeMap<DateTime<Utc>, usize>,
}

impl MarketSeries {
    pub fn new(mut bars: Vec<Bar>) -> Self {
        bars.sort_by_key(|b| b.timestamp);
        let mut index = BTreeMap::new();
        for (i, bar) in bars.iter().enumerate() {
            index.entry(bar.timestamp).or_insert(i);
        }
        Self { bars, index }
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn get(&self, index: usize) -> Option<&Bar> {
        self.bars.get(index)
    }

    /// Index of the first bar at exactly `timestamp`, if present.
    pub fn index_of(&self, timestamp: DateTime<Utc>) -> Option<usize> {
        self.index.get(&timestamp).copied()
    }

    /// Bars with `start <= timestamp <= end`, in series order.
    ///
    /// O(log n) lookup of the first candidate via the index, then a linear
    /// scan until the end bound is passed.
    pub fn range(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> &[Bar] {
        let from = match self.index.range(start..).next() {
            Some((_, &i)) => i,
            None => return &[],
        };
        let mut to = from;
        while to < self.bars.len() && self.bars[to].timestamp <= end {
            to += 1;
        }
        &self.bars[from..to]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 1, day, 0, 0, 0).unwrap()
    }

    fn bar(day: u32, close: f64) -> Bar {
        Bar::new(ts(day), close, close + 1.0, close - 1.0, close, 100)
    }

    #[test]
    fn sorts_ascending_on_construction() {
        let series = MarketSeries::new(vec![bar(3, 30.0), bar(1, 10.0), bar(2, 20.0)]);
        let closes: Vec<f64> = series.bars().iter().map(|b| b.close).collect();
        assert_eq!(closes, vec![10.0, 20.0, 30.0]);
    }

    #[test]
    fn duplicate_timestamps_keep_input_order() {
        let series = MarketSeries::new(vec![bar(1, 10.0), bar(2, 20.0), bar(2, 21.0), bar(3, 30.0)]);
        let closes: Vec<f64> = series.bars().iter().map(|b| b.close).collect();
        assert_eq!(closes, vec![10.0, 20.0, 21.0, 30.0]);
        // Index points at the first duplicate.
        assert_eq!(series.index_of(ts(2)), Some(1));
    }

    #[test]
    fn range_is_inclusive_on_both_ends() {
        let series = MarketSeries::new((1..=5).map(|d| bar(d, d as f64)).collect());
        let hit = series.range(ts(2), ts(4));
        let closes: Vec<f64> = hit.iter().map(|b| b.close).collect();
        assert_eq!(closes, vec![2.0, 3.0, 4.0]);
    }

    #[test]
    fn range_start_between_bars_snaps_forward() {
        let series = MarketSeries::new(vec![bar(1, 1.0), bar(3, 3.0), bar(5, 5.0)]);
        let hit = series.range(ts(2), ts(5));
        let closes: Vec<f64> = hit.iter().map(|b| b.close).collect();
        assert_eq!(closes, vec![3.0, 5.0]);
    }

    #[test]
    fn range_after_last_bar_is_empty() {
        let series = MarketSeries::new(vec![bar(1, 1.0), bar(2, 2.0)]);
        assert!(series.range(ts(3), ts(9)).is_empty());
    }

    #[test]
    fn range_includes_all_duplicates() {
        let series = MarketSeries::new(vec![bar(1, 1.0), bar(2, 2.0), bar(2, 2.5), bar(3, 3.0)]);
        let hit = series.range(ts(2), ts(2));
        assert_eq!(hit.len(), 2);
    }
}
