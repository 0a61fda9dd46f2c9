use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::{Candle, UnixSeconds};
use crate::error::{ReplayError, ReplayResult};

/// Ordered candle sequence: ascending by time, unique timestamps, valid OHLC.
///
/// Existing candles are never mutated in place; the only growth path is
/// [`CandleSeries::merge`], which inserts candles for times not yet present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<Candle>", into = "Vec<Candle>")]
pub struct CandleSeries {
    candles: Vec<Candle>,
}

/// Index of the candle in `candles` (sorted ascending by time) closest to
/// `time`; equidistant neighbours resolve to the earlier one.
#[must_use]
pub fn nearest_index(candles: &[Candle], time: UnixSeconds) -> Option<usize> {
    if candles.is_empty() {
        return None;
    }
    let right = candles.partition_point(|candle| candle.time < time);
    if right == 0 {
        return Some(0);
    }
    if right == candles.len() {
        return Some(right - 1);
    }
    let left = right - 1;
    let left_distance = time.abs_diff(candles[left].time);
    let right_distance = candles[right].time.abs_diff(time);
    match left_distance.cmp(&right_distance) {
        Ordering::Greater => Some(right),
        Ordering::Less | Ordering::Equal => Some(left),
    }
}

/// Outcome counters for one merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    pub inserted: usize,
    pub duplicates: usize,
    pub rejected: usize,
}

impl CandleSeries {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps candles that already satisfy the series invariants.
    pub fn from_sorted(candles: Vec<Candle>) -> ReplayResult<Self> {
        for candle in &candles {
            candle.validate()?;
        }
        if candles.windows(2).any(|pair| pair[0].time >= pair[1].time) {
            return Err(ReplayError::InvalidData(
                "candle times must be strictly increasing".to_owned(),
            ));
        }
        Ok(Self { candles })
    }

    /// Sorts, drops invalid candles and deduplicates by time (last one wins).
    #[must_use]
    pub fn from_unsorted(mut candles: Vec<Candle>) -> Self {
        let original_len = candles.len();
        candles.retain(Candle::is_valid);
        candles.sort_by_key(|candle| candle.time);

        let mut deduped: Vec<Candle> = Vec::with_capacity(candles.len());
        let mut duplicate_count = 0_usize;
        for candle in candles {
            if let Some(last) = deduped.last_mut() {
                if last.time == candle.time {
                    *last = candle;
                    duplicate_count += 1;
                    continue;
                }
            }
            deduped.push(candle);
        }

        let filtered_count = original_len.saturating_sub(deduped.len() + duplicate_count);
        if filtered_count > 0 || duplicate_count > 0 {
            warn!(
                filtered_count,
                duplicate_count,
                canonical_count = deduped.len(),
                "canonicalized candle series"
            );
        }
        Self { candles: deduped }
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Candle] {
        &self.candles
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.candles.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    #[must_use]
    pub fn first(&self) -> Option<&Candle> {
        self.candles.first()
    }

    #[must_use]
    pub fn last(&self) -> Option<&Candle> {
        self.candles.last()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Candle> {
        self.candles.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Candle> {
        self.candles.iter()
    }

    /// Index of the candle stamped exactly at `time`.
    #[must_use]
    pub fn index_of(&self, time: UnixSeconds) -> Option<usize> {
        self.candles
            .binary_search_by_key(&time, |candle| candle.time)
            .ok()
    }

    /// Index of the latest candle with `candle.time <= time`.
    #[must_use]
    pub fn index_at_or_before(&self, time: UnixSeconds) -> Option<usize> {
        let after = self.candles.partition_point(|candle| candle.time <= time);
        after.checked_sub(1)
    }

    /// Index of the candle closest in time; equidistant neighbours resolve to the earlier one.
    #[must_use]
    pub fn nearest_index(&self, time: UnixSeconds) -> Option<usize> {
        nearest_index(&self.candles, time)
    }

    #[must_use]
    pub fn nearest(&self, time: UnixSeconds) -> Option<&Candle> {
        self.nearest_index(time).map(|idx| &self.candles[idx])
    }

    /// Candles whose time falls inside the inclusive window.
    #[must_use]
    pub fn range(&self, from: UnixSeconds, to: UnixSeconds) -> &[Candle] {
        let (min_t, max_t) = if from <= to { (from, to) } else { (to, from) };
        let start = self.candles.partition_point(|candle| candle.time < min_t);
        let end = self.candles.partition_point(|candle| candle.time <= max_t);
        &self.candles[start..end]
    }

    /// Prefix of the series with `candle.time <= time`.
    #[must_use]
    pub fn truncated_at(&self, time: UnixSeconds) -> &[Candle] {
        let end = self.candles.partition_point(|candle| candle.time <= time);
        &self.candles[..end]
    }

    /// Smallest positive step between consecutive candles.
    #[must_use]
    pub fn native_interval(&self) -> Option<i64> {
        self.candles
            .windows(2)
            .map(|pair| pair[1].time - pair[0].time)
            .min()
    }

    /// Merges candles by time and keeps the series sorted.
    ///
    /// Candles for times already present are ignored, so the merge is
    /// idempotent and the resulting time set does not depend on arrival order.
    pub fn merge(&mut self, incoming: Vec<Candle>) -> MergeStats {
        let mut stats = MergeStats::default();
        let mut incoming: Vec<Candle> = incoming
            .into_iter()
            .filter(|candle| {
                let valid = candle.is_valid();
                if !valid {
                    stats.rejected += 1;
                }
                valid
            })
            .collect();
        incoming.sort_by_key(|candle| candle.time);
        let before_dedup = incoming.len();
        incoming.dedup_by_key(|candle| candle.time);
        stats.duplicates += before_dedup - incoming.len();

        let existing = std::mem::take(&mut self.candles);
        let mut merged = Vec::with_capacity(existing.len() + incoming.len());
        let mut old = existing.into_iter().peekable();
        let mut new = incoming.into_iter().peekable();
        loop {
            match (old.peek(), new.peek()) {
                (Some(a), Some(b)) => match a.time.cmp(&b.time) {
                    Ordering::Less => merged.extend(old.next()),
                    Ordering::Greater => {
                        merged.extend(new.next());
                        stats.inserted += 1;
                    }
                    Ordering::Equal => {
                        merged.extend(old.next());
                        new.next();
                        stats.duplicates += 1;
                    }
                },
                (Some(_), None) => merged.extend(old.next()),
                (None, Some(_)) => {
                    merged.extend(new.next());
                    stats.inserted += 1;
                }
                (None, None) => break,
            }
        }
        self.candles = merged;

        debug!(
            inserted = stats.inserted,
            duplicates = stats.duplicates,
            rejected = stats.rejected,
            count = self.candles.len(),
            "merged candles"
        );
        stats
    }
}

impl From<Vec<Candle>> for CandleSeries {
    fn from(candles: Vec<Candle>) -> Self {
        Self::from_unsorted(candles)
    }
}

impl From<CandleSeries> for Vec<Candle> {
    fn from(series: CandleSeries) -> Self {
        series.candles
    }
}

impl<'a> IntoIterator for &'a CandleSeries {
    type Item = &'a Candle;
    type IntoIter = std::slice::Iter<'a, Candle>;

    fn into_iter(self) -> Self::IntoIter {
        self.candles.iter()
    }
}
