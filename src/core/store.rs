use tracing::debug;

use crate::core::{Candle, CandleSeries, MergeStats, Timeframe, UnixSeconds, aggregate_to};
use crate::error::{ReplayError, ReplayResult};

/// Candle history for one instrument at its base (fetched) resolution.
///
/// Written once by the initial fetch and extended by back-fill merges; read by
/// both chart panes and by magnet lookups.
#[derive(Debug, Clone, PartialEq)]
pub struct CandleStore {
    instrument: String,
    base_timeframe: Timeframe,
    series: CandleSeries,
    revision: u64,
}

impl CandleStore {
    #[must_use]
    pub fn new(instrument: impl Into<String>, base_timeframe: Timeframe) -> Self {
        Self {
            instrument: instrument.into(),
            base_timeframe,
            series: CandleSeries::new(),
            revision: 0,
        }
    }

    #[must_use]
    pub fn instrument(&self) -> &str {
        &self.instrument
    }

    #[must_use]
    pub fn base_timeframe(&self) -> Timeframe {
        self.base_timeframe
    }

    #[must_use]
    pub fn series(&self) -> &CandleSeries {
        &self.series
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Bumped on every change so dependants can detect stale derived data.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    #[must_use]
    pub fn first_time(&self) -> Option<UnixSeconds> {
        self.series.first().map(|candle| candle.time)
    }

    #[must_use]
    pub fn last_time(&self) -> Option<UnixSeconds> {
        self.series.last().map(|candle| candle.time)
    }

    #[must_use]
    pub fn range(&self, from: UnixSeconds, to: UnixSeconds) -> &[Candle] {
        self.series.range(from, to)
    }

    /// Installs the result of the initial fetch.
    pub fn load(&mut self, candles: Vec<Candle>) {
        let original_count = candles.len();
        self.series = CandleSeries::from_unsorted(candles);
        self.revision += 1;
        debug!(
            instrument = %self.instrument,
            original_count,
            canonical_count = self.series.len(),
            "loaded candles"
        );
    }

    /// Merges a back-fill response; arrival order does not matter.
    pub fn backfill(&mut self, candles: Vec<Candle>) -> MergeStats {
        let stats = self.series.merge(candles);
        if stats.inserted > 0 {
            self.revision += 1;
        }
        stats
    }

    /// Series re-aggregated into a coarser timeframe.
    pub fn aggregated(&self, timeframe: Timeframe) -> ReplayResult<CandleSeries> {
        if timeframe.seconds() < self.base_timeframe.seconds() {
            return Err(ReplayError::InvalidData(format!(
                "cannot aggregate {} candles into finer {timeframe}",
                self.base_timeframe
            )));
        }
        aggregate_to(self.series.as_slice(), timeframe)
    }
}
