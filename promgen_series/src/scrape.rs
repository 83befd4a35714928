//! Scrape tickets and sample results.
//!
//! A scrape ticket records when a scrape happens; a sample result is the
//! outcome of asking a data iterator for its next sample. Both are plain
//! value types, created by the scraper (or the collection adapter) and
//! consumed read-only by everything downstream.

use std::time::SystemTime;

/// When a scrape happens.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrapeInfo {
    /// When scrape number zero happened. Anything that wants to compute
    /// "how far into the run are we" anchors on this.
    pub first_iteration_time: SystemTime,
    /// Which scrape this is, counted from zero.
    pub iteration_index: u64,
    /// The instant of this scrape, virtual or wall-clock.
    pub iteration_time: SystemTime,
}

/// The outcome of a single scrape against a data iterator.
///
/// A result with `exhausted` set is terminal: the iterator will never
/// produce anything again, and the `value` and `missing` fields of such
/// a result are garbage that must not be published.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrapeResult {
    /// The value of the sample.
    pub value: f64,
    /// The scrape happened but produced nothing, as if the target had
    /// failed to answer.
    pub missing: bool,
    /// The data iterator has no more data to return.
    pub exhausted: bool,
}

impl ScrapeResult {
    /// A plain sample carrying `value`.
    #[must_use]
    pub fn value(value: f64) -> Self {
        Self {
            value,
            missing: false,
            exhausted: false,
        }
    }

    /// A sample flagged as missing.
    #[must_use]
    pub fn missing() -> Self {
        Self {
            value: 0.0,
            missing: true,
            exhausted: false,
        }
    }

    /// The terminal result: no more samples.
    #[must_use]
    pub fn exhausted() -> Self {
        Self {
            value: 0.0,
            missing: false,
            exhausted: true,
        }
    }
}

/// A single bucket observation within a histogram scrape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistogramBucket {
    /// The less-than-or-equal threshold of the bucket.
    pub le: f64,
    /// The value of the sample.
    pub value: f64,
}

/// The outcome of a single scrape against a histogram data iterator.
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramScrapeResult {
    /// The buckets of the histogram.
    pub buckets: Vec<HistogramBucket>,
    /// The number of occurrences recorded by this histogram.
    pub count: f64,
    /// The total sum of all values recorded by this histogram.
    pub sum: f64,
    /// The scrape happened but produced nothing.
    pub missing: bool,
    /// The data iterator has no more data to return.
    pub exhausted: bool,
}

impl HistogramScrapeResult {
    /// The terminal result: no more samples.
    #[must_use]
    pub fn exhausted() -> Self {
        Self {
            buckets: Vec::new(),
            count: 0.0,
            sum: 0.0,
            missing: false,
            exhausted: true,
        }
    }
}

/// A stateful sample cursor for counter and gauge series.
///
/// Every call advances the cursor by one position, and there is no way
/// to go back. Exhaustion is sticky: once a call returns a result with
/// `exhausted` set, every subsequent call must do the same. Iterators
/// are not meant to be shared; whoever drains one should hold the only
/// reference to it.
pub trait DataIterator: std::fmt::Debug + Send {
    /// Return the next sample for the given scrape.
    fn evaluate(&mut self, scrape: ScrapeInfo) -> ScrapeResult;
}

/// A stateful sample cursor for histogram series.
///
/// Same contract as [`DataIterator`] with a histogram-shaped result.
pub trait DataHistogramIterator: std::fmt::Debug + Send {
    /// Return the next histogram sample for the given scrape.
    fn evaluate(&mut self, scrape: ScrapeInfo) -> HistogramScrapeResult;
}
