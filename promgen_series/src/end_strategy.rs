//! End-of-data policies for a metric time series.

use crate::scrape::ScrapeResult;

/// What a time series does once its underlying shape runs out of data.
///
/// Only [`EndStrategy::RemoveTimeSeries`] lets a series actually stop;
/// under every other variant the series keeps answering scrapes
/// forever.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EndStrategy {
    /// Restart the shape from the beginning with a fresh iterator.
    Loop,
    /// Repeat the last non-missing value forever.
    SendLastValue,
    /// Send a fixed result forever; a missing result simulates a
    /// permanently failing scrape, a zero simulates a counter reset.
    SendCustomValue(ScrapeResult),
    /// Stop the series: report exhaustion to the metric family, which
    /// emits a stale marker and drops the series.
    RemoveTimeSeries,
}
