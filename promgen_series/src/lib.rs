//! Deterministic time-series shapes for promgen.
//!
//! Everything in this crate is pure computation: an operator-defined
//! description of how a metric behaves over virtual time -- ramps,
//! plateaus, noise, gaps of missing scrapes, custom sequences and
//! compositions of all of these -- is drained one scrape at a time
//! through cursor-style iterators. Nothing is ever pre-expanded;
//! composing shapes costs memory proportional to the depth of the
//! composition, not the number of samples it will emit.

#![deny(clippy::all)]
#![deny(clippy::cargo)]
#![deny(clippy::perf)]
#![deny(clippy::suspicious)]
#![deny(clippy::complexity)]
#![deny(clippy::unnecessary_to_owned)]
#![deny(clippy::rc_buffer)]
#![deny(clippy::redundant_allocation)]
#![deny(unused_extern_crates)]
#![deny(unused_allocation)]
#![deny(unused_assignments)]
#![deny(unused_comparisons)]
#![deny(unreachable_pub)]
#![deny(missing_docs)]
#![deny(missing_debug_implementations)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::multiple_crate_versions)]

pub mod data;
pub mod end_strategy;
pub mod scrape;
pub mod scraper;
pub mod series;

pub use data::{
    CustomSample, CustomValues, DataGenerator, DataSpec, Join, LinearSegment, Loop, RandomSegment,
    VoidSegment,
};
pub use end_strategy::EndStrategy;
pub use scrape::{
    DataHistogramIterator, DataIterator, HistogramBucket, HistogramScrapeResult, ScrapeInfo,
    ScrapeResult,
};
pub use scraper::{Scraper, ScraperConfig, ScraperIterator};
pub use series::MetricTimeSeries;

/// Errors produced when validating shape or scraper configuration.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The iteration count limit of a segment must be one or greater.
    #[error("iteration count limit cannot be zero")]
    ZeroIterationCount,
    /// The scrape interval must be greater than zero.
    #[error("scrape interval cannot be zero")]
    ZeroInterval,
    /// A scraper end time must not precede its start time.
    #[error("end time cannot be before start time")]
    EndBeforeStart,
}
