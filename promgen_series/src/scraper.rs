//! The virtual-clock scrape generator.
//!
//! A scraper converts a start time plus an interval into an ordered
//! stream of scrape tickets. Every timestamp is an exact multiple of
//! the interval past the start, with none of the jitter a real
//! collector would introduce, which is what makes pushed series and
//! test assertions reproducible. The scraper itself never sleeps; a
//! driver that wants real-time pacing sleeps between tickets.

use std::time::{Duration, SystemTime};

use crate::scrape::{
    DataHistogramIterator, DataIterator, HistogramScrapeResult, ScrapeInfo, ScrapeResult,
};
use crate::Error;

/// Result type handlers passed to the scrape drivers must return.
pub type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// Errors produced while driving a data iterator through a scraper.
#[derive(thiserror::Error, Debug)]
pub enum DriveError {
    /// The scrape handler returned an error; driving stopped.
    #[error("scrape handler failed: {0}")]
    Handler(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Configuration for a [`Scraper`].
///
/// The end time and the iteration count limit are independent stop
/// conditions: whichever is reached first ends the run. Leaving both
/// unset yields an unbounded ticket stream.
#[derive(Debug, Clone, Copy)]
pub struct ScraperConfig {
    /// The timestamp of the first scrape.
    pub start_time: SystemTime,
    /// The interval between consecutive scrapes.
    pub interval: Duration,
    /// The time at which to stop, inclusive: a scrape is generated for
    /// the end time itself.
    pub end_time: Option<SystemTime>,
    /// The maximum number of scrapes to generate.
    pub iteration_count_limit: Option<u64>,
}

/// Generates scrape tickets on a virtual clock.
///
/// The scraper is cheap to copy and hands out as many independent
/// iterators as callers ask for.
#[derive(Debug, Clone, Copy)]
pub struct Scraper {
    cfg: ScraperConfig,
}

impl Scraper {
    /// Create a new [`Scraper`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::ZeroInterval`] if the interval is zero and
    /// [`Error::EndBeforeStart`] if the end time precedes the start
    /// time. An end time equal to the start time is valid and yields
    /// exactly one scrape.
    pub fn new(cfg: ScraperConfig) -> Result<Self, Error> {
        if cfg.interval.is_zero() {
            return Err(Error::ZeroInterval);
        }

        if let Some(end_time) = cfg.end_time {
            if end_time < cfg.start_time {
                return Err(Error::EndBeforeStart);
            }
        }

        Ok(Self { cfg })
    }

    /// Whether this scraper will generate scrapes forever.
    #[must_use]
    pub fn is_infinite(&self) -> bool {
        self.cfg.end_time.is_none() && self.cfg.iteration_count_limit.is_none()
    }

    /// The configured scrape interval.
    #[must_use]
    pub fn interval(&self) -> Duration {
        self.cfg.interval
    }

    /// Construct a fresh iterator over this scraper's tickets.
    #[must_use]
    pub fn iterator(&self) -> ScraperIterator {
        ScraperIterator {
            cfg: self.cfg,
            current_index: 0,
            last_timestamp: None,
        }
    }

    /// Drive a data iterator through this scraper, calling `handler`
    /// once per generated sample.
    ///
    /// Terminates cleanly when either the data iterator or the scraper
    /// runs out.
    ///
    /// # Errors
    ///
    /// Returns [`DriveError::Handler`] if the handler fails; driving
    /// stops at that sample.
    pub fn scrape_data_iterator<F>(
        &self,
        data: &mut dyn DataIterator,
        mut handler: F,
    ) -> Result<(), DriveError>
    where
        F: FnMut(ScrapeInfo, ScrapeResult) -> HandlerResult,
    {
        for scrape in self.iterator() {
            let result = data.evaluate(scrape);
            if result.exhausted {
                return Ok(());
            }

            handler(scrape, result).map_err(DriveError::Handler)?;
        }

        Ok(())
    }

    /// Drive a histogram data iterator through this scraper, calling
    /// `handler` once per generated sample.
    ///
    /// # Errors
    ///
    /// Returns [`DriveError::Handler`] if the handler fails; driving
    /// stops at that sample.
    pub fn scrape_histogram_iterator<F>(
        &self,
        data: &mut dyn DataHistogramIterator,
        mut handler: F,
    ) -> Result<(), DriveError>
    where
        F: FnMut(ScrapeInfo, HistogramScrapeResult) -> HandlerResult,
    {
        for scrape in self.iterator() {
            let result = data.evaluate(scrape);
            if result.exhausted {
                return Ok(());
            }

            handler(scrape, result).map_err(DriveError::Handler)?;
        }

        Ok(())
    }
}

/// Iterates over a scraper's tickets.
///
/// Implements [`Iterator`]; [`ScraperIterator::has_next`] answers
/// whether another ticket is available without consuming it, and
/// [`ScraperIterator::reset`] rewinds the iterator so a second full
/// traversal yields the same sequence.
#[derive(Debug, Clone)]
pub struct ScraperIterator {
    cfg: ScraperConfig,
    current_index: u64,
    last_timestamp: Option<SystemTime>,
}

impl ScraperIterator {
    /// The timestamp of the next scrape, if one remains.
    fn peek_time(&self) -> Option<SystemTime> {
        if let Some(limit) = self.cfg.iteration_count_limit {
            if self.current_index >= limit {
                return None;
            }
        }

        let next = if self.current_index == 0 {
            self.cfg.start_time
        } else {
            self.last_timestamp?.checked_add(self.cfg.interval)?
        };

        if let Some(end_time) = self.cfg.end_time {
            if next > end_time {
                return None;
            }
        }

        Some(next)
    }

    /// Whether another scrape remains. Idempotent: calling this any
    /// number of times before `next` has no effect.
    #[must_use]
    pub fn has_next(&self) -> bool {
        self.peek_time().is_some()
    }

    /// Rewind to the first scrape. Both the index and the last
    /// generated timestamp are cleared; dropping either would shift
    /// every timestamp of the second traversal.
    pub fn reset(&mut self) {
        self.current_index = 0;
        self.last_timestamp = None;
    }
}

impl Iterator for ScraperIterator {
    type Item = ScrapeInfo;

    fn next(&mut self) -> Option<ScrapeInfo> {
        let next_time = self.peek_time()?;

        let scrape = ScrapeInfo {
            first_iteration_time: self.cfg.start_time,
            iteration_index: self.current_index,
            iteration_time: next_time,
        };

        self.current_index += 1;
        self.last_timestamp = Some(next_time);

        Some(scrape)
    }
}
