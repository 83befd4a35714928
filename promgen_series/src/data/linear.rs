//! Linear segment shape.

use crate::data::{DataGenerator, DataSpec};
use crate::scrape::{DataIterator, ScrapeInfo, ScrapeResult};
use crate::Error;

/// A shape that ramps linearly between two amplitudes.
///
/// Emits exactly `iteration_count_limit` samples: the first is
/// `amplitude_start`, the last is `amplitude_end`, and everything in
/// between is evenly spaced. Equal amplitudes give a flat plateau;
/// swapping them gives a downward ramp. Negative amplitudes are the
/// caller's responsibility to keep out of counters.
#[derive(Debug, Clone)]
pub struct LinearSegment {
    amplitude_start: f64,
    amplitude_end: f64,
    iteration_count_limit: u64,
    slope: f64,
}

impl LinearSegment {
    /// Create a new [`LinearSegment`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::ZeroIterationCount`] if `iteration_count_limit`
    /// is zero.
    pub fn new(
        amplitude_start: f64,
        amplitude_end: f64,
        iteration_count_limit: u64,
    ) -> Result<Self, Error> {
        if iteration_count_limit == 0 {
            return Err(Error::ZeroIterationCount);
        }

        // For a single-sample segment the slope never applies.
        let slope = if iteration_count_limit >= 2 {
            (amplitude_end - amplitude_start) / (iteration_count_limit - 1) as f64
        } else {
            0.0
        };

        Ok(Self {
            amplitude_start,
            amplitude_end,
            iteration_count_limit,
            slope,
        })
    }
}

impl DataGenerator for LinearSegment {
    fn iterator(&self) -> Box<dyn DataIterator> {
        Box::new(LinearSegmentIterator {
            segment: self.clone(),
            index: 0,
        })
    }

    fn describe(&self) -> DataSpec {
        DataSpec::Leaf {
            name: "Linear Segment",
        }
    }
}

#[derive(Debug)]
struct LinearSegmentIterator {
    segment: LinearSegment,
    index: u64,
}

impl DataIterator for LinearSegmentIterator {
    #[allow(clippy::float_cmp)] // amplitude equality is an exact configuration check
    fn evaluate(&mut self, _scrape: ScrapeInfo) -> ScrapeResult {
        if self.index >= self.segment.iteration_count_limit {
            return ScrapeResult::exhausted();
        }

        let index = self.index;
        self.index += 1;

        // A horizontal line needs no slope arithmetic, and stays exact.
        if self.segment.amplitude_start == self.segment.amplitude_end {
            return ScrapeResult::value(self.segment.amplitude_start);
        }

        ScrapeResult::value(self.segment.amplitude_start + self.segment.slope * index as f64)
    }
}
