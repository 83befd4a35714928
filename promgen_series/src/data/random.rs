//! Random segment shape.

use std::sync::Mutex;

use rand::rngs::{SmallRng, StdRng};
use rand::{Rng, SeedableRng};

use crate::data::{DataGenerator, DataSpec};
use crate::scrape::{DataIterator, ScrapeInfo, ScrapeResult};
use crate::Error;

/// A shape that emits uniform noise from the half-open interval
/// `[amplitude_min, amplitude_max)`.
///
/// The generator owns a seeded random source and every iterator derives
/// a private stream from it, so a fixed construction seed yields a fixed
/// emitted sequence. Negative amplitudes are the caller's responsibility
/// to keep out of counters.
#[derive(Debug)]
pub struct RandomSegment {
    amplitude_min: f64,
    amplitude_max: f64,
    iteration_count_limit: u64,
    rng: Mutex<StdRng>,
}

impl RandomSegment {
    /// Create a new [`RandomSegment`] drawing from the given random
    /// source.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ZeroIterationCount`] if `iteration_count_limit`
    /// is zero.
    pub fn new(
        amplitude_min: f64,
        amplitude_max: f64,
        iteration_count_limit: u64,
        rng: StdRng,
    ) -> Result<Self, Error> {
        if iteration_count_limit == 0 {
            return Err(Error::ZeroIterationCount);
        }

        Ok(Self {
            amplitude_min,
            amplitude_max,
            iteration_count_limit,
            rng: Mutex::new(rng),
        })
    }
}

impl DataGenerator for RandomSegment {
    fn iterator(&self) -> Box<dyn DataIterator> {
        let seed = self
            .rng
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .gen::<u64>();

        Box::new(RandomSegmentIterator {
            amplitude_min: self.amplitude_min,
            amplitude_max: self.amplitude_max,
            iteration_count_limit: self.iteration_count_limit,
            rng: SmallRng::seed_from_u64(seed),
            index: 0,
        })
    }

    fn describe(&self) -> DataSpec {
        DataSpec::Leaf { name: "Random" }
    }
}

#[derive(Debug)]
struct RandomSegmentIterator {
    amplitude_min: f64,
    amplitude_max: f64,
    iteration_count_limit: u64,
    rng: SmallRng,
    index: u64,
}

impl DataIterator for RandomSegmentIterator {
    fn evaluate(&mut self, _scrape: ScrapeInfo) -> ScrapeResult {
        if self.index >= self.iteration_count_limit {
            return ScrapeResult::exhausted();
        }
        self.index += 1;

        let range = self.amplitude_max - self.amplitude_min;
        let value = self.rng.gen::<f64>() * range + self.amplitude_min;
        ScrapeResult::value(value)
    }
}
