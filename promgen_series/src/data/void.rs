//! Void segment shape.

use crate::data::{DataGenerator, DataSpec};
use crate::scrape::{DataIterator, ScrapeInfo, ScrapeResult};

/// A shape representing a run of missing scrapes.
///
/// Stands in for an outage window: the target is scraped but answers
/// with nothing. Emits `count` results flagged missing, then exhausts;
/// a count of zero exhausts immediately.
#[derive(Debug, Clone, Copy)]
pub struct VoidSegment {
    count: u64,
}

impl VoidSegment {
    /// Create a new [`VoidSegment`] spanning `count` scrapes.
    #[must_use]
    pub fn new(count: u64) -> Self {
        Self { count }
    }
}

impl DataGenerator for VoidSegment {
    fn iterator(&self) -> Box<dyn DataIterator> {
        Box::new(VoidSegmentIterator {
            count: self.count,
            index: 0,
        })
    }

    fn describe(&self) -> DataSpec {
        DataSpec::Leaf { name: "Void" }
    }
}

#[derive(Debug)]
struct VoidSegmentIterator {
    count: u64,
    index: u64,
}

impl DataIterator for VoidSegmentIterator {
    fn evaluate(&mut self, _scrape: ScrapeInfo) -> ScrapeResult {
        if self.index >= self.count {
            return ScrapeResult::exhausted();
        }

        self.index += 1;
        ScrapeResult::missing()
    }
}
