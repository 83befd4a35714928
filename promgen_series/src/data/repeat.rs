//! Loop composite shape.

use std::sync::Arc;

use crate::data::{DataGenerator, DataSpec};
use crate::scrape::{DataIterator, ScrapeInfo, ScrapeResult};

/// A shape that replays an inner shape a fixed number of times, each
/// cycle starting over with a fresh cursor.
///
/// A count of zero exhausts immediately.
#[derive(Debug, Clone)]
pub struct Loop {
    inner: Arc<dyn DataGenerator>,
    count: u64,
}

impl Loop {
    /// Create a new [`Loop`] repeating `inner` exactly `count` times.
    #[must_use]
    pub fn new(inner: Arc<dyn DataGenerator>, count: u64) -> Self {
        Self { inner, count }
    }
}

impl DataGenerator for Loop {
    fn iterator(&self) -> Box<dyn DataIterator> {
        Box::new(LoopIterator {
            inner: Arc::clone(&self.inner),
            count: self.count,
            cycles_done: 0,
            current: None,
        })
    }

    fn describe(&self) -> DataSpec {
        DataSpec::Loop {
            count: self.count,
            inner: Box::new(self.inner.describe()),
        }
    }
}

#[derive(Debug)]
struct LoopIterator {
    inner: Arc<dyn DataGenerator>,
    count: u64,
    cycles_done: u64,
    current: Option<Box<dyn DataIterator>>,
}

impl DataIterator for LoopIterator {
    fn evaluate(&mut self, scrape: ScrapeInfo) -> ScrapeResult {
        while self.cycles_done < self.count {
            let current = self.current.get_or_insert_with(|| self.inner.iterator());

            let result = current.evaluate(scrape);
            if result.exhausted {
                self.current = None;
                self.cycles_done += 1;
                continue;
            }

            return result;
        }

        ScrapeResult::exhausted()
    }
}
