//! A single metric time series: a label set, a shape, and an end
//! strategy, bound into a resettable iterator state machine.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::data::DataGenerator;
use crate::end_strategy::EndStrategy;
use crate::scrape::{DataIterator, ScrapeInfo, ScrapeResult};

/// A metric time series for a counter or gauge.
///
/// When the iterator reaches the end of the shape it applies the
/// configured [`EndStrategy`] to decide what to emit next.
#[derive(Debug, Clone)]
pub struct MetricTimeSeries {
    labels: FxHashMap<String, String>,
    data: Arc<dyn DataGenerator>,
    end_strategy: EndStrategy,
}

impl MetricTimeSeries {
    /// Create a new [`MetricTimeSeries`].
    #[must_use]
    pub fn new(
        labels: FxHashMap<String, String>,
        data: Arc<dyn DataGenerator>,
        end_strategy: EndStrategy,
    ) -> Self {
        Self {
            labels,
            data,
            end_strategy,
        }
    }

    /// The labels associated with this series.
    #[must_use]
    pub fn labels(&self) -> &FxHashMap<String, String> {
        &self.labels
    }

    /// Whether this series will never stop generating samples.
    #[must_use]
    pub fn is_infinite(&self) -> bool {
        self.end_strategy != EndStrategy::RemoveTimeSeries
    }

    /// Construct a fresh iterator over this series.
    #[must_use]
    pub fn iterator(&self) -> Box<dyn DataIterator> {
        Box::new(TimeSeriesIterator {
            data: Arc::clone(&self.data),
            end_strategy: self.end_strategy,
            current: None,
            state: State::Running,
            last_value: ScrapeResult::value(0.0),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Running,
    EndStrategy,
}

#[derive(Debug)]
struct TimeSeriesIterator {
    data: Arc<dyn DataGenerator>,
    end_strategy: EndStrategy,
    current: Option<Box<dyn DataIterator>>,
    state: State,
    /// The last non-missing result, replayed by `SendLastValue`.
    last_value: ScrapeResult,
}

impl DataIterator for TimeSeriesIterator {
    fn evaluate(&mut self, scrape: ScrapeInfo) -> ScrapeResult {
        // Hitting the end of the shape must not cost a tick: the same
        // call falls through into the end strategy, which answers for
        // the ticket that discovered the end.
        loop {
            if self.state == State::EndStrategy {
                match self.end_strategy {
                    EndStrategy::Loop => {
                        self.current = None;
                        self.state = State::Running;
                    }
                    EndStrategy::SendLastValue => return self.last_value,
                    EndStrategy::SendCustomValue(value) => return value,
                    EndStrategy::RemoveTimeSeries => return ScrapeResult::exhausted(),
                }
            }

            let fresh = self.current.is_none();
            let current = self.current.get_or_insert_with(|| self.data.iterator());

            let result = current.evaluate(scrape);
            if result.exhausted {
                // A shape that yields nothing at all would cycle forever
                // under the loop strategy; report exhaustion instead.
                if fresh && self.end_strategy == EndStrategy::Loop {
                    return ScrapeResult::exhausted();
                }
                self.state = State::EndStrategy;
                continue;
            }

            if !result.missing {
                self.last_value = result;
            }
            return result;
        }
    }
}
