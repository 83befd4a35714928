//! The shape algebra.
//!
//! A shape is a frozen recipe; the iterators it hands out carry all of
//! the per-consumer cursor state. Because a shape never mutates, it can
//! be asked for any number of independent iterators, which is what
//! makes looping and multi-series reuse work. Leaf shapes emit a
//! bounded run of samples; [`Join`] and [`Loop`] build longer signals
//! out of other shapes while upholding the same iterator contract, so
//! anything built here can be composed again.

use std::fmt::Write;
use std::sync::Arc;

use crate::scrape::DataIterator;

mod custom;
mod join;
mod linear;
mod random;
mod repeat;
mod void;

pub use custom::{CustomSample, CustomValues};
pub use join::Join;
pub use linear::LinearSegment;
pub use random::RandomSegment;
pub use repeat::Loop;
pub use void::VoidSegment;

/// A factory for sample iterators.
///
/// Generators hold configuration only; every call to
/// [`DataGenerator::iterator`] returns a fresh cursor positioned at the
/// start of the shape.
pub trait DataGenerator: std::fmt::Debug + Send + Sync {
    /// Construct a fresh iterator over this shape.
    fn iterator(&self) -> Box<dyn DataIterator>;

    /// Describe the composition tree of this shape for diagnostics.
    fn describe(&self) -> DataSpec;
}

impl<T: DataGenerator + ?Sized> DataGenerator for Arc<T> {
    fn iterator(&self) -> Box<dyn DataIterator> {
        (**self).iterator()
    }

    fn describe(&self) -> DataSpec {
        (**self).describe()
    }
}

/// A human-readable description of a shape composition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSpec {
    /// A leaf shape with no children.
    Leaf {
        /// Display name of the shape.
        name: &'static str,
    },
    /// A concatenation of child shapes.
    Join {
        /// Descriptions of the children, in emission order.
        children: Vec<DataSpec>,
    },
    /// A repetition of an inner shape.
    Loop {
        /// How many times the inner shape repeats.
        count: u64,
        /// Description of the repeated shape.
        inner: Box<DataSpec>,
    },
}

impl DataSpec {
    /// Render the description as an indented tree, one node per line.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.render_into(&mut out, 0);
        out
    }

    fn render_into(&self, out: &mut String, indent: usize) {
        if !out.is_empty() {
            out.push('\n');
        }
        let prefix = "  ".repeat(indent);
        match self {
            Self::Leaf { name } => {
                let _ = write!(out, "{prefix}{name}");
            }
            Self::Join { children } => {
                let _ = write!(out, "{prefix}Join");
                for child in children {
                    child.render_into(out, indent + 1);
                }
            }
            Self::Loop { count, inner } => {
                let _ = write!(out, "{prefix}Loop [{count}]");
                inner.render_into(out, indent + 1);
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::time::{Duration, UNIX_EPOCH};

    use super::*;
    use crate::scrape::{ScrapeInfo, ScrapeResult};

    /// A scrape ticket at a fixed start time plus `index` 15s intervals.
    pub(crate) fn scrape_at(index: u64) -> ScrapeInfo {
        let start = UNIX_EPOCH + Duration::from_secs(1_672_568_200);
        ScrapeInfo {
            first_iteration_time: start,
            iteration_index: index,
            iteration_time: start + Duration::from_secs(15 * index),
        }
    }

    /// Drain a generator to exhaustion, returning every result up to but
    /// not including the terminal one.
    pub(crate) fn drain_results(generator: &dyn DataGenerator) -> Vec<ScrapeResult> {
        let mut iter = generator.iterator();
        let mut out = Vec::new();
        for index in 0..10_000 {
            let result = iter.evaluate(scrape_at(index));
            if result.exhausted {
                break;
            }
            out.push(result);
        }
        out
    }

    /// Drain a generator to exhaustion, returning the non-missing values.
    pub(crate) fn drain(generator: &dyn DataGenerator) -> Vec<f64> {
        drain_results(generator)
            .into_iter()
            .filter(|result| !result.missing)
            .map(|result| result.value)
            .collect()
    }

    #[test]
    fn render_nests_children() {
        let spec = DataSpec::Join {
            children: vec![
                DataSpec::Leaf {
                    name: "Linear Segment",
                },
                DataSpec::Loop {
                    count: 3,
                    inner: Box::new(DataSpec::Leaf { name: "Void" }),
                },
            ],
        };

        let rendered = spec.render();
        let expected = "Join\n  Linear Segment\n  Loop [3]\n    Void";
        assert_eq!(rendered, expected);
    }

    #[test]
    fn generators_describe_their_composition() {
        let shape = Join::new(vec![
            Arc::new(LinearSegment::new(0.0, 1.0, 2).unwrap()),
            Arc::new(Loop::new(Arc::new(VoidSegment::new(1)), 2)),
        ]);

        assert_eq!(
            shape.describe().render(),
            "Join\n  Linear Segment\n  Loop [2]\n    Void"
        );
    }
}
