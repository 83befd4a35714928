//! Join composite shape.

use std::sync::Arc;

use crate::data::{DataGenerator, DataSpec};
use crate::scrape::{DataIterator, ScrapeInfo, ScrapeResult};

/// A shape that concatenates several child shapes into one longer
/// signal, draining each child in order.
///
/// Children that produce no samples are skipped silently; an empty child
/// list exhausts immediately.
#[derive(Debug, Clone)]
pub struct Join {
    children: Vec<Arc<dyn DataGenerator>>,
}

impl Join {
    /// Create a new [`Join`] over the given children.
    #[must_use]
    pub fn new(children: Vec<Arc<dyn DataGenerator>>) -> Self {
        Self { children }
    }
}

impl DataGenerator for Join {
    fn iterator(&self) -> Box<dyn DataIterator> {
        Box::new(JoinIterator {
            children: self.children.clone(),
            child_index: 0,
            current: None,
        })
    }

    fn describe(&self) -> DataSpec {
        DataSpec::Join {
            children: self.children.iter().map(|child| child.describe()).collect(),
        }
    }
}

#[derive(Debug)]
struct JoinIterator {
    children: Vec<Arc<dyn DataGenerator>>,
    child_index: usize,
    current: Option<Box<dyn DataIterator>>,
}

impl DataIterator for JoinIterator {
    fn evaluate(&mut self, scrape: ScrapeInfo) -> ScrapeResult {
        while let Some(child) = self.children.get(self.child_index) {
            let current = self.current.get_or_insert_with(|| child.iterator());

            let result = current.evaluate(scrape);
            if result.exhausted {
                self.current = None;
                self.child_index += 1;
                continue;
            }

            return result;
        }

        ScrapeResult::exhausted()
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::data::tests::{drain, scrape_at};
    use crate::data::{CustomValues, LinearSegment, VoidSegment};

    #[test]
    fn concatenates_children_in_order() {
        let join = Join::new(vec![
            Arc::new(LinearSegment::new(10.0, 20.0, 2).unwrap()),
            Arc::new(LinearSegment::new(40.0, 50.0, 3).unwrap()),
            Arc::new(LinearSegment::new(70.0, 70.0, 4).unwrap()),
        ]);

        assert_eq!(
            drain(&join),
            vec![10.0, 20.0, 40.0, 45.0, 50.0, 70.0, 70.0, 70.0, 70.0]
        );
    }

    #[test]
    fn empty_children_are_skipped() {
        let join = Join::new(vec![
            Arc::new(CustomValues::new(Vec::new())),
            Arc::new(VoidSegment::new(0)),
            Arc::new(LinearSegment::new(5.0, 5.0, 1).unwrap()),
        ]);

        assert_eq!(drain(&join), vec![5.0]);
    }

    #[test]
    fn empty_child_list_exhausts_immediately() {
        let join = Join::new(Vec::new());
        let mut iter = join.iterator();
        assert!(iter.evaluate(scrape_at(0)).exhausted);
        assert!(iter.evaluate(scrape_at(1)).exhausted);
    }

    proptest! {
        // The concatenation equals the catenation of each child's
        // independent emission.
        #[test]
        fn concatenation_matches_independent_drains(
            first_count in 1_u64..16,
            second_count in 1_u64..16,
            start in -100.0_f64..100.0,
        ) {
            let first = Arc::new(LinearSegment::new(start, start + 10.0, first_count).unwrap());
            let second = Arc::new(LinearSegment::new(start - 5.0, start, second_count).unwrap());

            let mut expected = drain(first.as_ref());
            expected.extend(drain(second.as_ref()));

            let join = Join::new(vec![first, second]);
            prop_assert_eq!(drain(&join), expected);
        }
    }
}
