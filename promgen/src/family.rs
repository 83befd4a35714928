//! Metric families: one descriptor, many time series.
//!
//! A family is a single metric as Prometheus sees it, fanned out into
//! however many label combinations were attached to it. Attachment
//! checks each series against the declared label schema; after that the
//! family owns the live iterator for every series along with the
//! one-shot stale-marker bookkeeping that fires when a series ends.

use std::time::SystemTime;

use rustc_hash::{FxHashMap, FxHashSet};

use promgen_series::{DataIterator, MetricTimeSeries, ScrapeInfo};

/// The type tag of a metric family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricType {
    /// A monotonically increasing value, apart from explicit resets.
    Counter,
    /// An unrestricted point-in-time value.
    Gauge,
}

/// The descriptor shared by every series in a family.
///
/// The order of `label_names` is semantically significant: it defines
/// the positional order of label values in emitted samples.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Desc {
    name: String,
    help: String,
    metric_type: MetricType,
    label_names: Vec<String>,
}

impl Desc {
    /// Create a new [`Desc`].
    pub fn new(
        name: impl Into<String>,
        help: impl Into<String>,
        metric_type: MetricType,
        label_names: Vec<String>,
    ) -> Self {
        Self {
            name: name.into(),
            help: help.into(),
            metric_type,
            label_names,
        }
    }

    /// The fully qualified metric name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The help string of the metric.
    #[must_use]
    pub fn help(&self) -> &str {
        &self.help
    }

    /// The type of the metric.
    #[must_use]
    pub fn metric_type(&self) -> MetricType {
        self.metric_type
    }

    /// The declared label names, in positional order.
    #[must_use]
    pub fn label_names(&self) -> &[String] {
        &self.label_names
    }
}

/// Errors produced when attaching a time series to a family.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AttachError {
    /// The series carries a label the descriptor does not declare.
    #[error("metric {metric:?} does not declare label {label:?} carried by the time series")]
    UnexpectedLabel {
        /// The metric name.
        metric: String,
        /// The offending label name.
        label: String,
    },
    /// The series is missing a label the descriptor declares.
    #[error("time series is missing label {label:?} declared by metric {metric:?}")]
    MissingLabel {
        /// The metric name.
        metric: String,
        /// The missing label name.
        label: String,
    },
}

/// One evaluated sample of one series in a family.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricResult {
    /// The label values of the series the sample belongs to.
    pub labels: FxHashMap<String, String>,
    /// The instant of the scrape that produced the sample.
    pub timestamp: SystemTime,
    /// The sample value. Carries the stale-marker NaN when
    /// `stale_marker` is set.
    pub value: f64,
    /// Whether this sample is the series' stale marker: the series has
    /// ended and will not be appended to anymore.
    pub stale_marker: bool,
}

/// A metric family for counters and gauges.
#[derive(Debug)]
pub struct MetricFamily {
    desc: Desc,
    series: Vec<MetricTimeSeries>,
    iterators: Vec<Box<dyn DataIterator>>,
    stale_emitted: Vec<bool>,
}

impl MetricFamily {
    /// Create an empty family described by `desc`.
    #[must_use]
    pub fn new(desc: Desc) -> Self {
        Self {
            desc,
            series: Vec::new(),
            iterators: Vec::new(),
            stale_emitted: Vec::new(),
        }
    }

    /// The family descriptor.
    #[must_use]
    pub fn desc(&self) -> &Desc {
        &self.desc
    }

    /// The number of attached time series.
    #[must_use]
    pub fn time_series_count(&self) -> usize {
        self.series.len()
    }

    /// Attach a time series to this family.
    ///
    /// # Errors
    ///
    /// The set of label keys on the series must equal the descriptor's
    /// declared label names exactly; an undeclared label fails with
    /// [`AttachError::UnexpectedLabel`], an absent one with
    /// [`AttachError::MissingLabel`].
    pub fn attach(&mut self, series: MetricTimeSeries) -> Result<(), AttachError> {
        let mut expected: FxHashSet<&str> = self
            .desc
            .label_names
            .iter()
            .map(String::as_str)
            .collect();

        for label in series.labels().keys() {
            if !expected.remove(label.as_str()) {
                return Err(AttachError::UnexpectedLabel {
                    metric: self.desc.name.clone(),
                    label: label.clone(),
                });
            }
        }

        if let Some(missing) = expected.into_iter().next() {
            return Err(AttachError::MissingLabel {
                metric: self.desc.name.clone(),
                label: missing.to_owned(),
            });
        }

        self.iterators.push(series.iterator());
        self.stale_emitted.push(false);
        self.series.push(series);

        Ok(())
    }

    /// Whether any attached series never stops generating samples.
    #[must_use]
    pub fn has_infinite_time_series(&self) -> bool {
        self.series.iter().any(MetricTimeSeries::is_infinite)
    }

    /// Whether every attached series has ended and emitted its stale
    /// marker.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.stale_emitted.iter().all(|emitted| *emitted)
    }

    /// Evaluate every live series for the given scrape.
    ///
    /// Missing samples advance their series but are not returned. When
    /// a series runs out it gets a single farewell sample carrying the
    /// stale-marker NaN, stamped with the current ticket's time; from
    /// then on the series is skipped without being evaluated.
    pub fn evaluate(&mut self, scrape: ScrapeInfo) -> Vec<MetricResult> {
        let mut results = Vec::new();

        for (index, iterator) in self.iterators.iter_mut().enumerate() {
            if self.stale_emitted[index] {
                continue;
            }

            let result = iterator.evaluate(scrape);

            if result.missing {
                continue;
            }

            if result.exhausted {
                self.stale_emitted[index] = true;
                results.push(MetricResult {
                    labels: self.series[index].labels().clone(),
                    timestamp: scrape.iteration_time,
                    value: promgen_write::stale_marker(),
                    stale_marker: true,
                });
                continue;
            }

            results.push(MetricResult {
                labels: self.series[index].labels().clone(),
                timestamp: scrape.iteration_time,
                value: result.value,
                stale_marker: false,
            });
        }

        results
    }
}
