//! Conversion from evaluated metric results to remote-write series.

use promgen_write::{Label, Sample, TimeSeries, METRIC_NAME_LABEL};

use crate::family::MetricResult;

/// Convert a batch of metric results into the time series the
/// remote-write client expects: the metric name is prepended as the
/// `__name__` label, the stale-marker NaN is substituted for flagged
/// results, and each result becomes one single-sample series.
#[must_use]
pub fn to_remote_write_series(metric_name: &str, results: &[MetricResult]) -> Vec<TimeSeries> {
    results
        .iter()
        .map(|result| {
            let mut labels = Vec::with_capacity(result.labels.len() + 1);
            labels.push(Label::new(METRIC_NAME_LABEL, metric_name));
            for (name, value) in &result.labels {
                labels.push(Label::new(name.clone(), value.clone()));
            }

            let value = if result.stale_marker {
                promgen_write::stale_marker()
            } else {
                result.value
            };

            TimeSeries {
                labels,
                samples: vec![Sample {
                    time: result.timestamp,
                    value,
                }],
            }
        })
        .collect()
}
