//! Label validation and wire conversion.

use once_cell::sync::Lazy;
use regex::Regex;
use rustc_hash::FxHashSet;

use crate::{proto, Error, Label, METRIC_NAME_LABEL};

/// The remote write spec's pattern for metric names: colons are
/// allowed here but nowhere else.
static METRIC_NAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new("^[a-zA-Z_:][a-zA-Z0-9_:]*$").expect("metric name pattern is valid"));

/// The remote write spec's pattern for label names. Values, by
/// contrast, may be any UTF-8.
static LABEL_NAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new("^[a-zA-Z_][a-zA-Z0-9_]*$").expect("label name pattern is valid"));

/// Validate a label set and convert it to its wire form.
///
/// The complete label set is sent with each sample and MUST NOT contain
/// repeated or empty label names; the emitted labels are sorted
/// lexicographically by name. The `__name__` label is held to the
/// metric-name pattern, every other name to the label-name pattern.
pub(crate) fn convert_labels(labels: &[Label]) -> Result<Vec<proto::Label>, Error> {
    let mut converted = Vec::with_capacity(labels.len());
    let mut seen = FxHashSet::default();

    for label in labels {
        if label.name.is_empty() {
            return Err(Error::EmptyLabelName);
        }

        if !seen.insert(label.name.as_str()) {
            return Err(Error::DuplicateLabel(label.name.clone()));
        }

        if label.name == METRIC_NAME_LABEL {
            if !METRIC_NAME_PATTERN.is_match(&label.value) {
                return Err(Error::InvalidMetricName(label.value.clone()));
            }
        } else if !LABEL_NAME_PATTERN.is_match(&label.name) {
            return Err(Error::InvalidLabelName(label.name.clone()));
        }

        converted.push(proto::Label {
            name: label.name.clone(),
            value: label.value.clone(),
        });
    }

    converted.sort_by(|a, b| a.name.cmp(&b.name));

    Ok(converted)
}
