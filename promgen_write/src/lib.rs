//! Prometheus remote-write support for the promgen project.
//!
//! This library implements the sender side of the Prometheus remote
//! write protocol: time series are label-validated, protobuf-encoded,
//! snappy-compressed and POSTed to a compatible receiver with the
//! headers the protocol requires. Response statuses are classified into
//! retryable and permanent failures; retry policy itself belongs to the
//! caller.
//!
//! See <https://prometheus.io/docs/concepts/remote_write_spec/>.

#![deny(clippy::all)]
#![deny(clippy::cargo)]
#![deny(clippy::perf)]
#![deny(clippy::suspicious)]
#![deny(clippy::complexity)]
#![deny(clippy::unnecessary_to_owned)]
#![deny(clippy::rc_buffer)]
#![deny(clippy::redundant_allocation)]
#![deny(unused_extern_crates)]
#![deny(unused_allocation)]
#![deny(unused_assignments)]
#![deny(unused_comparisons)]
#![deny(unreachable_pub)]
#![deny(missing_docs)]
#![deny(missing_debug_implementations)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::multiple_crate_versions)]
// `http::HeaderName` carries interior mutability in its representation;
// header constants are the crate's own convention.
#![allow(clippy::declare_interior_mutable_const)]
#![allow(clippy::borrow_interior_mutable_const)]

use std::time::{SystemTime, UNIX_EPOCH};

mod client;
mod labels;
pub mod proto;

pub use client::{RemoteWriteClient, RemoteWriteClientConfig, WriteOptions};

/// The reserved label carrying the metric name.
pub const METRIC_NAME_LABEL: &str = "__name__";

/// Bit pattern of the stale marker, a distinguished quiet NaN. The
/// remote write spec reserves exactly this NaN payload for signalling
/// staleness and forbids using it for anything else.
const STALE_MARKER_BITS: u64 = 0x7ff0_0000_0000_0002;

/// The stale marker value: the last sample of a time series that will
/// not be appended to anymore.
///
/// The value is a NaN with a specific payload; it must be moved through
/// float paths bit-exactly and never produced by arithmetic.
#[must_use]
pub fn stale_marker() -> f64 {
    f64::from_bits(STALE_MARKER_BITS)
}

/// Whether `value` is bit-exactly the stale marker.
#[must_use]
pub fn is_stale_marker(value: f64) -> bool {
    value.to_bits() == STALE_MARKER_BITS
}

/// Milliseconds since the Unix epoch, negative for instants before it.
///
/// Remote write timestamps MUST be int64 milliseconds since the epoch.
#[must_use]
pub fn unix_millis(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(elapsed) => i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX),
        Err(err) => -i64::try_from(err.duration().as_millis()).unwrap_or(i64::MAX),
    }
}

/// A time series: a label set and the samples recorded under it.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    /// Labels attached to this series. Order does not matter; labels
    /// are sorted on the wire.
    pub labels: Vec<Label>,
    /// Samples in timestamp order.
    pub samples: Vec<Sample>,
}

/// A label that can be attached to a time series.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    /// The label name.
    pub name: String,
    /// The label value.
    pub value: String,
}

impl Label {
    /// Create a new [`Label`].
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A single sample in a time series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    /// The instant the sample was taken.
    pub time: SystemTime,
    /// The value of the sample.
    pub value: f64,
}

/// Errors produced by the remote-write layer.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The configured endpoint is empty.
    #[error("remote write endpoint cannot be empty")]
    EmptyEndpoint,
    /// A caller-supplied header is owned by the client. Rejected at
    /// configuration time rather than silently overwritten.
    #[error("header {0:?} is owned by the remote write client and cannot be set")]
    ReservedHeader(String),
    /// A caller-supplied `User-Agent` header value is empty.
    #[error("user agent header value cannot be empty")]
    EmptyUserAgent,
    /// A label with an empty name was supplied.
    #[error("label name cannot be empty")]
    EmptyLabelName,
    /// A label name appeared more than once within a single series.
    #[error("label {0:?} is repeated within a single series")]
    DuplicateLabel(String),
    /// The metric name does not match the pattern the spec requires.
    #[error("metric name {0:?} is not a valid remote write metric name")]
    InvalidMetricName(String),
    /// A label name does not match the pattern the spec requires.
    #[error("label name {0:?} is not a valid remote write label name")]
    InvalidLabelName(String),
    /// Snappy compression of the encoded request failed.
    #[error("failed to compress write request: {0}")]
    Compress(#[from] snap::Error),
    /// The request could not be built or sent, or the response body
    /// could not be read.
    #[error("remote write transport failure: {0}")]
    Transport(#[from] reqwest::Error),
    /// The receiver answered 5xx or 429; the write should be retried
    /// with backoff.
    #[error("remote write endpoint returned retryable status {status}: {body:?}")]
    Retryable {
        /// The HTTP status of the response.
        status: http::StatusCode,
        /// The response body, lossily decoded.
        body: String,
    },
    /// The receiver answered with a non-429 4xx; the write must not be
    /// retried.
    #[error("remote write endpoint returned permanent status {status}: {body:?}")]
    Permanent {
        /// The HTTP status of the response.
        status: http::StatusCode,
        /// The response body, lossily decoded.
        body: String,
    },
}

impl Error {
    /// Whether the caller should retry the write with backoff.
    ///
    /// Transport failures count as retryable: if nothing will ever
    /// succeed the caller's buffers bound the damage, while dropping a
    /// transient network failure loses data.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Retryable { .. } | Self::Transport(_))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn stale_marker_round_trips_bit_exactly() {
        let marker = stale_marker();
        assert!(marker.is_nan());
        assert_eq!(marker.to_bits(), STALE_MARKER_BITS);
        assert!(is_stale_marker(marker));
        // An ordinary NaN is not a stale marker.
        assert!(!is_stale_marker(f64::NAN));
    }

    #[test]
    fn unix_millis_spans_the_epoch() {
        assert_eq!(unix_millis(UNIX_EPOCH), 0);
        assert_eq!(unix_millis(UNIX_EPOCH + Duration::from_millis(1_500)), 1_500);
        assert_eq!(unix_millis(UNIX_EPOCH - Duration::from_millis(250)), -250);
    }

    #[test]
    fn retryable_classification() {
        let retryable = Error::Retryable {
            status: http::StatusCode::TOO_MANY_REQUESTS,
            body: String::new(),
        };
        assert!(retryable.is_retryable());

        let permanent = Error::Permanent {
            status: http::StatusCode::BAD_REQUEST,
            body: String::new(),
        };
        assert!(!permanent.is_retryable());
    }
}
