//! Protobuf messages for the remote write protocol.
//!
//! A hand-maintained mirror of the subset of `prompb` the sender side
//! needs. The field numbers are wire-compatibility-critical and must
//! not change.

/// A remote write request: the only message a sender POSTs.
///
/// `prompb` reserves fields 2 (Cortex source) and 3 (metadata, still
/// experimental in v1 of the spec); neither is modelled here.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct WriteRequest {
    /// The time series carried by this request.
    #[prost(message, repeated, tag = "1")]
    pub timeseries: ::prost::alloc::vec::Vec<TimeSeries>,
}

/// A single time series: sorted labels plus samples in timestamp order.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TimeSeries {
    /// Labels, sorted lexicographically by name, without duplicates.
    #[prost(message, repeated, tag = "1")]
    pub labels: ::prost::alloc::vec::Vec<Label>,
    /// Samples, in timestamp order.
    #[prost(message, repeated, tag = "2")]
    pub samples: ::prost::alloc::vec::Vec<Sample>,
}

/// A label name/value pair.
#[derive(Clone, PartialEq, Eq, ::prost::Message)]
pub struct Label {
    /// The label name.
    #[prost(string, tag = "1")]
    pub name: ::prost::alloc::string::String,
    /// The label value.
    #[prost(string, tag = "2")]
    pub value: ::prost::alloc::string::String,
}

/// A single sample.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Sample {
    /// The sample value. MUST be float64 on the wire.
    #[prost(double, tag = "1")]
    pub value: f64,
    /// Milliseconds since the Unix epoch.
    #[prost(int64, tag = "2")]
    pub timestamp: i64,
}

#[cfg(test)]
mod tests {
    use prost::Message;

    use super::*;

    #[test]
    fn encode_decode_round_trip() {
        let request = WriteRequest {
            timeseries: vec![TimeSeries {
                labels: vec![Label {
                    name: "__name__".to_owned(),
                    value: "my_metric".to_owned(),
                }],
                samples: vec![Sample {
                    value: 3.5,
                    timestamp: 1_700_000_000_000,
                }],
            }],
        };

        let encoded = request.encode_to_vec();
        let decoded = WriteRequest::decode(encoded.as_slice()).unwrap();
        assert_eq!(request, decoded);
    }
}
