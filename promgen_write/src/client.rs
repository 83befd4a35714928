//! The remote-write HTTP client.

use std::time::Duration;

use http::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_ENCODING, CONTENT_TYPE, USER_AGENT};
use http::StatusCode;
use prost::Message;
use tracing::debug;

use crate::labels::convert_labels;
use crate::{proto, unix_millis, Error, TimeSeries};

const CONTENT_TYPE_PROTOBUF: &str = "application/x-protobuf";
const CONTENT_ENCODING_SNAPPY: &str = "snappy";
const REMOTE_WRITE_VERSION_HEADER: HeaderName =
    HeaderName::from_static("x-prometheus-remote-write-version");
const REMOTE_WRITE_VERSION: &str = "0.1.0";
const DEFAULT_USER_AGENT: &str = concat!("promgen/", env!("CARGO_PKG_VERSION"));

fn default_timeout() -> Duration {
    Duration::from_secs(10)
}

/// Configuration for a [`RemoteWriteClient`].
#[derive(Debug, Clone)]
pub struct RemoteWriteClientConfig {
    /// The URL samples are sent to, e.g.
    /// `http://localhost:9090/api/v1/write`.
    pub endpoint: String,
    /// Headers sent with every request. The protocol headers
    /// (`Content-Type`, `Content-Encoding`,
    /// `X-Prometheus-Remote-Write-Version`) are owned by the client and
    /// are rejected here.
    pub headers: HeaderMap,
    /// Total request timeout. Ignored when the HTTP client is supplied
    /// by the caller.
    pub timeout: Duration,
}

impl RemoteWriteClientConfig {
    /// Create a configuration for the given endpoint with no extra
    /// headers and the default ten second timeout.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            headers: HeaderMap::new(),
            timeout: default_timeout(),
        }
    }
}

/// Extra headers for a single [`RemoteWriteClient::send`] call.
#[derive(Debug, Clone, Default)]
pub struct WriteOptions {
    headers: HeaderMap,
}

impl WriteOptions {
    /// Add a header to be sent with this write. Repeated names
    /// accumulate values.
    #[must_use]
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }
}

/// Sends samples to a Prometheus remote-write compatible receiver:
/// Prometheus itself, Cortex, VictoriaMetrics and friends.
///
/// Samples for a given series MUST be sent in timestamp order. Series
/// may be sharded across parallel `send` calls as long as each series
/// stays within one shard; the client itself is cheap to clone and safe
/// to share.
#[derive(Debug, Clone)]
pub struct RemoteWriteClient {
    endpoint: String,
    headers: HeaderMap,
    http: reqwest::Client,
}

impl RemoteWriteClient {
    /// Create a new [`RemoteWriteClient`] with its own HTTP client.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint is empty, if a configured
    /// header is owned by the client, or if the HTTP client cannot be
    /// built.
    pub fn new(cfg: RemoteWriteClientConfig) -> Result<Self, Error> {
        let http = reqwest::Client::builder().timeout(cfg.timeout).build()?;
        Self::with_http_client(cfg, http)
    }

    /// Create a new [`RemoteWriteClient`] reusing a caller-supplied
    /// HTTP client; connection pooling and timeouts are then the
    /// caller's to configure.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint is empty or a configured header
    /// is owned by the client.
    pub fn with_http_client(
        cfg: RemoteWriteClientConfig,
        http: reqwest::Client,
    ) -> Result<Self, Error> {
        if cfg.endpoint.is_empty() {
            return Err(Error::EmptyEndpoint);
        }
        validate_headers(&cfg.headers)?;

        Ok(Self {
            endpoint: cfg.endpoint,
            headers: cfg.headers,
            http,
        })
    }

    /// Send the given time series to the receiver.
    ///
    /// The receiver's response body is read to completion on every path
    /// so the underlying connection can be reused, then discarded: the
    /// spec reserves it for future use.
    ///
    /// # Errors
    ///
    /// Label validation failures and reserved per-call headers surface
    /// before anything is sent. Failures to build or complete the
    /// round-trip return [`Error::Transport`]; a 5xx or 429 response
    /// returns [`Error::Retryable`]; any other non-2xx response
    /// returns [`Error::Permanent`].
    pub async fn send(
        &self,
        timeseries: &[TimeSeries],
        options: &WriteOptions,
    ) -> Result<(), Error> {
        validate_headers(&options.headers)?;

        let body = encode_write_request(timeseries)?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(CONTENT_TYPE_PROTOBUF));
        headers.insert(
            CONTENT_ENCODING,
            HeaderValue::from_static(CONTENT_ENCODING_SNAPPY),
        );
        headers.insert(
            REMOTE_WRITE_VERSION_HEADER,
            HeaderValue::from_static(REMOTE_WRITE_VERSION),
        );
        headers.insert(USER_AGENT, HeaderValue::from_static(DEFAULT_USER_AGENT));
        merge_headers(&mut headers, &self.headers);
        merge_headers(&mut headers, &options.headers);

        debug!(
            endpoint = %self.endpoint,
            series = timeseries.len(),
            bytes = body.len(),
            "sending remote write request"
        );

        let response = self
            .http
            .post(&self.endpoint)
            .headers(headers)
            .body(body)
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;

        if status.is_success() {
            return Ok(());
        }

        let body = String::from_utf8_lossy(&body).into_owned();
        if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
            return Err(Error::Retryable { status, body });
        }

        Err(Error::Permanent { status, body })
    }
}

/// Replace default headers with caller-supplied ones, keeping repeated
/// values of a repeated name together.
fn merge_headers(dst: &mut HeaderMap, src: &HeaderMap) {
    for name in src.keys() {
        dst.remove(name);
    }
    for (name, value) in src {
        dst.append(name, value.clone());
    }
}

/// Reject headers owned by the client, and empty `User-Agent` values.
fn validate_headers(headers: &HeaderMap) -> Result<(), Error> {
    for reserved in [CONTENT_TYPE, CONTENT_ENCODING, REMOTE_WRITE_VERSION_HEADER] {
        if headers.contains_key(&reserved) {
            return Err(Error::ReservedHeader(reserved.as_str().to_owned()));
        }
    }

    for value in headers.get_all(USER_AGENT) {
        if value.is_empty() {
            return Err(Error::EmptyUserAgent);
        }
    }

    Ok(())
}

/// Validate, protobuf-encode and snappy-compress a write request body.
fn encode_write_request(timeseries: &[TimeSeries]) -> Result<Vec<u8>, Error> {
    let mut converted = Vec::with_capacity(timeseries.len());

    for series in timeseries {
        let labels = convert_labels(&series.labels)?;
        let samples = series
            .samples
            .iter()
            .map(|sample| proto::Sample {
                value: sample.value,
                timestamp: unix_millis(sample.time),
            })
            .collect();

        converted.push(proto::TimeSeries { labels, samples });
    }

    let request = proto::WriteRequest {
        timeseries: converted,
    };

    let encoded = request.encode_to_vec();
    Ok(snap::raw::Encoder::new().compress_vec(&encoded)?)
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;
    use std::time::{Duration, UNIX_EPOCH};

    use http_body_util::{BodyExt, Full};
    use hyper::body::Incoming;
    use hyper::service::service_fn;
    use hyper::Request;
    use hyper_util::rt::TokioIo;
    use tokio::net::TcpListener;
    use tokio::sync::mpsc;

    use super::*;
    use crate::{Label, Sample};

    struct CapturedRequest {
        headers: HeaderMap,
        body: Vec<u8>,
    }

    /// Serve exactly one connection on an ephemeral port, answering
    /// every request with `status` and an empty body while capturing
    /// what was received.
    async fn capture_server(status: StatusCode) -> (SocketAddr, mpsc::Receiver<CapturedRequest>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = mpsc::channel(4);

        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let io = TokioIo::new(stream);

            let service = service_fn(move |request: Request<Incoming>| {
                let tx = tx.clone();
                async move {
                    let (parts, body) = request.into_parts();
                    let body = body.collect().await.unwrap().to_bytes().to_vec();
                    let _ = tx
                        .send(CapturedRequest {
                            headers: parts.headers,
                            body,
                        })
                        .await;

                    Ok::<_, std::convert::Infallible>(
                        hyper::Response::builder()
                            .status(status)
                            .body(Full::new(bytes::Bytes::new()))
                            .unwrap(),
                    )
                }
            });

            let _ = hyper::server::conn::http1::Builder::new()
                .serve_connection(io, service)
                .await;
        });

        (addr, rx)
    }

    fn client_for(addr: SocketAddr) -> RemoteWriteClient {
        let cfg = RemoteWriteClientConfig::new(format!("http://{addr}/api/v1/write"));
        RemoteWriteClient::new(cfg).unwrap()
    }

    fn sample_series() -> TimeSeries {
        TimeSeries {
            labels: vec![
                Label::new("b", "2"),
                Label::new(crate::METRIC_NAME_LABEL, "my_metric"),
                Label::new("a", "1"),
            ],
            samples: vec![Sample {
                time: UNIX_EPOCH + Duration::from_millis(1_700_000_000_123),
                value: 19.5,
            }],
        }
    }

    #[tokio::test]
    async fn sends_compliant_write_request() {
        let (addr, mut rx) = capture_server(StatusCode::NO_CONTENT).await;
        let client = client_for(addr);

        client
            .send(&[sample_series()], &WriteOptions::default())
            .await
            .unwrap();

        let captured = rx.recv().await.unwrap();
        assert_eq!(
            captured.headers.get(CONTENT_TYPE).unwrap(),
            CONTENT_TYPE_PROTOBUF
        );
        assert_eq!(
            captured.headers.get(CONTENT_ENCODING).unwrap(),
            CONTENT_ENCODING_SNAPPY
        );
        assert_eq!(
            captured.headers.get(REMOTE_WRITE_VERSION_HEADER).unwrap(),
            REMOTE_WRITE_VERSION
        );
        assert!(captured
            .headers
            .get(USER_AGENT)
            .unwrap()
            .to_str()
            .unwrap()
            .starts_with("promgen/"));

        let decompressed = snap::raw::Decoder::new()
            .decompress_vec(&captured.body)
            .unwrap();
        let request = proto::WriteRequest::decode(decompressed.as_slice()).unwrap();

        assert_eq!(request.timeseries.len(), 1);
        let series = &request.timeseries[0];
        let labels: Vec<(&str, &str)> = series
            .labels
            .iter()
            .map(|label| (label.name.as_str(), label.value.as_str()))
            .collect();
        assert_eq!(
            labels,
            vec![("__name__", "my_metric"), ("a", "1"), ("b", "2")]
        );

        assert_eq!(series.samples.len(), 1);
        assert_eq!(series.samples[0].timestamp, 1_700_000_000_123);
        assert!((series.samples[0].value - 19.5).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn per_call_headers_are_sent_and_override_defaults() {
        let (addr, mut rx) = capture_server(StatusCode::OK).await;
        let client = client_for(addr);

        let options = WriteOptions::default()
            .header(
                HeaderName::from_static("x-scope-orgid"),
                HeaderValue::from_static("tenant-1"),
            )
            .header(USER_AGENT, HeaderValue::from_static("custom-agent"));

        client.send(&[sample_series()], &options).await.unwrap();

        let captured = rx.recv().await.unwrap();
        assert_eq!(captured.headers.get("x-scope-orgid").unwrap(), "tenant-1");
        assert_eq!(captured.headers.get(USER_AGENT).unwrap(), "custom-agent");
    }

    #[tokio::test]
    async fn classifies_server_errors_as_retryable() {
        let (addr, _rx) = capture_server(StatusCode::INTERNAL_SERVER_ERROR).await;
        let client = client_for(addr);

        let err = client
            .send(&[sample_series()], &WriteOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Retryable { .. }));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn classifies_too_many_requests_as_retryable() {
        let (addr, _rx) = capture_server(StatusCode::TOO_MANY_REQUESTS).await;
        let client = client_for(addr);

        let err = client
            .send(&[sample_series()], &WriteOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Retryable { .. }));
    }

    #[tokio::test]
    async fn classifies_other_client_errors_as_permanent() {
        let (addr, _rx) = capture_server(StatusCode::BAD_REQUEST).await;
        let client = client_for(addr);

        let err = client
            .send(&[sample_series()], &WriteOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Permanent { .. }));
        assert!(!err.is_retryable());
    }

    #[test]
    fn rejects_reserved_instance_headers() {
        for name in [
            CONTENT_TYPE,
            CONTENT_ENCODING,
            REMOTE_WRITE_VERSION_HEADER,
        ] {
            let mut cfg = RemoteWriteClientConfig::new("http://localhost/api/v1/write");
            cfg.headers.insert(&name, HeaderValue::from_static("x"));
            assert!(
                matches!(RemoteWriteClient::new(cfg), Err(Error::ReservedHeader(_))),
                "header {name:?} was not rejected"
            );
        }
    }

    #[test]
    fn rejects_empty_endpoint() {
        let cfg = RemoteWriteClientConfig::new("");
        assert!(matches!(
            RemoteWriteClient::new(cfg),
            Err(Error::EmptyEndpoint)
        ));
    }

    #[test]
    fn rejects_empty_user_agent() {
        let mut cfg = RemoteWriteClientConfig::new("http://localhost/api/v1/write");
        cfg.headers.insert(USER_AGENT, HeaderValue::from_static(""));
        assert!(matches!(
            RemoteWriteClient::new(cfg),
            Err(Error::EmptyUserAgent)
        ));
    }

    #[tokio::test]
    async fn validation_failures_surface_before_sending() {
        // No server is listening on this endpoint; validation must trip
        // before any connection is attempted.
        let cfg = RemoteWriteClientConfig::new("http://127.0.0.1:1/api/v1/write");
        let client = RemoteWriteClient::new(cfg).unwrap();

        let series = TimeSeries {
            labels: vec![Label::new("a", "1"), Label::new("a", "2")],
            samples: Vec::new(),
        };

        let err = client
            .send(&[series], &WriteOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateLabel(_)));
    }
}
