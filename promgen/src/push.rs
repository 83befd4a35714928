//! The push driver.
//!
//! Drives a set of metric families through a scraper's tickets and
//! remote-writes the resulting samples. Within one driver every series
//! is evaluated in attach order and sent in timestamp order, which
//! satisfies the remote-write ordering rules without any sharding.
//!
//! ## Metrics
//!
//! `requests_sent`: Total remote write requests attempted
//! `request_ok`: Successful remote write requests
//! `request_failure`: Failed but retryable remote write requests
//! `samples_sent`: Total series samples delivered
//!

use metrics::counter;
use tracing::{info, warn};

use promgen_series::Scraper;
use promgen_write::{RemoteWriteClient, WriteOptions};

use crate::adapter::to_remote_write_series;
use crate::family::MetricFamily;

/// Errors produced by [`Pusher`].
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The receiver rejected a write permanently; pushing stopped.
    #[error("remote write failed: {0}")]
    Write(#[from] promgen_write::Error),
}

/// Pushes generated samples to a remote-write receiver.
#[derive(Debug)]
pub struct Pusher {
    scraper: Scraper,
    families: Vec<MetricFamily>,
    client: RemoteWriteClient,
    /// Sleep one scrape interval between tickets to approximate real
    /// time. The virtual timestamps are identical either way.
    pace: bool,
}

impl Pusher {
    /// Create a new [`Pusher`].
    #[must_use]
    pub fn new(
        scraper: Scraper,
        families: Vec<MetricFamily>,
        client: RemoteWriteClient,
        pace: bool,
    ) -> Self {
        Self {
            scraper,
            families,
            client,
            pace,
        }
    }

    /// Run the driver to completion.
    ///
    /// Terminates when the scraper runs out of tickets or when every
    /// family has gone stale. Retryable write failures are logged and
    /// the affected batch is dropped; retry buffering is a
    /// caller-level concern.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Write`] when the receiver classifies a write as
    /// a permanent failure, since every subsequent write would fail the
    /// same way.
    pub async fn run(mut self) -> Result<(), Error> {
        let mut tickets = self.scraper.iterator();

        loop {
            let Some(scrape) = tickets.next() else {
                info!("scraper exhausted, stopping push");
                return Ok(());
            };

            let mut batch = Vec::new();
            for family in &mut self.families {
                let results = family.evaluate(scrape);
                batch.extend(to_remote_write_series(family.desc().name(), &results));
            }

            if !batch.is_empty() {
                counter!("requests_sent").increment(1);
                let sample_count = batch.len();

                match self.client.send(&batch, &WriteOptions::default()).await {
                    Ok(()) => {
                        counter!("request_ok").increment(1);
                        counter!("samples_sent").increment(sample_count as u64);
                    }
                    Err(err) if err.is_retryable() => {
                        counter!("request_failure").increment(1);
                        warn!(
                            iteration = scrape.iteration_index,
                            "dropping batch after retryable remote write failure: {err}"
                        );
                    }
                    Err(err) => return Err(err.into()),
                }
            }

            if self.families.iter().all(MetricFamily::is_exhausted) {
                info!("all series have gone stale, stopping push");
                return Ok(());
            }

            if self.pace && tickets.has_next() {
                tokio::time::sleep(self.scraper.interval()).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;
    use std::sync::Arc;
    use std::time::{Duration, UNIX_EPOCH};

    use http_body_util::BodyExt;
    use hyper::service::service_fn;
    use hyper_util::rt::TokioIo;
    use prost::Message;
    use rustc_hash::FxHashMap;
    use tokio::net::TcpListener;
    use tokio::sync::mpsc;

    use promgen_series::{
        EndStrategy, LinearSegment, MetricTimeSeries, ScraperConfig,
    };
    use promgen_write::{proto, RemoteWriteClient, RemoteWriteClientConfig};

    use crate::family::{Desc, MetricType};

    use super::*;

    /// Answer every request on one connection with 204, forwarding each
    /// decoded write request.
    async fn capture_server() -> (SocketAddr, mpsc::UnboundedReceiver<proto::WriteRequest>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let io = TokioIo::new(stream);

            let service = service_fn(move |request: hyper::Request<hyper::body::Incoming>| {
                let tx = tx.clone();
                async move {
                    let body = request.into_body().collect().await.unwrap().to_bytes();
                    let decompressed = snap::raw::Decoder::new()
                        .decompress_vec(&body)
                        .unwrap();
                    let decoded = proto::WriteRequest::decode(decompressed.as_slice()).unwrap();
                    let _ = tx.send(decoded);

                    Ok::<_, std::convert::Infallible>(
                        hyper::Response::builder()
                            .status(hyper::StatusCode::NO_CONTENT)
                            .body(http_body_util::Full::new(bytes::Bytes::new()))
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

    fn ramp_family(end_strategy: EndStrategy) -> MetricFamily {
        let desc = Desc::new(
            "demo_metric",
            "A demo metric.",
            MetricType::Gauge,
            Vec::new(),
        );
        let mut family = MetricFamily::new(desc);
        family
            .attach(MetricTimeSeries::new(
                FxHashMap::default(),
                Arc::new(LinearSegment::new(50.0, 70.0, 3).unwrap()),
                end_strategy,
            ))
            .unwrap();
        family
    }

    #[tokio::test]
    async fn pushes_values_then_one_stale_marker() {
        let (addr, mut rx) = capture_server().await;

        let scraper = Scraper::new(ScraperConfig {
            start_time: UNIX_EPOCH + Duration::from_secs(1_672_569_000),
            interval: Duration::from_secs(15),
            end_time: None,
            iteration_count_limit: Some(9),
        })
        .unwrap();

        let client = RemoteWriteClient::new(RemoteWriteClientConfig::new(format!(
            "http://{addr}/api/v1/write"
        )))
        .unwrap();

        let pusher = Pusher::new(
            scraper,
            vec![ramp_family(EndStrategy::RemoveTimeSeries)],
            client,
            false,
        );
        pusher.run().await.unwrap();

        let mut requests = Vec::new();
        while let Ok(request) = rx.try_recv() {
            requests.push(request);
        }

        // Three value batches plus the stale-marker batch; the driver
        // stops once the family is fully stale rather than burning the
        // remaining tickets.
        assert_eq!(requests.len(), 4);

        let values: Vec<f64> = requests
            .iter()
            .map(|request| request.timeseries[0].samples[0].value)
            .collect();
        assert!((values[0] - 50.0).abs() < f64::EPSILON);
        assert!((values[1] - 60.0).abs() < f64::EPSILON);
        assert!((values[2] - 70.0).abs() < f64::EPSILON);
        assert!(promgen_write::is_stale_marker(values[3]));

        // Timestamps advance by exactly one interval per ticket.
        let timestamps: Vec<i64> = requests
            .iter()
            .map(|request| request.timeseries[0].samples[0].timestamp)
            .collect();
        for pair in timestamps.windows(2) {
            assert_eq!(pair[1] - pair[0], 15_000);
        }
    }
}
