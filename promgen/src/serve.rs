//! The `/metrics` exposition endpoint for pull mode.

use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::Full;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto;
use prometheus_client::encoding::text;
use prometheus_client::registry::Registry;
use tokio::net::TcpListener;
use tracing::{debug, info};

/// Errors produced by [`run`].
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Wrapper for [`std::io::Error`].
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

const OPENMETRICS_CONTENT_TYPE: &str =
    "application/openmetrics-text; version=1.0.0; charset=utf-8";

/// Serve the registry's text exposition on `GET /metrics` until the
/// task is cancelled.
///
/// # Errors
///
/// Function will return an error if binding or accepting fails.
pub async fn run(addr: SocketAddr, registry: Registry) -> Result<(), Error> {
    let registry = Arc::new(registry);
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "serving metrics");

    loop {
        let (stream, peer) = listener.accept().await?;
        debug!(%peer, "accepted connection");

        let registry = Arc::clone(&registry);
        tokio::spawn(async move {
            let io = TokioIo::new(stream);
            let service = service_fn(move |request: Request<hyper::body::Incoming>| {
                let registry = Arc::clone(&registry);
                async move { respond(&request, &registry) }
            });

            if let Err(err) = auto::Builder::new(TokioExecutor::new())
                .serve_connection(io, service)
                .await
            {
                debug!("connection closed with error: {err}");
            }
        });
    }
}

fn respond(
    request: &Request<hyper::body::Incoming>,
    registry: &Registry,
) -> Result<Response<Full<Bytes>>, std::convert::Infallible> {
    if request.uri().path() != "/metrics" {
        let mut response = Response::new(Full::new(Bytes::new()));
        *response.status_mut() = StatusCode::NOT_FOUND;
        return Ok(response);
    }

    let mut body = String::new();
    if text::encode(&mut body, registry).is_err() {
        let mut response = Response::new(Full::new(Bytes::new()));
        *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
        return Ok(response);
    }

    let response = Response::builder()
        .header(hyper::header::CONTENT_TYPE, OPENMETRICS_CONTENT_TYPE)
        .body(Full::new(Bytes::from(body)));

    Ok(match response {
        Ok(response) => response,
        Err(_) => {
            let mut response = Response::new(Full::new(Bytes::new()));
            *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
            response
        }
    })
}
