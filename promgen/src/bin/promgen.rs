//! The promgen binary: scripted metrics for exercising a monitoring
//! stack.
//!
//! In `serve` mode generated metrics are exposed on `/metrics` for a
//! scrape collector; in `push` mode samples are delivered to a
//! remote-write receiver on a virtual clock. The demo metric set is
//! built in; the scrape schedule and receiver come from the
//! configuration file.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use prometheus_client::registry::Registry;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rustc_hash::FxHashMap;
use tracing::{error, info};
use tracing_subscriber::filter::EnvFilter;

use promgen::collector::Collector;
use promgen::config::Config;
use promgen::family::{Desc, MetricFamily, MetricType};
use promgen::push::Pusher;
use promgen::serve;
use promgen_series::{
    CustomSample, CustomValues, EndStrategy, Join, LinearSegment, Loop, MetricTimeSeries,
    RandomSegment, ScrapeResult, VoidSegment,
};
use promgen_write::RemoteWriteClient;

const VERSION: &str = env!("CARGO_PKG_VERSION");
const BUILD_SHA: &str = match option_env!("PROMGEN_BUILD_SHA") {
    Some(sha) => sha,
    None => "dev",
};

#[derive(thiserror::Error, Debug)]
enum Error {
    #[error("Failed to load configuration: {0}")]
    Config(#[from] promgen::config::Error),
    #[error("Metrics endpoint returned an error: {0}")]
    Serve(#[from] promgen::serve::Error),
    #[error("Push driver returned an error: {0}")]
    Push(#[from] promgen::push::Error),
    #[error("Remote write client rejected its configuration: {0}")]
    Write(#[from] promgen_write::Error),
    #[error("Invalid demo shape: {0}")]
    Series(#[from] promgen_series::Error),
    #[error("Invalid demo series: {0}")]
    Attach(#[from] promgen::family::AttachError),
    #[error("Push mode requires a remote_write section in the configuration")]
    MissingRemoteWrite,
}

#[derive(Parser, Debug)]
#[command(
    name = "promgen",
    version,
    about = "A deterministic Prometheus metrics generator"
)]
struct Cli {
    /// Config file path, defaulting to $HOME/promgen.yaml
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show version
    Version,
    /// Expose the generated metrics on /metrics for a scrape collector
    Serve,
    /// Push the generated samples to a remote-write receiver
    Push {
        /// Do not sleep between virtual scrapes
        #[arg(long)]
        no_pace: bool,
    },
}

fn default_config_path() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_default()
        .join("promgen.yaml")
}

/// Load the configuration, falling back to defaults when the implicit
/// config file does not exist. An explicitly given path must exist.
fn load_config(cli: &Cli) -> Result<Config, Error> {
    match &cli.config {
        Some(path) => Ok(Config::from_path(path)?),
        None => {
            let path = default_config_path();
            if path.exists() {
                Ok(Config::from_path(&path)?)
            } else {
                Ok(Config::default())
            }
        }
    }
}

/// The built-in demo metric set: a counter family with looping and
/// plateauing traffic shapes, and a gauge family whose second series
/// ends and goes stale mid-run.
fn demo_families() -> Result<Vec<MetricFamily>, Error> {
    let mut requests = MetricFamily::new(Desc::new(
        "promgen_demo_requests",
        "Synthetic request volume shaped by promgen.",
        MetricType::Counter,
        vec!["path".to_owned()],
    ));

    let mut labels = FxHashMap::default();
    labels.insert("path".to_owned(), "/api".to_owned());
    requests.attach(MetricTimeSeries::new(
        labels,
        Arc::new(Join::new(vec![
            Arc::new(LinearSegment::new(0.0, 600.0, 40)?),
            Arc::new(LinearSegment::new(600.0, 600.0, 20)?),
        ])),
        // Looping a counter back to zero reads as a counter reset.
        EndStrategy::Loop,
    ))?;

    let mut labels = FxHashMap::default();
    labels.insert("path".to_owned(), "/healthz".to_owned());
    requests.attach(MetricTimeSeries::new(
        labels,
        Arc::new(LinearSegment::new(0.0, 120.0, 60)?),
        EndStrategy::SendLastValue,
    ))?;

    let mut queue_depth = MetricFamily::new(Desc::new(
        "promgen_demo_queue_depth",
        "Synthetic queue depth shaped by promgen.",
        MetricType::Gauge,
        vec!["queue".to_owned()],
    ));

    let mut labels = FxHashMap::default();
    labels.insert("queue".to_owned(), "ingest".to_owned());
    queue_depth.attach(MetricTimeSeries::new(
        labels,
        Arc::new(Loop::new(
            Arc::new(Join::new(vec![
                Arc::new(LinearSegment::new(0.0, 50.0, 10)?),
                Arc::new(RandomSegment::new(
                    40.0,
                    60.0,
                    20,
                    StdRng::seed_from_u64(0x70726f6d),
                )?),
                Arc::new(VoidSegment::new(3)),
                Arc::new(LinearSegment::new(50.0, 0.0, 10)?),
            ])),
            4,
        )),
        EndStrategy::SendCustomValue(ScrapeResult::value(0.0)),
    ))?;

    let mut labels = FxHashMap::default();
    labels.insert("queue".to_owned(), "backfill".to_owned());
    queue_depth.attach(MetricTimeSeries::new(
        labels,
        Arc::new(CustomValues::new(vec![
            CustomSample::value(12.0),
            CustomSample::value(7.0),
            CustomSample::missing(),
            CustomSample::value(3.0),
            CustomSample::value(0.0),
        ])),
        // This series ends: the stale marker path is exercised.
        EndStrategy::RemoveTimeSeries,
    ))?;

    Ok(vec![requests, queue_depth])
}

async fn run(cli: Cli) -> Result<(), Error> {
    match cli.command {
        Command::Version => {
            println!("Version: {VERSION}");
            println!("SHA: {BUILD_SHA}");
            Ok(())
        }
        Command::Serve => {
            let config = load_config(&cli)?;

            let mut registry = Registry::default();
            registry.register_collector(Box::new(Collector::new(demo_families()?)));

            tokio::select! {
                result = serve::run(config.listen_addr, registry) => result?,
                _ = tokio::signal::ctrl_c() => {
                    info!("received ctrl-c, shutting down");
                }
            }
            Ok(())
        }
        Command::Push { no_pace } => {
            let config = load_config(&cli)?;
            let remote_write = config.remote_write.ok_or(Error::MissingRemoteWrite)?;

            let client = RemoteWriteClient::new(remote_write.client_config()?)?;
            let scraper = config.scrape.scraper()?;
            if scraper.is_infinite() {
                info!("no stop condition configured, pushing until interrupted");
            }

            let pusher = Pusher::new(scraper, demo_families()?, client, !no_pace);

            tokio::select! {
                result = pusher.run() => result?,
                _ = tokio::signal::ctrl_c() => {
                    info!("received ctrl-c, shutting down");
                }
            }
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}
