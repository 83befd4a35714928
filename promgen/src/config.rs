//! Operator-facing YAML configuration.
//!
//! Everything the binary needs to decide at startup lives here: where
//! the `/metrics` endpoint binds, which remote-write receiver to push
//! to, and the virtual scrape schedule. Parsing is strict so a typo in
//! a field name fails loudly instead of being silently ignored.

use std::net::SocketAddr;
use std::path::Path;
use std::time::{Duration, SystemTime};

use http::header::{HeaderMap, HeaderName, HeaderValue};
use rustc_hash::FxHashMap;
use serde::Deserialize;

use promgen_series::{Scraper, ScraperConfig};
use promgen_write::RemoteWriteClientConfig;

/// Errors produced by [`Config`].
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Error for IO operations when reading the config file.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    /// Error for a serde [`serde_yaml`].
    #[error("failed to deserialize yaml: {0}")]
    SerdeYaml(#[from] serde_yaml::Error),
    /// A timestamp in the config was not valid RFC 3339.
    #[error("failed to parse timestamp: {0}")]
    Timestamp(#[from] humantime::TimestampError),
    /// A configured header name was not valid.
    #[error("invalid header name: {0}")]
    HeaderName(#[from] http::header::InvalidHeaderName),
    /// A configured header value was not valid.
    #[error("invalid header value: {0}")]
    HeaderValue(#[from] http::header::InvalidHeaderValue),
    /// The scraper configuration was rejected.
    #[error("invalid scrape configuration: {0}")]
    Scraper(#[from] promgen_series::Error),
}

fn default_listen_addr() -> SocketAddr {
    "0.0.0.0:9464".parse().expect("default listen addr parses")
}

fn default_interval_seconds() -> u64 {
    15
}

fn default_timeout_seconds() -> u64 {
    10
}

/// Main configuration struct for this program.
#[derive(Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// The address the `/metrics` endpoint binds to in pull mode.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,
    /// The remote-write receiver used in push mode.
    #[serde(default)]
    pub remote_write: Option<RemoteWriteConfig>,
    /// The virtual scrape schedule used in push mode.
    #[serde(default)]
    pub scrape: ScrapeConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            remote_write: None,
            scrape: ScrapeConfig::default(),
        }
    }
}

impl Config {
    /// Parse a configuration from YAML.
    ///
    /// # Errors
    ///
    /// Returns an error if the contents do not deserialize.
    pub fn from_yaml(contents: &str) -> Result<Self, Error> {
        Ok(serde_yaml::from_str(contents)?)
    }

    /// Load a configuration from the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or does not
    /// deserialize.
    pub fn from_path(path: &Path) -> Result<Self, Error> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }
}

/// Configuration for the remote-write receiver.
#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
#[serde(rename_all = "snake_case")]
pub struct RemoteWriteConfig {
    /// The receiver URL, e.g. `http://localhost:9090/api/v1/write`.
    pub endpoint: String,
    /// Extra headers sent with every request, e.g. tenancy headers.
    #[serde(default)]
    pub headers: FxHashMap<String, String>,
    /// Total request timeout in seconds.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl RemoteWriteConfig {
    /// Build the remote-write client configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if a configured header does not parse.
    pub fn client_config(&self) -> Result<RemoteWriteClientConfig, Error> {
        let mut headers = HeaderMap::new();
        for (name, value) in &self.headers {
            headers.append(
                name.parse::<HeaderName>()?,
                value.parse::<HeaderValue>()?,
            );
        }

        let mut cfg = RemoteWriteClientConfig::new(self.endpoint.clone());
        cfg.headers = headers;
        cfg.timeout = Duration::from_secs(self.timeout_seconds);
        Ok(cfg)
    }
}

/// Configuration for the virtual scrape schedule.
#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
#[serde(rename_all = "snake_case")]
pub struct ScrapeConfig {
    /// RFC 3339 timestamp of the first scrape. Defaults to the moment
    /// the program starts.
    #[serde(default)]
    pub start: Option<String>,
    /// Seconds between consecutive scrapes.
    #[serde(default = "default_interval_seconds")]
    pub interval_seconds: u64,
    /// RFC 3339 timestamp at which to stop, inclusive.
    #[serde(default)]
    pub end: Option<String>,
    /// The maximum number of scrapes to generate.
    #[serde(default)]
    pub iteration_count_limit: Option<u64>,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            start: None,
            interval_seconds: default_interval_seconds(),
            end: None,
            iteration_count_limit: None,
        }
    }
}

impl ScrapeConfig {
    /// Build the scraper described by this configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if a timestamp does not parse or the schedule
    /// is rejected by the scraper.
    pub fn scraper(&self) -> Result<Scraper, Error> {
        let start_time = match &self.start {
            Some(start) => humantime::parse_rfc3339(start)?,
            None => SystemTime::now(),
        };

        let end_time = match &self.end {
            Some(end) => Some(humantime::parse_rfc3339(end)?),
            None => None,
        };

        Ok(Scraper::new(ScraperConfig {
            start_time,
            interval: Duration::from_secs(self.interval_seconds),
            end_time,
            iteration_count_limit: self.iteration_count_limit,
        })?)
    }
}
