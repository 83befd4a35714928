//! The scrape-collection adapter.
//!
//! Bridges metric families into the `prometheus-client` collection
//! contract. Each collection pass is treated as one virtual scrape: a
//! ticket is minted from the wall clock and an ever-growing pass
//! counter, every family is evaluated against it, and the results are
//! encoded as constant counters and gauges.

use std::sync::{Mutex, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

use prometheus_client::encoding::{DescriptorEncoder, EncodeMetric};
use prometheus_client::metrics::counter::ConstCounter;
use prometheus_client::metrics::gauge::ConstGauge;
use prometheus_client::metrics::MetricType as ClientMetricType;

use promgen_series::ScrapeInfo;

use crate::family::{MetricFamily, MetricResult, MetricType};

/// Implements the `prometheus-client` collection contract over a set of
/// metric families.
///
/// Register with a registry via `Registry::register_collector`. The
/// registry guarantees one encode call at a time; the internal mutex
/// serializes collection passes and protects the iteration bookkeeping
/// either way, since families are stateful.
#[derive(Debug)]
pub struct Collector {
    inner: Mutex<Inner>,
}

#[derive(Debug)]
struct Inner {
    families: Vec<MetricFamily>,
    /// The wall-clock instant of iteration zero.
    first_iteration_time: SystemTime,
    iteration_index: u64,
}

impl Collector {
    /// Create a new [`Collector`] over the given families.
    #[must_use]
    pub fn new(families: Vec<MetricFamily>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                families,
                first_iteration_time: UNIX_EPOCH,
                iteration_index: 0,
            }),
        }
    }
}

impl prometheus_client::collector::Collector for Collector {
    fn encode(&self, mut encoder: DescriptorEncoder) -> Result<(), std::fmt::Error> {
        let now = SystemTime::now();

        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);

        if inner.iteration_index == 0 {
            inner.first_iteration_time = now;
        }

        let scrape = ScrapeInfo {
            first_iteration_time: inner.first_iteration_time,
            iteration_index: inner.iteration_index,
            iteration_time: now,
        };
        inner.iteration_index += 1;

        for family in &mut inner.families {
            let results = family.evaluate(scrape);

            let metric_type = match family.desc().metric_type() {
                MetricType::Counter => ClientMetricType::Counter,
                MetricType::Gauge => ClientMetricType::Gauge,
            };

            let mut family_encoder = encoder.encode_descriptor(
                family.desc().name(),
                family.desc().help(),
                None,
                metric_type,
            )?;

            for result in &results {
                // A single bad sample does not fail the whole pass.
                let _ = encode_result(&mut family_encoder, family, result);
            }
        }

        Ok(())
    }
}

fn encode_result(
    family_encoder: &mut prometheus_client::encoding::MetricEncoder,
    family: &MetricFamily,
    result: &MetricResult,
) -> Result<(), std::fmt::Error> {
    // Label values are emitted in the descriptor's label-name order.
    let labels: Vec<(String, String)> = family
        .desc()
        .label_names()
        .iter()
        .map(|name| {
            (
                name.clone(),
                result.labels.get(name).cloned().unwrap_or_default(),
            )
        })
        .collect();

    let sample_encoder = family_encoder.encode_family(&labels)?;

    match family.desc().metric_type() {
        MetricType::Counter => ConstCounter::new(result.value).encode(sample_encoder),
        MetricType::Gauge => ConstGauge::new(result.value).encode(sample_encoder),
    }
}
