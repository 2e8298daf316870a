//! Conversion of ingested metric families into remote-write timeseries.

use time::OffsetDateTime;

use crate::domain::{Metric, MetricType, PartitionedMetrics};
use crate::metrics::ForwardMetrics;
use crate::remote_write::{Label, Sample, TimeSeries, NAME_LABEL};

/// Mean drift (seconds) above which a warning is logged.
pub const DRIFT_WARN_SECS: f64 = 10.0;

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ConvertError {
    #[error("metric type {0} not supported")]
    UnsupportedType(MetricType),
    #[error("metric in family {family} has no {metric_type} value")]
    MissingValue {
        family: String,
        metric_type: MetricType,
    },
}

/// Builds one timeseries per metric instance, in family order then instance order.
///
/// Timestamps later than `now` are clamped to `now` and counted in
/// `telemeter_forward_overwritten_timestamps_total`. Earlier timestamps pass through untouched.
pub fn convert_to_timeseries(
    batch: &PartitionedMetrics,
    now: OffsetDateTime,
    metrics: &ForwardMetrics,
) -> Result<Vec<TimeSeries>, ConvertError> {
    let now_ms = unix_millis(now);
    let mut timeseries = Vec::with_capacity(batch.metric_count());

    for family in &batch.families {
        if !is_supported(family.metric_type) {
            return Err(ConvertError::UnsupportedType(family.metric_type));
        }

        for metric in &family.metrics {
            let mut labels = Vec::with_capacity(metric.labels.len() + 1);
            labels.push(Label::new(NAME_LABEL, family.name.as_str()));
            labels.extend(
                metric
                    .labels
                    .iter()
                    .map(|l| Label::new(l.name.as_str(), l.value.as_str())),
            );

            let value = scalar_value(metric, family.metric_type).ok_or_else(|| {
                ConvertError::MissingValue {
                    family: family.name.clone(),
                    metric_type: family.metric_type,
                }
            })?;

            let mut timestamp = metric.timestamp_ms;
            if timestamp > now_ms {
                timestamp = now_ms;
                metrics.overwritten_timestamps.inc();
            }

            timeseries.push(TimeSeries {
                labels,
                samples: vec![Sample { value, timestamp }],
            });
        }
    }

    Ok(timeseries)
}

fn is_supported(metric_type: MetricType) -> bool {
    matches!(
        metric_type,
        MetricType::Counter | MetricType::Gauge | MetricType::Untyped
    )
}

fn scalar_value(metric: &Metric, metric_type: MetricType) -> Option<f64> {
    match metric_type {
        MetricType::Counter => metric.counter,
        MetricType::Gauge => metric.gauge,
        MetricType::Untyped => metric.untyped,
        _ => None,
    }
}

/// Mean of `now_secs - sample_secs` over every sample. Callers must pass at least one sample.
pub fn mean_drift(timeseries: &[TimeSeries], now_secs: i64) -> f64 {
    let mut count = 0.0;
    let mut sum = 0.0;

    for sample in timeseries.iter().flat_map(|ts| &ts.samples) {
        sum += (now_secs - sample.timestamp / 1000) as f64;
        count += 1.0;
    }

    sum / count
}

/// Whether a batch's mean drift is large enough to be worth a warning.
pub fn drift_exceeds_threshold(drift_secs: f64) -> bool {
    drift_secs.abs() > DRIFT_WARN_SECS
}

pub fn unix_millis(t: OffsetDateTime) -> i64 {
    (t.unix_timestamp_nanos() / 1_000_000) as i64
}
