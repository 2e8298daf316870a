use std::sync::Arc;

use once_cell::sync::Lazy;
use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounter, Registry, TextEncoder};

/// Process-wide registry scraped through `GET /metrics`.
pub static REGISTRY: Lazy<Registry> = Lazy::new(Registry::new);

/// Forwarding metrics registered into [`REGISTRY`]. Tests build their own via [`ForwardMetrics::new`].
pub static FORWARD_METRICS: Lazy<Arc<ForwardMetrics>> = Lazy::new(|| {
    Arc::new(ForwardMetrics::new(&REGISTRY).expect("forward metrics are registered once"))
});

// max = request timeout
const DURATION_BUCKETS: &[f64] = &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0];

pub struct ForwardMetrics {
    pub samples: IntCounter,
    pub errors: IntCounter,
    pub duration: HistogramVec,
    pub overwritten_timestamps: IntCounter,
}

impl ForwardMetrics {
    pub fn new(registry: &Registry) -> prometheus::Result<Self> {
        let samples = IntCounter::new(
            "telemeter_forward_samples_total",
            "Total amount of samples successfully forwarded",
        )?;
        let errors = IntCounter::new(
            "telemeter_forward_request_errors_total",
            "Total amount of errors encountered while forwarding",
        )?;
        let duration = HistogramVec::new(
            HistogramOpts::new(
                "telemeter_forward_request_duration_seconds",
                "Tracks the duration of all forwarding requests",
            )
            .buckets(DURATION_BUCKETS.to_vec()),
            &["status_code"],
        )?;
        let overwritten_timestamps = IntCounter::new(
            "telemeter_forward_overwritten_timestamps_total",
            "Total number of timestamps that were overwritten",
        )?;

        registry.register(Box::new(samples.clone()))?;
        registry.register(Box::new(errors.clone()))?;
        registry.register(Box::new(duration.clone()))?;
        registry.register(Box::new(overwritten_timestamps.clone()))?;

        Ok(Self {
            samples,
            errors,
            duration,
            overwritten_timestamps,
        })
    }

    pub fn observe_duration(&self, status: u16, seconds: f64) {
        self.duration
            .with_label_values(&[&status.to_string()])
            .observe(seconds);
    }
}

/// Renders every family in `registry` in the text exposition format.
pub fn render(registry: &Registry) -> prometheus::Result<String> {
    let mut buf = Vec::new();
    TextEncoder::new().encode(&registry.gather(), &mut buf)?;
    String::from_utf8(buf).map_err(|err| prometheus::Error::Msg(err.to_string()))
}
