//! Best-effort forwarding of every written batch to a remote-write receiver.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::async_trait;
use futures_util::FutureExt;
use reqwest::header::{CONTENT_ENCODING, CONTENT_TYPE};
use reqwest::{Client, StatusCode, Url};
use time::OffsetDateTime;

use crate::convert::{convert_to_timeseries, drift_exceeds_threshold, mean_drift, ConvertError};
use crate::domain::PartitionedMetrics;
use crate::metrics::ForwardMetrics;
use crate::remote_write::{self, CodecError, WriteRequest};
use crate::store::{MetricStore, StoreError};

pub const TENANT_HEADER: &str = "THANOS-TENANT";

/// Deadline of every outbound request, independent of the writer.
pub const FORWARD_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(thiserror::Error, Debug)]
pub enum ForwardError {
    #[error(transparent)]
    Convert(#[from] ConvertError),
    #[error("encode write request: {0}")]
    Codec(#[from] CodecError),
    #[error("send request: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("response status code is {0}")]
    Status(StatusCode),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForwardOutcome {
    /// The batch held no samples; nothing was sent.
    Empty,
    Forwarded { samples: usize },
}

pub struct Forwarder {
    client: Client,
    url: Url,
    metrics: Arc<ForwardMetrics>,
}

impl Forwarder {
    pub fn new(url: Url, metrics: Arc<ForwardMetrics>) -> Result<Self, reqwest::Error> {
        Ok(Self::with_client(Client::builder().build()?, url, metrics))
    }

    pub fn with_client(client: Client, url: Url, metrics: Arc<ForwardMetrics>) -> Self {
        Self {
            client,
            url,
            metrics,
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Converts, encodes and POSTs one batch. Errors are returned, not counted.
    pub async fn forward(&self, batch: &PartitionedMetrics) -> Result<ForwardOutcome, ForwardError> {
        let timeseries = convert_to_timeseries(batch, OffsetDateTime::now_utc(), &self.metrics)?;
        if timeseries.is_empty() {
            tracing::info!(
                partition_key = %batch.partition_key,
                "no time series to forward to receive endpoint"
            );
            return Ok(ForwardOutcome::Empty);
        }

        let wreq = WriteRequest { timeseries };
        let body = remote_write::encode(&wreq)?;

        let begin = Instant::now();
        let resp = self
            .client
            .post(self.url.clone())
            .header(TENANT_HEADER, batch.partition_key.as_str())
            .header(CONTENT_TYPE, "application/x-protobuf")
            .header(CONTENT_ENCODING, "snappy")
            .header("X-Prometheus-Remote-Write-Version", "0.1.0")
            .timeout(FORWARD_TIMEOUT)
            .body(body)
            .send()
            .await?;

        let status = resp.status();
        self.metrics
            .observe_duration(status.as_u16(), begin.elapsed().as_secs_f64());

        let drift = mean_drift(&wreq.timeseries, OffsetDateTime::now_utc().unix_timestamp());
        if drift_exceeds_threshold(drift) {
            tracing::warn!(
                partition_key = %batch.partition_key,
                drift_secs = drift,
                "mean drift from now exceeds threshold"
            );
        }

        if !status.is_success() {
            return Err(ForwardError::Status(status));
        }

        let samples = wreq.sample_count();
        self.metrics.samples.inc_by(samples as u64);
        Ok(ForwardOutcome::Forwarded { samples })
    }

    /// Runs [`Forwarder::forward`] and swallows the result, counting and logging any failure.
    pub async fn forward_and_record(&self, batch: &PartitionedMetrics) {
        match self.forward(batch).await {
            Ok(outcome) => {
                tracing::debug!(partition_key = %batch.partition_key, ?outcome, "forwarded batch");
            }
            Err(err) => {
                self.metrics.errors.inc();
                tracing::warn!(
                    partition_key = %batch.partition_key,
                    url = %self.url,
                    error = %err,
                    "forwarding error"
                );
            }
        }
    }
}

/// Outermost frame of a detached forwarding task: a panic is counted and logged like any
/// other forwarding error instead of vanishing with the task.
async fn contain_panic<F>(task: F, metrics: &ForwardMetrics, partition_key: &str)
where
    F: Future<Output = ()>,
{
    if let Err(panic) = AssertUnwindSafe(task).catch_unwind().await {
        let reason = panic
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| panic.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        metrics.errors.inc();
        tracing::error!(%partition_key, %reason, "forwarding task panicked");
    }
}

/// Store decorator that ships every written batch to a receiver on a detached task
/// while the wrapped store performs the authoritative write.
pub struct ForwardStore<S> {
    next: S,
    forwarder: Arc<Forwarder>,
}

impl<S: MetricStore> ForwardStore<S> {
    pub fn new(next: S, forwarder: Arc<Forwarder>) -> Self {
        Self { next, forwarder }
    }
}

#[async_trait]
impl<S: MetricStore> MetricStore for ForwardStore<S> {
    async fn read_metrics(
        &self,
        min_timestamp_ms: i64,
    ) -> Result<Vec<Arc<PartitionedMetrics>>, StoreError> {
        self.next.read_metrics(min_timestamp_ms).await
    }

    async fn write_metrics(&self, batch: Arc<PartitionedMetrics>) -> Result<(), StoreError> {
        if batch.is_empty() {
            return Ok(());
        }

        let forwarder = self.forwarder.clone();
        let detached = batch.clone();
        tokio::spawn(async move {
            contain_panic(
                forwarder.forward_and_record(&detached),
                &forwarder.metrics,
                &detached.partition_key,
            )
            .await;
        });

        self.next.write_metrics(batch).await
    }
}
