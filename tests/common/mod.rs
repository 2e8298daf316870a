#![allow(dead_code)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::Router;
use parking_lot::Mutex;
use tokio::net::TcpListener;

use telemeter_forward::domain::{LabelPair, Metric, MetricFamily, MetricType, PartitionedMetrics};
use telemeter_forward::remote_write::{self, WriteRequest};

/// One request seen by the mock receive endpoint.
#[derive(Debug, Clone)]
pub struct Received {
    pub tenant: Option<String>,
    pub content_encoding: Option<String>,
    pub request: WriteRequest,
}

#[derive(Clone)]
struct ReceiverState {
    status: StatusCode,
    received: Arc<Mutex<Vec<Received>>>,
}

/// Stand-in for a remote-write receiver; decodes every body and answers with a fixed status.
pub struct MockReceiver {
    pub url: String,
    received: Arc<Mutex<Vec<Received>>>,
}

impl MockReceiver {
    pub async fn start(status: StatusCode) -> Self {
        let received = Arc::new(Mutex::new(Vec::new()));
        let app = Router::new()
            .route("/api/v1/receive", post(receive))
            .with_state(ReceiverState {
                status,
                received: received.clone(),
            });

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            url: format!("http://{addr}/api/v1/receive"),
            received,
        }
    }

    pub fn received(&self) -> Vec<Received> {
        self.received.lock().clone()
    }

    pub fn count(&self) -> usize {
        self.received.lock().len()
    }
}

async fn receive(State(st): State<ReceiverState>, headers: HeaderMap, body: Bytes) -> StatusCode {
    let request = match remote_write::decode(&body) {
        Ok(request) => request,
        Err(_) => return StatusCode::BAD_REQUEST,
    };
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned)
    };
    st.received.lock().push(Received {
        tenant: header("THANOS-TENANT"),
        content_encoding: header("content-encoding"),
        request,
    });
    st.status
}

/// Polls `cond` until it holds or `timeout` passes.
pub async fn eventually(timeout: Duration, cond: impl Fn() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < timeout {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    cond()
}

/// Three `up` series with timestamps well in the past.
pub fn sample_batch(partition_key: &str) -> PartitionedMetrics {
    let metric = |value: &str, v: f64, ts: i64| {
        Metric::untyped(
            vec![
                LabelPair::new("cluster", "test"),
                LabelPair::new("job", "test"),
                LabelPair::new("label", value),
            ],
            v,
            ts,
        )
    };
    PartitionedMetrics::new(
        partition_key,
        vec![MetricFamily::new(
            "up",
            MetricType::Untyped,
            vec![
                metric("value0", 1.0, 1562500000000),
                metric("value1", 1.0, 1562600000000),
                metric("value2", 0.0, 1562700000000),
            ],
        )],
    )
}
