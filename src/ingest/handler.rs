use crate::app::AppState;
use crate::domain::{MetricFamily, PartitionedMetrics};
use crate::store::StoreError;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use std::sync::Arc;

const MAX_FAMILIES: usize = 1024;

fn validate_families(families: &[MetricFamily]) -> Result<(), &'static str> {
    if families.is_empty() {
        return Err("no_families");
    }
    if families.len() > MAX_FAMILIES {
        return Err("too_many_families");
    }
    Ok(())
}

pub async fn upload(
    State(st): State<AppState>,
    Path(partition_key): Path<String>,
    Json(families): Json<Vec<MetricFamily>>,
) -> impl IntoResponse {
    if !st.ready.is_ready() {
        return (StatusCode::SERVICE_UNAVAILABLE, "not ready");
    }

    if let Err(reason) = validate_families(&families) {
        tracing::debug!(%partition_key, reason, "upload rejected");
        return (StatusCode::BAD_REQUEST, reason);
    }

    let batch = Arc::new(PartitionedMetrics::new(partition_key, families));
    match st.store.write_metrics(batch).await {
        Ok(()) => (StatusCode::OK, "ok"),
        Err(StoreError::EmptyPartitionKey) => (StatusCode::BAD_REQUEST, "empty_partition_key"),
        Err(err) => {
            tracing::error!(error = %err, "failed to store upload");
            (StatusCode::INTERNAL_SERVER_ERROR, "store_error")
        }
    }
}
