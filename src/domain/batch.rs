use serde::{Deserialize, Serialize};
use std::fmt;

/// A group of metric families uploaded together for one partition (tenant or cluster).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartitionedMetrics {
    pub partition_key: String,
    #[serde(default)]
    pub families: Vec<MetricFamily>,
}

impl PartitionedMetrics {
    pub fn new(partition_key: impl Into<String>, families: Vec<MetricFamily>) -> Self {
        Self {
            partition_key: partition_key.into(),
            families,
        }
    }

    /// A batch without families carries no data and is never stored or forwarded.
    pub fn is_empty(&self) -> bool {
        self.families.is_empty()
    }

    pub fn metric_count(&self) -> usize {
        self.families.iter().map(|f| f.metrics.len()).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricFamily {
    pub name: String,
    #[serde(rename = "type")]
    pub metric_type: MetricType,
    #[serde(default)]
    pub metrics: Vec<Metric>,
}

impl MetricFamily {
    pub fn new(name: impl Into<String>, metric_type: MetricType, metrics: Vec<Metric>) -> Self {
        Self {
            name: name.into(),
            metric_type,
            metrics,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricType {
    Counter,
    Gauge,
    Untyped,
    Summary,
    Histogram,
    GaugeHistogram,
}

impl fmt::Display for MetricType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MetricType::Counter => "COUNTER",
            MetricType::Gauge => "GAUGE",
            MetricType::Untyped => "UNTYPED",
            MetricType::Summary => "SUMMARY",
            MetricType::Histogram => "HISTOGRAM",
            MetricType::GaugeHistogram => "GAUGE_HISTOGRAM",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelPair {
    pub name: String,
    pub value: String,
}

impl LabelPair {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// One metric instance. Only the value slot matching the family type is expected to be set;
/// families of any other type carry no scalar and are rejected on conversion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    #[serde(default)]
    pub labels: Vec<LabelPair>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub counter: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gauge: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub untyped: Option<f64>,
    pub timestamp_ms: i64,
}

impl Metric {
    pub fn counter(labels: Vec<LabelPair>, value: f64, timestamp_ms: i64) -> Self {
        Self {
            labels,
            counter: Some(value),
            timestamp_ms,
            ..Default::default()
        }
    }

    pub fn gauge(labels: Vec<LabelPair>, value: f64, timestamp_ms: i64) -> Self {
        Self {
            labels,
            gauge: Some(value),
            timestamp_ms,
            ..Default::default()
        }
    }

    pub fn untyped(labels: Vec<LabelPair>, value: f64, timestamp_ms: i64) -> Self {
        Self {
            labels,
            untyped: Some(value),
            timestamp_ms,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_upload_body() {
        let body = r#"[
            {
                "name": "up",
                "type": "gauge",
                "metrics": [
                    {
                        "labels": [{"name": "job", "value": "api"}],
                        "gauge": 1.0,
                        "timestamp_ms": 1562500000000
                    }
                ]
            }
        ]"#;

        let families: Vec<MetricFamily> = serde_json::from_str(body).unwrap();

        assert_eq!(families.len(), 1);
        assert_eq!(families[0].metric_type, MetricType::Gauge);
        assert_eq!(
            families[0].metrics[0],
            Metric::gauge(vec![LabelPair::new("job", "api")], 1.0, 1562500000000)
        );
    }

    #[test]
    fn counts_metrics_across_families() {
        let batch = PartitionedMetrics::new(
            "cluster-a",
            vec![
                MetricFamily::new(
                    "a",
                    MetricType::Counter,
                    vec![Metric::counter(vec![], 1.0, 0), Metric::counter(vec![], 2.0, 0)],
                ),
                MetricFamily::new("b", MetricType::Gauge, vec![]),
            ],
        );

        assert!(!batch.is_empty());
        assert_eq!(batch.metric_count(), 2);
        assert!(PartitionedMetrics::new("cluster-a", vec![]).is_empty());
    }
}
