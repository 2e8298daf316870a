mod batch;

pub use batch::{LabelPair, Metric, MetricFamily, MetricType, PartitionedMetrics};
