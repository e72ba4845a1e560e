//! Observability: runtime event telemetry (metrics) and storage reports.

pub(crate) mod report;
pub(crate) mod sink;

// re-exports
pub use report::{StorageReport, storage_report};
pub use sink::{
    CacheKind, CountingSink, MetricsEvent, MetricsSink, MetricsSnapshot, NoopMetricsSink,
    RepairKind,
};
