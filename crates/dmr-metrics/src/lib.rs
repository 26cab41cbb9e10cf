pub mod config;
pub mod http;
pub mod labels;
pub mod recorder;

pub use config::MetricsConfig;
pub use http::MetricsServer;
pub use labels::{bound, BoundedLabel};
pub use recorder::PrometheusDispatcherMetrics;
