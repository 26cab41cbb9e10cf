//! Adapter from [`dmr_core::DispatcherMetrics`] to the `metrics` crate's
//! global recorder, installed by [`crate::MetricsServer::install`].

use metrics::{counter, gauge, histogram};

use crate::labels::{bound, CALL_TYPES, DROP_REASONS, PACKET_TYPES};
use dmr_core::DispatcherMetrics;

pub struct PrometheusDispatcherMetrics {
    ns: &'static str,
}

impl PrometheusDispatcherMetrics {
    pub fn new(namespace: &'static str) -> Self {
        Self { ns: namespace }
    }
}

impl DispatcherMetrics for PrometheusDispatcherMetrics {
    fn peer_login(&self) {
        counter!(format!("{}_peer_logins_total", self.ns)).increment(1);
    }

    fn peer_auth_failure(&self) {
        counter!(format!("{}_peer_auth_failures_total", self.ns)).increment(1);
    }

    fn peer_timeout(&self) {
        counter!(format!("{}_peer_timeouts_total", self.ns)).increment(1);
    }

    fn packet_rx(&self, packet_type: &str) {
        let label = bound(packet_type, PACKET_TYPES);
        counter!(format!("{}_packets_rx_total", self.ns), "type" => label.as_str()).increment(1);
    }

    fn packet_dropped(&self, reason: &str) {
        let label = bound(reason, DROP_REASONS);
        counter!(format!("{}_packets_dropped_total", self.ns), "reason" => label.as_str()).increment(1);
    }

    fn call_started(&self, call_type: &str) {
        let label = bound(call_type, CALL_TYPES);
        counter!(format!("{}_calls_started_total", self.ns), "call_type" => label.as_str()).increment(1);
    }

    fn call_duration(&self, secs: f64) {
        histogram!(format!("{}_call_duration_seconds", self.ns)).record(secs);
    }

    fn emblc_assembler_error(&self) {
        counter!(format!("{}_emblc_assembler_errors_total", self.ns)).increment(1);
    }

    fn peers_active(&self, n: usize) {
        gauge!(format!("{}_peers_active", self.ns)).set(n as f64);
    }

    fn calls_active(&self, n: usize) {
        gauge!(format!("{}_calls_active", self.ns)).set(n as f64);
    }
}
