use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Request, Response};
use hyper_util::rt::TokioIo;
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::MetricsConfig;

pub struct MetricsServer {
    handle: PrometheusHandle,
    cfg: MetricsConfig,
}

impl MetricsServer {
    /// Installs the global recorder. Call once from `main`; installing
    /// twice panics.
    pub fn install(cfg: MetricsConfig) -> Result<Self> {
        let handle = PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Full(format!("{}_call_duration_seconds", cfg.namespace)),
                &[1.0, 2.0, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0],
            )?
            .install_recorder()?;

        Ok(Self { handle, cfg })
    }

    /// Serves `GET /metrics` until the listener itself fails; a single
    /// bad `accept()` is logged and skipped rather than taking the whole
    /// scrape endpoint down, since nothing else in the process depends on
    /// this task staying up for the server to keep repeating traffic.
    pub async fn serve(self) -> Result<()> {
        let addr: SocketAddr = self.cfg.listen.parse()?;
        let listener = TcpListener::bind(addr).await?;
        info!("metrics listening on http://{}/metrics", addr);

        let handle = Arc::new(self.handle);

        loop {
            let (stream, peer) = match listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    warn!(error = %e, "metrics listener accept failed");
                    continue;
                }
            };
            let handle = handle.clone();

            tokio::spawn(async move {
                let io = TokioIo::new(stream);

                let service = hyper::service::service_fn(move |req: Request<hyper::body::Incoming>| {
                    let handle = handle.clone();
                    async move { metrics_handler(req, handle).await }
                });

                if let Err(e) = hyper::server::conn::http1::Builder::new().serve_connection(io, service).await {
                    debug!(%peer, error = %e, "metrics connection closed");
                }
            });
        }
    }
}

/// Serves the single external interface this daemon's metrics surface
/// exposes: `GET /metrics` in Prometheus text format. Anything else,
/// including the JSON dashboard endpoint other masters expose, is out of
/// scope here and gets a plain 404.
async fn metrics_handler(
    req: Request<hyper::body::Incoming>,
    handle: Arc<PrometheusHandle>,
) -> Result<Response<Full<Bytes>>, hyper::Error> {
    debug!(path = %req.uri().path(), "metrics scrape");
    if req.uri().path() != "/metrics" {
        return Ok(Response::builder()
            .status(404)
            .body(Full::new(Bytes::from("only /metrics is served")))
            .unwrap());
    }

    let body = handle.render();
    Ok(Response::builder()
        .status(200)
        .header("content-type", "text/plain; version=0.0.4")
        .body(Full::new(Bytes::from(body)))
        .unwrap())
}
