mod config;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use clap::Parser;
use tracing::{error, info, warn, Level};
use tracing_subscriber::EnvFilter;

use config::{AuthMode, Config};
use dmr_core::{AllowAll, AuthPolicy, DenyAll, Dispatcher, ListAuth, UdpTransport};
use dmr_metrics::{MetricsConfig, MetricsServer, PrometheusDispatcherMetrics};

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = Config::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&cfg.log_level).unwrap_or_else(|_| EnvFilter::new(Level::INFO.to_string())))
        .init();

    let auth: Arc<dyn AuthPolicy> = match cfg.auth_mode {
        AuthMode::DenyAll => Arc::new(DenyAll),
        AuthMode::AllowAll => {
            warn!("auth-mode=allow-all accepts any peer id and password; do not use in production");
            Arc::new(AllowAll)
        }
        AuthMode::List => Arc::new(ListAuth::new(cfg.load_allow_list()?)),
    };

    let ms = MetricsServer::install(MetricsConfig { listen: cfg.metrics_listen.clone(), namespace: "dmr" })?;
    tokio::spawn(async move {
        if let Err(e) = ms.serve().await {
            error!(error = %e, "metrics server exited");
        }
    });

    let listen_addr: SocketAddr = cfg.listen.parse()?;
    let transport = UdpTransport::bind(listen_addr).await?;
    info!(addr = %transport.local_addr()?, "listening for MMDVM peers");

    let metrics = Arc::new(PrometheusDispatcherMetrics::new("dmr"));
    let mut dispatcher = Dispatcher::new(transport, auth, metrics);

    let maintenance_period = Duration::from_millis(cfg.maintenance_period_ms);
    let mut maintenance_tick = tokio::time::interval(maintenance_period);
    let mut recv_buf = [0u8; 2048];

    loop {
        tokio::select! {
            result = dispatcher.recv_and_handle(&mut recv_buf) => {
                if let Err(e) = result {
                    error!(error = %e, "transport receive failed");
                }
            }
            _ = maintenance_tick.tick() => {
                dispatcher.run_maintenance(Instant::now());
            }
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown requested");
                break;
            }
        }
    }

    dispatcher.shutdown().await;
    Ok(())
}
