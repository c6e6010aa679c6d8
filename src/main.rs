mod adapters;
mod application;
mod config;
mod domain;
mod interface;
mod ports;

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use adapters::{HostFile, HttpProbe, IcmpProbe, MemoryStore, TcpProbe};
use application::{MonitoringService, Prober};
use config::Config;
use interface::http::create_router;
use ports::{HostMirror, ProbeMethod};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Load configuration
    let config = Config::load()?;

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("latmon={},tower_http=info", config.log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("🚀 Starting latmon v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration: {:?}", config);
    for adjustment in &config.adjustments {
        warn!("⚠ {}", adjustment);
    }
    info!(
        "Data retention: {} data points (24 hours at {}s)",
        config.capacity(),
        config.check_interval.as_secs()
    );

    // Seed the registry, preferring a previously mirrored host list
    let mirror = config
        .host_file
        .as_ref()
        .map(|path| Arc::new(HostFile::new(path)) as Arc<dyn HostMirror>);

    let initial_hosts = match mirror.as_ref().map(|m| m.load()) {
        Some(Ok(hosts)) if !hosts.is_empty() => {
            info!("Loaded {} unique hosts from host file", hosts.len());
            hosts
        }
        Some(Err(e)) => {
            warn!("⚠ Error loading hosts from file: {}. Using configured hosts.", e);
            config.hosts.clone()
        }
        _ => {
            info!("Using configured hosts");
            config.hosts.clone()
        }
    };
    info!("Monitored hosts: {}", initial_hosts.join(", "));

    let store = Arc::new(MemoryStore::with_hosts(config.capacity(), &initial_hosts));

    // Fallback chain: HTTP HEAD, then TCP connect, then ICMP echo
    let methods: Vec<Arc<dyn ProbeMethod>> = vec![
        Arc::new(HttpProbe::new(config.tcp_port, config.probe_attempts, config.http_timeout)?),
        Arc::new(TcpProbe::new(config.tcp_port, config.probe_attempts, config.tcp_timeout)),
        Arc::new(IcmpProbe::new(config.probe_attempts, config.icmp_timeout)),
    ];
    let prober = Arc::new(Prober::new(methods));

    let mut service = MonitoringService::new(store, prober, config.check_interval)
        .with_max_concurrency(config.max_concurrency);
    if let Some(mirror) = mirror {
        if let Err(e) = mirror.save(&initial_hosts) {
            warn!("⚠ Error saving hosts to file: {}", e);
        }
        service = service.with_mirror(mirror);
    }
    let monitoring_service = Arc::new(service);

    info!("✓ Monitoring service initialized");

    // Start the single background monitor loop
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let monitor = monitoring_service.monitor_loop();
    let monitor_handle = tokio::spawn(monitor.run(shutdown_rx));

    info!("✓ Monitor loop started");

    // Create HTTP server
    let app = create_router(monitoring_service, config.tcp_port);
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("✓ latmon listening on {}", addr);
    info!("  → Dashboard: http://localhost:{}", config.port);
    info!("  → API: http://localhost:{}/api/latency", config.port);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let _ = shutdown_tx.send(true);
    if let Err(e) = monitor_handle.await {
        warn!("⚠ Monitor loop ended abnormally: {}", e);
    }

    info!("Shutdown complete");
    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on unix
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("⚠ Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("⚠ Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
