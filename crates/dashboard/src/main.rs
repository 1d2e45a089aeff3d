//! Fleet Dashboard - container fleet dashboard service
//!
//! Keeps an in-memory view of a container fleet synchronized with a
//! telemetry source (simulating while it is unreachable) and exposes the
//! view and all operator actions over HTTP.

use anyhow::Result;
use fleet_dashboard::{api, config::DashboardConfig};
use fleet_lib::{
    analysis::{HttpLogAnalyzer, LogAnalyzer, SimulatedAnalyzer},
    fleet::{FleetState, FleetStore},
    health::{components, HealthRegistry},
    lifecycle::{ImageRegistry, LifecycleControllerBuilder, UserDirectory, VolumeRegistry},
    observability::{FleetMetrics, StructuredLogger},
    reconcile::{HttpSourceAdapter, ReconcilerBuilder, SnapshotSource},
    seed,
    view::NotificationQueue,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DASHBOARD_VERSION: &str = env!("CARGO_PKG_VERSION");
const ANALYSIS_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting fleet-dashboard");

    let config = DashboardConfig::load()?;
    info!(
        instance = %config.instance_name,
        source = %config.source_endpoint,
        seed_demo_fleet = config.seed_demo_fleet,
        "Dashboard configured"
    );

    let health_registry = HealthRegistry::new();
    health_registry.register(components::RECONCILER).await;
    health_registry.register(components::SOURCE_ADAPTER).await;
    health_registry.register(components::LIFECYCLE).await;
    health_registry.register(components::ANALYZER).await;

    let metrics = FleetMetrics::new();
    let logger = StructuredLogger::new(&config.instance_name);

    // The user directory is always populated: it stands in for the
    // credential store.
    let (state, images, volumes) = if config.seed_demo_fleet {
        (
            FleetState::with_containers(seed::demo_containers()),
            seed::demo_images(),
            seed::demo_volumes(),
        )
    } else {
        (FleetState::default(), Vec::new(), Vec::new())
    };
    let store = FleetStore::new(state);

    let source: Arc<dyn SnapshotSource> = Arc::new(HttpSourceAdapter::new(
        &config.source_endpoint,
        config.source_timeout(),
    )?);
    logger.log_startup(DASHBOARD_VERSION, &source.describe());

    let reconciler = ReconcilerBuilder::new()
        .source(source)
        .store(store.clone())
        .interval(config.tick_interval())
        .source_timeout(config.source_timeout())
        .health(health_registry.clone())
        .metrics(metrics.clone())
        .logger(logger.clone())
        .build()?;
    let refresh = reconciler.manual_refresh();

    let controller = LifecycleControllerBuilder::new()
        .store(store)
        .users(UserDirectory::new(seed::demo_users()))
        .images(ImageRegistry::new(images))
        .volumes(VolumeRegistry::new(volumes))
        .notifications(NotificationQueue::new(config.notification_ttl()))
        .delete_latency(config.delete_latency())
        .user_delete_latency(config.user_delete_latency())
        .health(health_registry.clone())
        .metrics(metrics.clone())
        .logger(logger.clone())
        .build()?;

    let analyzer: Arc<dyn LogAnalyzer> = match &config.analysis_endpoint {
        Some(endpoint) => Arc::new(HttpLogAnalyzer::new(
            endpoint,
            config.analysis_api_key.clone(),
            ANALYSIS_TIMEOUT,
        )?),
        None => {
            warn!("No analysis endpoint configured, log analysis is simulated");
            health_registry
                .set_degraded(components::ANALYZER, "no analysis endpoint configured")
                .await;
            Arc::new(SimulatedAnalyzer)
        }
    };

    // Start the reconciliation loop
    let (shutdown_tx, _) = broadcast::channel(1);
    let reconciler_handle = tokio::spawn(reconciler.run(shutdown_tx.subscribe()));

    let app_state = Arc::new(api::AppState::new(
        health_registry.clone(),
        metrics,
        controller,
        refresh,
        analyzer,
    ));

    // Mark dashboard as ready after initialization
    health_registry.set_ready(true).await;

    // Start API server
    let api_handle = tokio::spawn(api::serve(config.api_port, app_state));

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    logger.log_shutdown("SIGINT received");
    info!("Shutting down");

    health_registry.set_ready(false).await;
    let _ = shutdown_tx.send(());
    if let Err(e) = reconciler_handle.await {
        warn!(error = %e, "Reconciliation loop did not stop cleanly");
    }
    api_handle.abort();

    Ok(())
}
