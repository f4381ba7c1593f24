//! Headless synchronizer: keeps the live view current and logs every change.

use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use civic_live_sync::adapters::{
    InMemoryEventBus, RestApiClient, RestClientConfig, SseStreamConfig, SseStreamTransport,
    StompSocketConfig, StompSocketTransport, TracingToastSink,
};
use civic_live_sync::application::{LiveSync, LiveSyncDeps, StoreChange};
use civic_live_sync::config::{AppConfig, LogFormat};

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.client.log_level));
    let registry = tracing_subscriber::registry().with(filter);
    match config.client.log_format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

fn log_change(sync: &LiveSync, change: StoreChange) {
    match change {
        StoreChange::Complaints => {
            let page = sync.complaint_page();
            tracing::info!(
                items = page.items.len(),
                total = page.total_count,
                page = page.page_index,
                pages = page.page_count,
                "complaint list changed"
            );
        }
        StoreChange::MapComplaints => {
            tracing::info!(markers = sync.map_markers().len(), "map changed");
        }
        StoreChange::Notifications | StoreChange::UnreadCount => {
            let badge = sync.unread_badge();
            tracing::info!(
                unread = badge.count,
                label = badge.label().as_deref().unwrap_or(""),
                "notifications changed"
            );
        }
        StoreChange::Statistics => {
            let charts = sync.charts();
            tracing::info!(
                by_status = charts.by_status.labels.len(),
                by_category = charts.by_category.labels.len(),
                "statistics changed"
            );
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    init_tracing(&config);
    config.validate()?;

    tracing::info!(
        environment = ?config.client.environment,
        api = %config.api.base_url,
        socket = %config.realtime.socket_url,
        "starting civic live sync"
    );

    let credentials = config.auth.credentials();
    let api = Arc::new(RestApiClient::new(
        RestClientConfig::new(config.api.base_url.clone())
            .with_timeout(config.api.request_timeout())
            .with_credentials(credentials.clone()),
    )?);
    let socket = Arc::new(StompSocketTransport::new(StompSocketConfig {
        url: config.realtime.socket_url.clone(),
        connect_timeout: config.realtime.connect_timeout(),
        server_heartbeat: config.realtime.liveness_timeout().map(|t| t / 2),
    })?);
    let stream = Arc::new(SseStreamTransport::new(SseStreamConfig {
        url: config.stream_url(),
        connect_timeout: config.realtime.connect_timeout(),
    })?);
    let bus = Arc::new(InMemoryEventBus::new());

    let sync = LiveSync::start(
        LiveSyncDeps::new(api, socket, stream, bus, Arc::new(TracingToastSink)),
        config.live_sync_settings(),
    );
    let mut changes = sync.changes();

    if let Err(e) = sync.load_initial().await {
        tracing::warn!(error = %e, retryable = e.is_retryable(), "initial load incomplete");
    }
    sync.connect(credentials);

    let [mut socket_state, mut stream_state] = sync.watch_states();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            change = changes.recv() => match change {
                Ok(change) => log_change(&sync, change),
                Err(RecvError::Lagged(skipped)) => tracing::debug!(skipped, "change log lagged"),
                Err(RecvError::Closed) => break,
            },
            Ok(()) = socket_state.changed() => {
                tracing::info!(status = sync.live_status().label(), "live status");
            }
            Ok(()) = stream_state.changed() => {
                tracing::info!(status = sync.live_status().label(), "live status");
            }
        }
    }

    tracing::info!("shutting down");
    sync.shutdown().await;
    Ok(())
}
