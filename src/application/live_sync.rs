//! LiveSync - The synchronizer facade.
//!
//! Wires the two live channels, the event bus handlers, the snapshot store
//! and the REST client together. Views read projections from here and call
//! REST operations through here so the store stays the single copy of every
//! entity.
//!
//! ## Data flow
//!
//! ```text
//! socket channel ─┐                 ┌─> StoreSynchronizer ──> SnapshotStore ──> projections
//!                 ├─> event bus ────┼─> NotificationDelivery ─> store + toasts
//! stream channel ─┘                 └─> StatisticsRefresher ─> REST ─> store
//! ```

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::{broadcast, watch};

use super::handlers::{
    NotificationDelivery, StatisticsRefresher, StoreSynchronizer, DELIVERY_KINDS, REFRESH_KINDS,
    STORE_SYNC_KINDS,
};
use super::routing::{NotificationStreamRouter, TopicRouter};
use super::{LiveChannel, LiveChannelConfig, MapRefetcher, SnapshotStore, StoreChange, StoreConfig};
use crate::domain::civic::{
    Complaint, ComplaintDraft, ComplaintFilter, ComplaintSort, StatisticsSnapshot,
};
use crate::domain::connection::{ConnectionState, Topic};
use crate::domain::foundation::{Credentials, EntityId, SubscriptionId};
use crate::domain::projections::{
    project_live_status, LiveStatus, MapMarker, PagedListView, StatisticsCharts, UnreadBadge,
};
use crate::ports::{
    ApiError, ComplaintApi, ComplaintQuery, EventPublisher, EventSubscriber, LiveTransport, MapQuery,
    NotificationApi, ToastSink,
};

/// Tunables of the synchronizer.
#[derive(Debug, Clone)]
pub struct LiveSyncSettings {
    pub store: StoreConfig,
    pub socket: LiveChannelConfig,
    pub stream: LiveChannelConfig,
    pub toast_lifetime: Duration,
    pub map_debounce: Duration,
    pub statistics_debounce: Duration,
    pub announce_complaint_updates: bool,
}

impl Default for LiveSyncSettings {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            socket: LiveChannelConfig::default().with_topics(Topic::defaults()),
            stream: LiveChannelConfig::default(),
            toast_lifetime: Duration::from_millis(5_000),
            map_debounce: Duration::from_millis(300),
            statistics_debounce: Duration::from_millis(1_000),
            announce_complaint_updates: true,
        }
    }
}

/// Collaborators injected into the synchronizer.
pub struct LiveSyncDeps {
    pub complaints: Arc<dyn ComplaintApi>,
    pub notifications: Arc<dyn NotificationApi>,
    pub socket: Arc<dyn LiveTransport>,
    pub stream: Arc<dyn LiveTransport>,
    pub publisher: Arc<dyn EventPublisher>,
    pub subscriber: Arc<dyn EventSubscriber>,
    pub toasts: Arc<dyn ToastSink>,
}

impl LiveSyncDeps {
    /// Uses one REST client for both APIs and one bus for both bus roles.
    pub fn new<A, B>(
        api: Arc<A>,
        socket: Arc<dyn LiveTransport>,
        stream: Arc<dyn LiveTransport>,
        bus: Arc<B>,
        toasts: Arc<dyn ToastSink>,
    ) -> Self
    where
        A: ComplaintApi + NotificationApi + 'static,
        B: EventPublisher + EventSubscriber + 'static,
    {
        Self {
            complaints: api.clone(),
            notifications: api,
            socket,
            stream,
            publisher: bus.clone(),
            subscriber: bus,
            toasts,
        }
    }
}

pub struct LiveSync {
    store: Arc<SnapshotStore>,
    complaints_api: Arc<dyn ComplaintApi>,
    notifications_api: Arc<dyn NotificationApi>,
    subscriber: Arc<dyn EventSubscriber>,
    subscriptions: Mutex<Vec<SubscriptionId>>,
    socket: LiveChannel,
    stream: LiveChannel,
    map: MapRefetcher,
    statistics: Arc<StatisticsRefresher>,
    settings: LiveSyncSettings,
}

impl LiveSync {
    /// Builds the store, registers the bus handlers and spawns both channel
    /// tasks. Nothing connects until `connect` is called.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(deps: LiveSyncDeps, settings: LiveSyncSettings) -> Self {
        let store = Arc::new(SnapshotStore::new(settings.store));

        let synchronizer = Arc::new(StoreSynchronizer::new(Arc::clone(&store)));
        let delivery = Arc::new(
            NotificationDelivery::new(Arc::clone(&store), deps.toasts)
                .with_lifetime(settings.toast_lifetime)
                .with_complaint_updates(settings.announce_complaint_updates),
        );
        let statistics = Arc::new(StatisticsRefresher::new(
            Arc::clone(&deps.complaints),
            Arc::clone(&store),
            settings.statistics_debounce,
        ));

        // Store merge runs before delivery so toasts never precede the data.
        let mut subscriptions = deps.subscriber.subscribe_all(&STORE_SYNC_KINDS, synchronizer);
        subscriptions.extend(deps.subscriber.subscribe_all(&DELIVERY_KINDS, delivery));
        subscriptions.extend(
            deps.subscriber
                .subscribe_all(&REFRESH_KINDS, statistics.clone()),
        );

        let socket = LiveChannel::spawn(
            deps.socket,
            Arc::new(TopicRouter),
            Arc::clone(&deps.publisher),
            settings.socket.clone(),
        );
        let stream = LiveChannel::spawn(
            deps.stream,
            Arc::new(NotificationStreamRouter),
            deps.publisher,
            settings.stream.clone(),
        );

        let map = MapRefetcher::new(
            Arc::clone(&deps.complaints),
            Arc::clone(&store),
            settings.map_debounce,
        );

        tracing::info!(
            socket = socket.name(),
            stream = stream.name(),
            handlers = subscriptions.len(),
            "live sync started"
        );

        Self {
            store,
            complaints_api: deps.complaints,
            notifications_api: deps.notifications,
            subscriber: deps.subscriber,
            subscriptions: Mutex::new(subscriptions),
            socket,
            stream,
            map,
            statistics,
            settings,
        }
    }

    pub fn store(&self) -> &Arc<SnapshotStore> {
        &self.store
    }

    /// Receiver of store change notifications.
    pub fn changes(&self) -> broadcast::Receiver<StoreChange> {
        self.store.subscribe()
    }

    // ════════════════════════════════════════════════════════════════════
    // Live channels
    // ════════════════════════════════════════════════════════════════════

    /// Connects both channels with the same credential.
    pub fn connect(&self, credentials: Credentials) {
        self.socket.connect(credentials.clone());
        self.stream.connect(credentials);
    }

    pub fn disconnect(&self) {
        self.socket.disconnect();
        self.stream.disconnect();
    }

    pub fn socket(&self) -> &LiveChannel {
        &self.socket
    }

    pub fn stream(&self) -> &LiveChannel {
        &self.stream
    }

    pub fn channel_states(&self) -> [ConnectionState; 2] {
        [self.socket.state(), self.stream.state()]
    }

    pub fn watch_states(&self) -> [watch::Receiver<ConnectionState>; 2] {
        [self.socket.watch_state(), self.stream.watch_state()]
    }

    pub fn live_status(&self) -> LiveStatus {
        project_live_status(&self.channel_states())
    }

    // ════════════════════════════════════════════════════════════════════
    // Initial and explicit loads
    // ════════════════════════════════════════════════════════════════════

    /// Loads everything a dashboard shows: the first complaint page, the
    /// first notification page, the unread count and the statistics.
    ///
    /// Each load that succeeds is applied even if another fails; the first
    /// error is returned.
    pub async fn load_initial(&self) -> Result<(), ApiError> {
        let (complaints, notifications, unread, statistics) = tokio::join!(
            self.load_complaints(0),
            self.load_notifications(0),
            self.refresh_unread_count(),
            self.refresh_statistics(),
        );
        complaints?;
        notifications?;
        unread?;
        statistics
    }

    /// Replaces the complaint window with `page` of the current view.
    pub async fn load_complaints(&self, page: u32) -> Result<(), ApiError> {
        let (sort, filter) = self.store.complaint_view();
        let query = ComplaintQuery {
            page,
            size: page_size(self.settings.store.complaint_page_size),
            sort,
            filter,
        };
        let result = self.complaints_api.list_complaints(&query).await?;
        tracing::debug!(page, items = result.content.len(), total = result.total_elements, "complaint page loaded");
        self.store.load_complaints(result);
        Ok(())
    }

    /// Changes sort and filter, then reloads the first page.
    pub async fn set_complaint_view(&self, sort: ComplaintSort, filter: ComplaintFilter) -> Result<(), ApiError> {
        self.store.set_complaint_view(sort, filter);
        self.load_complaints(0).await
    }

    pub async fn load_notifications(&self, page: u32) -> Result<(), ApiError> {
        let size = page_size(self.settings.store.notification_page_size);
        let result = self.notifications_api.list_notifications(page, size).await?;
        self.store.load_notifications(result);
        Ok(())
    }

    pub async fn refresh_unread_count(&self) -> Result<(), ApiError> {
        let count = self.notifications_api.unread_count().await?;
        self.store.set_unread_count(count);
        Ok(())
    }

    pub async fn refresh_statistics(&self) -> Result<(), ApiError> {
        self.statistics.refresh_now().await
    }

    // ════════════════════════════════════════════════════════════════════
    // Complaint commands
    // ════════════════════════════════════════════════════════════════════

    pub async fn get_complaint(&self, id: &EntityId) -> Result<Complaint, ApiError> {
        let complaint = self.complaints_api.get_complaint(id).await?;
        self.store.upsert_complaint(complaint.clone());
        Ok(complaint)
    }

    pub async fn create_complaint(&self, draft: &ComplaintDraft) -> Result<Complaint, ApiError> {
        let complaint = self.complaints_api.create_complaint(draft).await?;
        self.store.upsert_complaint(complaint.clone());
        self.statistics.schedule();
        Ok(complaint)
    }

    pub async fn update_complaint(&self, id: &EntityId, draft: &ComplaintDraft) -> Result<Complaint, ApiError> {
        let complaint = self.complaints_api.update_complaint(id, draft).await?;
        self.store.upsert_complaint(complaint.clone());
        self.statistics.schedule();
        Ok(complaint)
    }

    pub async fn delete_complaint(&self, id: &EntityId) -> Result<(), ApiError> {
        self.complaints_api.delete_complaint(id).await?;
        self.store.remove_complaint(id);
        self.statistics.schedule();
        Ok(())
    }

    // ════════════════════════════════════════════════════════════════════
    // Notification commands
    // ════════════════════════════════════════════════════════════════════

    pub async fn mark_notification_read(&self, id: &EntityId) -> Result<(), ApiError> {
        self.notifications_api.mark_read(id).await?;
        self.store.mark_notification_read(id);
        Ok(())
    }

    pub async fn mark_all_notifications_read(&self) -> Result<(), ApiError> {
        self.notifications_api.mark_all_read().await?;
        self.store.mark_all_notifications_read();
        Ok(())
    }

    // ════════════════════════════════════════════════════════════════════
    // Map
    // ════════════════════════════════════════════════════════════════════

    /// Debounced map reload for panning and zooming.
    pub fn map_bounds_changed(&self, query: MapQuery) {
        self.map.bounds_changed(query);
    }

    pub async fn load_map(&self, query: &MapQuery) -> Result<(), ApiError> {
        self.map.load_now(query).await
    }

    // ════════════════════════════════════════════════════════════════════
    // Projections
    // ════════════════════════════════════════════════════════════════════

    pub fn complaint_page(&self) -> PagedListView<Complaint> {
        self.store.complaint_page()
    }

    pub fn unread_badge(&self) -> UnreadBadge {
        self.store.unread_badge()
    }

    pub fn charts(&self) -> StatisticsCharts {
        self.store.charts()
    }

    pub fn statistics(&self) -> Option<StatisticsSnapshot> {
        self.store.statistics()
    }

    pub fn map_markers(&self) -> Vec<MapMarker> {
        self.store.map_markers()
    }

    // ════════════════════════════════════════════════════════════════════
    // Shutdown
    // ════════════════════════════════════════════════════════════════════

    /// Cancels pending debounces, detaches the bus handlers and stops both
    /// channels.
    pub async fn shutdown(&self) {
        self.map.cancel();
        self.statistics.cancel();

        let subscriptions: Vec<SubscriptionId> = self
            .subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();
        for id in subscriptions {
            self.subscriber.unsubscribe(id);
        }

        tokio::join!(self.socket.shutdown(), self.stream.shutdown());
        tracing::info!("live sync stopped");
    }
}

fn page_size(size: usize) -> u32 {
    u32::try_from(size).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{InMemoryEventBus, InMemoryToastSink};
    use crate::application::fakes::FakeCivicApi;
    use crate::domain::civic::Notification;
    use crate::domain::foundation::EventKind;
    use crate::ports::{LiveConnection, TransportError};
    use async_trait::async_trait;

    /// Transport whose connect attempts always fail.
    struct Unreachable(&'static str);

    #[async_trait]
    impl LiveTransport for Unreachable {
        fn name(&self) -> &'static str {
            self.0
        }

        fn supports_send(&self) -> bool {
            false
        }

        async fn open(&self, _: &Credentials) -> Result<Box<dyn LiveConnection>, TransportError> {
            Err(TransportError::Connect("unreachable".into()))
        }
    }

    fn start(api: Arc<FakeCivicApi>) -> (LiveSync, Arc<InMemoryEventBus>) {
        let bus = Arc::new(InMemoryEventBus::new());
        let deps = LiveSyncDeps::new(
            api,
            Arc::new(Unreachable("socket")),
            Arc::new(Unreachable("stream")),
            Arc::clone(&bus),
            Arc::new(InMemoryToastSink::new()),
        );
        (LiveSync::start(deps, LiveSyncSettings::default()), bus)
    }

    fn complaints(n: i64) -> Vec<Complaint> {
        (1..=n).map(|id| Complaint::new(id, format!("Complaint {}", id))).collect()
    }

    #[tokio::test]
    async fn initial_load_fills_every_surface() {
        let api = Arc::new(
            FakeCivicApi::new()
                .with_complaints(complaints(25))
                .with_notifications(vec![Notification::new(1, "hello")], 3),
        );
        api.statistics.lock().unwrap().total_complaints = 25;
        let (sync, _) = start(api);

        sync.load_initial().await.unwrap();

        let page = sync.complaint_page();
        assert_eq!(page.items.len(), 10);
        assert_eq!(page.total_count, 25);
        assert_eq!(page.page_count, 3);
        assert_eq!(sync.unread_badge().count, 3);
        assert_eq!(sync.statistics().unwrap().total_complaints, 25);
        assert_eq!(sync.live_status(), LiveStatus::Offline);

        sync.shutdown().await;
    }

    #[tokio::test]
    async fn failed_page_load_keeps_previous_window() {
        let api = Arc::new(FakeCivicApi::new().with_complaints(complaints(5)));
        let (sync, _) = start(api.clone());
        sync.load_complaints(0).await.unwrap();

        api.fail_next(ApiError::Timeout { timeout_secs: 30 });
        let err = sync.load_complaints(1).await.unwrap_err();

        assert!(err.is_retryable());
        assert_eq!(sync.complaint_page().items.len(), 5);
        sync.shutdown().await;
    }

    #[tokio::test]
    async fn crud_pass_through_updates_store() {
        let api = Arc::new(FakeCivicApi::new().with_complaints(complaints(2)));
        let (sync, _) = start(api);
        sync.load_complaints(0).await.unwrap();

        let created = sync
            .create_complaint(&ComplaintDraft {
                title: "Overflowing bin".into(),
                ..ComplaintDraft::default()
            })
            .await
            .unwrap();
        assert!(sync.store().complaint(&created.complaint_id).is_some());
        assert_eq!(sync.complaint_page().total_count, 3);

        sync.delete_complaint(&EntityId::from(1)).await.unwrap();
        assert!(sync.store().complaint(&EntityId::from(1)).is_none());
        assert_eq!(sync.complaint_page().total_count, 2);

        sync.shutdown().await;
    }

    #[tokio::test]
    async fn mark_read_applies_only_after_server_accepts() {
        let mut unread = Notification::new(4, "Status changed");
        unread.is_read = false;
        let api = Arc::new(FakeCivicApi::new().with_notifications(vec![unread], 1));
        let (sync, _) = start(api.clone());
        sync.load_notifications(0).await.unwrap();
        sync.refresh_unread_count().await.unwrap();

        api.fail_next(ApiError::Forbidden);
        assert!(sync.mark_notification_read(&EntityId::from(4)).await.is_err());
        assert_eq!(sync.unread_badge().count, 1);

        sync.mark_notification_read(&EntityId::from(4)).await.unwrap();
        assert_eq!(sync.unread_badge().count, 0);

        sync.shutdown().await;
    }

    #[tokio::test]
    async fn shutdown_detaches_handlers() {
        let (sync, bus) = start(Arc::new(FakeCivicApi::new()));
        assert_eq!(bus.handler_count(EventKind::ComplaintUpserted), 3);

        sync.shutdown().await;

        assert_eq!(bus.handler_count(EventKind::ComplaintUpserted), 0);
        assert_eq!(bus.handler_count(EventKind::NotificationReceived), 0);
    }
}
