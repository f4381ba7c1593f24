//! MapRefetcher - Reloads the map window as the visible bounds move.

use std::sync::Arc;
use std::time::Duration;

use super::{Debouncer, SnapshotStore};
use crate::ports::{ApiError, ComplaintApi, MapQuery};

pub struct MapRefetcher {
    api: Arc<dyn ComplaintApi>,
    store: Arc<SnapshotStore>,
    debouncer: Debouncer,
}

impl MapRefetcher {
    pub fn new(api: Arc<dyn ComplaintApi>, store: Arc<SnapshotStore>, delay: Duration) -> Self {
        Self {
            api,
            store,
            debouncer: Debouncer::new("map", delay),
        }
    }

    /// Schedules a fetch for `query`. Only the latest query of a burst is
    /// fetched; a newer call also abandons a fetch already in flight.
    pub fn bounds_changed(&self, query: MapQuery) {
        let api = Arc::clone(&self.api);
        let store = Arc::clone(&self.store);
        self.debouncer.trigger(async move {
            if let Err(e) = fetch_into(api.as_ref(), &store, &query).await {
                tracing::warn!(error = %e, retryable = e.is_retryable(), "map refetch failed");
            }
        });
    }

    /// Fetches immediately, cancelling any scheduled fetch.
    pub async fn load_now(&self, query: &MapQuery) -> Result<(), ApiError> {
        self.debouncer.cancel();
        fetch_into(self.api.as_ref(), &self.store, query).await
    }

    pub fn cancel(&self) -> bool {
        self.debouncer.cancel()
    }

    pub fn is_pending(&self) -> bool {
        self.debouncer.is_pending()
    }
}

async fn fetch_into(api: &dyn ComplaintApi, store: &SnapshotStore, query: &MapQuery) -> Result<(), ApiError> {
    let complaints = api.map_data(query).await?;
    tracing::debug!(count = complaints.len(), bounds = ?query.bounds, "map data loaded");
    store.load_map(complaints, query.filter());
    Ok(())
}
