//! StatisticsRefresher - Refetches the statistics aggregate after complaint
//! changes, debounced so a burst of changes costs one request.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::application::{Debouncer, SnapshotStore};
use crate::domain::foundation::{DomainError, EventKind, LiveEvent};
use crate::ports::{ApiError, ComplaintApi, EventHandler};

/// Event kinds this handler expects to be subscribed to.
pub const REFRESH_KINDS: [EventKind; 2] = [EventKind::ComplaintUpserted, EventKind::ComplaintRemoved];

pub struct StatisticsRefresher {
    api: Arc<dyn ComplaintApi>,
    store: Arc<SnapshotStore>,
    debouncer: Debouncer,
}

impl StatisticsRefresher {
    pub fn new(api: Arc<dyn ComplaintApi>, store: Arc<SnapshotStore>, delay: Duration) -> Self {
        Self {
            api,
            store,
            debouncer: Debouncer::new("statistics", delay),
        }
    }

    pub fn schedule(&self) {
        let api = Arc::clone(&self.api);
        let store = Arc::clone(&self.store);
        self.debouncer.trigger(async move {
            match api.statistics().await {
                Ok(statistics) => {
                    store.replace_statistics(statistics);
                }
                Err(e) => tracing::warn!(error = %e, "statistics refresh failed"),
            }
        });
    }

    /// Fetches now, replacing any scheduled refresh.
    pub async fn refresh_now(&self) -> Result<(), ApiError> {
        self.debouncer.cancel();
        let statistics = self.api.statistics().await?;
        self.store.replace_statistics(statistics);
        Ok(())
    }

    pub fn cancel(&self) -> bool {
        self.debouncer.cancel()
    }
}

#[async_trait]
impl EventHandler for StatisticsRefresher {
    async fn handle(&self, event: LiveEvent) -> Result<(), DomainError> {
        if matches!(event.kind, EventKind::ComplaintUpserted | EventKind::ComplaintRemoved) {
            self.schedule();
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "StatisticsRefresher"
    }
}
