//! SnapshotStore - The single owner of synchronized entity state.
//!
//! Holds one window per list surface plus the statistics singleton. Every
//! mutation goes through this type; readers get copies. After each change
//! that altered state, a `StoreChange` is broadcast so views can re-project.

use std::collections::{HashMap, VecDeque};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::broadcast;

use crate::domain::civic::{
    Complaint, ComplaintFilter, ComplaintSort, Notification, StatisticsSnapshot,
};
use crate::domain::foundation::EntityId;
use crate::domain::projections::{
    project_badge, project_charts, project_markers, project_page, MapMarker, PagedListView,
    StatisticsCharts, UnreadBadge,
};
use crate::domain::snapshot::{SingletonSlot, SnapshotWindow, UpsertOutcome, WindowSnapshot};
use crate::ports::Page;

const CHANGE_CAPACITY: usize = 64;
/// Notification ids remembered for unread accounting and toast dedup.
const SEEN_CAPACITY: usize = 1_024;

/// Which part of the store changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreChange {
    Complaints,
    MapComplaints,
    Notifications,
    UnreadCount,
    Statistics,
}

/// Window sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreConfig {
    pub complaint_page_size: usize,
    pub notification_page_size: usize,
    pub map_window_size: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            complaint_page_size: 10,
            notification_page_size: 20,
            map_window_size: 500,
        }
    }
}

/// Outcome of merging a complaint into both complaint windows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComplaintMerge {
    pub list: UpsertOutcome,
    pub map: UpsertOutcome,
}

impl ComplaintMerge {
    pub fn changed(&self) -> bool {
        self.list.changed() || self.map.changed()
    }
}

/// Outcome of merging a live notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationMerge {
    pub window: UpsertOutcome,
    /// First time this id reached the store, through any path.
    pub first_arrival: bool,
}

/// Last known read flag per notification id, independent of the window.
/// Oldest ids are forgotten once `SEEN_CAPACITY` is reached.
#[derive(Debug, Default)]
struct SeenNotifications {
    unread: HashMap<EntityId, bool>,
    order: VecDeque<EntityId>,
}

impl SeenNotifications {
    /// Stores the flag and returns the previous one.
    fn record(&mut self, id: &EntityId, unread: bool) -> Option<bool> {
        let previous = self.unread.insert(id.clone(), unread);
        if previous.is_none() {
            self.order.push_back(id.clone());
            if self.order.len() > SEEN_CAPACITY {
                if let Some(oldest) = self.order.pop_front() {
                    self.unread.remove(&oldest);
                }
            }
        }
        previous
    }

    fn mark_all_read(&mut self) {
        for flag in self.unread.values_mut() {
            *flag = false;
        }
    }
}

struct StoreState {
    complaints: SnapshotWindow<Complaint>,
    complaint_sort: ComplaintSort,
    complaint_filter: ComplaintFilter,
    map: SnapshotWindow<Complaint>,
    notifications: SnapshotWindow<Notification>,
    /// Server-reported unread count, adjusted locally; `None` until seeded.
    unread_reported: Option<u64>,
    seen: SeenNotifications,
    statistics: SingletonSlot<StatisticsSnapshot>,
}

pub struct SnapshotStore {
    state: RwLock<StoreState>,
    changes: broadcast::Sender<StoreChange>,
}

impl SnapshotStore {
    pub fn new(config: StoreConfig) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CAPACITY);
        let complaint_sort = ComplaintSort::default();
        Self {
            state: RwLock::new(StoreState {
                complaints: SnapshotWindow::new(config.complaint_page_size, complaint_sort.to_spec()),
                complaint_sort,
                complaint_filter: ComplaintFilter::default(),
                map: SnapshotWindow::new(config.map_window_size, ComplaintSort::Newest.to_spec()),
                notifications: SnapshotWindow::new(
                    config.notification_page_size,
                    Notification::newest_first(),
                ),
                unread_reported: None,
                seen: SeenNotifications::default(),
                statistics: SingletonSlot::new(),
            }),
            changes,
        }
    }

    /// Receiver of change notifications. Lagging receivers skip to the
    /// newest changes; re-projecting from current state is always correct.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.changes.subscribe()
    }

    fn read(&self) -> RwLockReadGuard<'_, StoreState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(&self, change: StoreChange) {
        // No receivers is fine.
        let _ = self.changes.send(change);
    }

    // ════════════════════════════════════════════════════════════════════
    // Complaints
    // ════════════════════════════════════════════════════════════════════

    /// Replaces the complaint list window with a fetched page.
    pub fn load_complaints(&self, page: Page<Complaint>) {
        self.write()
            .complaints
            .load_page(page.content, page.total_elements, page.number);
        self.notify(StoreChange::Complaints);
    }

    /// Changes the list sort and filter. The caller refetches afterwards.
    pub fn set_complaint_view(&self, sort: ComplaintSort, filter: ComplaintFilter) {
        {
            let mut state = self.write();
            state.complaints.set_sort(sort.to_spec());
            state.complaints.set_admission(filter.admission());
            state.complaint_sort = sort;
            state.complaint_filter = filter;
        }
        self.notify(StoreChange::Complaints);
    }

    pub fn complaint_view(&self) -> (ComplaintSort, ComplaintFilter) {
        let state = self.read();
        (state.complaint_sort, state.complaint_filter.clone())
    }

    /// Merges a complaint into the list and map windows.
    pub fn upsert_complaint(&self, complaint: Complaint) -> ComplaintMerge {
        let merge = {
            let mut state = self.write();
            let map = state.map.upsert(complaint.clone());
            let list = state.complaints.upsert(complaint);
            ComplaintMerge { list, map }
        };
        if merge.list.changed() {
            self.notify(StoreChange::Complaints);
        }
        if merge.map.changed() {
            self.notify(StoreChange::MapComplaints);
        }
        merge
    }

    /// Removes a complaint from every window. Returns true if any held it.
    pub fn remove_complaint(&self, id: &EntityId) -> bool {
        let (list, map) = {
            let mut state = self.write();
            (
                state.complaints.remove(id).is_some(),
                state.map.remove(id).is_some(),
            )
        };
        if list {
            self.notify(StoreChange::Complaints);
        }
        if map {
            self.notify(StoreChange::MapComplaints);
        }
        list || map
    }

    pub fn complaint(&self, id: &EntityId) -> Option<Complaint> {
        let state = self.read();
        state
            .complaints
            .get(id)
            .or_else(|| state.map.get(id))
            .cloned()
    }

    pub fn complaints(&self) -> WindowSnapshot<Complaint> {
        self.read().complaints.snapshot()
    }

    pub fn complaint_page(&self) -> PagedListView<Complaint> {
        project_page(&self.read().complaints.snapshot())
    }

    // ════════════════════════════════════════════════════════════════════
    // Map
    // ════════════════════════════════════════════════════════════════════

    /// Replaces the map window; `filter` decides which live updates it keeps.
    pub fn load_map(&self, complaints: Vec<Complaint>, filter: ComplaintFilter) {
        {
            let mut state = self.write();
            let total = complaints.len() as u64;
            state.map.set_admission(filter.admission());
            state.map.load_page(complaints, total, 0);
        }
        self.notify(StoreChange::MapComplaints);
    }

    pub fn map_complaints(&self) -> Vec<Complaint> {
        self.read().map.list().to_vec()
    }

    pub fn map_markers(&self) -> Vec<MapMarker> {
        project_markers(self.read().map.list())
    }

    // ════════════════════════════════════════════════════════════════════
    // Notifications
    // ════════════════════════════════════════════════════════════════════

    pub fn load_notifications(&self, page: Page<Notification>) {
        {
            let mut state = self.write();
            for notification in &page.content {
                state.seen.record(&notification.id, !notification.is_read);
            }
            state
                .notifications
                .load_page(page.content, page.total_elements, page.number);
        }
        self.notify(StoreChange::Notifications);
    }

    /// Seeds the unread figure from the server.
    pub fn set_unread_count(&self, count: u64) {
        let changed = {
            let mut state = self.write();
            let changed = state.unread_reported != Some(count);
            state.unread_reported = Some(count);
            changed
        };
        if changed {
            self.notify(StoreChange::UnreadCount);
        }
    }

    /// Merges a notification, keeping the reported unread count in step.
    ///
    /// The unread delta follows the last read flag recorded for the id, so
    /// a notification the window ignores still counts once and only once.
    pub fn upsert_notification(&self, notification: Notification) -> NotificationMerge {
        let (merge, unread_changed) = {
            let mut state = self.write();
            let now_unread = !notification.is_read;
            let was_unread = state.seen.record(&notification.id, now_unread);
            let window = state.notifications.upsert(notification);
            let delta: i64 = match (was_unread, now_unread) {
                (None, true) | (Some(false), true) => 1,
                (Some(true), false) => -1,
                _ => 0,
            };
            let unread_changed = adjust_unread(&mut state.unread_reported, delta);
            let merge = NotificationMerge {
                window,
                first_arrival: was_unread.is_none(),
            };
            (merge, unread_changed)
        };
        if merge.window.changed() {
            self.notify(StoreChange::Notifications);
        }
        if unread_changed {
            self.notify(StoreChange::UnreadCount);
        }
        merge
    }

    /// Flags one notification as read after the server accepted it.
    pub fn mark_notification_read(&self, id: &EntityId) -> bool {
        let (window_changed, unread_changed) = {
            let mut state = self.write();
            let in_window = state.notifications.get(id).map(|n| !n.is_read);
            let was_unread = match state.seen.record(id, false) {
                Some(unread) => unread,
                None => in_window.unwrap_or(false),
            };
            let outcome = state.notifications.update(id, |n| n.is_read = true);
            let unread_changed = was_unread && adjust_unread(&mut state.unread_reported, -1);
            (outcome.changed(), unread_changed)
        };
        if window_changed {
            self.notify(StoreChange::Notifications);
        }
        if unread_changed {
            self.notify(StoreChange::UnreadCount);
        }
        window_changed || unread_changed
    }

    /// Flags every notification as read after the server accepted it.
    pub fn mark_all_notifications_read(&self) {
        let (window_changed, unread_changed) = {
            let mut state = self.write();
            let unread: Vec<EntityId> = state
                .notifications
                .list()
                .iter()
                .filter(|n| !n.is_read)
                .map(|n| n.id.clone())
                .collect();
            for id in &unread {
                state.notifications.update(id, |n| n.is_read = true);
            }
            state.seen.mark_all_read();
            let unread_changed = state.unread_reported != Some(0);
            state.unread_reported = Some(0);
            (!unread.is_empty(), unread_changed)
        };
        if window_changed {
            self.notify(StoreChange::Notifications);
        }
        if unread_changed {
            self.notify(StoreChange::UnreadCount);
        }
    }

    pub fn notifications(&self) -> WindowSnapshot<Notification> {
        self.read().notifications.snapshot()
    }

    pub fn unread_badge(&self) -> UnreadBadge {
        let state = self.read();
        project_badge(state.notifications.list(), state.unread_reported)
    }

    // ════════════════════════════════════════════════════════════════════
    // Statistics
    // ════════════════════════════════════════════════════════════════════

    /// Replaces the statistics singleton wholesale.
    pub fn replace_statistics(&self, statistics: StatisticsSnapshot) -> bool {
        let changed = self.write().statistics.replace(statistics);
        if changed {
            self.notify(StoreChange::Statistics);
        }
        changed
    }

    pub fn statistics(&self) -> Option<StatisticsSnapshot> {
        self.read().statistics.get().cloned()
    }

    pub fn charts(&self) -> StatisticsCharts {
        project_charts(self.read().statistics.get())
    }
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new(StoreConfig::default())
    }
}

fn adjust_unread(reported: &mut Option<u64>, delta: i64) -> bool {
    let Some(count) = reported.as_mut() else {
        return false;
    };
    let next = if delta >= 0 {
        count.saturating_add(delta.unsigned_abs())
    } else {
        count.saturating_sub(delta.unsigned_abs())
    };
    let changed = next != *count;
    *count = next;
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::civic::{ComplaintStatus, MapBounds};
    use crate::domain::foundation::Timestamp;

    fn complaint(id: i64, minute: i64) -> Complaint {
        let mut c = Complaint::new(id, format!("Complaint {}", id));
        c.created_at = Timestamp::from_millis(1_700_000_000_000 + minute * 60_000);
        c
    }

    fn page<T>(content: Vec<T>, total: u64) -> Page<T> {
        Page {
            content,
            number: 0,
            total_pages: 1,
            total_elements: total,
        }
    }

    fn store() -> SnapshotStore {
        SnapshotStore::new(StoreConfig {
            complaint_page_size: 3,
            notification_page_size: 5,
            map_window_size: 10,
        })
    }

    // ============================================================
    // Complaints
    // ============================================================

    #[test]
    fn failed_reload_is_simply_not_applied() {
        let store = store();
        store.load_complaints(page(vec![complaint(1, 1)], 1));
        // a failed fetch never reaches load_complaints
        assert_eq!(store.complaints().items.len(), 1);
    }

    #[test]
    fn upsert_reaches_list_and_map() {
        let store = store();
        let merge = store.upsert_complaint(complaint(1, 1));
        assert!(merge.list.changed());
        assert!(merge.map.changed());
        assert_eq!(store.map_complaints().len(), 1);
        assert_eq!(store.complaint_page().total_count, 1);
    }

    #[test]
    fn remove_clears_every_window() {
        let store = store();
        store.upsert_complaint(complaint(1, 1));
        assert!(store.remove_complaint(&EntityId::from(1)));
        assert!(store.complaint(&EntityId::from(1)).is_none());
        assert!(!store.remove_complaint(&EntityId::from(1)));
    }

    #[test]
    fn map_filter_excludes_out_of_bounds_updates() {
        let store = store();
        let bounds = MapBounds::new(10.0, 20.0, 10.0, 20.0).unwrap();
        store.load_map(
            vec![],
            ComplaintFilter {
                bounds: Some(bounds),
                ..ComplaintFilter::default()
            },
        );
        let mut outside = complaint(1, 1);
        outside.location_lat = Some(50.0);
        outside.location_lng = Some(50.0);
        let mut inside = complaint(2, 2);
        inside.location_lat = Some(15.0);
        inside.location_lng = Some(15.0);

        store.upsert_complaint(outside);
        store.upsert_complaint(inside);

        assert_eq!(store.map_markers().len(), 1);
        assert_eq!(store.complaints().items.len(), 2);
    }

    #[test]
    fn complaint_view_filter_prunes_list() {
        let store = store();
        let mut resolved = complaint(1, 1);
        resolved.status = ComplaintStatus::Resolved;
        store.upsert_complaint(resolved);
        store.upsert_complaint(complaint(2, 2));

        store.set_complaint_view(
            ComplaintSort::Newest,
            ComplaintFilter {
                status: Some(ComplaintStatus::Submitted),
                ..ComplaintFilter::default()
            },
        );

        let ids: Vec<_> = store.complaints().items.into_iter().map(|c| c.complaint_id).collect();
        assert_eq!(ids, vec![EntityId::from(2)]);
        assert_eq!(store.complaint_view().0, ComplaintSort::Newest);
    }

    // ============================================================
    // Notifications and badge
    // ============================================================

    #[test]
    fn badge_counts_window_flags_until_seeded() {
        let store = store();
        store.upsert_notification(Notification::new(1, "a"));
        store.upsert_notification(Notification::new(2, "b"));
        assert_eq!(store.unread_badge().count, 2);
    }

    #[test]
    fn reported_count_tracks_arrivals_and_reads() {
        let store = store();
        store.set_unread_count(40);

        store.upsert_notification(Notification::new(1, "a"));
        store.upsert_notification(Notification::new(1, "a"));
        assert_eq!(store.unread_badge().count, 41);

        assert!(store.mark_notification_read(&EntityId::from(1)));
        assert_eq!(store.unread_badge().count, 40);
        assert!(!store.mark_notification_read(&EntityId::from(1)));
        assert_eq!(store.unread_badge().count, 40);
    }

    fn sent(id: i64, minute: i64) -> Notification {
        let mut n = Notification::new(id, format!("Notification {}", id));
        n.sent_at = Timestamp::from_millis(1_700_000_000_000 + minute * 60_000);
        n
    }

    #[test]
    fn notification_outside_window_counts_once() {
        let store = SnapshotStore::new(StoreConfig {
            notification_page_size: 2,
            ..StoreConfig::default()
        });
        store.load_notifications(page(vec![sent(1, 20), sent(2, 10)], 2));
        store.set_unread_count(2);

        let first = store.upsert_notification(sent(99, 1));
        let again = store.upsert_notification(sent(99, 1));

        assert_eq!(first.window, UpsertOutcome::Ignored);
        assert_eq!(again.window, UpsertOutcome::Ignored);
        assert!(first.first_arrival);
        assert!(!again.first_arrival);
        assert_eq!(store.unread_badge().count, 3);

        assert!(store.mark_notification_read(&EntityId::from(99)));
        assert_eq!(store.unread_badge().count, 2);
    }

    #[test]
    fn loaded_notifications_are_not_first_arrivals() {
        let store = store();
        store.load_notifications(page(vec![sent(1, 1)], 1));
        store.set_unread_count(1);

        let merge = store.upsert_notification(sent(1, 1));

        assert!(!merge.first_arrival);
        assert_eq!(store.unread_badge().count, 1);
    }

    #[test]
    fn mark_all_read_zeroes_badge() {
        let store = store();
        store.upsert_notification(Notification::new(1, "a"));
        store.upsert_notification(Notification::new(2, "b"));

        store.mark_all_notifications_read();

        assert_eq!(store.unread_badge().count, 0);
        assert!(store.notifications().items.iter().all(|n| n.is_read));
    }

    // ============================================================
    // Statistics and change feed
    // ============================================================

    #[test]
    fn statistics_replace_is_wholesale() {
        let store = store();
        let mut stats = StatisticsSnapshot::default();
        stats.total_complaints = 4;
        assert!(store.replace_statistics(stats.clone()));
        assert!(!store.replace_statistics(stats));
        assert_eq!(store.statistics().map(|s| s.total_complaints), Some(4));
    }

    #[tokio::test]
    async fn changes_are_broadcast_only_when_state_changes() {
        let store = store();
        let mut rx = store.subscribe();

        store.upsert_notification(Notification::new(1, "a"));
        store.upsert_notification(Notification::new(1, "a"));
        store.set_unread_count(3);

        assert_eq!(rx.recv().await.unwrap(), StoreChange::Notifications);
        assert_eq!(rx.recv().await.unwrap(), StoreChange::UnreadCount);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn mark_all_read_is_silent_when_nothing_is_unread() {
        let store = store();
        let mut read = Notification::new(1, "a");
        read.is_read = true;
        store.upsert_notification(read);
        store.set_unread_count(0);
        let mut rx = store.subscribe();

        store.mark_all_notifications_read();
        assert!(rx.try_recv().is_err());

        store.upsert_notification(Notification::new(2, "b"));
        store.mark_all_notifications_read();
        let mut changes = Vec::new();
        while let Ok(change) = rx.try_recv() {
            changes.push(change);
        }
        assert_eq!(
            changes,
            vec![
                StoreChange::Notifications,
                StoreChange::UnreadCount,
                StoreChange::Notifications,
                StoreChange::UnreadCount,
            ]
        );
    }
}
