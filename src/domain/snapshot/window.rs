//! Bounded, ordered snapshot window with id-based merge.
//!
//! A window is the materialized slice of a paginated collection that one
//! view is currently showing. REST pages replace it wholesale; live events
//! are merged into it with `upsert`/`remove` without pagination context.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use super::{SortSpec, TrackedEntity};
use crate::domain::foundation::EntityId;

/// Admission predicate for filtered windows.
pub type Admission<E> = Arc<dyn Fn(&E) -> bool + Send + Sync>;

/// Result of merging one entity into a window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// New entity placed at `position`, possibly pushing the tail out.
    Inserted {
        position: usize,
        evicted: Option<EntityId>,
    },
    /// Existing entity replaced without moving.
    Replaced { position: usize },
    /// Existing entity replaced and re-sorted to a new position.
    Moved { from: usize, to: usize },
    /// Existing entity dropped because it no longer passes the window filter.
    Withdrawn { position: usize },
    /// Payload identical to the stored one.
    Unchanged,
    /// Entity belongs outside the materialized window.
    Ignored,
}

impl UpsertOutcome {
    /// Returns true if the window contents changed.
    pub fn changed(&self) -> bool {
        !matches!(self, UpsertOutcome::Unchanged | UpsertOutcome::Ignored)
    }
}

/// Immutable copy of a window handed to projections.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowSnapshot<E> {
    pub items: Vec<E>,
    pub total_count: u64,
    pub page_index: u32,
    pub page_size: usize,
    pub revision: u64,
}

impl<E> Default for WindowSnapshot<E> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            total_count: 0,
            page_index: 0,
            page_size: 0,
            revision: 0,
        }
    }
}

/// Bounded ordered window over one entity kind.
///
/// Invariants: no two items share an id, items are ordered by the sort spec,
/// and `items.len() <= page_size`.
pub struct SnapshotWindow<E: TrackedEntity> {
    items: Vec<E>,
    page_size: usize,
    total_count: u64,
    page_index: u32,
    revision: u64,
    sort: SortSpec<E>,
    admission: Option<Admission<E>>,
}

impl<E: TrackedEntity + fmt::Debug> fmt::Debug for SnapshotWindow<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnapshotWindow")
            .field("kind", &E::KIND)
            .field("len", &self.items.len())
            .field("page_size", &self.page_size)
            .field("total_count", &self.total_count)
            .field("page_index", &self.page_index)
            .field("revision", &self.revision)
            .field("sort", &self.sort)
            .field("filtered", &self.admission.is_some())
            .finish()
    }
}

impl<E: TrackedEntity> SnapshotWindow<E> {
    /// Creates an empty window.
    pub fn new(page_size: usize, sort: SortSpec<E>) -> Self {
        Self {
            items: Vec::new(),
            page_size,
            total_count: 0,
            page_index: 0,
            revision: 0,
            sort,
            admission: None,
        }
    }

    /// Returns the window with an admission filter installed.
    pub fn with_admission(mut self, admission: Admission<E>) -> Self {
        self.admission = Some(admission);
        self
    }

    // ─────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────

    pub fn get(&self, id: &EntityId) -> Option<&E> {
        self.items.iter().find(|e| e.entity_id() == id)
    }

    pub fn contains(&self, id: &EntityId) -> bool {
        self.position_of(id).is_some()
    }

    /// Items in window order.
    pub fn list(&self) -> &[E] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.items.len() >= self.page_size
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn page_index(&self) -> u32 {
        self.page_index
    }

    pub fn total_count(&self) -> u64 {
        self.total_count
    }

    /// Monotonic counter bumped on every mutation.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn sort(&self) -> SortSpec<E> {
        self.sort
    }

    pub fn snapshot(&self) -> WindowSnapshot<E> {
        WindowSnapshot {
            items: self.items.clone(),
            total_count: self.total_count,
            page_index: self.page_index,
            page_size: self.page_size,
            revision: self.revision,
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Mutations
    // ─────────────────────────────────────────────────────────────────────

    /// Replaces the window wholesale with a freshly fetched page.
    ///
    /// Duplicate ids keep their first occurrence. The page is sorted and
    /// truncated to `page_size`; `total_count` is taken as reported.
    pub fn load_page(&mut self, items: Vec<E>, total_count: u64, page_index: u32) {
        let mut page: Vec<E> = Vec::with_capacity(items.len().min(self.page_size));
        for item in items {
            if !page.iter().any(|p| p.entity_id() == item.entity_id()) {
                page.push(item);
            }
        }
        let sort = self.sort;
        page.sort_by(|a, b| sort.compare(a, b));
        page.truncate(self.page_size);

        self.items = page;
        self.total_count = total_count;
        self.page_index = page_index;
        self.revision += 1;
    }

    /// Inserts or replaces an entity by id.
    pub fn upsert(&mut self, entity: E) -> UpsertOutcome {
        let admitted = self.admits(&entity);

        if let Some(position) = self.position_of(entity.entity_id()) {
            if !admitted {
                self.items.remove(position);
                self.total_count = self.total_count.saturating_sub(1);
                self.revision += 1;
                return UpsertOutcome::Withdrawn { position };
            }
            if self.items[position] == entity {
                return UpsertOutcome::Unchanged;
            }

            let key_changed = self.sort.key_of(&self.items[position]) != self.sort.key_of(&entity);
            let id = entity.entity_id().clone();
            self.items[position] = entity;
            self.revision += 1;
            if !key_changed {
                return UpsertOutcome::Replaced { position };
            }

            let sort = self.sort;
            self.items.sort_by(|a, b| sort.compare(a, b));
            let to = self.position_of(&id).unwrap_or(position);
            return if to == position {
                UpsertOutcome::Replaced { position }
            } else {
                UpsertOutcome::Moved { from: position, to }
            };
        }

        if !admitted {
            return UpsertOutcome::Ignored;
        }

        let sort = self.sort;
        let position = self
            .items
            .partition_point(|existing| sort.compare(existing, &entity) == Ordering::Less);

        if self.items.len() < self.page_size {
            self.items.insert(position, entity);
            self.total_count += 1;
            self.revision += 1;
            return UpsertOutcome::Inserted {
                position,
                evicted: None,
            };
        }

        if position >= self.items.len() {
            return UpsertOutcome::Ignored;
        }

        self.items.insert(position, entity);
        let evicted = self.items.pop().map(|e| e.entity_id().clone());
        self.total_count += 1;
        self.revision += 1;
        UpsertOutcome::Inserted { position, evicted }
    }

    /// Removes an entity by id. No backfill from later pages.
    pub fn remove(&mut self, id: &EntityId) -> Option<E> {
        let position = self.position_of(id)?;
        let removed = self.items.remove(position);
        self.total_count = self.total_count.saturating_sub(1);
        self.revision += 1;
        Some(removed)
    }

    /// Applies `change` to a copy of the stored entity and merges it back.
    pub fn update<F>(&mut self, id: &EntityId, change: F) -> UpsertOutcome
    where
        F: FnOnce(&mut E),
    {
        match self.get(id).cloned() {
            Some(mut entity) => {
                change(&mut entity);
                self.upsert(entity)
            }
            None => UpsertOutcome::Ignored,
        }
    }

    /// Changes the active sort and re-sorts the current items.
    pub fn set_sort(&mut self, sort: SortSpec<E>) {
        self.sort = sort;
        self.items.sort_by(|a, b| sort.compare(a, b));
        self.revision += 1;
    }

    /// Installs or clears the admission filter, dropping items it rejects.
    pub fn set_admission(&mut self, admission: Option<Admission<E>>) {
        self.admission = admission;
        let before = self.items.len();
        if let Some(admits) = &self.admission {
            self.items.retain(|e| admits(e));
        }
        let dropped = (before - self.items.len()) as u64;
        self.total_count = self.total_count.saturating_sub(dropped);
        self.revision += 1;
    }

    /// Empties the window.
    pub fn clear(&mut self) {
        self.items.clear();
        self.total_count = 0;
        self.page_index = 0;
        self.revision += 1;
    }

    fn position_of(&self, id: &EntityId) -> Option<usize> {
        self.items.iter().position(|e| e.entity_id() == id)
    }

    fn admits(&self, entity: &E) -> bool {
        self.admission.as_ref().map_or(true, |admits| admits(entity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::snapshot::{EntityKind, SortValue};
    use proptest::prelude::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Item {
        id: EntityId,
        created: i64,
        status: &'static str,
    }

    impl TrackedEntity for Item {
        const KIND: EntityKind = EntityKind::Complaint;
        fn entity_id(&self) -> &EntityId {
            &self.id
        }
    }

    fn item(id: i64, created: i64) -> Item {
        Item {
            id: EntityId::from(id),
            created,
            status: "SUBMITTED",
        }
    }

    fn newest_first() -> SortSpec<Item> {
        SortSpec::<Item>::descending("created", |i: &Item| SortValue::Int(i.created))
    }

    fn ids(window: &SnapshotWindow<Item>) -> Vec<i64> {
        window
            .list()
            .iter()
            .filter_map(|i| i.id.as_number())
            .collect()
    }

    /// ids 1..=10 where id 1 is the newest.
    fn full_window() -> SnapshotWindow<Item> {
        let mut window = SnapshotWindow::new(10, newest_first());
        window.load_page((1..=10).map(|id| item(id, 100 - id)).collect(), 10, 0);
        window
    }

    // ============================================================
    // Merge algorithm
    // ============================================================

    #[test]
    fn newer_create_on_full_window_evicts_tail() {
        let mut window = full_window();

        let outcome = window.upsert(item(11, 1_000));

        assert_eq!(
            outcome,
            UpsertOutcome::Inserted {
                position: 0,
                evicted: Some(EntityId::from(10))
            }
        );
        assert_eq!(ids(&window), vec![11, 1, 2, 3, 4, 5, 6, 7, 8, 9]);
        assert_eq!(window.total_count(), 11);
    }

    #[test]
    fn older_create_on_full_window_is_ignored() {
        let mut window = full_window();

        let outcome = window.upsert(item(42, 0));

        assert_eq!(outcome, UpsertOutcome::Ignored);
        assert_eq!(ids(&window), (1..=10).collect::<Vec<_>>());
        assert_eq!(window.total_count(), 10);
    }

    #[test]
    fn update_without_key_change_keeps_position() {
        let mut window = full_window();
        let mut changed = item(5, 95);
        changed.status = "RESOLVED";

        let outcome = window.upsert(changed);

        assert_eq!(outcome, UpsertOutcome::Replaced { position: 4 });
        assert_eq!(ids(&window), (1..=10).collect::<Vec<_>>());
        assert_eq!(window.get(&EntityId::from(5)).unwrap().status, "RESOLVED");
        assert_eq!(window.total_count(), 10);
    }

    #[test]
    fn update_with_key_change_resorts() {
        let mut window = full_window();

        let outcome = window.upsert(item(7, 500));

        assert_eq!(outcome, UpsertOutcome::Moved { from: 6, to: 0 });
        assert_eq!(ids(&window)[0], 7);
    }

    #[test]
    fn identical_upsert_is_unchanged() {
        let mut window = full_window();
        let revision = window.revision();

        assert_eq!(window.upsert(item(3, 97)), UpsertOutcome::Unchanged);
        assert_eq!(window.revision(), revision);
    }

    #[test]
    fn insert_into_partial_window_uses_sort_position() {
        let mut window = SnapshotWindow::new(10, newest_first());
        window.load_page(vec![item(1, 30), item(2, 10)], 2, 0);

        window.upsert(item(3, 20));

        assert_eq!(ids(&window), vec![1, 3, 2]);
        assert_eq!(window.total_count(), 3);
    }

    #[test]
    fn remove_decrements_total_without_backfill() {
        let mut window = full_window();

        let removed = window.remove(&EntityId::from(4));

        assert!(removed.is_some());
        assert_eq!(window.len(), 9);
        assert_eq!(window.total_count(), 9);
        assert!(window.remove(&EntityId::from(4)).is_none());
        assert_eq!(window.total_count(), 9);
    }

    #[test]
    fn load_page_replaces_after_live_mutations() {
        let mut window = full_window();
        window.upsert(item(11, 1_000));
        window.remove(&EntityId::from(2));

        window.load_page(vec![item(20, 5), item(21, 6)], 42, 3);

        assert_eq!(ids(&window), vec![21, 20]);
        assert_eq!(window.total_count(), 42);
        assert_eq!(window.page_index(), 3);
    }

    #[test]
    fn load_page_dedupes_and_truncates() {
        let mut window = SnapshotWindow::new(2, newest_first());
        window.load_page(vec![item(1, 1), item(1, 9), item(2, 2), item(3, 3)], 3, 0);

        assert_eq!(ids(&window), vec![3, 2]);
    }

    #[test]
    fn filtered_window_withdraws_entities_that_stop_matching() {
        let admission: Admission<Item> = Arc::new(|i: &Item| i.status != "RESOLVED");
        let mut window = SnapshotWindow::new(10, newest_first()).with_admission(admission);
        window.load_page(vec![item(1, 3), item(2, 2)], 2, 0);

        let mut resolved = item(1, 3);
        resolved.status = "RESOLVED";
        assert_eq!(window.upsert(resolved.clone()), UpsertOutcome::Withdrawn { position: 0 });
        assert_eq!(window.total_count(), 1);

        resolved.id = EntityId::from(9);
        assert_eq!(window.upsert(resolved), UpsertOutcome::Ignored);
        assert_eq!(window.total_count(), 1);
    }

    #[test]
    fn update_applies_change_through_upsert() {
        let mut window = full_window();
        let outcome = window.update(&EntityId::from(2), |i| i.status = "CLOSED");
        assert_eq!(outcome, UpsertOutcome::Replaced { position: 1 });
        assert_eq!(window.update(&EntityId::from(99), |_| {}), UpsertOutcome::Ignored);
    }

    #[test]
    fn zero_sized_window_holds_nothing() {
        let mut window = SnapshotWindow::new(0, newest_first());
        assert_eq!(window.upsert(item(1, 1)), UpsertOutcome::Ignored);
        assert!(window.is_empty());
    }

    // ============================================================
    // Properties
    // ============================================================

    #[derive(Debug, Clone)]
    enum Op {
        Upsert { id: i64, created: i64, resolved: bool },
        Remove { id: i64 },
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            3 => (0i64..20, 0i64..30, any::<bool>())
                .prop_map(|(id, created, resolved)| Op::Upsert { id, created, resolved }),
            1 => (0i64..20).prop_map(|id| Op::Remove { id }),
        ]
    }

    fn apply(window: &mut SnapshotWindow<Item>, op: &Op) {
        match op {
            Op::Upsert { id, created, resolved } => {
                let mut it = item(*id, *created);
                if *resolved {
                    it.status = "RESOLVED";
                }
                window.upsert(it);
            }
            Op::Remove { id } => {
                window.remove(&EntityId::from(*id));
            }
        }
    }

    proptest! {
        #[test]
        fn window_invariants_hold(page_size in 0usize..8, ops in prop::collection::vec(op(), 0..60)) {
            let mut window = SnapshotWindow::new(page_size, newest_first());
            for op in &ops {
                apply(&mut window, op);

                let items = window.list();
                prop_assert!(items.len() <= page_size);

                let mut seen: Vec<&EntityId> = items.iter().map(|i| &i.id).collect();
                seen.sort();
                seen.dedup();
                prop_assert_eq!(seen.len(), items.len());

                let sort = window.sort();
                for pair in items.windows(2) {
                    prop_assert_eq!(sort.compare(&pair[0], &pair[1]), Ordering::Less);
                }
            }
        }

        #[test]
        fn repeated_upsert_is_idempotent(
            ops in prop::collection::vec(op(), 0..40),
            id in 0i64..20,
            created in 0i64..30,
        ) {
            let mut window = SnapshotWindow::new(5, newest_first());
            for op in &ops {
                apply(&mut window, op);
            }

            window.upsert(item(id, created));
            let order = ids(&window);
            let total = window.total_count();

            prop_assert!(!window.upsert(item(id, created)).changed());
            prop_assert_eq!(ids(&window), order);
            prop_assert_eq!(window.total_count(), total);
        }
    }
}
