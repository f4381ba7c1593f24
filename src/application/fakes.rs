//! In-process doubles of the REST ports for application tests.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use crate::domain::civic::{Complaint, ComplaintDraft, Notification, StatisticsSnapshot};
use crate::domain::foundation::EntityId;
use crate::ports::{ApiError, ComplaintApi, ComplaintQuery, MapQuery, NotificationApi, Page};

/// Canned REST backend recording every call it receives.
#[derive(Default)]
pub struct FakeCivicApi {
    pub complaints: Mutex<Vec<Complaint>>,
    pub notifications: Mutex<Vec<Notification>>,
    pub unread: Mutex<u64>,
    pub statistics: Mutex<StatisticsSnapshot>,
    pub failures: Mutex<VecDeque<ApiError>>,
    pub calls: Mutex<Vec<String>>,
    pub map_queries: Mutex<Vec<MapQuery>>,
}

impl FakeCivicApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_complaints(self, complaints: Vec<Complaint>) -> Self {
        *self.complaints.lock().unwrap_or_else(PoisonError::into_inner) = complaints;
        self
    }

    pub fn with_notifications(self, notifications: Vec<Notification>, unread: u64) -> Self {
        *self.notifications.lock().unwrap_or_else(PoisonError::into_inner) = notifications;
        *self.unread.lock().unwrap_or_else(PoisonError::into_inner) = unread;
        self
    }

    /// The next call fails with `error`.
    pub fn fail_next(&self, error: ApiError) {
        self.failures.lock().unwrap_or_else(PoisonError::into_inner).push_back(error);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn count(&self, call: &str) -> usize {
        self.calls().iter().filter(|c| c.as_str() == call).count()
    }

    fn record(&self, call: &str) -> Result<(), ApiError> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call.to_string());
        match self.failures.lock().unwrap_or_else(PoisonError::into_inner).pop_front() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

fn page_of<T: Clone>(items: &[T], page: u32, size: u32) -> Page<T> {
    let start = (page as usize) * (size as usize);
    let content: Vec<T> = items.iter().skip(start).take(size as usize).cloned().collect();
    let total = items.len() as u64;
    Page {
        content,
        number: page,
        total_pages: if size == 0 { 0 } else { total.div_ceil(u64::from(size)) as u32 },
        total_elements: total,
    }
}

#[async_trait]
impl ComplaintApi for FakeCivicApi {
    async fn list_complaints(&self, query: &ComplaintQuery) -> Result<Page<Complaint>, ApiError> {
        self.record("list_complaints")?;
        let all = self.complaints.lock().unwrap_or_else(PoisonError::into_inner).clone();
        Ok(page_of(&all, query.page, query.size))
    }

    async fn get_complaint(&self, id: &EntityId) -> Result<Complaint, ApiError> {
        self.record("get_complaint")?;
        self.complaints
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|c| &c.complaint_id == id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("/complaints/{}", id)))
    }

    async fn create_complaint(&self, draft: &ComplaintDraft) -> Result<Complaint, ApiError> {
        self.record("create_complaint")?;
        let mut complaints = self.complaints.lock().unwrap_or_else(PoisonError::into_inner);
        let id = complaints.len() as i64 + 100;
        let complaint = Complaint::new(id, draft.title.clone());
        complaints.push(complaint.clone());
        Ok(complaint)
    }

    async fn update_complaint(&self, id: &EntityId, draft: &ComplaintDraft) -> Result<Complaint, ApiError> {
        self.record("update_complaint")?;
        let mut complaints = self.complaints.lock().unwrap_or_else(PoisonError::into_inner);
        let existing = complaints
            .iter_mut()
            .find(|c| &c.complaint_id == id)
            .ok_or_else(|| ApiError::NotFound(format!("/complaints/{}", id)))?;
        existing.title = draft.title.clone();
        Ok(existing.clone())
    }

    async fn delete_complaint(&self, id: &EntityId) -> Result<(), ApiError> {
        self.record("delete_complaint")?;
        self.complaints
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|c| &c.complaint_id != id);
        Ok(())
    }

    async fn statistics(&self) -> Result<StatisticsSnapshot, ApiError> {
        self.record("statistics")?;
        Ok(self.statistics.lock().unwrap_or_else(PoisonError::into_inner).clone())
    }

    async fn map_data(&self, query: &MapQuery) -> Result<Vec<Complaint>, ApiError> {
        self.record("map_data")?;
        self.map_queries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(query.clone());
        let filter = query.filter();
        Ok(self
            .complaints
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|c| filter.matches(c))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl NotificationApi for FakeCivicApi {
    async fn list_notifications(&self, page: u32, size: u32) -> Result<Page<Notification>, ApiError> {
        self.record("list_notifications")?;
        let all = self.notifications.lock().unwrap_or_else(PoisonError::into_inner).clone();
        Ok(page_of(&all, page, size))
    }

    async fn mark_read(&self, id: &EntityId) -> Result<(), ApiError> {
        self.record("mark_read")?;
        if let Some(n) = self
            .notifications
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter_mut()
            .find(|n| &n.id == id)
        {
            n.is_read = true;
        }
        Ok(())
    }

    async fn mark_all_read(&self) -> Result<(), ApiError> {
        self.record("mark_all_read")?;
        for n in self.notifications.lock().unwrap_or_else(PoisonError::into_inner).iter_mut() {
            n.is_read = true;
        }
        *self.unread.lock().unwrap_or_else(PoisonError::into_inner) = 0;
        Ok(())
    }

    async fn unread_count(&self) -> Result<u64, ApiError> {
        self.record("unread_count")?;
        Ok(*self.unread.lock().unwrap_or_else(PoisonError::into_inner))
    }
}
