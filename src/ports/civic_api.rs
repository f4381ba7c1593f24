//! Civic REST API ports - Complaint and notification endpoints consumed by
//! the synchronizer.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::civic::{
    Complaint, ComplaintDraft, ComplaintFilter, ComplaintSort, ComplaintStatus, MapBounds,
    Notification, StatisticsSnapshot,
};
use crate::domain::foundation::{DomainError, EntityId, ErrorCode};

/// Typed failure of a REST call.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ApiError {
    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Authentication required")]
    Unauthorized,

    #[error("Access denied")]
    Forbidden,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("Invalid response: {0}")]
    Decode(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ApiError {
    /// Returns true if retrying the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ApiError::Timeout { .. } | ApiError::Network(_) | ApiError::Server { .. }
        )
    }
}

impl From<ApiError> for DomainError {
    fn from(err: ApiError) -> Self {
        let code = match err {
            ApiError::NotFound(_) => ErrorCode::NotFound,
            _ => ErrorCode::ApiFailure,
        };
        DomainError::new(code, err.to_string())
    }
}

/// One page of a paginated listing.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub content: Vec<T>,
    pub number: u32,
    pub total_pages: u32,
    pub total_elements: u64,
}

/// Parameters of `GET /complaints`.
#[derive(Debug, Clone, PartialEq)]
pub struct ComplaintQuery {
    pub page: u32,
    pub size: u32,
    pub sort: ComplaintSort,
    /// Category, status and search are sent; bounds are not.
    pub filter: ComplaintFilter,
}

impl ComplaintQuery {
    pub fn first_page(size: u32) -> Self {
        Self {
            page: 0,
            size,
            sort: ComplaintSort::default(),
            filter: ComplaintFilter::default(),
        }
    }
}

/// Parameters of the admin map data endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct MapQuery {
    pub bounds: MapBounds,
    pub category: Option<String>,
    pub status: Option<ComplaintStatus>,
}

impl MapQuery {
    pub fn new(bounds: MapBounds) -> Self {
        Self {
            bounds,
            category: None,
            status: None,
        }
    }

    /// Window filter equivalent to this query.
    pub fn filter(&self) -> ComplaintFilter {
        ComplaintFilter {
            category: self.category.clone(),
            status: self.status.clone(),
            search: None,
            bounds: Some(self.bounds),
        }
    }
}

/// Complaint endpoints.
#[async_trait]
pub trait ComplaintApi: Send + Sync {
    async fn list_complaints(&self, query: &ComplaintQuery) -> Result<Page<Complaint>, ApiError>;

    async fn get_complaint(&self, id: &EntityId) -> Result<Complaint, ApiError>;

    async fn create_complaint(&self, draft: &ComplaintDraft) -> Result<Complaint, ApiError>;

    async fn update_complaint(&self, id: &EntityId, draft: &ComplaintDraft) -> Result<Complaint, ApiError>;

    async fn delete_complaint(&self, id: &EntityId) -> Result<(), ApiError>;

    async fn statistics(&self) -> Result<StatisticsSnapshot, ApiError>;

    async fn map_data(&self, query: &MapQuery) -> Result<Vec<Complaint>, ApiError>;
}

/// Notification endpoints.
#[async_trait]
pub trait NotificationApi: Send + Sync {
    async fn list_notifications(&self, page: u32, size: u32) -> Result<Page<Notification>, ApiError>;

    async fn mark_read(&self, id: &EntityId) -> Result<(), ApiError>;

    async fn mark_all_read(&self) -> Result<(), ApiError>;

    async fn unread_count(&self) -> Result<u64, ApiError>;
}
