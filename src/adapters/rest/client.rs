//! reqwest implementation of the civic REST ports.
//!
//! Every request carries the bearer credential and is bounded by the
//! configured request timeout.

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

use super::dto::{ErrorBody, PageDto, UnreadCountDto};
use crate::domain::civic::{Complaint, ComplaintDraft, Notification, StatisticsSnapshot};
use crate::domain::foundation::{Credentials, EntityId};
use crate::ports::{ApiError, ComplaintApi, ComplaintQuery, MapQuery, NotificationApi, Page};

/// Configuration for the REST client.
#[derive(Debug, Clone)]
pub struct RestClientConfig {
    /// API root, e.g. `http://localhost:8080/api`.
    pub base_url: String,
    /// Request timeout.
    pub timeout: Duration,
    /// Bearer credential attached to every call.
    pub credentials: Credentials,
}

impl RestClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: Duration::from_secs(30),
            credentials: Credentials::anonymous(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }
}

/// REST client for complaint and notification endpoints.
pub struct RestApiClient {
    config: RestClientConfig,
    client: Client,
}

impl RestApiClient {
    pub fn new(config: RestClientConfig) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ApiError::InvalidRequest(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { config, client })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.client.request(method, self.url(path));
        match self.config.credentials.token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn execute(&self, builder: RequestBuilder) -> Result<Response, ApiError> {
        let response = builder.send().await.map_err(|e| self.transport_error(e))?;
        Self::check_status(response).await
    }

    async fn fetch<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ApiError> {
        let response = self.execute(builder).await?;
        let body = response.text().await.map_err(|e| self.transport_error(e))?;
        serde_json::from_str(&body).map_err(|e| ApiError::Decode(e.to_string()))
    }

    fn transport_error(&self, e: reqwest::Error) -> ApiError {
        if e.is_timeout() {
            ApiError::Timeout {
                timeout_secs: self.config.timeout.as_secs(),
            }
        } else if e.is_connect() {
            ApiError::Network(format!("Connection failed: {}", e))
        } else if e.is_decode() {
            ApiError::Decode(e.to_string())
        } else {
            ApiError::Network(e.to_string())
        }
    }

    async fn check_status(response: Response) -> Result<Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let path = response.url().path().to_string();
        let raw = response.text().await.unwrap_or_default();
        let message = ErrorBody::describe(&raw);
        tracing::debug!(status = status.as_u16(), path = %path, message = %message, "request failed");

        Err(match status {
            StatusCode::UNAUTHORIZED => ApiError::Unauthorized,
            StatusCode::FORBIDDEN => ApiError::Forbidden,
            StatusCode::NOT_FOUND => ApiError::NotFound(path),
            s if s.is_server_error() => ApiError::Server {
                status: s.as_u16(),
                message,
            },
            s => ApiError::Rejected {
                status: s.as_u16(),
                message,
            },
        })
    }
}

#[async_trait]
impl ComplaintApi for RestApiClient {
    async fn list_complaints(&self, query: &ComplaintQuery) -> Result<Page<Complaint>, ApiError> {
        let mut params: Vec<(&str, String)> = vec![
            ("page", query.page.to_string()),
            ("size", query.size.to_string()),
            ("sort", query.sort.query_param().to_string()),
        ];
        if let Some(category) = &query.filter.category {
            params.push(("category", category.clone()));
        }
        if let Some(status) = &query.filter.status {
            params.push(("status", status.as_str().to_string()));
        }
        if let Some(search) = query.filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
            params.push(("search", search.trim().to_string()));
        }

        let dto: PageDto<Complaint> = self
            .fetch(self.request(Method::GET, "/complaints").query(&params))
            .await?;
        Ok(dto.into_page(query.size))
    }

    async fn get_complaint(&self, id: &EntityId) -> Result<Complaint, ApiError> {
        self.fetch(self.request(Method::GET, &format!("/complaints/{}", id)))
            .await
    }

    async fn create_complaint(&self, draft: &ComplaintDraft) -> Result<Complaint, ApiError> {
        if draft.title.trim().is_empty() {
            return Err(ApiError::InvalidRequest("title must not be empty".into()));
        }
        self.fetch(self.request(Method::POST, "/complaints").json(draft))
            .await
    }

    async fn update_complaint(&self, id: &EntityId, draft: &ComplaintDraft) -> Result<Complaint, ApiError> {
        self.fetch(self.request(Method::PUT, &format!("/complaints/{}", id)).json(draft))
            .await
    }

    async fn delete_complaint(&self, id: &EntityId) -> Result<(), ApiError> {
        self.execute(self.request(Method::DELETE, &format!("/complaints/{}", id)))
            .await
            .map(|_| ())
    }

    async fn statistics(&self) -> Result<StatisticsSnapshot, ApiError> {
        self.fetch(self.request(Method::GET, "/complaints/statistics"))
            .await
    }

    async fn map_data(&self, query: &MapQuery) -> Result<Vec<Complaint>, ApiError> {
        let mut params: Vec<(&str, String)> = query.bounds.query_pairs().into_iter().collect();
        if let Some(category) = &query.category {
            params.push(("category", category.clone()));
        }
        if let Some(status) = &query.status {
            params.push(("status", status.as_str().to_string()));
        }
        let dto: PageDto<Complaint> = self
            .fetch(self.request(Method::GET, "/admin/complaints/mapdata").query(&params))
            .await?;
        Ok(dto.into_page(0).content)
    }
}

#[async_trait]
impl NotificationApi for RestApiClient {
    async fn list_notifications(&self, page: u32, size: u32) -> Result<Page<Notification>, ApiError> {
        let params = [("page", page.to_string()), ("size", size.to_string())];
        let dto: PageDto<Notification> = self
            .fetch(self.request(Method::GET, "/notifications").query(&params))
            .await?;
        Ok(dto.into_page(size))
    }

    async fn mark_read(&self, id: &EntityId) -> Result<(), ApiError> {
        self.execute(self.request(Method::PUT, &format!("/notifications/{}/read", id)))
            .await
            .map(|_| ())
    }

    async fn mark_all_read(&self) -> Result<(), ApiError> {
        self.execute(self.request(Method::PUT, "/notifications/read-all"))
            .await
            .map(|_| ())
    }

    async fn unread_count(&self) -> Result<u64, ApiError> {
        let dto: UnreadCountDto = self
            .fetch(self.request(Method::GET, "/notifications/unread/count"))
            .await?;
        Ok(dto.count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_joins_base_and_path() {
        let client = RestApiClient::new(RestClientConfig::new("http://localhost:8080/api/")).unwrap();
        assert_eq!(client.url("/complaints/7"), "http://localhost:8080/api/complaints/7");
    }

    #[test]
    fn config_defaults_to_thirty_second_timeout() {
        let config = RestClientConfig::new("http://localhost");
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.credentials.token(), None);
    }

    #[tokio::test]
    async fn create_rejects_blank_title_without_calling_backend() {
        let client = RestApiClient::new(RestClientConfig::new("http://127.0.0.1:1")).unwrap();
        let draft = ComplaintDraft {
            title: "  ".into(),
            ..ComplaintDraft::default()
        };
        assert!(matches!(
            client.create_complaint(&draft).await,
            Err(ApiError::InvalidRequest(_))
        ));
    }
}
