//! Wire shapes of the REST API that have no domain counterpart.

use serde::Deserialize;
use serde_json::Value as JsonValue;

use crate::ports::Page;

/// Listing response: a Spring page, or a bare array from endpoints that
/// do not paginate.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(super) enum PageDto<T> {
    Paged(SpringPage<T>),
    Plain(Vec<T>),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct SpringPage<T> {
    pub content: Vec<T>,
    #[serde(default)]
    pub number: u32,
    #[serde(default)]
    pub total_pages: Option<u32>,
    #[serde(default)]
    pub total_elements: Option<u64>,
}

impl<T> PageDto<T> {
    /// Normalizes to a `Page`, deriving missing totals from the content.
    pub(super) fn into_page(self, requested_size: u32) -> Page<T> {
        match self {
            PageDto::Paged(page) => {
                let total_elements = page
                    .total_elements
                    .unwrap_or(page.content.len() as u64);
                let total_pages = page
                    .total_pages
                    .unwrap_or_else(|| pages_for(total_elements, requested_size));
                Page {
                    content: page.content,
                    number: page.number,
                    total_pages,
                    total_elements,
                }
            }
            PageDto::Plain(content) => {
                let total_elements = content.len() as u64;
                Page {
                    content,
                    number: 0,
                    total_pages: u32::from(total_elements > 0),
                    total_elements,
                }
            }
        }
    }
}

fn pages_for(total: u64, size: u32) -> u32 {
    if size == 0 {
        return 0;
    }
    let pages = total.div_ceil(u64::from(size));
    u32::try_from(pages).unwrap_or(u32::MAX)
}

/// `GET /notifications/unread/count` answers with a bare number or an object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(super) enum UnreadCountDto {
    Bare(u64),
    Wrapped {
        #[serde(alias = "unreadCount")]
        count: u64,
    },
}

impl UnreadCountDto {
    pub(super) fn count(&self) -> u64 {
        match self {
            UnreadCountDto::Bare(n) => *n,
            UnreadCountDto::Wrapped { count } => *count,
        }
    }
}

/// Error body produced by the backend's exception handler.
#[derive(Debug, Default, Deserialize)]
pub(super) struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    errors: Vec<JsonValue>,
}

impl ErrorBody {
    /// Human-readable reason, falling back to the raw body text.
    pub(super) fn describe(raw: &str) -> String {
        let Ok(body) = serde_json::from_str::<ErrorBody>(raw) else {
            return raw.trim().to_string();
        };
        if !body.errors.is_empty() {
            return body
                .errors
                .iter()
                .map(|e| match e {
                    JsonValue::String(s) => s.clone(),
                    other => other
                        .get("defaultMessage")
                        .or_else(|| other.get("message"))
                        .and_then(JsonValue::as_str)
                        .map(str::to_string)
                        .unwrap_or_else(|| other.to_string()),
                })
                .collect::<Vec<_>>()
                .join("; ");
        }
        body.message
            .or(body.error)
            .unwrap_or_else(|| raw.trim().to_string())
    }
}
