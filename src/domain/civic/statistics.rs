//! Statistics aggregate pushed on the statistics topic and fetched by REST.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::collections::BTreeMap;

use super::null_as_default;

/// Complaint density around one location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaCount {
    pub lat: f64,
    pub lng: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub count: u64,
}

/// Aggregate counts; a singleton with no id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatisticsSnapshot {
    #[serde(default, deserialize_with = "null_as_default")]
    pub total_complaints: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub pending_complaints: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub in_progress_complaints: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub resolved_complaints: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub rejected_complaints: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub complaints_by_category: BTreeMap<String, u64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub complaints_by_status: BTreeMap<String, u64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub top_areas: Vec<AreaCount>,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

impl StatisticsSnapshot {
    /// Named headline counters in display order.
    pub fn headline(&self) -> [(&'static str, u64); 5] {
        [
            ("Total", self.total_complaints),
            ("Pending", self.pending_complaints),
            ("In Progress", self.in_progress_complaints),
            ("Resolved", self.resolved_complaints),
            ("Rejected", self.rejected_complaints),
        ]
    }
}
