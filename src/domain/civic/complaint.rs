//! Complaint entity, status vocabulary, change envelope, filter, and sorts.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::fmt;
use std::sync::Arc;

use super::{null_as_default, MapBounds};
use crate::domain::foundation::{DomainError, EntityId, ErrorCode, Timestamp};
use crate::domain::snapshot::{Admission, EntityKind, SortSpec, SortValue, TrackedEntity};

// ════════════════════════════════════════════════════════════════════════════════
// Status
// ════════════════════════════════════════════════════════════════════════════════

/// Lifecycle status of a complaint as reported by the backend.
///
/// Unrecognized values are preserved verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ComplaintStatus {
    #[default]
    Submitted,
    Pending,
    InProgress,
    Escalated,
    Resolved,
    Closed,
    Rejected,
    Other(String),
}

impl ComplaintStatus {
    /// Wire name in SCREAMING_SNAKE_CASE.
    pub fn as_str(&self) -> &str {
        match self {
            ComplaintStatus::Submitted => "SUBMITTED",
            ComplaintStatus::Pending => "PENDING",
            ComplaintStatus::InProgress => "IN_PROGRESS",
            ComplaintStatus::Escalated => "ESCALATED",
            ComplaintStatus::Resolved => "RESOLVED",
            ComplaintStatus::Closed => "CLOSED",
            ComplaintStatus::Rejected => "REJECTED",
            ComplaintStatus::Other(s) => s,
        }
    }

    /// Returns true while the complaint still needs action.
    pub fn is_open(&self) -> bool {
        matches!(
            self,
            ComplaintStatus::Submitted
                | ComplaintStatus::Pending
                | ComplaintStatus::InProgress
                | ComplaintStatus::Escalated
        )
    }
}

impl From<String> for ComplaintStatus {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_uppercase().replace([' ', '-'], "_").as_str() {
            "SUBMITTED" => ComplaintStatus::Submitted,
            "PENDING" => ComplaintStatus::Pending,
            "IN_PROGRESS" => ComplaintStatus::InProgress,
            "ESCALATED" => ComplaintStatus::Escalated,
            "RESOLVED" => ComplaintStatus::Resolved,
            "CLOSED" => ComplaintStatus::Closed,
            "REJECTED" => ComplaintStatus::Rejected,
            _ => ComplaintStatus::Other(value),
        }
    }
}

impl From<ComplaintStatus> for String {
    fn from(value: ComplaintStatus) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for ComplaintStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Complaint
// ════════════════════════════════════════════════════════════════════════════════

/// A citizen complaint.
///
/// Only the fields the synchronizer orders, filters, or projects on are
/// typed; everything else rides along in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Complaint {
    #[serde(alias = "id")]
    pub complaint_id: EntityId,

    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    #[serde(default, alias = "latitude", skip_serializing_if = "Option::is_none")]
    pub location_lat: Option<f64>,

    #[serde(default, alias = "longitude", skip_serializing_if = "Option::is_none")]
    pub location_lng: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub status: ComplaintStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<Timestamp>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<Timestamp>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub reopened: bool,

    #[serde(default, alias = "duplicate", deserialize_with = "null_as_default")]
    pub is_duplicate: bool,

    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

impl Complaint {
    /// Creates a complaint with only an id and title set.
    pub fn new(id: impl Into<EntityId>, title: impl Into<String>) -> Self {
        Self {
            complaint_id: id.into(),
            title: title.into(),
            description: None,
            category: None,
            location_lat: None,
            location_lng: None,
            address: None,
            status: ComplaintStatus::default(),
            created_at: None,
            updated_at: None,
            rating: None,
            feedback: None,
            reopened: false,
            is_duplicate: false,
            extra: Map::new(),
        }
    }

    /// Returns both coordinates when present and finite.
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.location_lat, self.location_lng) {
            (Some(lat), Some(lng)) if lat.is_finite() && lng.is_finite() => Some((lat, lng)),
            _ => None,
        }
    }

    /// Most recent change time, falling back to creation time.
    pub fn last_touched(&self) -> Option<Timestamp> {
        self.updated_at.or(self.created_at)
    }
}

impl TrackedEntity for Complaint {
    const KIND: EntityKind = EntityKind::Complaint;

    fn entity_id(&self) -> &EntityId {
        &self.complaint_id
    }
}

/// Fields accepted by create and update requests.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplaintDraft {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_lat: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_lng: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ComplaintStatus>,
}

// ════════════════════════════════════════════════════════════════════════════════
// Change envelope
// ════════════════════════════════════════════════════════════════════════════════

/// Action named in a complaint change envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeAction {
    Created,
    Updated,
    Deleted,
}

impl ChangeAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeAction::Created => "CREATED",
            ChangeAction::Updated => "UPDATED",
            ChangeAction::Deleted => "DELETED",
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "CREATED" | "CREATE" | "NEW" => Some(ChangeAction::Created),
            "UPDATED" | "UPDATE" | "STATUS_CHANGED" | "MODIFIED" => Some(ChangeAction::Updated),
            "DELETED" | "DELETE" | "REMOVED" | "REMOVE" => Some(ChangeAction::Deleted),
            _ => None,
        }
    }
}

/// What a complaint-topic message asks the store to do.
#[derive(Debug, Clone, PartialEq)]
pub enum ComplaintChange {
    Upserted {
        action: ChangeAction,
        complaint: Box<Complaint>,
    },
    Removed {
        id: EntityId,
    },
}

impl ComplaintChange {
    /// Canonical envelope form, accepted again by `from_payload`.
    pub fn to_payload(&self) -> Result<JsonValue, DomainError> {
        Ok(match self {
            ComplaintChange::Upserted { action, complaint } => serde_json::json!({
                "action": action.as_str(),
                "complaint": serde_json::to_value(complaint)?,
            }),
            ComplaintChange::Removed { id } => serde_json::json!({
                "action": ChangeAction::Deleted.as_str(),
                "complaintId": id,
            }),
        })
    }

    pub fn entity_id(&self) -> &EntityId {
        match self {
            ComplaintChange::Upserted { complaint, .. } => &complaint.complaint_id,
            ComplaintChange::Removed { id } => id,
        }
    }

    /// Interprets a complaint-topic payload.
    ///
    /// Accepts a bare complaint object, or an envelope
    /// `{"action": "...", "complaint": {...}}` where a deletion may carry only
    /// `complaintId`.
    pub fn from_payload(payload: &JsonValue) -> Result<Self, DomainError> {
        let object = payload.as_object().ok_or_else(|| {
            DomainError::new(ErrorCode::MalformedPayload, "complaint payload is not an object")
        })?;

        let Some(raw_action) = object.get("action") else {
            let complaint = Complaint::deserialize(payload)?;
            return Ok(ComplaintChange::Upserted {
                action: ChangeAction::Updated,
                complaint: Box::new(complaint),
            });
        };

        let action = raw_action
            .as_str()
            .and_then(ChangeAction::parse)
            .ok_or_else(|| {
                DomainError::new(ErrorCode::MalformedPayload, "unknown complaint change action")
                    .with_detail("action", raw_action.to_string())
            })?;
        let body = object
            .get("complaint")
            .or_else(|| object.get("payload"))
            .or_else(|| object.get("data"))
            .filter(|v| !v.is_null());

        match action {
            ChangeAction::Deleted => {
                let id = body
                    .and_then(|b| b.get("complaintId").or_else(|| b.get("id")))
                    .or_else(|| object.get("complaintId"))
                    .or_else(|| object.get("id"))
                    .ok_or_else(|| {
                        DomainError::new(
                            ErrorCode::MalformedPayload,
                            "complaint deletion carries no id",
                        )
                    })?;
                Ok(ComplaintChange::Removed {
                    id: EntityId::deserialize(id)?,
                })
            }
            _ => {
                let body = body.ok_or_else(|| {
                    DomainError::new(ErrorCode::MalformedPayload, "complaint change carries no complaint")
                })?;
                Ok(ComplaintChange::Upserted {
                    action,
                    complaint: Box::new(Complaint::deserialize(body)?),
                })
            }
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Filter and sort
// ════════════════════════════════════════════════════════════════════════════════

/// Criteria a complaint list or map view is restricted to.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComplaintFilter {
    pub category: Option<String>,
    pub status: Option<ComplaintStatus>,
    pub search: Option<String>,
    pub bounds: Option<MapBounds>,
}

impl ComplaintFilter {
    pub fn is_empty(&self) -> bool {
        self.category.is_none() && self.status.is_none() && self.search.is_none() && self.bounds.is_none()
    }

    /// Returns true if the complaint satisfies every set criterion.
    pub fn matches(&self, complaint: &Complaint) -> bool {
        if let Some(category) = &self.category {
            let same = complaint
                .category
                .as_deref()
                .is_some_and(|c| c.eq_ignore_ascii_case(category));
            if !same {
                return false;
            }
        }
        if let Some(status) = &self.status {
            if &complaint.status != status {
                return false;
            }
        }
        if let Some(search) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let needle = search.to_lowercase();
            let hit = [
                Some(complaint.title.as_str()),
                complaint.description.as_deref(),
                complaint.address.as_deref(),
            ]
            .into_iter()
            .flatten()
            .any(|field| field.to_lowercase().contains(&needle));
            if !hit {
                return false;
            }
        }
        if let Some(bounds) = &self.bounds {
            match complaint.coordinates() {
                Some((lat, lng)) if bounds.contains(lat, lng) => {}
                _ => return false,
            }
        }
        true
    }

    /// Admission predicate for a snapshot window, `None` when unfiltered.
    pub fn admission(&self) -> Option<Admission<Complaint>> {
        if self.is_empty() {
            return None;
        }
        let filter = self.clone();
        Some(Arc::new(move |c: &Complaint| filter.matches(c)))
    }
}

/// Orderings offered by complaint lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ComplaintSort {
    #[default]
    Newest,
    Oldest,
    RecentlyUpdated,
    Title,
}

impl ComplaintSort {
    /// Value of the REST `sort` query parameter.
    pub fn query_param(&self) -> &'static str {
        match self {
            ComplaintSort::Newest => "createdAt,desc",
            ComplaintSort::Oldest => "createdAt,asc",
            ComplaintSort::RecentlyUpdated => "updatedAt,desc",
            ComplaintSort::Title => "title,asc",
        }
    }

    /// Window ordering matching the server's ordering.
    pub fn to_spec(&self) -> SortSpec<Complaint> {
        match self {
            ComplaintSort::Newest => {
                SortSpec::descending("createdAt", |c: &Complaint| c.created_at.into())
            }
            ComplaintSort::Oldest => {
                SortSpec::ascending("createdAt", |c: &Complaint| c.created_at.into())
            }
            ComplaintSort::RecentlyUpdated => {
                SortSpec::descending("updatedAt", |c: &Complaint| c.last_touched().into())
            }
            ComplaintSort::Title => SortSpec::ascending("title", |c: &Complaint| {
                SortValue::Text(c.title.to_lowercase())
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> JsonValue {
        json!({
            "complaintId": 17,
            "title": "Pothole on Main St",
            "description": "Deep pothole near the bakery",
            "category": "ROADS",
            "locationLat": 12.97,
            "locationLng": 77.59,
            "address": "Main St 4",
            "status": "IN_PROGRESS",
            "createdAt": "2024-03-01T10:15:00",
            "updatedAt": [2024, 3, 2, 8, 0, 0, 0],
            "rating": null,
            "reopened": null,
            "isDuplicate": false,
            "imageUrl": "/uploads/17.jpg"
        })
    }

    // ============================================================
    // Decoding
    // ============================================================

    #[test]
    fn decodes_backend_shape() {
        let c: Complaint = serde_json::from_value(sample()).unwrap();
        assert_eq!(c.complaint_id, EntityId::from(17));
        assert_eq!(c.status, ComplaintStatus::InProgress);
        assert_eq!(c.coordinates(), Some((12.97, 77.59)));
        assert!(c.updated_at.is_some());
        assert!(!c.reopened);
        assert_eq!(c.extra.get("imageUrl"), Some(&json!("/uploads/17.jpg")));
    }

    #[test]
    fn accepts_alternate_field_names() {
        let c: Complaint = serde_json::from_value(json!({
            "id": "c-9",
            "title": "Broken lamp",
            "latitude": 1.5,
            "longitude": 2.5
        }))
        .unwrap();
        assert_eq!(c.complaint_id, EntityId::from("c-9"));
        assert_eq!(c.coordinates(), Some((1.5, 2.5)));
        assert_eq!(c.status, ComplaintStatus::Submitted);
    }

    #[test]
    fn unknown_status_is_preserved() {
        let c: Complaint =
            serde_json::from_value(json!({"complaintId": 1, "status": "ON_HOLD"})).unwrap();
        assert_eq!(c.status, ComplaintStatus::Other("ON_HOLD".into()));
        assert_eq!(serde_json::to_value(&c).unwrap()["status"], json!("ON_HOLD"));
    }

    #[test]
    fn missing_id_is_rejected() {
        assert!(serde_json::from_value::<Complaint>(json!({"title": "x"})).is_err());
    }

    // ============================================================
    // Change envelope
    // ============================================================

    #[test]
    fn bare_complaint_is_an_upsert() {
        let change = ComplaintChange::from_payload(&sample()).unwrap();
        assert!(matches!(change, ComplaintChange::Upserted { action: ChangeAction::Updated, .. }));
    }

    #[test]
    fn created_envelope_is_an_upsert() {
        let change =
            ComplaintChange::from_payload(&json!({"action": "CREATED", "complaint": sample()}))
                .unwrap();
        match change {
            ComplaintChange::Upserted { action, complaint } => {
                assert_eq!(action, ChangeAction::Created);
                assert_eq!(complaint.complaint_id, EntityId::from(17));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn deleted_envelope_with_bare_id_is_a_removal() {
        let change =
            ComplaintChange::from_payload(&json!({"action": "DELETED", "complaintId": 4})).unwrap();
        assert_eq!(change, ComplaintChange::Removed { id: EntityId::from(4) });
    }

    #[test]
    fn deleted_envelope_with_body_is_a_removal() {
        let change =
            ComplaintChange::from_payload(&json!({"action": "deleted", "complaint": sample()}))
                .unwrap();
        assert_eq!(change, ComplaintChange::Removed { id: EntityId::from(17) });
    }

    #[test]
    fn unknown_action_is_malformed() {
        let err = ComplaintChange::from_payload(&json!({"action": "ARCHIVED", "complaint": sample()}))
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::MalformedPayload);
    }

    #[test]
    fn non_object_payload_is_malformed() {
        assert!(ComplaintChange::from_payload(&json!([1, 2])).is_err());
    }

    // ============================================================
    // Filter and sort
    // ============================================================

    #[test]
    fn filter_matches_all_criteria() {
        let c: Complaint = serde_json::from_value(sample()).unwrap();
        let filter = ComplaintFilter {
            category: Some("roads".into()),
            status: Some(ComplaintStatus::InProgress),
            search: Some("bakery".into()),
            bounds: Some(MapBounds::new(12.0, 13.0, 77.0, 78.0).unwrap()),
        };
        assert!(filter.matches(&c));

        let outside = ComplaintFilter {
            bounds: Some(MapBounds::new(0.0, 1.0, 0.0, 1.0).unwrap()),
            ..Default::default()
        };
        assert!(!outside.matches(&c));
    }

    #[test]
    fn bounds_filter_excludes_complaints_without_coordinates() {
        let filter = ComplaintFilter {
            bounds: Some(MapBounds::new(-90.0, 90.0, -180.0, 180.0).unwrap()),
            ..Default::default()
        };
        assert!(!filter.matches(&Complaint::new(1, "no location")));
    }

    #[test]
    fn empty_filter_has_no_admission() {
        assert!(ComplaintFilter::default().admission().is_none());
    }

    #[test]
    fn title_sort_is_case_insensitive() {
        let spec = ComplaintSort::Title.to_spec();
        let a = Complaint::new(1, "apple");
        let b = Complaint::new(2, "Banana");
        assert_eq!(spec.compare(&a, &b), std::cmp::Ordering::Less);
        assert_eq!(ComplaintSort::Title.query_param(), "title,asc");
    }

    #[test]
    fn canonical_payload_is_read_back() {
        let change = ComplaintChange::Upserted {
            action: ChangeAction::Created,
            complaint: Box::new(Complaint::new(8, "Streetlight out")),
        };
        let payload = change.to_payload().unwrap();
        assert_eq!(payload["action"], "CREATED");
        assert_eq!(ComplaintChange::from_payload(&payload).unwrap(), change);

        let removal = ComplaintChange::Removed { id: EntityId::from(8) };
        let payload = removal.to_payload().unwrap();
        assert_eq!(ComplaintChange::from_payload(&payload).unwrap(), removal);
        assert_eq!(removal.entity_id(), &EntityId::from(8));
    }
}
