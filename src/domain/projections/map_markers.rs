//! Map marker projection.

use crate::domain::civic::{Complaint, ComplaintStatus};
use crate::domain::foundation::EntityId;

#[derive(Debug, Clone, PartialEq)]
pub struct MapMarker {
    pub id: EntityId,
    pub lat: f64,
    pub lng: f64,
    pub status: ComplaintStatus,
    pub title: String,
}

/// One marker per complaint with usable coordinates; the rest are skipped.
pub fn project_markers(complaints: &[Complaint]) -> Vec<MapMarker> {
    complaints
        .iter()
        .filter_map(|c| {
            let (lat, lng) = c.coordinates()?;
            if lat.abs() > 90.0 || lng.abs() > 180.0 {
                return None;
            }
            Some(MapMarker {
                id: c.complaint_id.clone(),
                lat,
                lng,
                status: c.status.clone(),
                title: c.title.clone(),
            })
        })
        .collect()
}
