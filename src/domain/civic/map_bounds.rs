//! Geographic viewport used for map data queries and map window admission.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::ValidationError;

/// Rectangular viewport in WGS84 degrees.
///
/// When `min_lng > max_lng` the box crosses the antimeridian.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapBounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl MapBounds {
    /// Creates validated bounds.
    pub fn new(min_lat: f64, max_lat: f64, min_lng: f64, max_lng: f64) -> Result<Self, ValidationError> {
        for (field, value, limit) in [
            ("min_lat", min_lat, 90.0),
            ("max_lat", max_lat, 90.0),
            ("min_lng", min_lng, 180.0),
            ("max_lng", max_lng, 180.0),
        ] {
            if !value.is_finite() || value.abs() > limit {
                return Err(ValidationError::out_of_range(
                    field,
                    -(limit as i64),
                    limit as i64,
                    value as i64,
                ));
            }
        }
        if min_lat > max_lat {
            return Err(ValidationError::invalid_format(
                "min_lat",
                "southern edge lies north of the northern edge",
            ));
        }
        Ok(Self {
            min_lat,
            max_lat,
            min_lng,
            max_lng,
        })
    }

    /// Returns true if the point lies inside the bounds (edges inclusive).
    pub fn contains(&self, lat: f64, lng: f64) -> bool {
        if lat < self.min_lat || lat > self.max_lat {
            return false;
        }
        if self.min_lng <= self.max_lng {
            lng >= self.min_lng && lng <= self.max_lng
        } else {
            lng >= self.min_lng || lng <= self.max_lng
        }
    }

    /// Query parameters understood by the map data endpoint.
    pub fn query_pairs(&self) -> [(&'static str, String); 4] {
        [
            ("minLat", self.min_lat.to_string()),
            ("maxLat", self.max_lat.to_string()),
            ("minLng", self.min_lng.to_string()),
            ("maxLng", self.max_lng.to_string()),
        ]
    }
}
