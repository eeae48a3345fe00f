//! Geographic primitives: validated coordinates, haversine distances, grid keys,
//! and the unit-sphere projection used by the spatial index.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Mean Earth radius in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Rounding applied to node coordinates (three decimals, ~110 m at the equator).
pub const DEFAULT_RESOLUTION_DEG: f64 = 0.001;

/// Kilometres spanned by one degree of arc on a great circle.
pub const KM_PER_DEGREE: f64 = EARTH_RADIUS_KM * std::f64::consts::PI / 180.0;

/// Latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    /// Create a coordinate, rejecting anything outside the valid ranges.
    pub fn new(lat: f64, lon: f64) -> Result<Self> {
        let coordinate = Self { lat, lon };
        if coordinate.is_valid() {
            Ok(coordinate)
        } else {
            Err(Error::InvalidCoordinate { lat, lon })
        }
    }

    /// True when `-90 <= lat <= 90` and `-180 <= lon <= 180`.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }

    /// Great-circle distance to another coordinate in kilometres.
    pub fn distance_km(&self, other: &Self) -> f64 {
        haversine_km(self.lat, self.lon, other.lat, other.lon)
    }

    /// Snap both components to the given resolution.
    pub fn rounded(&self, resolution_deg: f64) -> Self {
        Self {
            lat: round_to(self.lat, resolution_deg),
            lon: round_to(self.lon, resolution_deg),
        }
    }

    /// Project onto the unit sphere (x, y, z) via radians.
    pub fn to_unit_vector(&self) -> [f64; 3] {
        let lat = self.lat.to_radians();
        let lon = self.lon.to_radians();
        [lat.cos() * lon.cos(), lat.cos() * lon.sin(), lat.sin()]
    }

    /// Key used for node identity at the given resolution.
    pub fn key(&self, resolution_deg: f64) -> CoordKey {
        CoordKey::new(self, resolution_deg)
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.4}, {:.4})", self.lat, self.lon)
    }
}

/// Haversine distance between two lat/lon pairs in degrees, in kilometres.
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (lat1, lon1, lat2, lon2) = (
        lat1.to_radians(),
        lon1.to_radians(),
        lat2.to_radians(),
        lon2.to_radians(),
    );
    let dlat = lat2 - lat1;
    let dlon = lon2 - lon1;
    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().min(1.0).asin();
    c * EARTH_RADIUS_KM
}

/// Convert a great-circle distance to the squared chord length on the unit
/// sphere, which is the metric the KD-tree works in.
pub fn km_to_squared_chord(km: f64) -> f64 {
    let angle = (km / EARTH_RADIUS_KM).min(std::f64::consts::PI);
    let chord = 2.0 * (angle / 2.0).sin();
    chord * chord
}

/// Inverse of [`km_to_squared_chord`].
pub fn squared_chord_to_km(squared_chord: f64) -> f64 {
    let chord = squared_chord.max(0.0).sqrt().min(2.0);
    2.0 * (chord / 2.0).asin() * EARTH_RADIUS_KM
}

fn round_to(value: f64, resolution_deg: f64) -> f64 {
    let scale = 1.0 / resolution_deg;
    (value * scale).round() / scale
}

/// Coordinate identity at a fixed grid resolution.
///
/// Two coordinates that round to the same lattice cell produce equal keys, so
/// re-creating a node for the same position always resolves to one entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CoordKey {
    lat: i64,
    lon: i64,
}

impl CoordKey {
    pub fn new(coordinate: &Coordinate, resolution_deg: f64) -> Self {
        let scale = 1.0 / resolution_deg;
        Self {
            lat: (coordinate.lat * scale).round() as i64,
            lon: (coordinate.lon * scale).round() as i64,
        }
    }
}
