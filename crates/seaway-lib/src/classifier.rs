//! Land and coastline classification.
//!
//! The graph builder only needs the [`GeometryOracle`] capability. [`LandMask`]
//! is the file-backed implementation: land polygons come from a GeoJSON
//! dataset, candidate polygons are found through an R-tree over their bounding
//! boxes, and coastline proximity is answered from a KD-tree of densified
//! coastline vertices.

use std::fs;
use std::path::Path;

use geo::{BoundingRect, Coord, Intersects, LineString, Point, Polygon};
use rstar::primitives::{GeomWithData, Rectangle};
use rstar::RTree;
use serde_json::Value;
use tracing::{debug, info};

use crate::coord::Coordinate;
use crate::error::{Error, Result};
use crate::node::Node;
use crate::spatial::SpatialIndex;

/// Default spacing between sampled coastline vertices in kilometres.
pub const DEFAULT_COAST_SAMPLE_KM: f64 = 5.0;

/// Answers "is this point on land / near the coast?".
pub trait GeometryOracle: Send + Sync {
    fn is_land(&self, point: &Coordinate) -> bool;

    /// Great-circle distance to the nearest coastline, if any coastline is known.
    fn coast_distance_km(&self, point: &Coordinate) -> Option<f64>;

    fn is_near_coast(&self, point: &Coordinate, threshold_km: f64) -> bool {
        threshold_km > 0.0
            && self
                .coast_distance_km(point)
                .is_some_and(|distance| distance <= threshold_km)
    }
}

/// Oracle for datasets that are already water-only: nothing is land and there
/// is no coastline.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenWater;

impl GeometryOracle for OpenWater {
    fn is_land(&self, _point: &Coordinate) -> bool {
        false
    }

    fn coast_distance_km(&self, _point: &Coordinate) -> Option<f64> {
        None
    }
}

/// Coarse terrain class of a node, used for search diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terrain {
    OpenWater,
    Coastal,
    Blocked,
}

impl Terrain {
    pub fn of_node(node: &Node, coastal_threshold_km: f64) -> Self {
        if !node.walkable {
            Terrain::Blocked
        } else if is_within_threshold(node.coast_distance_km, coastal_threshold_km) {
            Terrain::Coastal
        } else {
            Terrain::OpenWater
        }
    }
}

pub(crate) fn is_within_threshold(distance_km: Option<f64>, threshold_km: f64) -> bool {
    threshold_km > 0.0 && distance_km.is_some_and(|distance| distance < threshold_km)
}

type PolygonEnvelope = GeomWithData<Rectangle<[f64; 2]>, usize>;

/// Land polygons plus a coastline vertex index.
pub struct LandMask {
    polygons: Vec<Polygon<f64>>,
    envelopes: RTree<PolygonEnvelope>,
    coastline: Vec<Coordinate>,
    coast_index: SpatialIndex,
}

impl LandMask {
    /// Load a GeoJSON file of `Polygon`/`MultiPolygon` land features.
    pub fn from_path(path: &Path, coast_sample_km: f64) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        let mask = Self::from_geojson_str(&raw, coast_sample_km)?;
        info!(
            path = %path.display(),
            polygons = mask.polygons.len(),
            coast_vertices = mask.coastline.len(),
            "loaded land mask"
        );
        Ok(mask)
    }

    /// Parse GeoJSON text. `LineString`/`MultiLineString` features only add
    /// coastline; polygons add both land and coastline.
    pub fn from_geojson_str(raw: &str, coast_sample_km: f64) -> Result<Self> {
        let value: Value = serde_json::from_str(raw)?;
        let mut polygons = Vec::new();
        let mut lines = Vec::new();
        collect_geometry(&value, &mut polygons, &mut lines)?;
        Self::from_geometry(polygons, lines, coast_sample_km)
    }

    /// Build from already-parsed geometry.
    pub fn from_geometry(
        polygons: Vec<Polygon<f64>>,
        lines: Vec<LineString<f64>>,
        coast_sample_km: f64,
    ) -> Result<Self> {
        if !(coast_sample_km.is_finite() && coast_sample_km > 0.0) {
            return Err(Error::InvalidGeometry {
                message: format!("coast sample spacing must be positive, got {coast_sample_km}"),
            });
        }

        let mut envelopes = Vec::with_capacity(polygons.len());
        for (index, polygon) in polygons.iter().enumerate() {
            let rect = polygon
                .bounding_rect()
                .ok_or_else(|| Error::InvalidGeometry {
                    message: format!("polygon {index} has no extent"),
                })?;
            let (min, max) = (rect.min(), rect.max());
            envelopes.push(GeomWithData::new(
                Rectangle::from_corners([min.x, min.y], [max.x, max.y]),
                index,
            ));
        }

        let mut coastline = Vec::new();
        for polygon in &polygons {
            densify(polygon.exterior(), coast_sample_km, &mut coastline);
            for interior in polygon.interiors() {
                densify(interior, coast_sample_km, &mut coastline);
            }
        }
        for line in &lines {
            densify(line, coast_sample_km, &mut coastline);
        }

        debug!(
            polygons = polygons.len(),
            lines = lines.len(),
            coast_vertices = coastline.len(),
            "indexed land geometry"
        );

        Ok(Self {
            envelopes: RTree::bulk_load(envelopes),
            coast_index: SpatialIndex::build(&coastline),
            polygons,
            coastline,
        })
    }

    pub fn polygon_count(&self) -> usize {
        self.polygons.len()
    }

    pub fn coast_vertex_count(&self) -> usize {
        self.coastline.len()
    }
}

impl GeometryOracle for LandMask {
    fn is_land(&self, point: &Coordinate) -> bool {
        let probe = Point::new(point.lon, point.lat);
        self.envelopes
            .locate_all_at_point(&[point.lon, point.lat])
            .any(|envelope| self.polygons[envelope.data].intersects(&probe))
    }

    fn coast_distance_km(&self, point: &Coordinate) -> Option<f64> {
        self.coast_index
            .nearest_one(point)
            .map(|(_, distance)| distance)
    }
}

impl std::fmt::Debug for LandMask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LandMask")
            .field("polygons", &self.polygons.len())
            .field("coast_vertices", &self.coastline.len())
            .finish()
    }
}

/// Emit the vertices of `line`, inserting interpolated points so that
/// consecutive samples are at most `spacing_km` apart.
fn densify(line: &LineString<f64>, spacing_km: f64, out: &mut Vec<Coordinate>) {
    let coords: Vec<Coord<f64>> = line.coords().copied().collect();
    let Some(first) = coords.first() else {
        return;
    };
    out.push(Coordinate {
        lat: first.y,
        lon: first.x,
    });

    for pair in coords.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        let start = Coordinate { lat: a.y, lon: a.x };
        let end = Coordinate { lat: b.y, lon: b.x };
        let steps = (start.distance_km(&end) / spacing_km).ceil().max(1.0) as usize;
        for step in 1..=steps {
            let t = step as f64 / steps as f64;
            out.push(Coordinate {
                lat: a.y + (b.y - a.y) * t,
                lon: a.x + (b.x - a.x) * t,
            });
        }
    }
}

fn collect_geometry(
    value: &Value,
    polygons: &mut Vec<Polygon<f64>>,
    lines: &mut Vec<LineString<f64>>,
) -> Result<()> {
    let kind = value
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| invalid("object without a \"type\" member"))?;

    match kind {
        "FeatureCollection" => {
            let features = value
                .get("features")
                .and_then(Value::as_array)
                .ok_or_else(|| invalid("FeatureCollection without a features array"))?;
            for feature in features {
                collect_geometry(feature, polygons, lines)?;
            }
        }
        "Feature" => match value.get("geometry") {
            Some(Value::Null) | None => {}
            Some(geometry) => collect_geometry(geometry, polygons, lines)?,
        },
        "GeometryCollection" => {
            let geometries = value
                .get("geometries")
                .and_then(Value::as_array)
                .ok_or_else(|| invalid("GeometryCollection without geometries"))?;
            for geometry in geometries {
                collect_geometry(geometry, polygons, lines)?;
            }
        }
        "Polygon" => polygons.push(parse_polygon(coordinates(value)?)?),
        "MultiPolygon" => {
            for polygon in as_array(coordinates(value)?, "MultiPolygon")? {
                polygons.push(parse_polygon(polygon)?);
            }
        }
        "LineString" => lines.push(parse_line(coordinates(value)?, 2)?),
        "MultiLineString" => {
            for line in as_array(coordinates(value)?, "MultiLineString")? {
                lines.push(parse_line(line, 2)?);
            }
        }
        other => return Err(invalid(&format!("unsupported geometry type {other}"))),
    }
    Ok(())
}

fn coordinates(value: &Value) -> Result<&Value> {
    value
        .get("coordinates")
        .ok_or_else(|| invalid("geometry without coordinates"))
}

fn as_array<'a>(value: &'a Value, what: &str) -> Result<&'a Vec<Value>> {
    value
        .as_array()
        .ok_or_else(|| invalid(&format!("{what} coordinates must be an array")))
}

fn parse_polygon(value: &Value) -> Result<Polygon<f64>> {
    let rings = as_array(value, "Polygon")?;
    let Some((exterior, interiors)) = rings.split_first() else {
        return Err(invalid("polygon without rings"));
    };
    let exterior = parse_ring(exterior)?;
    let interiors = interiors
        .iter()
        .map(parse_ring)
        .collect::<Result<Vec<_>>>()?;
    Ok(Polygon::new(exterior, interiors))
}

fn parse_ring(value: &Value) -> Result<LineString<f64>> {
    let ring = parse_line(value, 4)?;
    if ring.0.first() != ring.0.last() {
        return Err(invalid("polygon ring is not closed"));
    }
    Ok(ring)
}

fn parse_line(value: &Value, min_positions: usize) -> Result<LineString<f64>> {
    let positions = as_array(value, "line")?;
    if positions.len() < min_positions {
        return Err(invalid(&format!(
            "expected at least {min_positions} positions, found {}",
            positions.len()
        )));
    }

    let coords = positions
        .iter()
        .map(|position| {
            let pair = position
                .as_array()
                .filter(|pair| pair.len() >= 2)
                .ok_or_else(|| invalid("position must be [lon, lat]"))?;
            let (Some(lon), Some(lat)) = (pair[0].as_f64(), pair[1].as_f64()) else {
                return Err(invalid("position components must be numbers"));
            };
            let position = Coordinate { lat, lon };
            if !position.is_valid() {
                return Err(invalid(&format!("position ({lon}, {lat}) is out of range")));
            }
            Ok(Coord { x: lon, y: lat })
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(LineString::new(coords))
}

fn invalid(message: &str) -> Error {
    Error::InvalidGeometry {
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ISLAND: &str = r#"{
        "type": "FeatureCollection",
        "features": [{
            "type": "Feature",
            "properties": {},
            "geometry": {
                "type": "Polygon",
                "coordinates": [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0], [0.0, 0.0]]]
            }
        }]
    }"#;

    fn at(lat: f64, lon: f64) -> Coordinate {
        Coordinate::new(lat, lon).unwrap()
    }

    #[test]
    fn island_interior_and_boundary_are_land() {
        let mask = LandMask::from_geojson_str(ISLAND, 1.0).unwrap();
        assert_eq!(mask.polygon_count(), 1);
        assert!(mask.is_land(&at(0.5, 0.5)));
        assert!(mask.is_land(&at(0.0, 0.5)));
        assert!(!mask.is_land(&at(2.0, 2.0)));
        assert!(!mask.is_land(&at(-0.5, 0.5)));
    }

    #[test]
    fn coast_distance_uses_densified_edges() {
        let mask = LandMask::from_geojson_str(ISLAND, 1.0).unwrap();
        // 0.1 degree south of the midpoint of the southern edge
        let distance = mask.coast_distance_km(&at(-0.1, 0.5)).unwrap();
        assert!((distance - 11.12).abs() < 0.2, "got {distance}");
        assert!(mask.is_near_coast(&at(-0.1, 0.5), 20.0));
        assert!(!mask.is_near_coast(&at(-0.1, 0.5), 5.0));
        assert!(!mask.is_near_coast(&at(-0.1, 0.5), 0.0));
    }

    #[test]
    fn holes_are_water() {
        let raw = r#"{"type": "Polygon", "coordinates": [
            [[0, 0], [4, 0], [4, 4], [0, 4], [0, 0]],
            [[1, 1], [3, 1], [3, 3], [1, 3], [1, 1]]
        ]}"#;
        let mask = LandMask::from_geojson_str(raw, 5.0).unwrap();
        assert!(mask.is_land(&at(0.5, 0.5)));
        assert!(!mask.is_land(&at(2.0, 2.0)));
    }

    #[test]
    fn invalid_geometry_is_rejected() {
        let open_ring = r#"{"type": "Polygon", "coordinates": [[[0, 0], [1, 0], [1, 1], [0, 1]]]}"#;
        assert!(matches!(
            LandMask::from_geojson_str(open_ring, 1.0),
            Err(Error::InvalidGeometry { .. })
        ));

        let out_of_range =
            r#"{"type": "Polygon", "coordinates": [[[0, 0], [200, 0], [1, 1], [0, 0]]]}"#;
        assert!(matches!(
            LandMask::from_geojson_str(out_of_range, 1.0),
            Err(Error::InvalidGeometry { message }) if message.contains("out of range")
        ));

        let point = r#"{"type": "Point", "coordinates": [0, 0]}"#;
        assert!(LandMask::from_geojson_str(point, 1.0).is_err());

        assert!(LandMask::from_geojson_str(ISLAND, 0.0).is_err());
    }

    #[test]
    fn open_water_has_no_land_or_coast() {
        let oracle = OpenWater;
        assert!(!oracle.is_land(&at(10.0, 10.0)));
        assert!(!oracle.is_near_coast(&at(10.0, 10.0), 100.0));
    }

    #[test]
    fn terrain_reflects_node_state() {
        let mut node = Node::new(0, 1.0, 1.0).unwrap();
        node.coast_distance_km = Some(3.0);
        assert_eq!(Terrain::of_node(&node, 5.0), Terrain::Coastal);
        assert_eq!(Terrain::of_node(&node, 0.0), Terrain::OpenWater);
        node.walkable = false;
        assert_eq!(Terrain::of_node(&node, 0.0), Terrain::Blocked);
    }
}
