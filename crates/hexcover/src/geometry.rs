use std::fmt;

use geo::{Coord, LineString, Polygon};
use serde::Deserialize;

/// A WGS84 position in GeoJSON order (longitude first).
///
/// Deserializes from a JSON array of two or more numbers; anything past the
/// second element (altitude, measure) is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(try_from = "Vec<f64>")]
pub struct Position {
    pub lon: f64,
    pub lat: f64,
}

impl Position {
    #[inline] pub fn new(lon: f64, lat: f64) -> Self { Self { lon, lat } }

    #[inline] pub fn is_finite(&self) -> bool { self.lon.is_finite() && self.lat.is_finite() }
}

impl TryFrom<Vec<f64>> for Position {
    type Error = String;

    fn try_from(value: Vec<f64>) -> Result<Self, Self::Error> {
        match value.as_slice() {
            [lon, lat, ..] => Ok(Self { lon: *lon, lat: *lat }),
            _ => Err(format!("position needs at least 2 numbers, got {}", value.len())),
        }
    }
}

/// The closed set of geometry types a zone source may carry.
///
/// Ring and member nesting follows GeoJSON: a polygon is a list of rings,
/// the first ring being the exterior.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum Geometry {
    Point(Position),
    LineString(Vec<Position>),
    MultiLineString(Vec<Vec<Position>>),
    Polygon(Vec<Vec<Position>>),
    MultiPolygon(Vec<Vec<Vec<Position>>>),
}

/// Tag-only view of a `Geometry`, used in skip reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeometryKind {
    Point,
    LineString,
    MultiLineString,
    Polygon,
    MultiPolygon,
}

impl fmt::Display for GeometryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            GeometryKind::Point => "Point",
            GeometryKind::LineString => "LineString",
            GeometryKind::MultiLineString => "MultiLineString",
            GeometryKind::Polygon => "Polygon",
            GeometryKind::MultiPolygon => "MultiPolygon",
        })
    }
}

impl Geometry {
    pub fn kind(&self) -> GeometryKind {
        match self {
            Geometry::Point(_) => GeometryKind::Point,
            Geometry::LineString(_) => GeometryKind::LineString,
            Geometry::MultiLineString(_) => GeometryKind::MultiLineString,
            Geometry::Polygon(_) => GeometryKind::Polygon,
            Geometry::MultiPolygon(_) => GeometryKind::MultiPolygon,
        }
    }

    /// Total number of positions, counting closing vertices.
    pub fn vertex_count(&self) -> usize {
        match self {
            Geometry::Point(_) => 1,
            Geometry::LineString(line) => line.len(),
            Geometry::MultiLineString(lines) => lines.iter().map(Vec::len).sum(),
            Geometry::Polygon(rings) => rings.iter().map(Vec::len).sum(),
            Geometry::MultiPolygon(polygons) => polygons.iter().flatten().map(Vec::len).sum(),
        }
    }
}

/// Convert GeoJSON polygon rings into a `geo::Polygon` for tiling.
///
/// `geo` keeps x = longitude and y = latitude, which is the order h3o reads
/// when it builds its own (lat, lng) vertices. Returns `None` when the
/// exterior is missing, has fewer than three positions, or any position is
/// not finite. Degenerate holes are dropped on their own.
pub(crate) fn to_geo_polygon(rings: &[Vec<Position>]) -> Option<Polygon<f64>> {
    fn ring(positions: &[Position]) -> Option<LineString<f64>> {
        if positions.len() < 3 || !positions.iter().all(Position::is_finite) {
            return None;
        }
        Some(LineString(positions.iter().map(|p| Coord { x: p.lon, y: p.lat }).collect()))
    }

    let (exterior, holes) = rings.split_first()?;
    Some(Polygon::new(ring(exterior)?, holes.iter().filter_map(|h| ring(h)).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_ignores_altitude() {
        let p: Position = serde_json::from_str("[-157.8, 21.3, 12.5]").unwrap();
        assert_eq!(p, Position::new(-157.8, 21.3));
    }

    #[test]
    fn position_rejects_short_arrays() {
        assert!(serde_json::from_str::<Position>("[1.0]").is_err());
    }

    #[test]
    fn geometry_parses_tagged_union() {
        let g: Geometry = serde_json::from_str(
            r#"{"type": "MultiLineString", "coordinates": [[[0, 0], [1, 1]], [[2, 2], [3, 3], [4, 4]]]}"#,
        ).unwrap();
        assert_eq!(g.kind(), GeometryKind::MultiLineString);
        assert_eq!(g.vertex_count(), 5);
    }

    #[test]
    fn geometry_rejects_unknown_type() {
        let g = serde_json::from_str::<Geometry>(r#"{"type": "GeometryCollection", "coordinates": []}"#);
        assert!(g.is_err());
    }

    #[test]
    fn geo_polygon_keeps_lon_as_x() {
        let rings = vec![vec![
            Position::new(-158.0, 21.0),
            Position::new(-157.0, 21.0),
            Position::new(-157.0, 22.0),
        ]];
        let polygon = to_geo_polygon(&rings).unwrap();
        let first = polygon.exterior().0[0];
        assert_eq!((first.x, first.y), (-158.0, 21.0));
        // geo closes the ring on construction
        assert_eq!(polygon.exterior().0.len(), 4);
    }

    #[test]
    fn geo_polygon_rejects_short_or_non_finite_exterior() {
        assert!(to_geo_polygon(&[]).is_none());
        assert!(to_geo_polygon(&[vec![Position::new(0.0, 0.0), Position::new(1.0, 1.0)]]).is_none());
        assert!(to_geo_polygon(&[vec![
            Position::new(0.0, 0.0),
            Position::new(f64::NAN, 1.0),
            Position::new(1.0, 0.0),
        ]]).is_none());
    }
}
