use std::fmt;

use h3o::{
    geom::{ContainmentMode, TilerBuilder},
    CellIndex, LatLng, Resolution,
};
use serde::{Deserialize, Serialize};

use crate::cells::CellSet;
use crate::geometry::{to_geo_polygon, Geometry, GeometryKind, Position};

/// How a geometry is reduced to cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// One cell at the unweighted vertex average of a (multi)polygon.
    Centroid,
    /// One cell at the unweighted vertex average of a (multi)line.
    Midpoint,
    /// One cell at a point.
    Point,
    /// Every cell a polygon touches, or every cell a line's vertices fall in.
    Polyfill,
}

/// Which polygon rings feed the vertex average.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RingSelection {
    #[default]
    All,
    Exterior,
}

/// Which cells count as covered by a polygon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Containment {
    /// Any cell whose area intersects the polygon.
    #[default]
    Intersects,
    /// Cells whose center lies inside the polygon.
    Centroid,
}

impl From<Containment> for ContainmentMode {
    fn from(value: Containment) -> Self {
        match value {
            Containment::Intersects => ContainmentMode::Covers,
            Containment::Centroid => ContainmentMode::ContainsCentroid,
        }
    }
}

/// The reduction actually applied, recorded in provenance strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Centroid,
    Midpoint,
    Point,
    Polyfill,
    LineSample,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Method::Centroid => "Centroid",
            Method::Midpoint => "Midpoint",
            Method::Point => "Point",
            Method::Polyfill => "Polyfill",
            Method::LineSample => "Line sample",
        })
    }
}

/// Why a geometry produced no reduction at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Skip {
    /// The strategy does not apply to this geometry type.
    Unsupported { strategy: Strategy, kind: GeometryKind },
    /// The geometry has no positions.
    NoVertices,
    /// A position needed for the reduction is not a finite coordinate.
    InvalidCoordinate,
    /// Every sub-polygon failed conversion.
    Unconvertible,
}

impl fmt::Display for Skip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Skip::Unsupported { strategy, kind } => write!(f, "{strategy:?} does not apply to {kind}"),
            Skip::NoVertices => f.write_str("geometry has no vertices"),
            Skip::InvalidCoordinate => f.write_str("geometry has a non-finite coordinate"),
            Skip::Unconvertible => f.write_str("no sub-polygon could be converted"),
        }
    }
}

/// Cells produced for one geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct Reduction {
    /// Distinct cells, first-seen order. May be empty when a valid polygon
    /// is too small to cover any cell center.
    pub cells: Vec<CellIndex>,
    pub method: Method,
    /// Sub-polygons or vertices discarded during conversion.
    pub dropped: usize,
}

/// Reduces geometries to cells at a fixed resolution.
#[derive(Debug, Clone, Copy)]
pub struct Reducer {
    strategy: Strategy,
    resolution: Resolution,
    containment: Containment,
    rings: RingSelection,
}

impl Reducer {
    pub fn new(strategy: Strategy, resolution: Resolution) -> Self {
        Self { strategy, resolution, containment: Containment::default(), rings: RingSelection::default() }
    }

    pub fn with_containment(mut self, containment: Containment) -> Self {
        self.containment = containment;
        self
    }

    pub fn with_rings(mut self, rings: RingSelection) -> Self {
        self.rings = rings;
        self
    }

    #[inline] pub fn strategy(&self) -> Strategy { self.strategy }

    #[inline] pub fn resolution(&self) -> Resolution { self.resolution }

    /// Same settings at another resolution.
    #[inline] pub fn at(&self, resolution: Resolution) -> Self { Self { resolution, ..*self } }

    pub fn reduce(&self, geometry: &Geometry) -> Result<Reduction, Skip> {
        use Geometry as G;

        match (self.strategy, geometry) {
            (Strategy::Centroid, G::Polygon(rings)) => {
                self.single(self.ring_vertices(std::slice::from_ref(rings)), Method::Centroid)
            }
            (Strategy::Centroid, G::MultiPolygon(polygons)) => {
                self.single(self.ring_vertices(polygons), Method::Centroid)
            }
            (Strategy::Midpoint, G::LineString(line)) => self.single(line.iter(), Method::Midpoint),
            (Strategy::Midpoint, G::MultiLineString(lines)) => self.single(lines.iter().flatten(), Method::Midpoint),
            (Strategy::Point, G::Point(point)) => self.single(std::iter::once(point), Method::Point),
            (Strategy::Polyfill, G::Polygon(rings)) => self.polyfill(std::slice::from_ref(rings)),
            (Strategy::Polyfill, G::MultiPolygon(polygons)) => self.polyfill(polygons),
            (Strategy::Polyfill, G::LineString(line)) => self.sample(line.iter()),
            (Strategy::Polyfill, G::MultiLineString(lines)) => self.sample(lines.iter().flatten()),
            (Strategy::Polyfill, G::Point(point)) => self.sample(std::iter::once(point)),
            (
                strategy @ Strategy::Centroid,
                G::Point(_) | G::LineString(_) | G::MultiLineString(_),
            )
            | (
                strategy @ Strategy::Midpoint,
                G::Point(_) | G::Polygon(_) | G::MultiPolygon(_),
            )
            | (
                strategy @ Strategy::Point,
                G::LineString(_) | G::MultiLineString(_) | G::Polygon(_) | G::MultiPolygon(_),
            ) => Err(Skip::Unsupported { strategy, kind: geometry.kind() }),
        }
    }

    /// Pooled vertices of every selected ring of every polygon.
    fn ring_vertices<'a>(&self, polygons: &'a [Vec<Vec<Position>>]) -> impl Iterator<Item = &'a Position> {
        let take = match self.rings {
            RingSelection::All => usize::MAX,
            RingSelection::Exterior => 1,
        };
        polygons.iter().flat_map(move |rings| rings.iter().take(take)).flatten()
    }

    fn single<'a>(&self, positions: impl IntoIterator<Item = &'a Position>, method: Method) -> Result<Reduction, Skip> {
        let center = vertex_average(positions).ok_or(Skip::NoVertices)?;
        let cell = cell_at(center, self.resolution).ok_or(Skip::InvalidCoordinate)?;
        Ok(Reduction { cells: vec![cell], method, dropped: 0 })
    }

    fn sample<'a>(&self, positions: impl IntoIterator<Item = &'a Position>) -> Result<Reduction, Skip> {
        let mut cells = CellSet::new();
        let mut seen = 0;
        let mut dropped = 0;
        for position in positions {
            seen += 1;
            match cell_at(*position, self.resolution) {
                Some(cell) => { cells.insert(cell); }
                None => dropped += 1,
            }
        }
        match (seen, cells.is_empty()) {
            (0, _) => Err(Skip::NoVertices),
            (_, true) => Err(Skip::InvalidCoordinate),
            _ => Ok(Reduction { cells: cells.into_vec(), method: Method::LineSample, dropped }),
        }
    }

    fn polyfill(&self, polygons: &[Vec<Vec<Position>>]) -> Result<Reduction, Skip> {
        if polygons.iter().flatten().all(Vec::is_empty) {
            return Err(Skip::NoVertices);
        }

        let mut cells = CellSet::new();
        let mut dropped = 0;
        for rings in polygons {
            // Each member gets its own tiler so one bad ring only loses its own cells.
            let Some(polygon) = to_geo_polygon(rings) else {
                dropped += 1;
                continue;
            };
            let mut tiler = TilerBuilder::new(self.resolution)
                .containment_mode(self.containment.into())
                .build();
            if tiler.add(polygon).is_err() {
                dropped += 1;
                continue;
            }
            cells.extend(tiler.into_coverage());
        }

        if dropped == polygons.len() {
            return Err(Skip::Unconvertible);
        }
        Ok(Reduction { cells: cells.into_vec(), method: Method::Polyfill, dropped })
    }
}

/// Unweighted mean of the given positions, `None` when there are none.
///
/// Every position counts once, closing vertices included, so dense stretches
/// of a boundary pull the result toward them.
pub fn vertex_average<'a>(positions: impl IntoIterator<Item = &'a Position>) -> Option<Position> {
    let (sum_lon, sum_lat, n) = positions.into_iter()
        .fold((0.0, 0.0, 0usize), |(lon, lat, n), p| (lon + p.lon, lat + p.lat, n + 1));
    (n > 0).then(|| Position::new(sum_lon / n as f64, sum_lat / n as f64))
}

/// The cell containing `position`, `None` for non-finite coordinates.
pub fn cell_at(position: Position, resolution: Resolution) -> Option<CellIndex> {
    LatLng::new(position.lat, position.lon).ok().map(|ll| ll.to_cell(resolution))
}
