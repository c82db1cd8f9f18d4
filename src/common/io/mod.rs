//! Boundary readers and writers: CSV through polars, GeoJSON through serde.

mod csv;
mod geojson;

pub(crate) use csv::*;
pub(crate) use geojson::*;
