pub mod ancestor;
pub mod cells;
pub mod geometry;
pub mod reduce;

pub use ancestor::{ancestor, parse_cell, parse_resolution};
pub use cells::CellSet;
pub use geometry::{Geometry, GeometryKind, Position};
pub use reduce::{cell_at, vertex_average, Containment, Method, Reducer, Reduction, RingSelection, Skip, Strategy};

pub use h3o::{CellIndex, Resolution};
