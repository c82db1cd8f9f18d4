use h3o::{CellIndex, Resolution};

/// The ancestor of `cell` at `resolution`.
///
/// Returns the cell itself at its own resolution and `None` when
/// `resolution` is finer than the cell.
#[inline]
pub fn ancestor(cell: CellIndex, resolution: Resolution) -> Option<CellIndex> {
    cell.parent(resolution)
}

/// Parse a 15-digit hex cell string, `None` when it is not a valid cell.
pub fn parse_cell(value: &str) -> Option<CellIndex> {
    value.trim().parse().ok()
}

/// Parse a resolution number, `None` when it is outside 0..=15.
pub fn parse_resolution(value: u8) -> Option<Resolution> {
    Resolution::try_from(value).ok()
}
