use ahash::AHashSet;
use h3o::CellIndex;

/// Insertion-ordered set of cells.
///
/// Output order is the order cells were first seen, so repeated runs over
/// the same input emit rows in the same order.
#[derive(Debug, Clone, Default)]
pub struct CellSet {
    seen: AHashSet<CellIndex>,
    order: Vec<CellIndex>,
}

impl CellSet {
    pub fn new() -> Self { Self::default() }

    /// Insert a cell, returning `false` if it was already present.
    pub fn insert(&mut self, cell: CellIndex) -> bool {
        let fresh = self.seen.insert(cell);
        if fresh { self.order.push(cell) }
        fresh
    }

    #[inline] pub fn contains(&self, cell: CellIndex) -> bool { self.seen.contains(&cell) }

    #[inline] pub fn len(&self) -> usize { self.order.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.order.is_empty() }

    #[inline] pub fn iter(&self) -> impl Iterator<Item = CellIndex> + '_ { self.order.iter().copied() }

    #[inline] pub fn into_vec(self) -> Vec<CellIndex> { self.order }
}

impl Extend<CellIndex> for CellSet {
    fn extend<I: IntoIterator<Item = CellIndex>>(&mut self, iter: I) {
        for cell in iter { self.insert(cell); }
    }
}

impl FromIterator<CellIndex> for CellSet {
    fn from_iter<I: IntoIterator<Item = CellIndex>>(iter: I) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use h3o::{LatLng, Resolution};

    fn cell(lat: f64, lng: f64) -> CellIndex {
        LatLng::new(lat, lng).unwrap().to_cell(Resolution::Nine)
    }

    #[test]
    fn insert_reports_duplicates() {
        let mut set = CellSet::new();
        assert!(set.insert(cell(21.3, -157.8)));
        assert!(!set.insert(cell(21.3, -157.8)));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn keeps_first_seen_order() {
        let (a, b, c) = (cell(21.3, -157.8), cell(20.8, -156.3), cell(22.0, -159.5));
        let set: CellSet = [b, a, b, c, a].into_iter().collect();
        assert_eq!(set.into_vec(), vec![b, a, c]);
    }
}
