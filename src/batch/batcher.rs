/// Rows per store round trip. Tuning only; loads are idempotent so the size
/// never changes the final graph.
pub const DEFAULT_BATCH_SIZE: usize = 500;

/// Fixed-size chunks in arrival order; the last chunk may be short.
pub fn batches<T>(items: &[T], size: usize) -> impl Iterator<Item = &[T]> {
    items.chunks(size.max(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunks_keep_order_and_remainder() {
        let items: Vec<u32> = (0..1203).collect();
        let chunks: Vec<&[u32]> = batches(&items, DEFAULT_BATCH_SIZE).collect();
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[2].len(), 203);
        assert_eq!(chunks.concat(), items);
    }

    #[test]
    fn zero_size_is_treated_as_one() {
        assert_eq!(batches(&[1, 2, 3], 0).count(), 3);
    }
}
