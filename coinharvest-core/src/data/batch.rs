//! Batching of identifier lists for multi-id endpoints.

/// Split `items` into consecutive groups of at most `size` elements.
///
/// Produces `ceil(len / size)` batches; every batch but the last has exactly
/// `size` elements and concatenating them yields `items` in order. A size of
/// zero is treated as one.
pub fn batches<T>(items: &[T], size: usize) -> impl Iterator<Item = &[T]> {
    items.chunks(size.max(1))
}

/// Number of batches `batches(items, size)` will yield.
pub fn batch_count(len: usize, size: usize) -> usize {
    len.div_ceil(size.max(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn twenty_tokens_fit_in_one_batch_of_fifty() {
        let ids: Vec<u32> = (0..20).collect();
        let out: Vec<&[u32]> = batches(&ids, 50).collect();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].len(), 20);
    }

    #[test]
    fn remainder_goes_to_last_batch() {
        let ids: Vec<u32> = (0..120).collect();
        let sizes: Vec<usize> = batches(&ids, 50).map(|b| b.len()).collect();
        assert_eq!(sizes, vec![50, 50, 20]);
        assert_eq!(batch_count(120, 50), 3);
    }

    #[test]
    fn empty_input_yields_no_batches() {
        let ids: Vec<u32> = Vec::new();
        assert_eq!(batches(&ids, 50).count(), 0);
        assert_eq!(batch_count(0, 50), 0);
    }

    #[test]
    fn zero_size_is_clamped() {
        let ids = [1, 2, 3];
        assert_eq!(batches(&ids, 0).count(), 3);
        assert_eq!(batch_count(3, 0), 3);
    }
}
