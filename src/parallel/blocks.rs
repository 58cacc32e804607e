use std::ops::Range;

/// A contiguous range of work items `[start, end)` assigned to one block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockRange {
    pub block: usize,
    pub start: usize,
    pub end: usize,
}

impl BlockRange {
    #[inline]
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    #[inline]
    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }
}

/// Partition `[0, n)` into `min(n, workers)` contiguous blocks.
///
/// Block sizes differ by at most one item: the `n % blocks` trailing blocks
/// take one extra, so the last block always ends at `n`. The partition
/// depends only on `n` and `workers`. `n == 0` yields no blocks;
/// `workers == 0` is treated as one worker.
pub fn block_ranges(n: usize, workers: usize) -> Vec<BlockRange> {
    let blocks = n.min(workers.max(1));
    if blocks == 0 {
        return Vec::new();
    }

    let size = n / blocks;
    let first_long = blocks - n % blocks;
    (0..blocks)
        .map(|block| {
            let start = block * size + block.saturating_sub(first_long);
            let end = start + size + usize::from(block >= first_long);
            BlockRange { block, start, end }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_partition(n: usize, workers: usize) {
        let ranges = block_ranges(n, workers);
        assert_eq!(ranges.len(), n.min(workers));

        let total: usize = ranges.iter().map(BlockRange::len).sum();
        assert_eq!(total, n);

        let mut expected_start = 0;
        for (i, r) in ranges.iter().enumerate() {
            assert_eq!(r.block, i);
            assert_eq!(r.start, expected_start);
            assert!(!r.is_empty());
            expected_start = r.end;
        }
        assert_eq!(expected_start, n);
    }

    #[test]
    fn test_partition_covers_range() {
        for &n in &[0usize, 1, 7, 1000] {
            for &workers in &[1usize, 4] {
                assert_partition(n, workers);
            }
        }
    }

    #[test]
    fn test_remainder_spread_over_trailing_blocks() {
        let lens = |n, workers| -> Vec<usize> {
            block_ranges(n, workers).iter().map(BlockRange::len).collect()
        };
        assert_eq!(lens(7, 4), vec![1, 2, 2, 2]);
        assert_eq!(lens(1000, 3), vec![333, 333, 334]);
        assert_eq!(lens(8, 4), vec![2, 2, 2, 2]);

        for &(n, workers) in &[(7usize, 4usize), (127, 64), (1000, 64), (1001, 7)] {
            assert_partition(n, workers);
            let sizes = lens(n, workers);
            let max = sizes.iter().max().unwrap();
            let min = sizes.iter().min().unwrap();
            assert!(max - min <= 1, "n={} workers={} sizes {:?}", n, workers, sizes);
            assert_eq!(block_ranges(n, workers).last().unwrap().end, n);
        }
    }

    #[test]
    fn test_zero_workers() {
        let ranges = block_ranges(5, 0);
        assert_eq!(ranges, vec![BlockRange { block: 0, start: 0, end: 5 }]);
    }

    #[test]
    fn test_deterministic() {
        assert_eq!(block_ranges(123, 8), block_ranges(123, 8));
    }
}
