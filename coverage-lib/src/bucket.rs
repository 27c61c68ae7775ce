use crate::error::{CoverageError, Result};

/// Inclusive `(start, end)` pair of block numbers.
pub type Span = (u64, u64);

/// Balanced partition of `[0, total]`.
///
/// With `items = total + 1` blocks over `n` buckets, the first `items % n` buckets hold
/// `items / n + 1` blocks and the rest hold `items / n`. Every requested bucket is produced
/// unless `n > items`, in which case only the `items` single-block buckets remain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Buckets {
    total: u64,
    // u128 so that `total == u64::MAX` with a single bucket stays representable
    base: u128,
    wide: u128,
    len: usize,
}

impl Buckets {
    pub fn new(total: u64, bucket_count: u32) -> Result<Self> {
        if bucket_count == 0 {
            return Err(CoverageError::invalid("bucket count must be at least 1"));
        }
        let items = u128::from(total) + 1;
        let count = u128::from(bucket_count);
        let base = items / count;
        let wide = items % count;
        let len = if base == 0 { wide } else { count } as usize;
        Ok(Self {
            total,
            base,
            wide,
            len,
        })
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Width of the widest bucket, saturated to `u64::MAX`.
    pub fn width(&self) -> u64 {
        let width = if self.wide > 0 { self.base + 1 } else { self.base };
        u64::try_from(width).unwrap_or(u64::MAX)
    }

    /// Bounds of the bucket at `index`. `index` must be below [`Buckets::len`].
    pub fn span(&self, index: usize) -> Span {
        debug_assert!(index < self.len);
        let index = index as u128;
        let start = index * self.base + index.min(self.wide);
        let width = if index < self.wide { self.base + 1 } else { self.base };
        (start as u64, (start + width - 1) as u64)
    }

    /// Index of the bucket holding `block`, `None` past `total`.
    pub fn index_of(&self, block: u64) -> Option<usize> {
        if block > self.total {
            return None;
        }
        let block = u128::from(block);
        // blocks below `wide_end` live in the wider leading buckets
        let wide_end = self.wide * (self.base + 1);
        let index = if block < wide_end {
            block / (self.base + 1)
        } else {
            self.wide + (block - wide_end) / self.base
        };
        Some(index as usize)
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = Span> + '_ {
        (0..self.len).map(|index| self.span(index))
    }
}

/// Splits `[0, total]` into `min(bucket_count, total + 1)` contiguous buckets whose sizes
/// differ by at most one block.
pub fn bucketize(total: u64, bucket_count: u32) -> Result<Vec<Span>> {
    Ok(Buckets::new(total, bucket_count)?.iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn thousand_blocks_in_ten_buckets() {
        let ranges = bucketize(999, 10).unwrap();
        assert_eq!(ranges.len(), 10);
        assert!(ranges.iter().all(|(start, end)| end - start + 1 == 100));
        assert_eq!(ranges.last(), Some(&(900, 999)));
    }

    #[test]
    fn last_bucket_ends_at_total() {
        let ranges = bucketize(1000, 10).unwrap();
        assert_eq!(ranges.len(), 10);
        assert_eq!(ranges.first(), Some(&(0, 100)));
        assert_eq!(ranges[1], (101, 200));
        assert_eq!(ranges.last(), Some(&(901, 1000)));
    }

    #[test]
    fn zero_total_is_single_point() {
        assert_eq!(bucketize(0, 1).unwrap(), vec![(0, 0)]);
        assert_eq!(bucketize(0, 120).unwrap(), vec![(0, 0)]);
    }

    #[test]
    fn more_buckets_than_blocks() {
        assert_eq!(bucketize(2, 5).unwrap(), vec![(0, 0), (1, 1), (2, 2)]);
    }

    #[test]
    fn zero_buckets_rejected() {
        assert!(matches!(
            bucketize(10, 0),
            Err(CoverageError::InvalidParameters(_))
        ));
    }

    #[test]
    fn full_u64_range() {
        let buckets = Buckets::new(u64::MAX, 1).unwrap();
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets.span(0), (0, u64::MAX));
        assert_eq!(buckets.width(), u64::MAX);
        assert_eq!(buckets.index_of(u64::MAX), Some(0));

        let halves = bucketize(u64::MAX, 2).unwrap();
        assert_eq!(halves, vec![(0, u64::MAX / 2), (u64::MAX / 2 + 1, u64::MAX)]);
    }

    #[test]
    fn short_chains_keep_every_bucket() {
        assert_eq!(bucketize(200, 120).unwrap().len(), 120);
        assert_eq!(bucketize(1000, 120).unwrap().len(), 120);
        assert_eq!(bucketize(130, 120).unwrap().len(), 120);
        assert_eq!(Buckets::new(200, 120).unwrap().width(), 2);
        assert_eq!(Buckets::new(239, 120).unwrap().width(), 2);
    }

    #[test]
    fn index_of_matches_spans() {
        let buckets = Buckets::new(57, 7).unwrap();
        for (index, (start, end)) in buckets.iter().enumerate() {
            assert_eq!(buckets.index_of(start), Some(index));
            assert_eq!(buckets.index_of(end), Some(index));
        }
        assert_eq!(buckets.index_of(58), None);
    }

    proptest! {
        #[test]
        fn covers_range_exactly(total in 0u64..1_000_000, bucket_count in 1u32..500) {
            let ranges = bucketize(total, bucket_count).unwrap();
            prop_assert!(!ranges.is_empty());
            prop_assert_eq!(ranges.len() as u64, (total + 1).min(u64::from(bucket_count)));
            prop_assert_eq!(ranges[0].0, 0);
            prop_assert_eq!(ranges[ranges.len() - 1].1, total);
            for (start, end) in &ranges {
                prop_assert!(start <= end);
            }
            for pair in ranges.windows(2) {
                prop_assert_eq!(pair[0].1 + 1, pair[1].0);
            }
            let widths: Vec<u64> = ranges.iter().map(|(start, end)| end - start + 1).collect();
            let widest = *widths.iter().max().unwrap();
            prop_assert!(widths.iter().all(|width| widest - width <= 1));
            prop_assert_eq!(widest, Buckets::new(total, bucket_count).unwrap().width());
        }

        #[test]
        fn index_of_agrees_with_spans(total in 0u64..50_000, bucket_count in 1u32..300) {
            let buckets = Buckets::new(total, bucket_count).unwrap();
            for (index, (start, end)) in buckets.iter().enumerate() {
                prop_assert_eq!(buckets.index_of(start), Some(index));
                prop_assert_eq!(buckets.index_of(end), Some(index));
            }
            prop_assert_eq!(buckets.index_of(total + 1), None);
        }

        #[test]
        fn long_enough_chains_get_every_bucket(total in 119u64..u64::MAX / 2) {
            let ranges = bucketize(total, 120).unwrap();
            prop_assert_eq!(ranges.len(), 120);
        }
    }
}
