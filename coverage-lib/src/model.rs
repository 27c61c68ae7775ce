use itertools::Itertools;
use serde::{Deserialize, Serialize};

#[cfg(feature = "utoipa")]
use utoipa::ToSchema;

/// Contiguous inclusive interval of blocks together with the blocks in it that are not indexed yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(ToSchema))]
pub struct BlockRange {
    pub start: u64,
    pub end: u64,
    /// Strictly increasing, every element within `[start, end]`
    pub missing: Vec<u64>,
}

impl BlockRange {
    /// Number of blocks in the range.
    pub fn block_count(&self) -> u64 {
        (self.end - self.start).saturating_add(1)
    }

    pub fn contains(&self, block: u64) -> bool {
        (self.start..=self.end).contains(&block)
    }

    pub fn indexed_count(&self) -> u64 {
        self.block_count() - self.missing.len() as u64
    }

    pub fn percent_complete(&self) -> f64 {
        percent(self.indexed_count(), self.block_count())
    }

    /// Missing blocks folded into inclusive `(from, to)` runs.
    pub fn missing_runs(&self) -> Vec<(u64, u64)> {
        runs(self.missing.iter().copied())
    }
}

/// Point-in-time indexing coverage of `[0, latest]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(ToSchema))]
pub struct ReconciliationResult {
    pub latest: u64,
    pub ranges: Vec<BlockRange>,
    pub bucket_width: u64,
    pub total_missing: u64,
}

impl ReconciliationResult {
    /// Number of blocks in `[0, latest]`, saturated for `latest == u64::MAX`.
    pub fn expected_count(&self) -> u64 {
        self.latest.saturating_add(1)
    }

    pub fn indexed_count(&self) -> u64 {
        self.expected_count() - self.total_missing
    }

    pub fn percent_complete(&self) -> f64 {
        percent(self.indexed_count(), self.expected_count())
    }

    pub fn is_complete(&self) -> bool {
        self.total_missing == 0
    }

    /// Missing blocks across all buckets folded into inclusive `(from, to)` runs.
    /// Runs are not split at bucket boundaries.
    pub fn missing_ranges(&self) -> Vec<(u64, u64)> {
        runs(
            self.ranges
                .iter()
                .flat_map(|range| range.missing.iter().copied()),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(ToSchema))]
pub struct WorkerTaskSpec {
    pub from: u64,
    pub to: u64,
    pub force_mode: bool,
    pub log_level: String,
}

fn percent(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        return 100.0;
    }
    part as f64 * 100.0 / whole as f64
}

fn runs(blocks: impl Iterator<Item = u64>) -> Vec<(u64, u64)> {
    blocks
        .map(|block| (block, block))
        .coalesce(|(from, to), (next_from, next_to)| {
            if to.checked_add(1) == Some(next_from) {
                Ok((from, next_to))
            } else {
                Err(((from, to), (next_from, next_to)))
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_counts() {
        let range = BlockRange {
            start: 10,
            end: 19,
            missing: vec![11, 12, 15],
        };
        assert_eq!(range.block_count(), 10);
        assert_eq!(range.indexed_count(), 7);
        assert!((range.percent_complete() - 70.0).abs() < f64::EPSILON);
        assert!(range.contains(10) && range.contains(19) && !range.contains(20));
        assert_eq!(range.missing_runs(), vec![(11, 12), (15, 15)]);
    }

    #[test]
    fn missing_runs_cross_buckets() {
        let result = ReconciliationResult {
            latest: 9,
            ranges: vec![
                BlockRange {
                    start: 0,
                    end: 4,
                    missing: vec![3, 4],
                },
                BlockRange {
                    start: 5,
                    end: 9,
                    missing: vec![5, 9],
                },
            ],
            bucket_width: 5,
            total_missing: 4,
        };
        assert_eq!(result.missing_ranges(), vec![(3, 5), (9, 9)]);
        assert_eq!(result.indexed_count(), 6);
        assert!((result.percent_complete() - 60.0).abs() < f64::EPSILON);
        assert!(!result.is_complete());
    }
}
