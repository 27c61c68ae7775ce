use crate::bucket::Buckets;
use crate::error::{CoverageError, Result};
use crate::model::WorkerTaskSpec;
use serde::{Deserialize, Serialize};

pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Task settings shared by every worker of one dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, bon::Builder)]
pub struct PlanOptions {
    #[builder(default)]
    #[serde(default)]
    pub force_mode: bool,
    #[builder(default = DEFAULT_LOG_LEVEL.to_owned(), into)]
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_owned()
}

impl Default for PlanOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Splits `[from, to]` into at most `worker_count` contiguous worker tasks.
pub fn plan(from: u64, to: u64, worker_count: u32) -> Result<Vec<WorkerTaskSpec>> {
    plan_with(from, to, worker_count, &PlanOptions::default())
}

/// Like [`plan`], stamping `options` on every task.
///
/// Task sizes differ by at most one block, the larger ones first. When there are more workers
/// than blocks, the surplus workers get no task at all.
pub fn plan_with(
    from: u64,
    to: u64,
    worker_count: u32,
    options: &PlanOptions,
) -> Result<Vec<WorkerTaskSpec>> {
    if to < from {
        return Err(CoverageError::invalid(format!(
            "range end {to} is below range start {from}"
        )));
    }
    if worker_count == 0 {
        return Err(CoverageError::invalid("worker count must be at least 1"));
    }
    let buckets = Buckets::new(to - from, worker_count)?;
    Ok(buckets
        .iter()
        .map(|(start, end)| WorkerTaskSpec {
            from: from + start,
            to: from + end,
            force_mode: options.force_mode,
            log_level: options.log_level.clone(),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bucket::bucketize;
    use proptest::prelude::*;

    fn spans(tasks: &[WorkerTaskSpec]) -> Vec<(u64, u64)> {
        tasks.iter().map(|task| (task.from, task.to)).collect()
    }

    #[test]
    fn last_worker_absorbs_remainder() {
        let tasks = plan(0, 10, 3).unwrap();
        assert_eq!(spans(&tasks), vec![(0, 3), (4, 7), (8, 10)]);
    }

    #[test]
    fn degenerate_workers_dropped() {
        let tasks = plan(0, 2, 5).unwrap();
        assert_eq!(spans(&tasks), vec![(0, 0), (1, 1), (2, 2)]);
    }

    #[test]
    fn offset_range() {
        let tasks = plan(1_000, 1_999, 4).unwrap();
        assert_eq!(
            spans(&tasks),
            vec![(1_000, 1_249), (1_250, 1_499), (1_500, 1_749), (1_750, 1_999)]
        );
    }

    #[test]
    fn every_requested_worker_gets_a_task() {
        let tasks = plan(0, 99, 30).unwrap();
        assert_eq!(tasks.len(), 30);
        let got = spans(&tasks);
        assert_eq!(got[9], (36, 39));
        assert_eq!(got[10], (40, 42));
        assert_eq!(got[29], (97, 99));
        assert_eq!(plan(0, 130, 120).unwrap().len(), 120);
    }

    #[test]
    fn single_block() {
        assert_eq!(spans(&plan(42, 42, 8).unwrap()), vec![(42, 42)]);
    }

    #[test]
    fn options_stamped_on_every_task() {
        let options = PlanOptions::builder()
            .force_mode(true)
            .log_level("debug")
            .build();
        let tasks = plan_with(0, 99, 4, &options).unwrap();
        assert_eq!(tasks.len(), 4);
        assert!(tasks
            .iter()
            .all(|task| task.force_mode && task.log_level == "debug"));
    }

    #[test]
    fn defaults() {
        let tasks = plan(0, 9, 2).unwrap();
        assert!(tasks
            .iter()
            .all(|task| !task.force_mode && task.log_level == DEFAULT_LOG_LEVEL));
    }

    #[test]
    fn invalid_parameters() {
        assert!(matches!(
            plan(10, 9, 1),
            Err(CoverageError::InvalidParameters(_))
        ));
        assert!(matches!(
            plan(0, 9, 0),
            Err(CoverageError::InvalidParameters(_))
        ));
    }

    #[test]
    fn whole_u64_range() {
        let tasks = plan(0, u64::MAX, 2).unwrap();
        assert_eq!(
            spans(&tasks),
            vec![(0, u64::MAX / 2), (u64::MAX / 2 + 1, u64::MAX)]
        );
    }

    proptest! {
        #[test]
        fn single_worker_spans_everything(from in 0u64..1_000_000, len in 0u64..1_000_000) {
            let tasks = plan(from, from + len, 1).unwrap();
            prop_assert_eq!(spans(&tasks), vec![(from, from + len)]);
        }

        #[test]
        fn tasks_cover_request_exactly(
            from in 0u64..1_000_000,
            len in 0u64..100_000,
            workers in 1u32..300,
        ) {
            let to = from + len;
            let tasks = plan(from, to, workers).unwrap();
            prop_assert!(!tasks.is_empty());
            prop_assert_eq!(tasks.len() as u64, (len + 1).min(u64::from(workers)));
            prop_assert_eq!(tasks[0].from, from);
            prop_assert_eq!(tasks[tasks.len() - 1].to, to);
            prop_assert!(tasks.iter().all(|task| task.from <= task.to));
            for pair in tasks.windows(2) {
                prop_assert_eq!(pair[0].to + 1, pair[1].from);
            }
        }

        #[test]
        fn boundaries_match_bucketizer(
            from in 0u64..1_000_000,
            len in 0u64..100_000,
            workers in 1u32..300,
        ) {
            let to = from + len;
            let shifted: Vec<_> = bucketize(to - from, workers)
                .unwrap()
                .into_iter()
                .map(|(start, end)| (from + start, from + end))
                .collect();
            prop_assert_eq!(spans(&plan(from, to, workers).unwrap()), shifted);
        }
    }
}
