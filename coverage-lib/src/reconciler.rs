use crate::bucket::Buckets;
use crate::error::{CoverageError, Result};
use crate::model::{BlockRange, ReconciliationResult};
use crate::source::{block_pages, IndexedBlockSource, LatestBlockOracle};
use futures_util::{Stream, StreamExt};
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

pub const DEFAULT_BUCKET_COUNT: u32 = 120;
pub const DEFAULT_PAGE_SIZE: usize = 1000;

/// Single forward pass classifying every block of `[0, latest]` as indexed or missing.
///
/// Indexed blocks are fed in ascending order through [`Reconciler::push`]. Everything skipped
/// over between two pushed blocks is recorded as missing in its bucket. The expected cursor only
/// ever moves forward: a block below it is either a duplicate (ignored) or a late arrival that
/// was already recorded as missing. Late arrivals are set aside and filtered out of the
/// missing lists once, in [`Reconciler::finish`].
#[derive(Debug)]
pub struct Reconciler {
    latest: u64,
    buckets: Buckets,
    missing: Vec<Vec<u64>>,
    // u128 so the cursor can move past `u64::MAX`
    next_expected: u128,
    duplicates: u64,
    // recorded missing, then seen below the cursor
    late: BTreeSet<u64>,
}

impl Reconciler {
    pub fn new(latest: u64, bucket_count: u32) -> Result<Self> {
        let buckets = Buckets::new(latest, bucket_count)?;
        Ok(Self {
            latest,
            missing: vec![Vec::new(); buckets.len()],
            buckets,
            next_expected: 0,
            duplicates: 0,
            late: BTreeSet::new(),
        })
    }

    pub fn push(&mut self, block: u64) {
        let block_wide = u128::from(block);
        if block_wide >= self.next_expected {
            self.record_missing_until(block_wide.min(self.end()));
            self.next_expected = block_wide + 1;
            return;
        }
        // below the cursor, so within [0, latest]
        let Some(index) = self.buckets.index_of(block) else {
            return;
        };
        let recorded = self.missing[index].binary_search(&block).is_ok();
        if !(recorded && self.late.insert(block)) {
            self.duplicates += 1;
        }
    }

    pub fn push_page(&mut self, page: impl IntoIterator<Item = u64>) {
        page.into_iter().for_each(|block| self.push(block));
    }

    pub fn finish(mut self) -> ReconciliationResult {
        self.record_missing_until(self.end());
        if self.duplicates > 0 || !self.late.is_empty() {
            debug!(
                latest = self.latest,
                duplicates = self.duplicates,
                late_arrivals = self.late.len(),
                "Indexed blocks arrived out of order"
            );
        }
        if !self.late.is_empty() {
            for missing in &mut self.missing {
                missing.retain(|block| !self.late.contains(block));
            }
        }
        let ranges: Vec<BlockRange> = self
            .buckets
            .iter()
            .zip(self.missing)
            .map(|((start, end), missing)| BlockRange {
                start,
                end,
                missing,
            })
            .collect();
        let total_missing = ranges.iter().map(|range| range.missing.len() as u64).sum();
        ReconciliationResult {
            latest: self.latest,
            ranges,
            bucket_width: self.buckets.width(),
            total_missing,
        }
    }

    /// Exclusive end of the expected range.
    fn end(&self) -> u128 {
        u128::from(self.latest) + 1
    }

    /// Records `[next_expected, until)` as missing, bucket by bucket.
    fn record_missing_until(&mut self, until: u128) {
        while self.next_expected < until {
            let block = self.next_expected as u64;
            let Some(index) = self.buckets.index_of(block) else {
                return;
            };
            let (_, bucket_end) = self.buckets.span(index);
            let stop = until.min(u128::from(bucket_end) + 1);
            self.missing[index].extend((self.next_expected..stop).map(|block| block as u64));
            self.next_expected = stop;
        }
    }
}

/// Reconciles a paginated stream of indexed block numbers against `[0, latest]`.
///
/// Pages are pulled one at a time. A failing page aborts the whole reconciliation.
pub async fn reconcile<S, P, E>(
    latest: u64,
    pages: S,
    bucket_count: u32,
) -> Result<ReconciliationResult>
where
    S: Stream<Item = Result<P, E>>,
    P: IntoIterator<Item = u64>,
    E: Into<anyhow::Error>,
{
    let mut reconciler = Reconciler::new(latest, bucket_count)?;
    let mut pages = std::pin::pin!(pages);
    let mut page_count = 0usize;
    while let Some(page) = pages.next().await {
        let page = page.map_err(CoverageError::source_unavailable)?;
        reconciler.push_page(page);
        page_count += 1;
    }
    debug!(latest, page_count, "Consumed indexed block pages");
    Ok(reconciler.finish())
}

/// [`reconcile`] over blocks already in memory.
pub fn reconcile_blocks(
    latest: u64,
    blocks: impl IntoIterator<Item = u64>,
    bucket_count: u32,
) -> Result<ReconciliationResult> {
    let mut reconciler = Reconciler::new(latest, bucket_count)?;
    reconciler.push_page(blocks);
    Ok(reconciler.finish())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, bon::Builder)]
pub struct ReconcileOptions {
    #[builder(default = DEFAULT_BUCKET_COUNT)]
    pub bucket_count: u32,
    #[builder(default = DEFAULT_PAGE_SIZE)]
    pub page_size: usize,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Asks `oracle` for the chain head of `network` and reconciles the indexed blocks `source`
/// holds for it.
pub async fn reconcile_network<O, S>(
    oracle: &O,
    source: &S,
    network: &str,
    options: ReconcileOptions,
) -> Result<ReconciliationResult>
where
    O: LatestBlockOracle,
    S: IndexedBlockSource,
{
    if options.bucket_count == 0 {
        return Err(CoverageError::invalid("bucket count must be at least 1"));
    }
    let latest = oracle
        .latest_block(network)
        .await
        .map_err(CoverageError::source_unavailable)
        .inspect_err(|err| warn!(network, %err, "Failed to query latest block"))?;
    let result = reconcile(
        latest,
        block_pages(source, network, latest, options.page_size),
        options.bucket_count,
    )
    .await
    .inspect_err(|err| warn!(network, latest, %err, "Reconciliation aborted"))?;
    info!(
        network,
        latest,
        total_missing = result.total_missing,
        percent_complete = result.percent_complete(),
        "Reconciled indexing coverage"
    );
    Ok(result)
}
