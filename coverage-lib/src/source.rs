use anyhow::bail;
use futures_util::Stream;
use std::future::Future;

/// Returns the current chain head of a network.
pub trait LatestBlockOracle: Send + Sync {
    fn latest_block(&self, network: &str) -> impl Future<Output = anyhow::Result<u64>> + Send;
}

/// One ascending page of indexed block numbers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub network: String,
    /// Exclusive lower bound, `None` starts at block 0
    pub after: Option<u64>,
    /// Inclusive upper bound
    pub until: u64,
    pub limit: usize,
}

/// Paginated read of the block numbers a store holds as fully indexed.
///
/// Implementations must return blocks in ascending order, strictly above `after`
/// and at most `until`, no more than `limit` of them.
pub trait IndexedBlockSource: Send + Sync {
    fn fetch_page(
        &self,
        request: PageRequest,
    ) -> impl Future<Output = anyhow::Result<Vec<u64>>> + Send;
}

/// Pulls `[0, until]` out of `source` page by page.
///
/// The next page is requested only once the previous one has been consumed. The stream ends
/// after the first short page, and fails if the source stops advancing.
pub fn block_pages<'a, S: IndexedBlockSource>(
    source: &'a S,
    network: &'a str,
    until: u64,
    page_size: usize,
) -> impl Stream<Item = anyhow::Result<Vec<u64>>> + Send + 'a {
    let limit = page_size.max(1);
    futures_util::stream::try_unfold(Some(None), move |cursor: Option<Option<u64>>| async move {
        let Some(after) = cursor else {
            return anyhow::Ok(None);
        };
        let page = source
            .fetch_page(PageRequest {
                network: network.to_owned(),
                after,
                until,
                limit,
            })
            .await?;
        let Some(&last) = page.last() else {
            return Ok(None);
        };
        if after.is_some_and(|after| last <= after) {
            bail!("block source did not advance past block {last}");
        }
        let next = (page.len() >= limit && last < until).then_some(Some(last));
        Ok(Some((page, next)))
    })
}
