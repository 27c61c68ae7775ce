use crate::indexed_blocks::IndexedBlocksPartition;
use crate::metadata::MetadataPartition;
use anyhow::anyhow;
use coverage_lib::{IndexedBlockSource, LatestBlockOracle, PageRequest};
use fjall::Config;
use std::path::Path;
use tokio::task::spawn_blocking;
use tracing::info;

/// Local store of indexing progress, readable as a block source and a chain-head oracle.
#[derive(Clone)]
pub struct Store {
    tx_keyspace: fjall::TxKeyspace,
    metadata_partition: MetadataPartition,
    indexed_blocks_partition: IndexedBlocksPartition,
}

impl Store {
    pub fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Opening coverage store");
        let tx_keyspace = Config::new(path).open_transactional()?;
        Self::from_keyspace(tx_keyspace)
    }

    pub fn from_keyspace(tx_keyspace: fjall::TxKeyspace) -> anyhow::Result<Self> {
        Ok(Self {
            metadata_partition: MetadataPartition::new(&tx_keyspace)?,
            indexed_blocks_partition: IndexedBlocksPartition::new(&tx_keyspace)?,
            tx_keyspace,
        })
    }

    pub fn tx_keyspace(&self) -> &fjall::TxKeyspace {
        &self.tx_keyspace
    }

    pub fn metadata(&self) -> &MetadataPartition {
        &self.metadata_partition
    }

    pub fn indexed_blocks(&self) -> &IndexedBlocksPartition {
        &self.indexed_blocks_partition
    }

    pub fn indexed_count(&self, network: &str) -> anyhow::Result<usize> {
        self.indexed_blocks_partition
            .count(&self.tx_keyspace.read_tx(), network)
    }
}

impl LatestBlockOracle for Store {
    async fn latest_block(&self, network: &str) -> anyhow::Result<u64> {
        let metadata = self.metadata_partition.clone();
        let network = network.to_owned();
        spawn_blocking(move || {
            metadata
                .get_latest_block(&network)?
                .ok_or_else(|| anyhow!("no chain head recorded for network {network}"))
        })
        .await?
    }
}

impl IndexedBlockSource for Store {
    async fn fetch_page(&self, request: PageRequest) -> anyhow::Result<Vec<u64>> {
        let store = self.clone();
        spawn_blocking(move || {
            let rtx = store.tx_keyspace.read_tx();
            store.indexed_blocks_partition.page(
                &rtx,
                &request.network,
                request.after,
                request.until,
                request.limit,
            )
        })
        .await?
    }
}
