use crate::network_prefix;
use anyhow::{bail, Result};
use fjall::{PartitionCreateOptions, ReadTransaction};

/// Block numbers whose indexing has completed, per network.
/// Keys: [network bytes] + [0x00] + [block_number_be_bytes (8)]
/// Values: empty
#[derive(Clone)]
pub struct IndexedBlocksPartition(fjall::TxPartition);

impl IndexedBlocksPartition {
    pub fn new(keyspace: &fjall::TxKeyspace) -> Result<Self> {
        Ok(Self(keyspace.open_partition(
            "indexed_blocks",
            PartitionCreateOptions::default().block_size(64 * 1024),
        )?))
    }

    fn make_key(network: &str, block: u64) -> Result<Vec<u8>> {
        let mut key = network_prefix(network)?;
        key.extend_from_slice(&block.to_be_bytes());
        Ok(key)
    }

    pub fn mark_indexed(&self, network: &str, block: u64) -> Result<()> {
        self.0.insert(Self::make_key(network, block)?, [])?;
        Ok(())
    }

    pub fn mark_indexed_many(
        &self,
        network: &str,
        blocks: impl IntoIterator<Item = u64>,
    ) -> Result<usize> {
        let mut count = 0;
        for block in blocks {
            self.mark_indexed(network, block)?;
            count += 1;
        }
        Ok(count)
    }

    pub fn unmark(&self, network: &str, block: u64) -> Result<()> {
        self.0.remove(Self::make_key(network, block)?)?;
        Ok(())
    }

    pub fn is_indexed(&self, network: &str, block: u64) -> Result<bool> {
        Ok(self.0.get(Self::make_key(network, block)?)?.is_some())
    }

    /// Ascending block numbers of `network` in `(after, until]`, at most `limit` of them.
    pub fn page(
        &self,
        rtx: &ReadTransaction,
        network: &str,
        after: Option<u64>,
        until: u64,
        limit: usize,
    ) -> Result<Vec<u64>> {
        let lower = match after {
            Some(after) if after >= until => return Ok(Vec::new()),
            Some(after) => after + 1,
            None => 0,
        };
        let prefix_len = network_prefix(network)?.len();
        let from = Self::make_key(network, lower)?;
        let to = Self::make_key(network, until)?;
        rtx.range(&self.0, from..=to)
            .take(limit)
            .map(|item| {
                let (key, _) = item?;
                if key.len() != prefix_len + 8 {
                    bail!("Invalid key length in indexed_blocks partition: {}", key.len());
                }
                Ok(u64::from_be_bytes(key[prefix_len..].try_into()?))
            })
            .collect()
    }

    /// Number of indexed blocks recorded for `network`. Scans the whole prefix.
    pub fn count(&self, rtx: &ReadTransaction, network: &str) -> Result<usize> {
        let prefix = network_prefix(network)?;
        let mut count = 0;
        for item in rtx.prefix(&self.0, prefix) {
            item?;
            count += 1;
        }
        Ok(count)
    }

    pub fn approximate_len(&self) -> usize {
        self.0.approximate_len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fjall::Config;
    use tempfile::TempDir;

    fn create_partition() -> (TempDir, fjall::TxKeyspace, IndexedBlocksPartition) {
        let temp_dir = TempDir::new().unwrap();
        let keyspace = Config::new(temp_dir.path()).open_transactional().unwrap();
        let partition = IndexedBlocksPartition::new(&keyspace).unwrap();
        (temp_dir, keyspace, partition)
    }

    #[test]
    fn pages_are_ascending_and_bounded() {
        let (_dir, keyspace, partition) = create_partition();
        partition
            .mark_indexed_many("mainnet", [7, 300, 2, 256, 5, 1_000])
            .unwrap();

        let rtx = keyspace.read_tx();
        assert_eq!(
            partition.page(&rtx, "mainnet", None, 500, 10).unwrap(),
            vec![2, 5, 7, 256, 300]
        );
        assert_eq!(
            partition.page(&rtx, "mainnet", Some(5), 500, 2).unwrap(),
            vec![7, 256]
        );
        assert_eq!(
            partition.page(&rtx, "mainnet", Some(300), 300, 10).unwrap(),
            Vec::<u64>::new()
        );
    }

    #[test]
    fn networks_are_isolated() {
        let (_dir, keyspace, partition) = create_partition();
        partition.mark_indexed_many("main", [1, 2, 3]).unwrap();
        partition.mark_indexed_many("mainnet", [4]).unwrap();

        let rtx = keyspace.read_tx();
        assert_eq!(
            partition.page(&rtx, "main", None, u64::MAX, 10).unwrap(),
            vec![1, 2, 3]
        );
        assert_eq!(partition.count(&rtx, "main").unwrap(), 3);
        assert_eq!(partition.count(&rtx, "mainnet").unwrap(), 1);
    }

    #[test]
    fn mark_is_idempotent() {
        let (_dir, keyspace, partition) = create_partition();
        partition.mark_indexed_many("sepolia", [9, 9, 9]).unwrap();
        assert!(partition.is_indexed("sepolia", 9).unwrap());
        assert_eq!(partition.count(&keyspace.read_tx(), "sepolia").unwrap(), 1);

        partition.unmark("sepolia", 9).unwrap();
        assert!(!partition.is_indexed("sepolia", 9).unwrap());
    }

    #[test]
    fn invalid_network_rejected() {
        let (_dir, _keyspace, partition) = create_partition();
        assert!(partition.mark_indexed("", 1).is_err());
        assert!(partition.mark_indexed("main\0net", 1).is_err());
    }
}
