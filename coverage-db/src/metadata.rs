use anyhow::Result;
use fjall::{CompressionType, PartitionCreateOptions};
use zerocopy::little_endian::U64;
use zerocopy::{IntoBytes, TryFromBytes};

/// Per-network metadata.
/// Key: [MetadataKey] + [network bytes]
/// Value: depends on the key
#[derive(Clone)]
pub struct MetadataPartition(pub fjall::TxPartition);

#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MetadataKey {
    LatestBlock = 0,
}

impl MetadataPartition {
    pub fn new(keyspace: &fjall::TxKeyspace) -> Result<Self> {
        Ok(Self(
            keyspace.open_partition(
                "metadata",
                PartitionCreateOptions::default()
                    .block_size(1024)
                    .compression(CompressionType::None),
            )?,
        ))
    }

    fn make_key(key: MetadataKey, network: &str) -> Result<Vec<u8>> {
        crate::validate_network(network)?;
        let mut bytes = Vec::with_capacity(1 + network.len());
        bytes.push(key as u8);
        bytes.extend_from_slice(network.as_bytes());
        Ok(bytes)
    }

    /// Store the chain head of `network`
    pub fn set_latest_block(&self, network: &str, block: u64) -> Result<()> {
        let key = Self::make_key(MetadataKey::LatestBlock, network)?;
        self.0.insert(key, U64::new(block).as_bytes())?;
        Ok(())
    }

    /// Get the chain head of `network`
    pub fn get_latest_block(&self, network: &str) -> Result<Option<u64>> {
        let key = Self::make_key(MetadataKey::LatestBlock, network)?;
        self.0
            .get(key)?
            .map(|bytes| {
                U64::try_read_from_bytes(bytes.as_bytes())
                    .map(U64::get)
                    .map_err(|_| anyhow::anyhow!("db corrupted, failed to read latest block"))
            })
            .transpose()
    }
}
