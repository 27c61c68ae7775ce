use anyhow::bail;

pub mod indexed_blocks;
pub mod metadata;
pub mod store;

pub use store::Store;

const MAX_NETWORK_LEN: usize = 64;

/// Network names are used as key prefixes, so they must not contain the separator byte.
pub fn validate_network(network: &str) -> anyhow::Result<()> {
    if network.is_empty() || network.len() > MAX_NETWORK_LEN {
        bail!("network name must be 1 to {MAX_NETWORK_LEN} bytes long");
    }
    if !network
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
    {
        bail!("invalid network name: {network:?}");
    }
    Ok(())
}

pub(crate) fn network_prefix(network: &str) -> anyhow::Result<Vec<u8>> {
    validate_network(network)?;
    let mut prefix = Vec::with_capacity(network.len() + 1 + 8);
    prefix.extend_from_slice(network.as_bytes());
    prefix.push(0);
    Ok(prefix)
}
