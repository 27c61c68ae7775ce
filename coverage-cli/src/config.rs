use std::path::PathBuf;

use coverage_lib::reconciler::{DEFAULT_BUCKET_COUNT, DEFAULT_PAGE_SIZE};
use serde::Deserialize;
use serde_with::{serde_as, DisplayFromStr};
use tracing::level_filters::LevelFilter;

#[serde_as]
#[derive(Deserialize, Debug, Clone)]
pub struct CliConfig {
    #[serde_as(as = "DisplayFromStr")]
    #[serde(default = "default_rust_log")]
    pub rust_log: LevelFilter,
    #[serde(default = "default_coverage_db_root")]
    pub coverage_db_root: PathBuf,
    #[serde(default = "default_bucket_count")]
    pub default_bucket_count: u32,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

fn default_rust_log() -> LevelFilter {
    LevelFilter::INFO
}

fn default_coverage_db_root() -> PathBuf {
    std::env::home_dir()
        .unwrap_or_default()
        .join(".block-coverage")
}

fn default_bucket_count() -> u32 {
    DEFAULT_BUCKET_COUNT
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

impl CliConfig {
    /// Same keyspace the service opens.
    pub fn db_path(&self) -> PathBuf {
        self.coverage_db_root.join("db")
    }
}

pub fn get_cli_config() -> anyhow::Result<CliConfig> {
    Ok(envy::from_env::<CliConfig>()?)
}
