use std::path::PathBuf;

use coverage_lib::reconciler::{DEFAULT_BUCKET_COUNT, DEFAULT_PAGE_SIZE};
use serde::Deserialize;
use serde_with::{serde_as, DisplayFromStr};
use tracing::level_filters::LevelFilter;

#[serde_as]
#[derive(Deserialize, Debug, Clone)]
pub struct ServiceConfig {
    #[serde_as(as = "DisplayFromStr")]
    #[serde(default = "default_rust_log")]
    pub rust_log: LevelFilter,
    #[serde(default = "default_coverage_db_root")]
    pub coverage_db_root: PathBuf,
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_bucket_count")]
    pub default_bucket_count: u32,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default = "default_max_workers")]
    pub max_workers: u32,
    /// Largest `buckets` value a coverage request may ask for
    #[serde(default = "default_max_buckets")]
    pub max_buckets: u32,
}

fn default_rust_log() -> LevelFilter {
    LevelFilter::INFO
}

fn default_coverage_db_root() -> PathBuf {
    std::env::home_dir()
        .unwrap_or_default()
        .join(".block-coverage")
}

fn default_bind_address() -> String {
    "0.0.0.0:8080".to_owned()
}

fn default_bucket_count() -> u32 {
    DEFAULT_BUCKET_COUNT
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

fn default_max_workers() -> u32 {
    64
}

fn default_max_buckets() -> u32 {
    1000
}

impl ServiceConfig {
    pub fn log_path(&self) -> PathBuf {
        self.coverage_db_root.join("app_logs")
    }
}

pub fn get_service_config() -> anyhow::Result<ServiceConfig> {
    Ok(envy::from_env::<ServiceConfig>()?)
}
