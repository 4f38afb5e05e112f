use crate::retention::RetentionPolicy;
use crate::types::key::Bucket;
use crate::types::config::SweepConfig;
use std::path::PathBuf;

/// Resolved configuration for opening the ledger and services.
#[derive(Clone, Debug)]
pub struct Config {
    pub data_dir: PathBuf,
    pub trash_bucket: Bucket,
    pub artifact_bucket: Bucket,
    pub retention: RetentionPolicy,
    pub sweep: SweepConfig,
}

impl Config {
    pub fn ledger_path(&self) -> PathBuf {
        self.data_dir.join("reclaim.redb")
    }
}
