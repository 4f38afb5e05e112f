//! Metadata types for persistent ledger state.

use serde::{Deserialize, Serialize};
use std::time::SystemTime;

/// Sweep bookkeeping. Missing fields default to None.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SweepMetadata {
    #[serde(default)]
    pub last_run_at: Option<SystemTime>,
}
