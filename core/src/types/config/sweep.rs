use super::SweepSettings;
use std::time::Duration;

/// Timing passed to sweep operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SweepConfig {
    pub interval: Duration,
    /// Pending records younger than this belong to a live call and are left alone.
    pub pending_grace: Duration,
}

impl From<&SweepSettings> for SweepConfig {
    fn from(settings: &SweepSettings) -> Self {
        Self {
            interval: Duration::from_secs(settings.interval_secs),
            pending_grace: Duration::from_secs(settings.pending_grace_secs),
        }
    }
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self::from(&SweepSettings::default())
    }
}
