//! Retention window arithmetic.
//!
//! Everything here is pure: the deadline is computed once when a group enters
//! the trash and stored on the entry, and eligibility is a projection of that
//! stored deadline against a caller-supplied `now`. Presentation layers can call
//! [`eligibility`] locally to refresh countdowns without asking the service.

use crate::types::record::latest::Entry;
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime};

const SECS_PER_DAY: u64 = 24 * 60 * 60;

/// Which timestamp the retention window is measured from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetentionAnchor {
    /// Last-modified time of the most recently touched object in the group.
    #[default]
    YoungestObject,
    /// The moment the group entered the trash.
    TrashedAt,
}

/// Policy settings captured on each entry at trash time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionSnapshot {
    pub retention: Duration,
    pub anchor: RetentionAnchor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    retention: Duration,
    anchor: RetentionAnchor,
}

impl RetentionPolicy {
    pub fn new(retention: Duration, anchor: RetentionAnchor) -> Self {
        Self { retention, anchor }
    }

    pub fn from_days(days: u32, anchor: RetentionAnchor) -> Self {
        Self::new(Duration::from_secs(u64::from(days) * SECS_PER_DAY), anchor)
    }

    pub fn retention(&self) -> Duration {
        self.retention
    }

    pub fn snapshot(&self) -> RetentionSnapshot {
        RetentionSnapshot {
            retention: self.retention,
            anchor: self.anchor,
        }
    }

    /// Deadline for a group trashed at `trashed_at` whose newest object was last
    /// modified at `youngest_last_modified`.
    ///
    /// Returns `None` if the deadline is not representable.
    pub fn deadline(
        &self,
        trashed_at: SystemTime,
        youngest_last_modified: SystemTime,
    ) -> Option<SystemTime> {
        let anchor = match self.anchor {
            RetentionAnchor::YoungestObject => youngest_last_modified,
            RetentionAnchor::TrashedAt => trashed_at,
        };
        anchor.checked_add(self.retention)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Eligibility {
    pub eligible: bool,
    pub eligible_at: SystemTime,
}

impl Eligibility {
    /// Time left until the deadline; zero once eligible.
    pub fn remaining(&self, now: SystemTime) -> Duration {
        self.eligible_at.duration_since(now).unwrap_or_default()
    }
}

/// Whether `entry` may be permanently deleted at `now` without an override.
pub fn eligibility(entry: &Entry, now: SystemTime) -> Eligibility {
    eligibility_at(entry.eligible_at, now)
}

pub fn eligibility_at(eligible_at: SystemTime, now: SystemTime) -> Eligibility {
    Eligibility {
        eligible: now >= eligible_at,
        eligible_at,
    }
}
