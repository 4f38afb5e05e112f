//! Collision detection and the override protocol shared by every guarded write.
//!
//! A write first asks [`ConflictGuard::check`] whether its target collides with
//! existing state. A collision comes back as [`ConflictDetails`] the caller can
//! act on without re-querying. If the caller resubmits with an override,
//! [`ConflictGuard::resolve`] decides whether the override is enough.
//!
//! Which collisions may be overridden, and whether a written reason is needed,
//! is decided here and nowhere else.

use crate::types::{Bucket, Justification, ObjectPath, TrashKey};
use serde::Serialize;
use std::fmt;
use std::time::SystemTime;
use uuid::Uuid;

pub const CODE_VERSION_EXISTS: &str = "VERSION_EXISTS";
pub const CODE_RETENTION_NOT_ELAPSED: &str = "RETENTION_NOT_ELAPSED";
pub const CODE_DESTINATION_OCCUPIED: &str = "DESTINATION_OCCUPIED";

/// Existing state a write would run into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Collision {
    /// An upload targets a version that already has an artifact.
    VersionExists { entity: String, version: String },
    /// A permanent delete comes before the entry's retention deadline.
    RetentionNotElapsed {
        key: TrashKey,
        eligible_at: SystemTime,
    },
    /// A restore targets a location that holds live objects.
    DestinationOccupied {
        bucket: Bucket,
        path: ObjectPath,
        object_count: u64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverridePolicy {
    Allowed { justification_required: bool },
    Never,
}

impl Collision {
    pub fn code(&self) -> &'static str {
        match self {
            Collision::VersionExists { .. } => CODE_VERSION_EXISTS,
            Collision::RetentionNotElapsed { .. } => CODE_RETENTION_NOT_ELAPSED,
            Collision::DestinationOccupied { .. } => CODE_DESTINATION_OCCUPIED,
        }
    }

    /// Only an early delete is irreversible, so only it needs a written reason.
    pub fn policy(&self) -> OverridePolicy {
        match self {
            Collision::VersionExists { .. } => OverridePolicy::Allowed {
                justification_required: false,
            },
            Collision::RetentionNotElapsed { .. } => OverridePolicy::Allowed {
                justification_required: true,
            },
            Collision::DestinationOccupied { .. } => OverridePolicy::Never,
        }
    }

    /// Request flag that asks for the override.
    fn retry_flag(&self) -> Option<&'static str> {
        match self {
            Collision::VersionExists { .. } => Some("override"),
            Collision::RetentionNotElapsed { .. } => Some("force"),
            Collision::DestinationOccupied { .. } => None,
        }
    }

    pub fn message(&self) -> String {
        match self {
            Collision::VersionExists { entity, version } => format!(
                "version {version} of {entity} already exists; resubmit with override=true to replace it"
            ),
            Collision::RetentionNotElapsed { key, .. } => format!(
                "retention period for {key} has not elapsed; resubmit with force=true and a reason to delete early"
            ),
            Collision::DestinationOccupied {
                bucket,
                path,
                object_count,
            } => format!("{bucket}/{path} already holds {object_count} live objects"),
        }
    }
}

impl fmt::Display for Collision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

/// How to resubmit a refused write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RetryHint {
    pub flag: &'static str,
    pub requires_justification: bool,
}

/// Identifies one refusal so a caller can correlate its retry in logs.
///
/// Tokens are advisory. Nothing accepts a token in place of a fresh check, so
/// replaying one for another operation or version grants nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictToken {
    pub id: Uuid,
    pub operation: String,
    pub retry: Option<RetryHint>,
}

impl ConflictToken {
    fn issue(operation: &str, collision: &Collision) -> Self {
        let retry = match collision.policy() {
            OverridePolicy::Allowed {
                justification_required,
            } => collision.retry_flag().map(|flag| RetryHint {
                flag,
                requires_justification: justification_required,
            }),
            OverridePolicy::Never => None,
        };

        Self {
            id: Uuid::new_v4(),
            operation: operation.to_string(),
            retry,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictDetails {
    pub code: &'static str,
    pub message: String,
    pub collision: Collision,
    pub token: ConflictToken,
}

impl ConflictDetails {
    pub fn overridable(&self) -> bool {
        self.token.retry.is_some()
    }
}

impl fmt::Display for ConflictDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Check {
    Clear,
    Conflict(ConflictDetails),
}

/// What the caller asked for on (re)submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Override {
    pub requested: bool,
    pub reason: Option<String>,
}

impl Override {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn requested(reason: Option<&str>) -> Self {
        Self {
            requested: true,
            reason: reason.map(str::to_string),
        }
    }

    /// The reason as a [`Justification`]; `None` when absent or blank.
    pub fn justification(&self) -> Option<Justification> {
        self.reason
            .as_deref()
            .and_then(|reason| Justification::try_new(reason).ok())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Proceed {
        justification: Option<Justification>,
    },
    MissingJustification,
    StillBlocked(ConflictDetails),
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ConflictGuard;

impl ConflictGuard {
    /// Turns a detected collision into a structured refusal.
    ///
    /// `operation` names the guarded target (a trash key, `entity@version`) and
    /// is echoed on the token.
    pub fn check(operation: &str, collision: Option<Collision>) -> Check {
        match collision {
            None => Check::Clear,
            Some(collision) => {
                let token = ConflictToken::issue(operation, &collision);
                tracing::debug!(
                    operation,
                    code = collision.code(),
                    token = %token.id,
                    "write refused by conflict guard"
                );
                Check::Conflict(ConflictDetails {
                    code: collision.code(),
                    message: collision.message(),
                    collision,
                    token,
                })
            }
        }
    }

    /// Decides whether `ov` lets a refused write through.
    pub fn resolve(details: ConflictDetails, ov: &Override) -> Resolution {
        if !ov.requested {
            return Resolution::StillBlocked(details);
        }

        match details.collision.policy() {
            OverridePolicy::Never => Resolution::StillBlocked(details),
            OverridePolicy::Allowed {
                justification_required: false,
            } => Resolution::Proceed {
                justification: ov.justification(),
            },
            OverridePolicy::Allowed {
                justification_required: true,
            } => match ov.justification() {
                Some(justification) => Resolution::Proceed {
                    justification: Some(justification),
                },
                None => Resolution::MissingJustification,
            },
        }
    }
}
