//! Trash lifecycle orchestration.
//!
//! Every operation that touches objects follows the same order: commit the
//! ledger transition first, then call the object store, then settle the
//! pending record. When the store call fails the ledger is put back where it
//! was and the caller gets [`TrashError::PartialFailure`]. Whatever a failed
//! compensation leaves behind is finished later by [`TrashService::sweep`].

use crate::audit::AuditLog;
use crate::clock::Clock;
use crate::guard::{Check, Collision, ConflictGuard, Override, Resolution};
use crate::ledger::Ledger;
use crate::object_store::error::ObjectStoreError;
use crate::object_store::{GroupRef, ObjectStore};
use crate::retention::{RetentionPolicy, eligibility};
use crate::service::error::TrashError;
use crate::types::{
    Actor, AuditAction, Bucket, Config, Entry, ItemType, Metadata, ObjectPath, OverrideAudit,
    PendingOp, SweepConfig, TrashKey,
};
use std::sync::Arc;
use std::time::SystemTime;

mod sweep;

pub use sweep::SweepOutcome;

pub mod error {
    use crate::guard::ConflictDetails;
    use crate::ledger::error::LedgerError;
    use crate::object_store::error::ObjectStoreError;
    use crate::types::{PendingOp, TrashKey};
    use std::time::SystemTime;
    use thiserror::Error;

    #[derive(Debug, Error)]
    pub enum TrashError {
        #[error("Trash entry not found: {0}")]
        NotFound(TrashKey),

        #[error("Already in trash: {0}")]
        AlreadyTrashed(TrashKey),

        /// Refused because of existing state; never overridable here.
        #[error("{0}")]
        Conflict(Box<ConflictDetails>),

        /// Retryable only with `force` and a reason.
        #[error("{details}")]
        RetentionNotElapsed {
            eligible_at: SystemTime,
            details: Box<ConflictDetails>,
        },

        #[error("force delete requires a non-empty override reason")]
        MissingJustification,

        /// The ledger committed but the object store step did not complete.
        /// `compensated` tells whether the ledger was put back.
        #[error("{stage:?} of {key} failed after commit (compensated: {compensated}): {source}")]
        PartialFailure {
            key: TrashKey,
            stage: PendingOp,
            compensated: bool,
            source: ObjectStoreError,
        },

        #[error("Object store unavailable: {0}")]
        UpstreamUnavailable(#[source] ObjectStoreError),

        #[error("Ledger error: {0}")]
        Ledger(#[source] LedgerError),

        #[error("Invalid request: {0}")]
        Invalid(String),
    }

    impl From<LedgerError> for TrashError {
        fn from(err: LedgerError) -> Self {
            match err {
                LedgerError::NotFound(key) | LedgerError::Changed(key) => TrashError::NotFound(key),
                LedgerError::AlreadyTrashed(key) => TrashError::AlreadyTrashed(key),
                other => TrashError::Ledger(other),
            }
        }
    }

    impl From<ObjectStoreError> for TrashError {
        fn from(err: ObjectStoreError) -> Self {
            TrashError::UpstreamUnavailable(err)
        }
    }
}

/// A group to move into the trash.
#[derive(Debug, Clone)]
pub struct TrashRequest {
    pub bucket: Bucket,
    pub path: ObjectPath,
    pub item_type: ItemType,
    pub metadata: Metadata,
}

/// A ledger entry plus its eligibility at read time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrashEntry {
    pub entry: Entry,
    pub label: String,
    pub eligible_for_deletion: bool,
}

impl TrashEntry {
    fn project(entry: Entry, now: SystemTime) -> Self {
        Self {
            label: entry.item_type.label(&entry.metadata, &entry.path),
            eligible_for_deletion: eligibility(&entry, now).eligible,
            entry,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreResult {
    pub restored_key: TrashKey,
    pub objects_moved: u64,
    pub item_type: ItemType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteResult {
    pub objects_deleted: u64,
    /// True when the delete bypassed the retention window.
    pub overridden: bool,
}

pub struct TrashService {
    ledger: Ledger,
    audit: AuditLog,
    store: Arc<dyn ObjectStore>,
    clock: Arc<dyn Clock>,
    policy: RetentionPolicy,
    trash_bucket: Bucket,
    sweep: SweepConfig,
}

impl TrashService {
    pub fn new(
        ledger: Ledger,
        store: Arc<dyn ObjectStore>,
        clock: Arc<dyn Clock>,
        config: &Config,
    ) -> Self {
        Self {
            audit: ledger.audit_log(),
            ledger,
            store,
            clock,
            policy: config.retention,
            trash_bucket: config.trash_bucket.clone(),
            sweep: config.sweep,
        }
    }

    /// Opens the ledger under `config.data_dir` and builds the service on it.
    pub fn open(
        config: &Config,
        store: Arc<dyn ObjectStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, TrashError> {
        let ledger = Ledger::open(&config.ledger_path())?;
        Ok(Self::new(ledger, store, clock, config))
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn policy(&self) -> RetentionPolicy {
        self.policy
    }

    /// Where `key`'s objects live while trashed.
    fn slot(&self, key: &TrashKey) -> Result<GroupRef, TrashError> {
        let path =
            ObjectPath::try_new(key.trash_slot()).map_err(|e| TrashError::Invalid(e.to_string()))?;
        Ok(GroupRef::new(self.trash_bucket.clone(), path))
    }
}

/// Reads.
impl TrashService {
    /// All entries at rest, in key order. Display ordering is up to the caller.
    pub fn list(&self) -> Result<Vec<TrashEntry>, TrashError> {
        let now = self.clock.now();
        Ok(self
            .ledger
            .entries()?
            .into_iter()
            .map(|entry| TrashEntry::project(entry, now))
            .collect())
    }

    pub fn get(&self, key: &TrashKey) -> Result<TrashEntry, TrashError> {
        let entry = self
            .ledger
            .get(key)?
            .ok_or_else(|| TrashError::NotFound(key.clone()))?;
        Ok(TrashEntry::project(entry, self.clock.now()))
    }

    /// Override records for `key`, oldest first. Survives the entry itself.
    pub fn audit(&self, key: &TrashKey) -> Result<Vec<OverrideAudit>, TrashError> {
        Ok(self.audit.query(key)?)
    }
}

/// Lifecycle transitions.
impl TrashService {
    /// Moves a live group into the trash and freezes its deletion deadline.
    pub fn trash(&self, request: TrashRequest, actor: &Actor) -> Result<TrashEntry, TrashError> {
        if request.bucket == self.trash_bucket {
            return Err(TrashError::Invalid(format!(
                "{} is the trash bucket",
                self.trash_bucket
            )));
        }

        let key = TrashKey::derive(&request.bucket, &request.path);
        let source = GroupRef::new(request.bucket.clone(), request.path.clone());
        let slot = self.slot(&key)?;

        if self.ledger.get(&key)?.is_some() || self.ledger.pending(&key)?.is_some() {
            return Err(TrashError::AlreadyTrashed(key));
        }

        let stats = self.store.group_stats(&source)?;
        let Some(youngest_last_modified) = stats.newest_last_modified else {
            return Err(TrashError::NotFound(key));
        };

        let now = self.clock.now();
        let eligible_at = self
            .policy
            .deadline(now, youngest_last_modified)
            .ok_or_else(|| TrashError::Invalid("retention deadline out of range".to_string()))?;

        let entry = Entry {
            key: key.clone(),
            bucket: request.bucket,
            path: request.path,
            item_type: request.item_type,
            object_count: stats.object_count,
            total_size: stats.total_size,
            metadata: request.metadata,
            trashed_at: now,
            trashed_by: actor.clone(),
            youngest_last_modified,
            eligible_at,
            retention: self.policy.snapshot(),
        };

        // Leftovers in the slot would be folded into this entry.
        self.check_destination(&key, &slot)?;
        self.ledger.begin_trash(&entry, actor, now)?;

        if let Err(source_err) = self.store.move_group(&source, &slot) {
            if matches!(source_err, ObjectStoreError::Collision(_)) {
                // Nothing was moved.
                self.ledger.abandon(&key)?;
                let occupied = self.store.group_stats(&slot)?;
                return Err(destination_conflict(&key, &slot, occupied.object_count));
            }
            let compensated = match self.store.move_group(&slot, &source) {
                Ok(_) => settle("abandon", &key, self.ledger.abandon(&key)),
                Err(err) => {
                    tracing::warn!(key = %key, error = %err, "could not move objects back after failed trash");
                    false
                }
            };
            return Err(TrashError::PartialFailure {
                key,
                stage: PendingOp::Trash,
                compensated,
                source: source_err,
            });
        }

        let entry = self.ledger.promote(&key)?;
        tracing::info!(
            key = %key,
            actor = %actor,
            objects = entry.object_count,
            bytes = entry.total_size,
            "moved group to trash"
        );
        Ok(TrashEntry::project(entry, now))
    }

    /// Moves a trashed group back to where it came from.
    ///
    /// Refuses with `Conflict` if the original location holds live objects.
    /// That collision is never overridable.
    pub fn restore(&self, key: &TrashKey, actor: &Actor) -> Result<RestoreResult, TrashError> {
        let entry = self
            .ledger
            .get(key)?
            .ok_or_else(|| TrashError::NotFound(key.clone()))?;
        let destination = GroupRef::new(entry.bucket.clone(), entry.path.clone());
        let slot = self.slot(key)?;

        self.check_destination(key, &destination)?;

        let now = self.clock.now();
        let entry = self
            .ledger
            .claim(key, PendingOp::Restore, actor, now, None)?;

        let objects_moved = match self.store.move_group(&slot, &destination) {
            Ok(moved) => moved,
            Err(ObjectStoreError::Collision(_)) => {
                // Lost a race with a writer; nothing was moved.
                self.ledger.reinstate(key)?;
                let occupied = self.store.group_stats(&destination)?;
                return Err(destination_conflict(key, &destination, occupied.object_count));
            }
            Err(source_err) => {
                let compensated = match self.store.move_group(&destination, &slot) {
                    Ok(_) => settle("reinstate", key, self.ledger.reinstate(key).map(|_| ())),
                    Err(err) => {
                        tracing::warn!(key = %key, error = %err, "could not move objects back after failed restore");
                        false
                    }
                };
                return Err(TrashError::PartialFailure {
                    key: key.clone(),
                    stage: PendingOp::Restore,
                    compensated,
                    source: source_err,
                });
            }
        };

        settle("finish", key, self.ledger.finish(key).map(|_| ()));
        tracing::info!(
            key = %key,
            actor = %actor,
            objects = objects_moved,
            "restored group from trash"
        );
        Ok(RestoreResult {
            restored_key: key.clone(),
            objects_moved,
            item_type: entry.item_type,
        })
    }

    /// Permanently deletes a trashed group.
    ///
    /// Before `eligible_at` this needs `force` and a non-blank `reason`; the
    /// override is recorded in the audit log in the same transaction that
    /// claims the entry. A forced delete always carries a reason and is
    /// always recorded, even once the deadline has passed.
    pub fn delete(
        &self,
        key: &TrashKey,
        force: bool,
        reason: Option<&str>,
        actor: &Actor,
    ) -> Result<DeleteResult, TrashError> {
        let entry = self
            .ledger
            .get(key)?
            .ok_or_else(|| TrashError::NotFound(key.clone()))?;
        let slot = self.slot(key)?;
        let now = self.clock.now();

        let verdict = eligibility(&entry, now);
        let collision = (!verdict.eligible).then(|| Collision::RetentionNotElapsed {
            key: key.clone(),
            eligible_at: verdict.eligible_at,
        });
        let ov = if force {
            Override::requested(reason)
        } else {
            Override::none()
        };

        let justification = match ConflictGuard::check(key.as_str(), collision) {
            Check::Clear if force => Some(
                ov.justification()
                    .ok_or(TrashError::MissingJustification)?,
            ),
            Check::Clear => None,
            Check::Conflict(details) => match ConflictGuard::resolve(details, &ov) {
                Resolution::Proceed { justification } => justification,
                Resolution::MissingJustification => return Err(TrashError::MissingJustification),
                Resolution::StillBlocked(details) => {
                    return Err(TrashError::RetentionNotElapsed {
                        eligible_at: entry.eligible_at,
                        details: Box::new(details),
                    });
                }
            },
        };

        let audit = justification.map(|justification| OverrideAudit {
            key: key.clone(),
            label: entry.item_type.label(&entry.metadata, &entry.path),
            actor: actor.clone(),
            justification,
            at: now,
            action: AuditAction::OverrideDelete,
            eligible_at: entry.eligible_at,
        });

        let claimed = self
            .ledger
            .claim(key, PendingOp::Delete, actor, now, audit.as_ref())?;
        if claimed.eligible_at != entry.eligible_at {
            // Restored and trashed again since the check; its deadline was never looked at.
            self.ledger.reinstate(key)?;
            return Err(TrashError::NotFound(key.clone()));
        }

        let objects_deleted = match self.store.delete_group(&slot) {
            Ok(deleted) => deleted,
            Err(source_err) => {
                let compensated =
                    settle("reinstate", key, self.ledger.reinstate(key).map(|_| ()));
                return Err(TrashError::PartialFailure {
                    key: key.clone(),
                    stage: PendingOp::Delete,
                    compensated,
                    source: source_err,
                });
            }
        };

        settle("finish", key, self.ledger.finish(key).map(|_| ()));
        if let Some(record) = &audit {
            tracing::warn!(
                key = %key,
                actor = %actor,
                eligible_at = ?record.eligible_at,
                justification = %record.justification,
                objects = objects_deleted,
                "override delete before retention deadline"
            );
        } else {
            tracing::info!(
                key = %key,
                actor = %actor,
                objects = objects_deleted,
                "permanently deleted trash entry"
            );
        }

        Ok(DeleteResult {
            objects_deleted,
            overridden: audit.is_some(),
        })
    }

    fn check_destination(&self, key: &TrashKey, destination: &GroupRef) -> Result<(), TrashError> {
        let occupied = self.store.group_stats(destination)?;
        if occupied.is_empty() {
            Ok(())
        } else {
            Err(destination_conflict(key, destination, occupied.object_count))
        }
    }
}

fn destination_conflict(key: &TrashKey, destination: &GroupRef, object_count: u64) -> TrashError {
    let collision = Collision::DestinationOccupied {
        bucket: destination.bucket.clone(),
        path: destination.path.clone(),
        object_count,
    };
    match ConflictGuard::check(key.as_str(), Some(collision)) {
        Check::Conflict(details) => TrashError::Conflict(Box::new(details)),
        Check::Clear => TrashError::Invalid(format!("{key}: destination collision not reported")),
    }
}

/// Logs a failed ledger settlement. Left-over pending records are picked up by
/// the sweep.
fn settle<E: std::fmt::Display>(step: &'static str, key: &TrashKey, result: Result<(), E>) -> bool {
    match result {
        Ok(()) => true,
        Err(err) => {
            tracing::error!(key = %key, step, error = %err, "ledger settlement failed");
            false
        }
    }
}
