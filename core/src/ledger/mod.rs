//! Durable record of trashed groups.
//!
//! This module handles all redb operations for the trash lifecycle:
//! - `entries`: groups at rest in the trash (TrashKey → VersionedEntry)
//! - `pending`: groups whose object-store step is in flight
//! - `pending_since`: age index over `pending` for the sweep
//! - `metadata`: sweep bookkeeping (JSON strings)
//!
//! The audit tables live in the same database so an override can be recorded
//! in the transaction that claims the entry.

use crate::audit::AuditLog;
use crate::ledger::error::LedgerError;
use crate::types::metadata::SweepMetadata;
use crate::types::record::latest::{Entry, OverrideAudit, Pending, PendingOp};
use crate::types::record::{VersionedEntry, VersionedPending};
use crate::types::{Actor, TrashKey};
use redb::{ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

pub mod error {
    use crate::types::{PendingOp, TrashKey};
    use thiserror::Error;

    #[derive(Debug, Error)]
    pub enum LedgerError {
        #[error("Database error: {0}")]
        Redb(#[from] redb::DatabaseError),

        #[error("Table error: {0}")]
        TableError(#[from] redb::TableError),

        #[error("Storage error: {0}")]
        StorageError(#[from] redb::StorageError),

        #[error("Transaction error: {0}")]
        TransactionError(#[from] redb::TransactionError),

        #[error("Commit error: {0}")]
        CommitError(#[from] redb::CommitError),

        #[error("IO error: {0}")]
        Io(#[from] std::io::Error),

        #[error("Metadata encoding error: {0}")]
        Metadata(#[from] serde_json::Error),

        #[error("Trash entry not found: {0}")]
        NotFound(TrashKey),

        #[error("Already in trash: {0}")]
        AlreadyTrashed(TrashKey),

        #[error("Trash entry was replaced while being claimed: {0}")]
        Changed(TrashKey),

        #[error("No pending {expected:?} for {key}")]
        InvalidTransition { key: TrashKey, expected: PendingOp },
    }
}

mod pending_index;

const ENTRIES_TABLE: TableDefinition<TrashKey, VersionedEntry> = TableDefinition::new("entries");

const PENDING_TABLE: TableDefinition<TrashKey, VersionedPending> =
    TableDefinition::new("pending");

/// Metadata table: &str → JSON string
const METADATA_TABLE: TableDefinition<&str, &str> = TableDefinition::new("metadata");

const METADATA_KEY_SWEEP: &str = "sweep";

#[derive(Clone)]
pub struct Ledger {
    db: Arc<redb::Database>,
}

impl Ledger {
    /// Creates or opens the ledger database at `path`.
    pub fn open(path: &Path) -> Result<Self, LedgerError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db = redb::Database::create(path)?;

        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(ENTRIES_TABLE)?;
            let _ = write_txn.open_table(PENDING_TABLE)?;
            let _ = write_txn.open_table(METADATA_TABLE)?;
            pending_index::init(&write_txn)?;
            AuditLog::init(&write_txn)?;
        }
        write_txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Audit log stored alongside the ledger.
    pub fn audit_log(&self) -> AuditLog {
        AuditLog::new(self.db.clone())
    }
}

/// Read operations.
impl Ledger {
    pub fn get(&self, key: &TrashKey) -> Result<Option<Entry>, LedgerError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ENTRIES_TABLE)?;

        Ok(table.get(key)?.map(|guard| guard.value().into_latest()))
    }

    /// All entries at rest in the trash, in key order.
    pub fn entries(&self) -> Result<Vec<Entry>, LedgerError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ENTRIES_TABLE)?;

        let mut entries = Vec::new();
        for item in table.iter()? {
            let (_, guard) = item?;
            entries.push(guard.value().into_latest());
        }
        Ok(entries)
    }

    pub fn pending(&self, key: &TrashKey) -> Result<Option<Pending>, LedgerError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PENDING_TABLE)?;

        Ok(table.get(key)?.map(|guard| guard.value().into_latest()))
    }

    /// Trash slots referenced by any entry or pending record.
    pub fn known_slots(&self) -> Result<HashSet<String>, LedgerError> {
        let read_txn = self.db.begin_read()?;
        let entries = read_txn.open_table(ENTRIES_TABLE)?;
        let pending = read_txn.open_table(PENDING_TABLE)?;

        let mut slots = HashSet::new();
        for item in entries.iter()? {
            let (key, _) = item?;
            slots.insert(key.value().trash_slot());
        }
        for item in pending.iter()? {
            let (key, _) = item?;
            slots.insert(key.value().trash_slot());
        }
        Ok(slots)
    }

    /// Pending records that started more than `grace` before `now`, oldest first.
    pub fn stale_pending(
        &self,
        now: SystemTime,
        grace: Duration,
    ) -> Result<Vec<Pending>, LedgerError> {
        let Some(cutoff) = now.checked_sub(grace) else {
            return Ok(Vec::new());
        };
        let read_txn = self.db.begin_read()?;
        let keys = pending_index::started_before(&read_txn, cutoff)?;
        let table = read_txn.open_table(PENDING_TABLE)?;

        let mut stale = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(guard) = table.get(&key)? {
                stale.push(guard.value().into_latest());
            }
        }
        Ok(stale)
    }
}

/// Lifecycle transitions.
///
/// Every transition is one write transaction; redb runs write transactions one
/// at a time, so the existence checks below cannot interleave.
impl Ledger {
    /// Records that `entry` is on its way into the trash.
    ///
    /// Returns `Err(AlreadyTrashed)` if the key is at rest or in flight.
    pub fn begin_trash(
        &self,
        entry: &Entry,
        actor: &Actor,
        now: SystemTime,
    ) -> Result<(), LedgerError> {
        let write_txn = self.db.begin_write()?;

        {
            let entries = write_txn.open_table(ENTRIES_TABLE)?;
            if entries.get(&entry.key)?.is_some() {
                return Err(LedgerError::AlreadyTrashed(entry.key.clone()));
            }
        }

        Self::insert_pending(
            &write_txn,
            Pending {
                op: PendingOp::Trash,
                started_at: now,
                actor: actor.clone(),
                entry: entry.clone(),
            },
        )?;

        write_txn.commit()?;
        Ok(())
    }

    /// Atomically takes `key` out of the trash for a restore or delete.
    ///
    /// This is the commit point: exactly one concurrent caller gets the entry,
    /// the rest get `Err(NotFound)`. When `audit` is given it is appended in the
    /// same transaction, so an override never claims an entry without its record.
    /// An audit record naming a different deadline than the stored entry aborts
    /// the claim with `Err(Changed)`.
    pub fn claim(
        &self,
        key: &TrashKey,
        op: PendingOp,
        actor: &Actor,
        now: SystemTime,
        audit: Option<&OverrideAudit>,
    ) -> Result<Entry, LedgerError> {
        if op == PendingOp::Trash {
            return Err(LedgerError::InvalidTransition {
                key: key.clone(),
                expected: PendingOp::Restore,
            });
        }

        let write_txn = self.db.begin_write()?;

        let entry = {
            let mut entries = write_txn.open_table(ENTRIES_TABLE)?;
            entries
                .remove(key)?
                .map(|guard| guard.value().into_latest())
                .ok_or_else(|| LedgerError::NotFound(key.clone()))?
        };

        if let Some(record) = audit {
            // The record names the deadline that was overridden; it must be this entry's.
            if record.eligible_at != entry.eligible_at {
                return Err(LedgerError::Changed(key.clone()));
            }
            AuditLog::append_in(&write_txn, record)?;
        }

        Self::insert_pending(
            &write_txn,
            Pending {
                op,
                started_at: now,
                actor: actor.clone(),
                entry: entry.clone(),
            },
        )?;

        write_txn.commit()?;
        Ok(entry)
    }

    /// Completes a trash: the pending record becomes an entry at rest.
    pub fn promote(&self, key: &TrashKey) -> Result<Entry, LedgerError> {
        let write_txn = self.db.begin_write()?;

        let pending = Self::take_pending(&write_txn, key, &[PendingOp::Trash])?;
        {
            let mut entries = write_txn.open_table(ENTRIES_TABLE)?;
            entries.insert(key, &VersionedEntry::from(pending.entry.clone()))?;
        }

        write_txn.commit()?;
        Ok(pending.entry)
    }

    /// Completes a restore or delete. The key leaves the ledger for good.
    pub fn finish(&self, key: &TrashKey) -> Result<Pending, LedgerError> {
        let write_txn = self.db.begin_write()?;
        let pending =
            Self::take_pending(&write_txn, key, &[PendingOp::Restore, PendingOp::Delete])?;
        write_txn.commit()?;
        Ok(pending)
    }

    /// Compensates a failed restore or delete by putting the original entry
    /// back, `eligible_at` included.
    pub fn reinstate(&self, key: &TrashKey) -> Result<Entry, LedgerError> {
        let write_txn = self.db.begin_write()?;

        let pending =
            Self::take_pending(&write_txn, key, &[PendingOp::Restore, PendingOp::Delete])?;
        {
            let mut entries = write_txn.open_table(ENTRIES_TABLE)?;
            entries.insert(key, &VersionedEntry::from(pending.entry.clone()))?;
        }

        write_txn.commit()?;
        Ok(pending.entry)
    }

    /// Compensates a failed trash by forgetting the pending record.
    pub fn abandon(&self, key: &TrashKey) -> Result<(), LedgerError> {
        let write_txn = self.db.begin_write()?;
        Self::take_pending(&write_txn, key, &[PendingOp::Trash])?;
        write_txn.commit()?;
        Ok(())
    }
}

/// Pending record helpers.
impl Ledger {
    fn insert_pending(txn: &WriteTransaction, pending: Pending) -> Result<(), LedgerError> {
        let key = pending.entry.key.clone();
        {
            let mut table = txn.open_table(PENDING_TABLE)?;
            if table.get(&key)?.is_some() {
                return Err(LedgerError::AlreadyTrashed(key));
            }
            table.insert(&key, &VersionedPending::from(pending.clone()))?;
        }
        pending_index::track(txn, &pending)?;
        Ok(())
    }

    fn take_pending(
        txn: &WriteTransaction,
        key: &TrashKey,
        allowed: &[PendingOp],
    ) -> Result<Pending, LedgerError> {
        let pending = {
            let mut table = txn.open_table(PENDING_TABLE)?;
            let pending = table
                .get(key)?
                .map(|guard| guard.value().into_latest())
                .ok_or_else(|| LedgerError::NotFound(key.clone()))?;
            if !allowed.contains(&pending.op) {
                return Err(LedgerError::InvalidTransition {
                    key: key.clone(),
                    expected: allowed[0],
                });
            }
            table.remove(key)?;
            pending
        };
        pending_index::untrack(txn, &pending)?;
        Ok(pending)
    }
}

/// Sweep bookkeeping.
impl Ledger {
    fn sweep_metadata(&self) -> Result<SweepMetadata, LedgerError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(METADATA_TABLE)?;
        match table.get(METADATA_KEY_SWEEP)? {
            Some(guard) => Ok(serde_json::from_str(guard.value())?),
            None => Ok(SweepMetadata::default()),
        }
    }

    pub fn record_sweep(&self, now: SystemTime) -> Result<(), LedgerError> {
        let json = serde_json::to_string(&SweepMetadata {
            last_run_at: Some(now),
        })?;
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(METADATA_TABLE)?;
            table.insert(METADATA_KEY_SWEEP, json.as_str())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    pub fn last_sweep_at(&self) -> Result<Option<SystemTime>, LedgerError> {
        Ok(self.sweep_metadata()?.last_run_at)
    }

    /// Returns true if a sweep should run (never run or interval elapsed).
    pub fn should_sweep(&self, now: SystemTime, interval: Duration) -> Result<bool, LedgerError> {
        Ok(match self.last_sweep_at()? {
            None => true,
            Some(last) => now
                .duration_since(last)
                .map(|d| d >= interval)
                .unwrap_or(true),
        })
    }
}

#[cfg(test)]
mod tests;
