//! Append-only log of override actions.
//!
//! Records are never updated or removed through this interface.

use crate::ledger::error::LedgerError;
use crate::types::TrashKey;
use crate::types::record::VersionedAudit;
use crate::types::record::latest::OverrideAudit;
use redb::{
    MultimapTableDefinition, ReadableDatabase, ReadableMultimapTable, ReadableTable,
    TableDefinition, WriteTransaction,
};
use std::sync::Arc;

/// Sequence number → record. Sequence numbers start at 1.
const AUDIT_TABLE: TableDefinition<u64, VersionedAudit> = TableDefinition::new("audit");

const AUDIT_BY_KEY: MultimapTableDefinition<TrashKey, u64> =
    MultimapTableDefinition::new("audit_by_key");

#[derive(Clone)]
pub struct AuditLog {
    db: Arc<redb::Database>,
}

impl AuditLog {
    pub(crate) fn new(db: Arc<redb::Database>) -> Self {
        Self { db }
    }

    pub(crate) fn init(txn: &WriteTransaction) -> Result<(), LedgerError> {
        txn.open_table(AUDIT_TABLE)?;
        txn.open_multimap_table(AUDIT_BY_KEY)?;
        Ok(())
    }

    /// Appends `record` in its own transaction and returns its sequence number.
    pub fn append(&self, record: &OverrideAudit) -> Result<u64, LedgerError> {
        let write_txn = self.db.begin_write()?;
        let seq = Self::append_in(&write_txn, record)?;
        write_txn.commit()?;
        Ok(seq)
    }

    /// Appends `record` inside a caller's transaction. Nothing is durable until
    /// the caller commits.
    pub(crate) fn append_in(
        txn: &WriteTransaction,
        record: &OverrideAudit,
    ) -> Result<u64, LedgerError> {
        let seq = {
            let mut table = txn.open_table(AUDIT_TABLE)?;
            let seq = table.last()?.map(|(seq, _)| seq.value()).unwrap_or(0) + 1;
            table.insert(seq, &VersionedAudit::from(record.clone()))?;
            seq
        };

        let mut index = txn.open_multimap_table(AUDIT_BY_KEY)?;
        index.insert(&record.key, seq)?;
        Ok(seq)
    }

    /// Records for `key`, oldest first.
    pub fn query(&self, key: &TrashKey) -> Result<Vec<OverrideAudit>, LedgerError> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_multimap_table(AUDIT_BY_KEY)?;
        let table = read_txn.open_table(AUDIT_TABLE)?;

        let mut records = Vec::new();
        for seq in index.get(key)? {
            let seq = seq?.value();
            if let Some(guard) = table.get(seq)? {
                records.push(guard.value().into_latest());
            }
        }
        Ok(records)
    }

    /// Number of records ever appended.
    pub fn len(&self) -> Result<u64, LedgerError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(AUDIT_TABLE)?;
        Ok(table.last()?.map(|(seq, _)| seq.value()).unwrap_or(0))
    }

    pub fn is_empty(&self) -> Result<bool, LedgerError> {
        Ok(self.len()? == 0)
    }
}
