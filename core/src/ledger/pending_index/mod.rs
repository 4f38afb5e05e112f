//! Which pending records have been in flight the longest.
//!
//! Rows are written and removed in the same transaction as the pending record
//! they describe, so the index never outlives or predates one.

use crate::ledger::error::LedgerError;
use crate::types::{Pending, PendingStamp, TrashKey};
use redb::{ReadTransaction, ReadableTable, TableDefinition, WriteTransaction};
use std::time::SystemTime;

const PENDING_SINCE: TableDefinition<PendingStamp, ()> = TableDefinition::new("pending_since");

pub(super) fn init(txn: &WriteTransaction) -> Result<(), LedgerError> {
    txn.open_table(PENDING_SINCE)?;
    Ok(())
}

pub(super) fn track(txn: &WriteTransaction, pending: &Pending) -> Result<(), LedgerError> {
    let mut table = txn.open_table(PENDING_SINCE)?;
    table.insert(PendingStamp::of(pending), ())?;
    Ok(())
}

/// Returns `false` if `pending` was not tracked.
pub(super) fn untrack(txn: &WriteTransaction, pending: &Pending) -> Result<bool, LedgerError> {
    let mut table = txn.open_table(PENDING_SINCE)?;
    Ok(table.remove(PendingStamp::of(pending))?.is_some())
}

/// Keys of records started strictly before `cutoff`, oldest first.
pub(super) fn started_before(
    txn: &ReadTransaction,
    cutoff: SystemTime,
) -> Result<Vec<TrashKey>, LedgerError> {
    let table = txn.open_table(PENDING_SINCE)?;

    let mut keys = Vec::new();
    for row in table.iter()? {
        let stamp = row?.0.value();
        if stamp.started_at >= cutoff {
            break;
        }
        keys.push(stamp.key);
    }
    Ok(keys)
}
