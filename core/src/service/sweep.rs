use super::TrashService;
use super::error::TrashError;
use crate::object_store::GroupRef;
use crate::types::{Pending, PendingOp};

/// What one sweep did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepOutcome {
    /// Stale pending records carried through to their intended end state.
    pub rolled_forward: usize,
    /// Stale pending records that could not be settled this time.
    pub failed: usize,
    /// Trash groups with no ledger record. Reported, never removed.
    pub unrecorded: usize,
}

impl TrashService {
    /// Returns true if a sweep should run (never run or interval elapsed).
    pub fn should_sweep(&self) -> Result<bool, TrashError> {
        Ok(self
            .ledger
            .should_sweep(self.clock.now(), self.sweep.interval)?)
    }

    /// Finishes operations whose compensation also failed.
    ///
    /// Only pending records older than the configured grace period are
    /// touched, so calls still in flight are left alone. Every step is
    /// idempotent: a sweep interrupted half way is completed by the next one.
    pub fn sweep(&self) -> Result<SweepOutcome, TrashError> {
        let now = self.clock.now();
        let mut outcome = SweepOutcome::default();

        for pending in self.ledger.stale_pending(now, self.sweep.pending_grace)? {
            let key = pending.entry.key.clone();
            match self.roll_forward(&pending) {
                Ok(()) => {
                    outcome.rolled_forward += 1;
                    tracing::info!(key = %key, op = ?pending.op, "rolled forward stale operation");
                }
                Err(err) => {
                    outcome.failed += 1;
                    tracing::warn!(key = %key, op = ?pending.op, error = %err, "could not roll forward stale operation");
                }
            }
        }

        outcome.unrecorded = self.report_unrecorded()?;

        self.ledger.record_sweep(now)?;
        tracing::debug!(
            rolled_forward = outcome.rolled_forward,
            failed = outcome.failed,
            unrecorded = outcome.unrecorded,
            "sweep finished"
        );
        Ok(outcome)
    }

    /// Counts trash groups the ledger knows nothing about.
    ///
    /// The store is listed before the ledger is read. A trash in flight has
    /// its pending record written before any object moves, so it is never
    /// counted.
    fn report_unrecorded(&self) -> Result<usize, TrashError> {
        let slots = self.store.list_groups(&self.trash_bucket)?;
        let known = self.ledger.known_slots()?;

        let mut unrecorded = 0;
        for slot in slots.iter().filter(|slot| !known.contains(*slot)) {
            unrecorded += 1;
            tracing::warn!(bucket = %self.trash_bucket, slot = %slot, "trash group has no ledger record");
        }
        Ok(unrecorded)
    }

    fn roll_forward(&self, pending: &Pending) -> Result<(), TrashError> {
        let entry = &pending.entry;
        let original = GroupRef::new(entry.bucket.clone(), entry.path.clone());
        let slot = self.slot(&entry.key)?;

        match pending.op {
            PendingOp::Trash => {
                self.store.move_group(&original, &slot)?;
                self.ledger.promote(&entry.key)?;
            }
            PendingOp::Restore => {
                self.store.move_group(&slot, &original)?;
                self.ledger.finish(&entry.key)?;
            }
            PendingOp::Delete => {
                self.store.delete_group(&slot)?;
                self.ledger.finish(&entry.key)?;
            }
        }
        Ok(())
    }
}
