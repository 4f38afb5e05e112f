mod common {
    use crate::ledger::Ledger;
    use crate::retention::{RetentionAnchor, RetentionPolicy};
    use crate::types::{Actor, Bucket, Entry, ItemType, Metadata, ObjectPath, TrashKey};
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    pub(super) fn create_test_ledger() -> (Ledger, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let ledger = Ledger::open(&temp_dir.path().join("ledger/reclaim.redb")).unwrap();
        (ledger, temp_dir)
    }

    pub(super) fn t0() -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000)
    }

    pub(super) fn actor() -> Actor {
        Actor::try_new("alice").unwrap()
    }

    pub(super) fn make_entry(path: &str) -> Entry {
        let bucket = Bucket::try_new("books").unwrap();
        let path = ObjectPath::try_new(path).unwrap();
        let policy = RetentionPolicy::from_days(30, RetentionAnchor::YoungestObject);

        Entry {
            key: TrashKey::derive(&bucket, &path),
            bucket,
            path,
            item_type: ItemType::Book,
            object_count: 2,
            total_size: 10,
            metadata: Metadata::new(),
            trashed_at: t0(),
            trashed_by: actor(),
            youngest_last_modified: t0(),
            eligible_at: policy.deadline(t0(), t0()).unwrap(),
            retention: policy.snapshot(),
        }
    }

    /// Puts `entry` at rest in the trash.
    pub(super) fn trash(ledger: &Ledger, entry: &Entry) {
        ledger.begin_trash(entry, &actor(), t0()).unwrap();
        ledger.promote(&entry.key).unwrap();
    }
}

mod trash {
    use super::common::*;
    use crate::ledger::error::LedgerError;
    use crate::types::PendingOp;

    #[test]
    fn test_pending_trash_is_not_listed() {
        let (ledger, _temp) = create_test_ledger();
        let entry = make_entry("acme/algebra");

        ledger.begin_trash(&entry, &actor(), t0()).unwrap();

        assert!(ledger.entries().unwrap().is_empty());
        assert_eq!(
            ledger.pending(&entry.key).unwrap().unwrap().op,
            PendingOp::Trash
        );
    }

    #[test]
    fn test_promote_makes_entry_visible() {
        let (ledger, _temp) = create_test_ledger();
        let entry = make_entry("acme/algebra");

        trash(&ledger, &entry);

        assert_eq!(ledger.get(&entry.key).unwrap().unwrap(), entry);
        assert!(ledger.pending(&entry.key).unwrap().is_none());
    }

    #[test]
    fn test_second_trash_of_same_key_is_rejected() {
        let (ledger, _temp) = create_test_ledger();
        let entry = make_entry("acme/algebra");

        ledger.begin_trash(&entry, &actor(), t0()).unwrap();
        let in_flight = ledger.begin_trash(&entry, &actor(), t0());
        assert!(matches!(in_flight, Err(LedgerError::AlreadyTrashed(_))));

        ledger.promote(&entry.key).unwrap();
        let at_rest = ledger.begin_trash(&entry, &actor(), t0());
        assert!(matches!(at_rest, Err(LedgerError::AlreadyTrashed(_))));
    }

    #[test]
    fn test_abandon_forgets_pending_trash() {
        let (ledger, _temp) = create_test_ledger();
        let entry = make_entry("acme/algebra");

        ledger.begin_trash(&entry, &actor(), t0()).unwrap();
        ledger.abandon(&entry.key).unwrap();

        assert!(ledger.pending(&entry.key).unwrap().is_none());
        assert!(ledger.get(&entry.key).unwrap().is_none());
    }
}

mod claim {
    use super::common::*;
    use crate::ledger::error::LedgerError;
    use crate::types::{AuditAction, Justification, OverrideAudit, PendingOp};

    #[test]
    fn test_claim_moves_entry_to_pending() {
        let (ledger, _temp) = create_test_ledger();
        let entry = make_entry("acme/algebra");
        trash(&ledger, &entry);

        let claimed = ledger
            .claim(&entry.key, PendingOp::Delete, &actor(), t0(), None)
            .unwrap();

        assert_eq!(claimed, entry);
        assert!(ledger.get(&entry.key).unwrap().is_none());
        assert_eq!(
            ledger.pending(&entry.key).unwrap().unwrap().op,
            PendingOp::Delete
        );
    }

    #[test]
    fn test_second_claim_is_not_found() {
        let (ledger, _temp) = create_test_ledger();
        let entry = make_entry("acme/algebra");
        trash(&ledger, &entry);

        ledger
            .claim(&entry.key, PendingOp::Delete, &actor(), t0(), None)
            .unwrap();
        let second = ledger.claim(&entry.key, PendingOp::Restore, &actor(), t0(), None);

        assert!(matches!(second, Err(LedgerError::NotFound(_))));
    }

    #[test]
    fn test_claim_rejects_trash_op() {
        let (ledger, _temp) = create_test_ledger();
        let entry = make_entry("acme/algebra");
        trash(&ledger, &entry);

        let result = ledger.claim(&entry.key, PendingOp::Trash, &actor(), t0(), None);
        assert!(matches!(result, Err(LedgerError::InvalidTransition { .. })));
        assert!(ledger.get(&entry.key).unwrap().is_some());
    }

    #[test]
    fn test_claim_appends_audit_in_same_transaction() {
        let (ledger, _temp) = create_test_ledger();
        let entry = make_entry("acme/algebra");
        trash(&ledger, &entry);

        let record = OverrideAudit {
            key: entry.key.clone(),
            label: "acme/algebra".to_string(),
            actor: actor(),
            justification: Justification::try_new("approved by X").unwrap(),
            at: t0(),
            action: AuditAction::OverrideDelete,
            eligible_at: entry.eligible_at,
        };

        ledger
            .claim(&entry.key, PendingOp::Delete, &actor(), t0(), Some(&record))
            .unwrap();

        assert_eq!(ledger.audit_log().query(&entry.key).unwrap(), vec![record]);
    }

    #[test]
    fn test_failed_claim_writes_no_audit() {
        let (ledger, _temp) = create_test_ledger();
        let entry = make_entry("acme/algebra");

        let record = OverrideAudit {
            key: entry.key.clone(),
            label: "acme/algebra".to_string(),
            actor: actor(),
            justification: Justification::try_new("approved by X").unwrap(),
            at: t0(),
            action: AuditAction::OverrideDelete,
            eligible_at: entry.eligible_at,
        };

        let result = ledger.claim(&entry.key, PendingOp::Delete, &actor(), t0(), Some(&record));
        assert!(matches!(result, Err(LedgerError::NotFound(_))));
        assert!(ledger.audit_log().is_empty().unwrap());
    }
}

mod stale_override {
    use super::common::*;
    use crate::ledger::error::LedgerError;
    use crate::types::{AuditAction, Justification, OverrideAudit, PendingOp};
    use std::time::Duration;

    #[test]
    fn test_audit_for_replaced_entry_aborts_claim() {
        let (ledger, _temp) = create_test_ledger();
        let entry = make_entry("acme/algebra");
        trash(&ledger, &entry);

        let record = OverrideAudit {
            key: entry.key.clone(),
            label: "acme/algebra".to_string(),
            actor: actor(),
            justification: Justification::try_new("approved by X").unwrap(),
            at: t0(),
            action: AuditAction::OverrideDelete,
            eligible_at: entry.eligible_at - Duration::from_secs(1),
        };

        let result = ledger.claim(&entry.key, PendingOp::Delete, &actor(), t0(), Some(&record));
        assert!(matches!(result, Err(LedgerError::Changed(_))));
        assert_eq!(ledger.get(&entry.key).unwrap().unwrap(), entry);
        assert!(ledger.audit_log().is_empty().unwrap());
    }
}

mod compensation {
    use super::common::*;
    use crate::ledger::error::LedgerError;
    use crate::types::PendingOp;
    use std::time::Duration;

    #[test]
    fn test_reinstate_preserves_original_deadline() {
        let (ledger, _temp) = create_test_ledger();
        let entry = make_entry("acme/algebra");
        trash(&ledger, &entry);

        let later = t0() + Duration::from_secs(3600);
        ledger
            .claim(&entry.key, PendingOp::Delete, &actor(), later, None)
            .unwrap();
        let reinstated = ledger.reinstate(&entry.key).unwrap();

        assert_eq!(reinstated.eligible_at, entry.eligible_at);
        assert_eq!(ledger.get(&entry.key).unwrap().unwrap(), entry);
        assert!(ledger.pending(&entry.key).unwrap().is_none());
    }

    #[test]
    fn test_finish_removes_key_entirely() {
        let (ledger, _temp) = create_test_ledger();
        let entry = make_entry("acme/algebra");
        trash(&ledger, &entry);

        ledger
            .claim(&entry.key, PendingOp::Restore, &actor(), t0(), None)
            .unwrap();
        let finished = ledger.finish(&entry.key).unwrap();

        assert_eq!(finished.op, PendingOp::Restore);
        assert!(ledger.get(&entry.key).unwrap().is_none());
        assert!(ledger.pending(&entry.key).unwrap().is_none());
        assert!(ledger.known_slots().unwrap().is_empty());
    }

    #[test]
    fn test_transitions_check_pending_op() {
        let (ledger, _temp) = create_test_ledger();
        let entry = make_entry("acme/algebra");

        ledger.begin_trash(&entry, &actor(), t0()).unwrap();

        assert!(matches!(
            ledger.finish(&entry.key),
            Err(LedgerError::InvalidTransition { .. })
        ));
        assert!(matches!(
            ledger.reinstate(&entry.key),
            Err(LedgerError::InvalidTransition { .. })
        ));
        assert!(matches!(
            ledger.promote(&make_entry("other").key),
            Err(LedgerError::NotFound(_))
        ));
    }
}

mod sweep {
    use super::common::*;
    use crate::types::PendingOp;
    use std::time::Duration;

    #[test]
    fn test_stale_pending_only_returns_old_records() {
        let (ledger, _temp) = create_test_ledger();
        let old = make_entry("old");
        let fresh = make_entry("fresh");
        trash(&ledger, &old);
        trash(&ledger, &fresh);

        ledger
            .claim(&old.key, PendingOp::Delete, &actor(), t0(), None)
            .unwrap();
        ledger
            .claim(
                &fresh.key,
                PendingOp::Delete,
                &actor(),
                t0() + Duration::from_secs(500),
                None,
            )
            .unwrap();

        let stale = ledger
            .stale_pending(t0() + Duration::from_secs(700), Duration::from_secs(600))
            .unwrap();
        assert_eq!(stale.len(), 1);
        assert_eq!(stale[0].entry.key, old.key);
    }

    #[test]
    fn test_known_slots_cover_entries_and_pending() {
        let (ledger, _temp) = create_test_ledger();
        let at_rest = make_entry("a");
        let in_flight = make_entry("b");
        trash(&ledger, &at_rest);
        ledger.begin_trash(&in_flight, &actor(), t0()).unwrap();

        let slots = ledger.known_slots().unwrap();
        assert!(slots.contains(&at_rest.key.trash_slot()));
        assert!(slots.contains(&in_flight.key.trash_slot()));
    }

    #[test]
    fn test_should_sweep_tracks_last_run() {
        let (ledger, _temp) = create_test_ledger();
        let interval = Duration::from_secs(300);

        assert!(ledger.should_sweep(t0(), interval).unwrap());

        ledger.record_sweep(t0()).unwrap();
        assert_eq!(ledger.last_sweep_at().unwrap(), Some(t0()));
        assert!(!ledger.should_sweep(t0() + Duration::from_secs(299), interval).unwrap());
        assert!(ledger.should_sweep(t0() + interval, interval).unwrap());
    }
}

mod durability {
    use super::common::*;
    use crate::ledger::Ledger;

    #[test]
    fn test_entries_survive_reopen() {
        let (ledger, temp) = create_test_ledger();
        let entry = make_entry("acme/algebra");
        trash(&ledger, &entry);
        drop(ledger);

        let reopened = Ledger::open(&temp.path().join("ledger/reclaim.redb")).unwrap();
        assert_eq!(reopened.entries().unwrap(), vec![entry]);
    }
}
