use reclaim_core::guard::{CODE_DESTINATION_OCCUPIED, CODE_RETENTION_NOT_ELAPSED};
use reclaim_core::object_store::FaultOp;
use reclaim_core::types::ItemType;
use reclaim_core::{
    Clock, FsObjectStore, ManualClock, ObjectStore, RetentionAnchor, RetentionPolicy, TrashError,
    TrashService, eligibility,
};
use std::sync::Arc;
use std::time::SystemTime;

mod common;
use common::*;

#[test]
fn test_thirty_day_window_boundary() {
    let f = fixture(30);
    let key = trash_group(&f, "books", "acme/algebra", 2);

    let entry = f.service.get(&key).unwrap().entry;
    assert_eq!(entry.youngest_last_modified, t());
    assert_eq!(entry.eligible_at, t() + 30 * DAY);

    f.clock.set(t() + 29 * DAY);
    assert!(!f.service.get(&key).unwrap().eligible_for_deletion);
    assert!(!eligibility(&entry, f.clock.now()).eligible);

    f.clock.set(t() + 30 * DAY);
    assert!(f.service.get(&key).unwrap().eligible_for_deletion);
    assert!(eligibility(&entry, f.clock.now()).eligible);
}

#[test]
fn test_youngest_object_anchors_the_window() {
    let f = fixture(30);
    let live = group("books", "acme/geometry");
    f.store.put_object(&live, "old.pdf", b"old").unwrap();
    f.clock.advance(10 * DAY);
    f.store.put_object(&live, "new.pdf", b"new").unwrap();
    f.clock.advance(DAY);

    let entry = f
        .service
        .trash(request("books", "acme/geometry", ItemType::Book), &actor("ops"))
        .unwrap()
        .entry;
    assert_eq!(entry.youngest_last_modified, t() + 10 * DAY);
    assert_eq!(entry.eligible_at, t() + 40 * DAY);
}

#[test]
fn test_retention_change_only_affects_later_trash() {
    let f = fixture(30);
    let before = trash_group(&f, "books", "before", 1);

    let shorter = TrashService::new(
        f.service.ledger().clone(),
        f.store.clone(),
        f.clock.clone(),
        &reclaim_core::types::Config {
            retention: RetentionPolicy::from_days(5, RetentionAnchor::YoungestObject),
            ..f.config.clone()
        },
    );
    let live = group("books", "after");
    f.store.put_object(&live, "a.bin", b"a").unwrap();
    let after = shorter
        .trash(request("books", "after", ItemType::App), &actor("ops"))
        .unwrap()
        .entry
        .key;

    assert_eq!(shorter.get(&before).unwrap().entry.eligible_at, t() + 30 * DAY);
    assert_eq!(shorter.get(&after).unwrap().entry.eligible_at, t() + 5 * DAY);
}

#[test]
fn test_restore_then_everything_is_not_found() {
    let f = fixture(30);
    let key = trash_group(&f, "books", "acme/algebra", 3);

    let restored = f.service.restore(&key, &actor("ops")).unwrap();
    assert_eq!(restored.objects_moved, 3);
    assert!(f.service.list().unwrap().is_empty());

    assert!(matches!(
        f.service.restore(&key, &actor("ops")),
        Err(TrashError::NotFound(_))
    ));
    assert!(matches!(
        f.service.delete(&key, true, Some("approved by X"), &actor("ops")),
        Err(TrashError::NotFound(_))
    ));
    assert!(f.service.audit(&key).unwrap().is_empty());
}

#[test]
fn test_override_protocol() {
    let f = fixture(30);
    let key = trash_group(&f, "books", "acme/algebra", 2);
    f.clock.advance(3 * DAY);

    let Err(TrashError::RetentionNotElapsed {
        eligible_at,
        details,
    }) = f.service.delete(&key, false, None, &actor("ops"))
    else {
        panic!("expected retention block");
    };
    assert_eq!(eligible_at, t() + 30 * DAY);
    assert_eq!(details.code, CODE_RETENTION_NOT_ELAPSED);

    assert!(matches!(
        f.service.delete(&key, true, Some(""), &actor("ops")),
        Err(TrashError::MissingJustification)
    ));

    let deleted = f
        .service
        .delete(&key, true, Some("approved by X"), &actor("ops"))
        .unwrap();
    assert_eq!(deleted.objects_deleted, 2);

    let records = f.service.audit(&key).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].justification.as_str(), "approved by X");
    assert_eq!(records[0].at, t() + 3 * DAY);
}

#[test]
fn test_restore_into_live_destination_is_refused() {
    let f = fixture(30);
    let key = trash_group(&f, "books", "acme/algebra", 2);
    let live = group("books", "acme/algebra");
    f.store.put_object(&live, "replacement.pdf", b"live").unwrap();

    let Err(TrashError::Conflict(details)) = f.service.restore(&key, &actor("ops")) else {
        panic!("expected destination conflict");
    };
    assert_eq!(details.code, CODE_DESTINATION_OCCUPIED);

    assert_eq!(f.store.object_names(&live), vec!["replacement.pdf"]);
    assert_eq!(f.store.object_names(&trash_slot(&f, &key)).len(), 2);
    assert_eq!(f.service.list().unwrap().len(), 1);
}

#[test]
fn test_partial_delete_failure_keeps_original_deadline() {
    let f = fixture(30);
    let key = trash_group(&f, "books", "acme/algebra", 3);
    f.clock.advance(5 * DAY);
    f.store.fail_next(FaultOp::Delete, 2);

    let Err(TrashError::PartialFailure {
        compensated, stage, ..
    }) = f.service.delete(&key, true, Some("legal hold lifted"), &actor("ops"))
    else {
        panic!("expected partial failure");
    };
    assert!(compensated);
    assert_eq!(stage, reclaim_core::types::PendingOp::Delete);

    let entry = f.service.get(&key).unwrap().entry;
    assert_eq!(entry.eligible_at, t() + 30 * DAY);
    // The claim committed with its audit record before the store failed.
    assert_eq!(f.service.audit(&key).unwrap().len(), 1);
}

#[test]
fn test_entry_survives_out_of_band_purge() {
    let f = fixture(30);
    let key = trash_group(&f, "books", "acme/algebra", 2);
    f.store.delete_group(&trash_slot(&f, &key)).unwrap();

    assert_eq!(f.service.list().unwrap().len(), 1);
    f.clock.set(t() + 30 * DAY);
    let deleted = f.service.delete(&key, false, None, &actor("ops")).unwrap();
    assert_eq!(deleted.objects_deleted, 0);
    assert!(f.service.list().unwrap().is_empty());
}

#[test]
fn test_filesystem_round_trip_survives_reopen() {
    let temp = tempfile::TempDir::new().unwrap();
    let config = config(&temp, 30);
    let clock = Arc::new(ManualClock::new(SystemTime::now()));
    let store = Arc::new(FsObjectStore::new(temp.path().join("objects")).unwrap());

    let live = group("books", "acme/algebra");
    store.put_object(&live, "cover.png", b"png").unwrap();
    store.put_object(&live, "pages/1.pdf", b"pdf").unwrap();

    let key = {
        let service = TrashService::open(&config, store.clone(), clock.clone()).unwrap();
        let trashed = service
            .trash(request("books", "acme/algebra", ItemType::Book), &actor("ops"))
            .unwrap();
        assert_eq!(trashed.entry.object_count, 2);
        trashed.entry.key
    };
    assert!(!temp.path().join("objects/books/acme").exists());

    let service = TrashService::open(&config, store.clone(), clock.clone()).unwrap();
    assert_eq!(service.list().unwrap().len(), 1);
    let restored = service.restore(&key, &actor("ops")).unwrap();
    assert_eq!(restored.objects_moved, 2);
    assert!(temp.path().join("objects/books/acme/algebra/pages/1.pdf").exists());
}
