#![allow(dead_code)]

use reclaim_core::object_store::GroupRef;
use reclaim_core::types::{Actor, Bucket, Config, ItemType, Metadata, ObjectPath, SweepConfig, TrashKey};
use reclaim_core::{Clock, ManualClock, MemoryObjectStore, ObjectStore, RetentionAnchor, RetentionPolicy, TrashRequest, TrashService};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

pub const DAY: Duration = Duration::from_secs(24 * 60 * 60);

pub struct Fixture {
    pub service: Arc<TrashService>,
    pub store: Arc<MemoryObjectStore>,
    pub clock: Arc<ManualClock>,
    pub config: Config,
    pub temp: TempDir,
}

/// Instant every object in a fixture is written at.
pub fn t() -> SystemTime {
    SystemTime::UNIX_EPOCH + Duration::from_secs(1_750_000_000)
}

pub fn actor(name: &str) -> Actor {
    Actor::try_new(name).unwrap()
}

pub fn config(temp: &TempDir, days: u32) -> Config {
    Config {
        data_dir: temp.path().join("data"),
        trash_bucket: Bucket::try_new("trash").unwrap(),
        artifact_bucket: Bucket::try_new("books").unwrap(),
        retention: RetentionPolicy::from_days(days, RetentionAnchor::YoungestObject),
        sweep: SweepConfig::default(),
    }
}

pub fn fixture(days: u32) -> Fixture {
    let temp = TempDir::new().unwrap();
    let clock = Arc::new(ManualClock::new(t()));
    let store = Arc::new(MemoryObjectStore::new(clock.clone() as Arc<dyn Clock>));
    let config = config(&temp, days);
    let service = TrashService::open(&config, store.clone(), clock.clone()).unwrap();
    Fixture {
        service: Arc::new(service),
        store,
        clock,
        config,
        temp,
    }
}

pub fn group(bucket: &str, path: &str) -> GroupRef {
    GroupRef::new(
        Bucket::try_new(bucket).unwrap(),
        ObjectPath::try_new(path).unwrap(),
    )
}

pub fn request(bucket: &str, path: &str, item_type: ItemType) -> TrashRequest {
    TrashRequest {
        bucket: Bucket::try_new(bucket).unwrap(),
        path: ObjectPath::try_new(path).unwrap(),
        item_type,
        metadata: Metadata::new(),
    }
}

/// Writes `objects` objects under `bucket/path` at the current clock time and
/// trashes the group.
pub fn trash_group(f: &Fixture, bucket: &str, path: &str, objects: usize) -> TrashKey {
    let live = group(bucket, path);
    for i in 0..objects {
        f.store
            .put_object(&live, &format!("part-{i}.bin"), b"content")
            .unwrap();
    }
    f.service
        .trash(request(bucket, path, ItemType::Book), &actor("seed"))
        .unwrap()
        .entry
        .key
}

pub fn trash_slot(f: &Fixture, key: &TrashKey) -> GroupRef {
    GroupRef::new(
        f.config.trash_bucket.clone(),
        ObjectPath::try_new(key.trash_slot()).unwrap(),
    )
}
