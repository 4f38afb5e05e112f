use super::error::ObjectStoreError;
use super::{GroupRef, GroupStats, ObjectStore, validate_object_name};
use crate::clock::Clock;
use crate::types::Bucket;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::SystemTime;

#[derive(Debug, Clone)]
struct StoredObject {
    data: Vec<u8>,
    last_modified: SystemTime,
}

/// Store operations that can be made to fail once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultOp {
    Stats,
    Move,
    Delete,
    Put,
}

#[derive(Debug, Clone, Copy)]
struct Fault {
    op: FaultOp,
    /// Objects processed before the failure hits.
    after: u64,
}

#[derive(Default)]
struct State {
    buckets: BTreeMap<String, BTreeMap<String, StoredObject>>,
    faults: Vec<Fault>,
    unavailable: bool,
    objects_deleted: u64,
}

impl State {
    fn check(&mut self, op: FaultOp, processed: u64) -> Result<(), ObjectStoreError> {
        if self.unavailable {
            return Err(ObjectStoreError::Unavailable("store offline".to_string()));
        }
        if let Some(pos) = self
            .faults
            .iter()
            .position(|f| f.op == op && f.after == processed)
        {
            self.faults.remove(pos);
            return Err(ObjectStoreError::Unavailable(format!(
                "injected {op:?} fault after {processed} objects"
            )));
        }
        Ok(())
    }

    fn group_keys(&self, group: &GroupRef) -> Vec<String> {
        let prefix = format!("{}/", group.path);
        self.buckets
            .get(group.bucket.as_str())
            .map(|objects| {
                objects
                    .range(prefix.clone()..)
                    .take_while(|(k, _)| k.starts_with(&prefix))
                    .map(|(k, _)| k.clone())
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// In-process store stamped from a [`Clock`], with one-shot fault injection for
/// exercising partial failures.
pub struct MemoryObjectStore {
    clock: Arc<dyn Clock>,
    state: Mutex<State>,
}

impl MemoryObjectStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            state: Mutex::new(State::default()),
        }
    }

    /// Makes the next `op` fail once `after` objects have been processed.
    pub fn fail_next(&self, op: FaultOp, after: u64) {
        self.state.lock().faults.push(Fault { op, after });
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.state.lock().unavailable = unavailable;
    }

    /// Total objects removed through `delete_group` since creation.
    pub fn objects_deleted(&self) -> u64 {
        self.state.lock().objects_deleted
    }

    /// Object keys of `group`, relative to the group prefix.
    pub fn object_names(&self, group: &GroupRef) -> Vec<String> {
        let state = self.state.lock();
        let prefix_len = group.path.len() + 1;
        state
            .group_keys(group)
            .into_iter()
            .map(|k| k[prefix_len..].to_string())
            .collect()
    }

    pub fn read_object(&self, group: &GroupRef, name: &str) -> Option<Vec<u8>> {
        let state = self.state.lock();
        state
            .buckets
            .get(group.bucket.as_str())?
            .get(&format!("{}/{}", group.path, name))
            .map(|o| o.data.clone())
    }
}

impl ObjectStore for MemoryObjectStore {
    fn group_stats(&self, group: &GroupRef) -> Result<GroupStats, ObjectStoreError> {
        let mut state = self.state.lock();
        state.check(FaultOp::Stats, 0)?;

        let mut stats = GroupStats::default();
        if let Some(objects) = state.buckets.get(group.bucket.as_str()) {
            for key in state.group_keys(group) {
                let object = &objects[&key];
                stats.object_count += 1;
                stats.total_size += object.data.len() as u64;
                stats.newest_last_modified = Some(match stats.newest_last_modified {
                    Some(newest) => newest.max(object.last_modified),
                    None => object.last_modified,
                });
            }
        }
        Ok(stats)
    }

    fn move_group(&self, src: &GroupRef, dst: &GroupRef) -> Result<u64, ObjectStoreError> {
        let mut state = self.state.lock();
        let src_prefix_len = src.path.len() + 1;

        let moves: Vec<(String, String)> = state
            .group_keys(src)
            .into_iter()
            .map(|key| {
                let target = format!("{}/{}", dst.path, &key[src_prefix_len..]);
                (key, target)
            })
            .collect();

        if let Some(objects) = state.buckets.get(dst.bucket.as_str()) {
            if let Some((_, target)) = moves.iter().find(|(_, t)| objects.contains_key(t)) {
                return Err(ObjectStoreError::Collision(format!("{}/{}", dst.bucket, target)));
            }
        }

        let mut moved = 0;
        for (key, target) in moves {
            state.check(FaultOp::Move, moved)?;

            let object = state
                .buckets
                .get_mut(src.bucket.as_str())
                .and_then(|objects| objects.remove(&key));
            if let Some(object) = object {
                state
                    .buckets
                    .entry(dst.bucket.to_string())
                    .or_default()
                    .insert(target, object);
                moved += 1;
            }
        }
        state.check(FaultOp::Move, moved)?;
        Ok(moved)
    }

    fn delete_group(&self, group: &GroupRef) -> Result<u64, ObjectStoreError> {
        let mut state = self.state.lock();

        let mut deleted = 0;
        for key in state.group_keys(group) {
            state.check(FaultOp::Delete, deleted)?;
            if let Some(objects) = state.buckets.get_mut(group.bucket.as_str()) {
                objects.remove(&key);
            }
            deleted += 1;
            state.objects_deleted += 1;
        }
        state.check(FaultOp::Delete, deleted)?;
        Ok(deleted)
    }

    fn put_object(
        &self,
        group: &GroupRef,
        name: &str,
        data: &[u8],
    ) -> Result<u64, ObjectStoreError> {
        validate_object_name(name)?;
        let now = self.clock.now();
        let mut state = self.state.lock();
        state.check(FaultOp::Put, 0)?;

        state
            .buckets
            .entry(group.bucket.to_string())
            .or_default()
            .insert(
                format!("{}/{}", group.path, name),
                StoredObject {
                    data: data.to_vec(),
                    last_modified: now,
                },
            );
        Ok(data.len() as u64)
    }

    fn list_groups(&self, bucket: &Bucket) -> Result<Vec<String>, ObjectStoreError> {
        let mut state = self.state.lock();
        state.check(FaultOp::Stats, 0)?;

        let mut groups: Vec<String> = state
            .buckets
            .get(bucket.as_str())
            .map(|objects| {
                objects
                    .keys()
                    .filter_map(|k| k.split_once('/').map(|(head, _)| head.to_string()))
                    .collect()
            })
            .unwrap_or_default();
        groups.dedup();
        Ok(groups)
    }
}
