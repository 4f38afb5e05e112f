//! Interface to the blob store holding book, app and teacher-material content.
//!
//! Objects are grouped by a key prefix (`GroupRef`). The trash service only ever
//! moves, deletes and inspects whole groups.

use crate::types::{Bucket, ObjectPath};
use std::fmt;
use std::time::SystemTime;

mod fs;
mod memory;

pub use fs::FsObjectStore;
pub use memory::{FaultOp, MemoryObjectStore};

pub mod error {
    use thiserror::Error;

    #[derive(Debug, Error)]
    pub enum ObjectStoreError {
        #[error("object store unavailable: {0}")]
        Unavailable(String),

        #[error("destination object already exists: {0}")]
        Collision(String),

        #[error("invalid object name: {0}")]
        InvalidName(String),

        #[error("IO error: {0}")]
        Io(#[from] std::io::Error),
    }
}

use error::ObjectStoreError;

/// All objects under `bucket/path/`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupRef {
    pub bucket: Bucket,
    pub path: ObjectPath,
}

impl GroupRef {
    pub fn new(bucket: Bucket, path: ObjectPath) -> Self {
        Self { bucket, path }
    }
}

impl fmt::Display for GroupRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.bucket, self.path)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GroupStats {
    pub object_count: u64,
    pub total_size: u64,
    pub newest_last_modified: Option<SystemTime>,
}

impl GroupStats {
    pub fn is_empty(&self) -> bool {
        self.object_count == 0
    }
}

pub trait ObjectStore: Send + Sync {
    fn group_stats(&self, group: &GroupRef) -> Result<GroupStats, ObjectStoreError>;

    fn newest_last_modified(
        &self,
        group: &GroupRef,
    ) -> Result<Option<SystemTime>, ObjectStoreError> {
        Ok(self.group_stats(group)?.newest_last_modified)
    }

    /// Moves every object of `src` under `dst`, keeping relative names.
    ///
    /// Fails with `Collision`, moving nothing, if any destination object
    /// already exists. Objects moved before any other failure stay moved.
    fn move_group(&self, src: &GroupRef, dst: &GroupRef) -> Result<u64, ObjectStoreError>;

    /// Removes every object of `group`. Removing an empty group returns 0.
    fn delete_group(&self, group: &GroupRef) -> Result<u64, ObjectStoreError>;

    /// Writes one object named `name` inside `group`, replacing any object of
    /// the same name. Returns the number of bytes written.
    fn put_object(
        &self,
        group: &GroupRef,
        name: &str,
        data: &[u8],
    ) -> Result<u64, ObjectStoreError>;

    /// Names of the immediate child prefixes of `bucket`.
    fn list_groups(&self, bucket: &Bucket) -> Result<Vec<String>, ObjectStoreError>;
}

/// Checks a relative object name (`a/b.pdf`) for traversal or empty segments.
pub(crate) fn validate_object_name(name: &str) -> Result<(), ObjectStoreError> {
    let valid = !name.is_empty()
        && !name.contains('\\')
        && name
            .split('/')
            .all(|segment| !segment.is_empty() && segment != "." && segment != "..");
    if valid {
        Ok(())
    } else {
        Err(ObjectStoreError::InvalidName(name.to_string()))
    }
}
