use super::RecordVariant;
use crate::retention::RetentionSnapshot;
use crate::types::item::{ItemType, Metadata};
use crate::types::key::{Actor, Bucket, Justification, ObjectPath, TrashKey};
use serde::{Deserialize, Serialize};
use std::time::SystemTime;

/// A group of objects sitting in the trash namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub key: TrashKey,
    pub bucket: Bucket,
    pub path: ObjectPath,
    pub item_type: ItemType,
    /// Advisory; taken when the group was trashed and never re-verified.
    pub object_count: u64,
    /// Advisory; see `object_count`.
    pub total_size: u64,
    pub metadata: Metadata,
    pub trashed_at: SystemTime,
    pub trashed_by: Actor,
    pub youngest_last_modified: SystemTime,
    /// Frozen when the entry is created.
    pub eligible_at: SystemTime,
    pub retention: RetentionSnapshot,
}

impl RecordVariant for Entry {
    const VERSION: u8 = 1;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PendingOp {
    /// Objects are moving into the trash namespace.
    Trash,
    /// Objects are moving back to their original location.
    Restore,
    /// Objects are being removed for good.
    Delete,
}

/// An entry whose object-store step has not completed yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pending {
    pub op: PendingOp,
    pub started_at: SystemTime,
    pub actor: Actor,
    pub entry: Entry,
}

impl RecordVariant for Pending {
    const VERSION: u8 = 1;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// Permanent deletion requested with `force`.
    OverrideDelete,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverrideAudit {
    pub key: TrashKey,
    pub label: String,
    pub actor: Actor,
    pub justification: Justification,
    pub at: SystemTime,
    pub action: AuditAction,
    /// Deadline that was in force when the override happened.
    pub eligible_at: SystemTime,
}

impl RecordVariant for OverrideAudit {
    const VERSION: u8 = 1;
}
