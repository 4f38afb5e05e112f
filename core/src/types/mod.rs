pub(crate) mod config;
pub use config::{
    AppConfig, AppConfigError, AuthConfig, Config, LoggingConfig, RetentionConfig, ServerConfig,
    StorageConfig, SweepConfig, SweepSettings,
};

pub(crate) mod key;
pub use key::{Actor, Bucket, Justification, ObjectPath, TrashKey};

pub(crate) mod item;
pub use item::{ItemType, Metadata, canonicalize_metadata};

pub(crate) mod metadata;

pub mod record;
pub use record::latest::{AuditAction, Entry, OverrideAudit, Pending, PendingOp};

pub(crate) mod pending_stamp;
pub use pending_stamp::PendingStamp;
