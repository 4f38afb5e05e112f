pub mod audit;
pub mod clock;
pub mod guard;
pub mod ledger;
pub mod object_store;
pub mod retention;
pub mod service;
pub mod types;
pub mod upload;

pub use clock::{Clock, ManualClock, SystemClock};
pub use guard::{ConflictDetails, ConflictGuard};
pub use object_store::{FsObjectStore, MemoryObjectStore, ObjectStore};
pub use retention::{Eligibility, RetentionAnchor, RetentionPolicy, eligibility};
pub use service::error::TrashError;
pub use service::{DeleteResult, RestoreResult, SweepOutcome, TrashEntry, TrashRequest, TrashService};
pub use upload::error::UploadError;
pub use upload::{UploadOutcome, UploadRequest, UploadService};
