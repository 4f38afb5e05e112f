//! Versioned artifact uploads.
//!
//! Each version of an entity lives in its own group,
//! `<artifact_bucket>/<entity>/<version>`. Writing to an occupied version is
//! refused unless the caller asks to replace it.

use crate::guard::{Check, Collision, ConflictGuard, Override, Resolution};
use crate::object_store::{GroupRef, ObjectStore, validate_object_name};
use crate::types::{Bucket, ObjectPath};
use crate::upload::error::UploadError;
use std::sync::Arc;
use uuid::Uuid;

pub mod error {
    use crate::guard::ConflictDetails;
    use crate::object_store::error::ObjectStoreError;
    use thiserror::Error;

    #[derive(Debug, Error)]
    pub enum UploadError {
        #[error("{0}")]
        Conflict(Box<ConflictDetails>),

        #[error("Invalid upload: {0}")]
        Invalid(String),

        #[error("Object store unavailable: {0}")]
        UpstreamUnavailable(#[source] ObjectStoreError),
    }

    impl From<ObjectStoreError> for UploadError {
        fn from(err: ObjectStoreError) -> Self {
            match err {
                ObjectStoreError::InvalidName(name) => {
                    UploadError::Invalid(format!("invalid file name: {name}"))
                }
                other => UploadError::UpstreamUnavailable(other),
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub entity: String,
    pub version: String,
    pub file_name: String,
    pub data: Vec<u8>,
    /// Replace the version's existing artifact instead of refusing.
    pub override_existing: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOutcome {
    pub group: GroupRef,
    pub bytes_written: u64,
    /// Objects of the previous artifact removed by an override.
    pub replaced_objects: u64,
}

pub struct UploadService {
    store: Arc<dyn ObjectStore>,
    artifact_bucket: Bucket,
}

/// A single path segment: no slashes, no traversal.
fn segment(field: &str, value: &str) -> Result<ObjectPath, UploadError> {
    if value.contains('/') {
        return Err(UploadError::Invalid(format!("{field} must not contain '/'")));
    }
    ObjectPath::try_new(value).map_err(|e| UploadError::Invalid(format!("{field}: {e}")))
}

impl UploadService {
    pub fn new(store: Arc<dyn ObjectStore>, artifact_bucket: Bucket) -> Self {
        Self {
            store,
            artifact_bucket,
        }
    }

    /// Group a version's artifact lives in.
    pub fn version_group(&self, entity: &str, version: &str) -> Result<GroupRef, UploadError> {
        let path = segment("entity", entity)?
            .join(segment("version", version)?.as_str())
            .map_err(|e| UploadError::Invalid(e.to_string()))?;
        Ok(GroupRef::new(self.artifact_bucket.clone(), path))
    }

    /// Stores `request.data` as the artifact of `request.version`.
    ///
    /// An existing artifact for that version yields `Conflict(VERSION_EXISTS)`
    /// unless `override_existing` is set, in which case it is replaced. The
    /// override takes no reason and is not audited.
    pub fn upload(&self, request: UploadRequest) -> Result<UploadOutcome, UploadError> {
        let group = self.version_group(&request.entity, &request.version)?;
        validate_object_name(&request.file_name)?;
        let existing = self.store.group_stats(&group)?;

        let collision = (!existing.is_empty()).then(|| Collision::VersionExists {
            entity: request.entity.clone(),
            version: request.version.clone(),
        });
        let operation = format!("{}@{}", request.entity, request.version);
        let ov = if request.override_existing {
            Override::requested(None)
        } else {
            Override::none()
        };

        let replace = match ConflictGuard::check(&operation, collision) {
            Check::Clear => false,
            Check::Conflict(details) => match ConflictGuard::resolve(details, &ov) {
                Resolution::Proceed { .. } => true,
                Resolution::StillBlocked(details) => {
                    return Err(UploadError::Conflict(Box::new(details)));
                }
                Resolution::MissingJustification => {
                    return Err(UploadError::Invalid(
                        "version override unexpectedly asked for a reason".to_string(),
                    ));
                }
            },
        };

        let (bytes_written, replaced_objects) = if replace {
            self.replace(&request, &group)?
        } else {
            let bytes = self
                .store
                .put_object(&group, &request.file_name, &request.data)?;
            (bytes, 0)
        };

        tracing::info!(
            group = %group,
            file = %request.file_name,
            bytes = bytes_written,
            replaced = replaced_objects,
            "stored artifact"
        );
        Ok(UploadOutcome {
            group,
            bytes_written,
            replaced_objects,
        })
    }
}

impl UploadService {
    /// Sibling group a replacement is written to before the old artifact goes.
    fn staging_group(&self, entity: &str) -> Result<GroupRef, UploadError> {
        let path = segment("entity", entity)?
            .join(&format!(".upload-{}", Uuid::new_v4().simple()))
            .map_err(|e| UploadError::Invalid(e.to_string()))?;
        Ok(GroupRef::new(self.artifact_bucket.clone(), path))
    }

    /// Writes the new artifact aside, then swaps it in for the old one.
    ///
    /// The old artifact is only removed once the new bytes are stored.
    fn replace(
        &self,
        request: &UploadRequest,
        group: &GroupRef,
    ) -> Result<(u64, u64), UploadError> {
        let staging = self.staging_group(&request.entity)?;

        let bytes_written = match self
            .store
            .put_object(&staging, &request.file_name, &request.data)
        {
            Ok(bytes) => bytes,
            Err(err) => {
                self.discard(&staging);
                return Err(err.into());
            }
        };

        let replaced_objects = match self.store.delete_group(group) {
            Ok(count) => count,
            Err(err) => {
                self.discard(&staging);
                return Err(err.into());
            }
        };

        if let Err(err) = self.store.move_group(&staging, group) {
            tracing::error!(
                group = %group,
                staged = %staging,
                error = %err,
                "replacement artifact left in staging"
            );
            return Err(err.into());
        }
        Ok((bytes_written, replaced_objects))
    }

    fn discard(&self, staging: &GroupRef) {
        if let Err(err) = self.store.delete_group(staging) {
            tracing::warn!(staged = %staging, error = %err, "could not remove staged upload");
        }
    }
}
