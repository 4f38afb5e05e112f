use super::error::ObjectStoreError;
use super::{GroupRef, GroupStats, ObjectStore, validate_object_name};
use crate::types::Bucket;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Directory-backed store: one directory per bucket, one file per object, file
/// mtime as last-modified.
pub struct FsObjectStore {
    root: PathBuf,
}

fn remove_dir_if_empty(path: &Path) -> Result<bool, ObjectStoreError> {
    if path.is_dir() && path.read_dir()?.next().is_none() {
        std::fs::remove_dir(path)?;
        return Ok(true);
    }
    Ok(false)
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, ObjectStoreError> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn bucket_dir(&self, bucket: &Bucket) -> PathBuf {
        self.root.join(bucket.as_str())
    }

    fn group_dir(&self, group: &GroupRef) -> PathBuf {
        self.bucket_dir(&group.bucket).join(group.path.as_str())
    }

    fn ensure_root(&self) -> Result<(), ObjectStoreError> {
        if self.root.is_dir() {
            Ok(())
        } else {
            Err(ObjectStoreError::Unavailable(format!(
                "root directory {} is missing",
                self.root.display()
            )))
        }
    }

    /// Files under `dir`, relative to it. A missing directory has no files.
    fn files(dir: &Path) -> Result<Vec<PathBuf>, ObjectStoreError> {
        if !dir.is_dir() {
            return Ok(vec![]);
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(dir).min_depth(1) {
            let entry = entry.map_err(|e| ObjectStoreError::Io(e.into()))?;
            if entry.file_type().is_file() {
                let rel = entry
                    .path()
                    .strip_prefix(dir)
                    .map_err(|e| ObjectStoreError::InvalidName(e.to_string()))?;
                files.push(rel.to_path_buf());
            }
        }
        Ok(files)
    }

    /// Removes empty directories left under `dir`, then `dir` and its empty
    /// ancestors up to the bucket directory.
    fn prune(&self, dir: &Path, bucket: &Bucket) -> Result<(), ObjectStoreError> {
        if dir.is_dir() {
            for entry in WalkDir::new(dir).min_depth(1).contents_first(true) {
                let entry = entry.map_err(|e| ObjectStoreError::Io(e.into()))?;
                if entry.file_type().is_dir() {
                    remove_dir_if_empty(entry.path())?;
                }
            }
        }

        let stop = self.bucket_dir(bucket);
        let mut current = Some(dir);
        while let Some(path) = current {
            if path == stop || !path.starts_with(&stop) {
                break;
            }
            if path.exists() && !remove_dir_if_empty(path)? {
                break;
            }
            current = path.parent();
        }
        Ok(())
    }
}

impl ObjectStore for FsObjectStore {
    fn group_stats(&self, group: &GroupRef) -> Result<GroupStats, ObjectStoreError> {
        self.ensure_root()?;
        let dir = self.group_dir(group);

        let mut stats = GroupStats::default();
        for rel in Self::files(&dir)? {
            let metadata = std::fs::metadata(dir.join(rel))?;
            let modified = metadata.modified()?;

            stats.object_count += 1;
            stats.total_size += metadata.len();
            stats.newest_last_modified = Some(match stats.newest_last_modified {
                Some(newest) => newest.max(modified),
                None => modified,
            });
        }
        Ok(stats)
    }

    fn move_group(&self, src: &GroupRef, dst: &GroupRef) -> Result<u64, ObjectStoreError> {
        self.ensure_root()?;
        let src_dir = self.group_dir(src);
        let dst_dir = self.group_dir(dst);

        let files = Self::files(&src_dir)?;
        if let Some(rel) = files.iter().find(|rel| dst_dir.join(rel).exists()) {
            return Err(ObjectStoreError::Collision(format!(
                "{}/{}",
                dst,
                rel.display()
            )));
        }

        let mut moved = 0;
        for rel in files {
            let target = dst_dir.join(&rel);
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::rename(src_dir.join(&rel), &target)?;
            moved += 1;
        }

        self.prune(&src_dir, &src.bucket)?;
        Ok(moved)
    }

    fn delete_group(&self, group: &GroupRef) -> Result<u64, ObjectStoreError> {
        self.ensure_root()?;
        let dir = self.group_dir(group);

        let mut deleted = 0;
        for rel in Self::files(&dir)? {
            std::fs::remove_file(dir.join(rel))?;
            deleted += 1;
        }

        self.prune(&dir, &group.bucket)?;
        Ok(deleted)
    }

    fn put_object(
        &self,
        group: &GroupRef,
        name: &str,
        data: &[u8],
    ) -> Result<u64, ObjectStoreError> {
        self.ensure_root()?;
        validate_object_name(name)?;

        let path = self.group_dir(group).join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, data)?;
        Ok(data.len() as u64)
    }

    fn list_groups(&self, bucket: &Bucket) -> Result<Vec<String>, ObjectStoreError> {
        self.ensure_root()?;
        let dir = self.bucket_dir(bucket);
        if !dir.is_dir() {
            return Ok(vec![]);
        }

        let mut groups = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    groups.push(name.to_string());
                }
            }
        }
        groups.sort();
        Ok(groups)
    }
}
