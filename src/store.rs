use std::{
    fs::{create_dir_all, read_to_string, write},
    io::ErrorKind,
    path::{Path, PathBuf},
};

use tracing::{debug, warn};

use crate::{
    bucket::{BucketSource, StampRequest},
    error::{Error, Result},
    types::{Version, VersionRecord},
};

/// Holds the single latest version in a one-line text file.
///
/// Only the version string is written, so a record read back carries a
/// synthesized description and the time it was read.
pub struct VersionStore<S: BucketSource> {
    path:   PathBuf,
    source: S,
}
impl<S: BucketSource> VersionStore<S> {
    pub fn new(path: impl Into<PathBuf>, source: S) -> Self {
        VersionStore {
            path: path.into(),
            source,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// The recorded version, or `None` if the store is missing, empty or malformed.
    pub fn read_current(&self) -> Option<VersionRecord> {
        let content = match read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no version store");
                return None;
            }
            Err(e) => {
                warn!(path = %self.path.display(), "couldn't read version store: {}", e);
                return None;
            }
        };
        match content.trim().parse::<Version>() {
            Ok(version) => Some(VersionRecord::new(version, None)),
            Err(e) => {
                if !content.trim().is_empty() {
                    warn!(path = %self.path.display(), "ignoring version store: {}", e);
                }
                None
            }
        }
    }

    /// Build number for `head` in `bucket`: one past the recorded build if both
    /// match the recorded version, otherwise 1.
    pub fn next_build(&self, head: u32, bucket: u32) -> Result<u32> {
        match self.read_current() {
            Some(current) if current.version.head == head && current.version.bucket == bucket => {
                current
                    .version
                    .build
                    .checked_add(1)
                    .ok_or_else(|| Error::BuildOverflow(current.version.to_string()))
            }
            _ => Ok(1),
        }
    }

    /// Computes, persists and returns the next version. The store is only
    /// written once every part of the version is known.
    pub fn generate_next(
        &self, head: Option<u32>, description: Option<&str>, suffix: Option<&str>,
    ) -> Result<VersionRecord> {
        let head = head.unwrap_or_else(|| {
            self.read_current()
                .map(|current| current.version.head)
                .unwrap_or(0)
        });
        let bucket = self.source.bucket()?;
        let build = self.next_build(head, bucket)?;
        debug!(head, bucket, build, "stamping next version");
        let version = self.source.stamp(&StampRequest {
            head,
            build,
            suffix: suffix.map(str::trim).filter(|suffix| !suffix.is_empty()),
        })?;
        let record = VersionRecord::new(version, description);
        self.persist(&record)?;
        Ok(record)
    }

    /// Replaces the stored version with the version of `record`.
    pub fn persist(&self, record: &VersionRecord) -> Result<()> {
        let error = |source| Error::Store {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            create_dir_all(parent).map_err(error)?;
        }
        write(&self.path, format!("{}\n", record.version)).map_err(error)?;
        debug!(path = %self.path.display(), version = %record.version, "stored version");
        Ok(())
    }
}
