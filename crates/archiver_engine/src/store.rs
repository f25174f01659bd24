//! On-disk home of archive artifacts, addressed by bookmark id and encoder name.

use std::fs;
use std::io;
use std::path::PathBuf;

use crate::error::ArchiveError;
use crate::persist::{PersistError, StagedFile};
use crate::types::BookmarkId;

#[derive(Debug, Clone)]
pub struct ArchiveStore {
    root: PathBuf,
}

impl ArchiveStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &std::path::Path {
        &self.root
    }

    /// `{root}/{bookmark id}/{encoder name}`
    pub fn artifact_path(&self, bookmark_id: BookmarkId, encoder: &str) -> PathBuf {
        self.root.join(bookmark_id.to_string()).join(encoder)
    }

    /// Open a staged artifact. It only replaces the live one on commit.
    pub fn stage(&self, bookmark_id: BookmarkId, encoder: &str) -> Result<StagedFile, PersistError> {
        StagedFile::new(self.artifact_path(bookmark_id, encoder))
    }

    /// Read a committed artifact.
    ///
    /// A missing file means the bookmark claims an archive that is not there,
    /// which is reported as corruption rather than as a missing resource.
    pub fn read(&self, bookmark_id: BookmarkId, encoder: &str) -> Result<Vec<u8>, ArchiveError> {
        let path = self.artifact_path(bookmark_id, encoder);
        fs::read(&path).map_err(|err| match err.kind() {
            io::ErrorKind::NotFound => ArchiveError::ArchiveCorrupt {
                bookmark_id,
                encoder: encoder.to_string(),
                reason: "archive artifact is missing".to_string(),
            },
            _ => ArchiveError::Storage {
                bookmark_id,
                source: err,
            },
        })
    }

    pub fn exists(&self, bookmark_id: BookmarkId, encoder: &str) -> bool {
        self.artifact_path(bookmark_id, encoder).is_file()
    }
}
