//! File-backed bookmark metadata store.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use archive_logging::{archive_debug, archive_info};
use archiver_engine::{
    ensure_output_dir, AtomicFileWriter, BookmarkId, BookmarkRecord, BookmarkSource, PersistError,
    SourceError,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read bookmarks from {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse bookmarks in {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ron::error::SpannedError,
    },
    #[error("failed to serialize bookmarks: {0}")]
    Serialize(#[from] ron::Error),
    #[error("failed to write bookmarks: {0}")]
    Write(#[from] PersistError),
    #[error("no bookmark with id {0}")]
    UnknownBookmark(BookmarkId),
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PersistedBookmarks {
    next_id: BookmarkId,
    bookmarks: Vec<BookmarkRecord>,
}

pub struct BookmarkStore {
    path: PathBuf,
    state: PersistedBookmarks,
}

impl BookmarkStore {
    /// Open the store at `path`; a missing file is an empty store.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let state = match fs::read_to_string(path) {
            Ok(text) => ron::from_str(&text).map_err(|source| StoreError::Parse {
                path: path.to_path_buf(),
                source,
            })?,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                archive_debug!("no bookmark file at {:?}, starting empty", path);
                PersistedBookmarks::default()
            }
            Err(source) => {
                return Err(StoreError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        Ok(Self {
            path: path.to_path_buf(),
            state,
        })
    }

    pub fn add(&mut self, url: &str, title: Option<String>, excerpt: Option<String>) -> BookmarkId {
        let highest = self.state.bookmarks.iter().map(|b| b.id).max().unwrap_or(0);
        let id = self.state.next_id.max(highest) + 1;
        self.state.next_id = id;

        let mut record = BookmarkRecord::new(id, url);
        record.title = title.unwrap_or_default();
        record.excerpt = excerpt.unwrap_or_default();
        self.state.bookmarks.push(record);
        id
    }

    pub fn get(&self, id: BookmarkId) -> Result<&BookmarkRecord, StoreError> {
        self.state
            .bookmarks
            .iter()
            .find(|b| b.id == id)
            .ok_or(StoreError::UnknownBookmark(id))
    }

    pub fn list(&self) -> &[BookmarkRecord] {
        &self.state.bookmarks
    }

    /// Replace the stored record with the same id.
    pub fn update(&mut self, record: BookmarkRecord) -> Result<(), StoreError> {
        let slot = self
            .state
            .bookmarks
            .iter_mut()
            .find(|b| b.id == record.id)
            .ok_or(StoreError::UnknownBookmark(record.id))?;
        *slot = record;
        Ok(())
    }

    pub fn save(&self) -> Result<(), StoreError> {
        let (dir, filename) = split_path(&self.path);
        ensure_output_dir(&dir)?;
        let pretty = ron::ser::PrettyConfig::new();
        let content = ron::ser::to_string_pretty(&self.state, pretty)?;
        AtomicFileWriter::new(dir).write(&filename, content)?;
        archive_info!(
            "saved {} bookmark(s) to {:?}",
            self.state.bookmarks.len(),
            self.path
        );
        Ok(())
    }
}

impl BookmarkSource for BookmarkStore {
    fn get_bookmarks(&self, ids: &[BookmarkId]) -> Result<Vec<BookmarkRecord>, SourceError> {
        Ok(self
            .state
            .bookmarks
            .iter()
            .filter(|b| ids.contains(&b.id))
            .cloned()
            .collect())
    }
}

fn split_path(path: &Path) -> (PathBuf, String) {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "bookmarks.ron".to_string());
    (dir, filename)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn bookmarks_survive_save_and_reopen() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("nested").join("bookmarks.ron");

        let mut store = BookmarkStore::open(&path).unwrap();
        let first = store.add("https://a.example/", Some("A".into()), None);
        let second = store.add("https://b.example/", None, Some("about b".into()));
        assert_eq!((first, second), (1, 2));

        let mut archived = store.get(second).unwrap().clone();
        archived.archiver_kind = Some("page-capture".into());
        archived.has_archive = true;
        store.update(archived.clone()).unwrap();
        store.save().unwrap();

        let reopened = BookmarkStore::open(&path).unwrap();
        assert_eq!(reopened.list().len(), 2);
        assert_eq!(reopened.get(1).unwrap().title, "A");
        assert_eq!(reopened.get(2).unwrap(), &archived);
    }

    #[test]
    fn ids_keep_increasing_after_reopen() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("bookmarks.ron");
        let mut store = BookmarkStore::open(&path).unwrap();
        store.add("https://a.example/", None, None);
        store.save().unwrap();

        let mut reopened = BookmarkStore::open(&path).unwrap();
        assert_eq!(reopened.add("https://b.example/", None, None), 2);
    }

    #[test]
    fn updating_unknown_bookmark_fails() {
        let temp = tempfile::TempDir::new().unwrap();
        let mut store = BookmarkStore::open(&temp.path().join("b.ron")).unwrap();
        let err = store.update(BookmarkRecord::new(42, "https://x")).unwrap_err();
        assert!(matches!(err, StoreError::UnknownBookmark(42)));
    }

    #[test]
    fn corrupt_file_is_a_parse_error() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("bookmarks.ron");
        fs::write(&path, "(next_id: 1, bookmarks: [").unwrap();
        assert!(matches!(BookmarkStore::open(&path), Err(StoreError::Parse { .. })));
    }

    #[test]
    fn source_returns_only_requested_ids() {
        let temp = tempfile::TempDir::new().unwrap();
        let mut store = BookmarkStore::open(&temp.path().join("b.ron")).unwrap();
        store.add("https://a.example/", None, None);
        store.add("https://b.example/", None, None);
        store.add("https://c.example/", None, None);

        let records = store.get_bookmarks(&[3, 1, 9]).unwrap();
        let ids: Vec<_> = records.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 3]);
    }
}
