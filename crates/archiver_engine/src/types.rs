use std::fmt;
use std::io::Cursor;
use std::path::PathBuf;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

pub type BookmarkId = i64;

/// The data-transfer shape of a saved bookmark.
///
/// Owned by the bookmark metadata store. The archiver receives a copy,
/// annotates it and hands it back; persisting the result is the caller's job.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BookmarkRecord {
    pub id: BookmarkId,
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub excerpt: String,
    /// Name of the encoder that produced the stored archive. `None` until archived.
    #[serde(default)]
    pub archiver_kind: Option<String>,
    #[serde(default)]
    pub has_archive: bool,
    #[serde(default)]
    pub archived_utc: Option<String>,
}

impl BookmarkRecord {
    pub fn new(id: BookmarkId, url: impl Into<String>) -> Self {
        Self {
            id,
            url: url.into(),
            ..Self::default()
        }
    }

    /// The recorded archiver kind, treating an empty string as unset.
    pub fn archiver_kind(&self) -> Option<&str> {
        self.archiver_kind.as_deref().filter(|kind| !kind.is_empty())
    }

    pub(crate) fn mark_archived(&mut self, encoder: &str, archived_utc: String) {
        self.archiver_kind = Some(encoder.to_string());
        self.has_archive = true;
        self.archived_utc = Some(archived_utc);
    }
}

/// A fully buffered response body plus the content type the transport declared.
///
/// The body is immutable and every [`reader`](Self::reader) starts at offset 0,
/// so a rejected encode attempt never consumes bytes a later candidate needs.
pub struct ContentStream {
    body: Bytes,
    content_type: String,
    source_url: Option<String>,
}

impl ContentStream {
    pub fn new(body: impl Into<Bytes>, content_type: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            content_type: content_type.into(),
            source_url: None,
        }
    }

    pub fn with_source_url(mut self, url: impl Into<String>) -> Self {
        self.source_url = Some(url.into());
        self
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Final URL after redirects, when the stream came from a fetch.
    pub fn source_url(&self) -> Option<&str> {
        self.source_url.as_deref()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.body
    }

    pub fn reader(&self) -> Cursor<&[u8]> {
        Cursor::new(&self.body)
    }

    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }
}

impl fmt::Debug for ContentStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContentStream")
            .field("content_type", &self.content_type)
            .field("source_url", &self.source_url)
            .field("len", &self.body.len())
            .finish()
    }
}

/// A named resource resolved out of a persisted archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveFile {
    pub path: String,
    pub content_type: String,
    pub content: Bytes,
}

/// Which bookmarks to fold into one long-form document, and where to put it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EbookExportRequest {
    pub bookmark_ids: Vec<BookmarkId>,
    pub title: String,
    pub output_dir: PathBuf,
    /// Defaults to a deterministic name derived from the title and ids.
    pub output_filename: Option<String>,
    pub write_manifest: bool,
}

impl EbookExportRequest {
    pub fn new(title: impl Into<String>, bookmark_ids: Vec<BookmarkId>, output_dir: PathBuf) -> Self {
        Self {
            bookmark_ids,
            title: title.into(),
            output_dir,
            output_filename: None,
            write_manifest: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub chapter_count: usize,
    pub total_words: u64,
    pub skipped: Vec<BookmarkId>,
    pub output_path: PathBuf,
    pub manifest_path: Option<PathBuf>,
}
