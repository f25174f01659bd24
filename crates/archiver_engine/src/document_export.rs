//! `document-export`: keeps a fetched PDF verbatim.

use std::io::Write;

use archive_logging::archive_debug;
use bytes::Bytes;
use tokio_util::sync::CancellationToken;

use crate::config::Clock;
use crate::encoder::{mime_essence, ArchiveEncoder, ResourcePath};
use crate::error::{ArchiveError, EncodeError};
use crate::persist::PersistError;
use crate::store::ArchiveStore;
use crate::types::{ArchiveFile, BookmarkRecord, ContentStream};

pub const DOCUMENT_EXPORT: &str = "document-export";

/// Alternative name of the root document.
pub const DOCUMENT_ENTRY: &str = "document.pdf";

const PDF_MAGIC: &[u8] = b"%PDF-";
const PDF_CONTENT_TYPE: &str = "application/pdf";

pub struct DocumentExportEncoder {
    store: ArchiveStore,
    clock: Clock,
}

impl DocumentExportEncoder {
    pub fn new(store: ArchiveStore, clock: Clock) -> Self {
        Self { store, clock }
    }
}

impl ArchiveEncoder for DocumentExportEncoder {
    fn name(&self) -> &str {
        DOCUMENT_EXPORT
    }

    fn matches(&self, content_type: &str) -> bool {
        matches!(mime_essence(content_type).as_str(), "application/pdf" | "application/x-pdf")
    }

    fn encode(
        &self,
        content: &ContentStream,
        mut bookmark: BookmarkRecord,
        cancel: &CancellationToken,
    ) -> Result<BookmarkRecord, EncodeError> {
        if !content.bytes().starts_with(PDF_MAGIC) {
            return Err(EncodeError::Rejected("missing %PDF- signature".to_string()));
        }

        let mut staged = self.store.stage(bookmark.id, DOCUMENT_EXPORT)?;
        std::io::copy(&mut content.reader(), &mut staged)?;
        staged.flush()?;
        let path = staged.commit(cancel).map_err(|err| match err {
            PersistError::Cancelled => EncodeError::Cancelled,
            other => EncodeError::Persist(other),
        })?;
        archive_debug!(
            "document for bookmark {} written to {} ({} bytes)",
            bookmark.id,
            path.display(),
            content.len()
        );

        if bookmark.title.trim().is_empty() {
            if let Some(name) = file_name_from_url(content.source_url().unwrap_or(&bookmark.url)) {
                bookmark.title = name;
            }
        }
        bookmark.mark_archived(DOCUMENT_EXPORT, (self.clock)());
        Ok(bookmark)
    }

    fn get_archive_file(
        &self,
        bookmark: &BookmarkRecord,
        resource_path: &str,
    ) -> Result<ArchiveFile, ArchiveError> {
        match ResourcePath::parse(resource_path) {
            Some(ResourcePath::Root) => {}
            Some(ResourcePath::Entry(entry)) if entry == DOCUMENT_ENTRY => {}
            _ => {
                return Err(ArchiveError::ResourceNotFound {
                    bookmark_id: bookmark.id,
                    encoder: DOCUMENT_EXPORT.to_string(),
                    path: resource_path.to_string(),
                })
            }
        }

        let content = self.store.read(bookmark.id, DOCUMENT_EXPORT)?;
        if !content.starts_with(PDF_MAGIC) {
            return Err(ArchiveError::ArchiveCorrupt {
                bookmark_id: bookmark.id,
                encoder: DOCUMENT_EXPORT.to_string(),
                reason: "stored document lacks a PDF signature".to_string(),
            });
        }

        Ok(ArchiveFile {
            path: DOCUMENT_ENTRY.to_string(),
            content_type: PDF_CONTENT_TYPE.to_string(),
            content: Bytes::from(content),
        })
    }
}

fn file_name_from_url(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let last = parsed.path_segments()?.filter(|s| !s.is_empty()).last()?;
    let name = percent_encoding::percent_decode_str(last).decode_utf8_lossy();
    (!name.trim().is_empty()).then(|| name.into_owned())
}
