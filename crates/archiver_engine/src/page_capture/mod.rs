//! `page-capture`: stores an HTML page together with a reader view of it.
//!
//! The artifact is a gzip-compressed tar bundle holding the decoded page
//! (`index.html`), a Markdown rendition (`readable.md`) and a
//! `manifest.json` describing the capture.

mod bundle;
mod decode;
mod readable;

use std::collections::BTreeMap;

use archive_logging::archive_debug;
use bytes::Bytes;
use tokio_util::sync::CancellationToken;

pub use bundle::{CaptureManifest, ManifestEntry, INDEX_ENTRY, MANIFEST_ENTRY, READABLE_ENTRY};
pub use decode::{decode_html, DecodeError, DecodedHtml};
pub use readable::{extract_readable, strip_frontmatter, ReadablePage};

use crate::config::Clock;
use crate::encoder::{mime_essence, ArchiveEncoder, ResourcePath};
use crate::error::{ArchiveError, EncodeError};
use crate::persist::PersistError;
use crate::store::ArchiveStore;
use crate::types::{ArchiveFile, BookmarkRecord, ContentStream};

pub const PAGE_CAPTURE: &str = "page-capture";

const MANIFEST_CONTENT_TYPE: &str = "application/json";

const HANDLED_TYPES: &[&str] = &["text/html", "text/htm", "application/xhtml+xml"];

pub struct PageCaptureEncoder {
    store: ArchiveStore,
    clock: Clock,
}

impl PageCaptureEncoder {
    pub fn new(store: ArchiveStore, clock: Clock) -> Self {
        Self { store, clock }
    }

    fn open_bundle(
        &self,
        bookmark: &BookmarkRecord,
    ) -> Result<(CaptureManifest, BTreeMap<String, Vec<u8>>), ArchiveError> {
        let raw = self.store.read(bookmark.id, PAGE_CAPTURE)?;
        let corrupt = |reason: String| ArchiveError::ArchiveCorrupt {
            bookmark_id: bookmark.id,
            encoder: PAGE_CAPTURE.to_string(),
            reason,
        };
        let entries = bundle::read_bundle(&raw).map_err(|err| corrupt(err.to_string()))?;
        let manifest_bytes = entries
            .get(MANIFEST_ENTRY)
            .ok_or_else(|| corrupt("manifest.json is missing".to_string()))?;
        let manifest: CaptureManifest = serde_json::from_slice(manifest_bytes)
            .map_err(|err| corrupt(format!("unreadable manifest: {err}")))?;
        if manifest.version != bundle::MANIFEST_VERSION {
            return Err(corrupt(format!("unsupported manifest version {}", manifest.version)));
        }
        Ok((manifest, entries))
    }
}

impl ArchiveEncoder for PageCaptureEncoder {
    fn name(&self) -> &str {
        PAGE_CAPTURE
    }

    fn matches(&self, content_type: &str) -> bool {
        let essence = mime_essence(content_type);
        HANDLED_TYPES.contains(&essence.as_str())
    }

    fn encode(
        &self,
        content: &ContentStream,
        mut bookmark: BookmarkRecord,
        cancel: &CancellationToken,
    ) -> Result<BookmarkRecord, EncodeError> {
        let decoded = decode_html(content.bytes(), Some(content.content_type()))?;
        let page = extract_readable(&decoded.html);
        let captured_utc = (self.clock)();
        let url = content.source_url().unwrap_or(&bookmark.url).to_string();

        let readable_doc = readable::build_readable_document(&url, &page, &captured_utc);
        let manifest = CaptureManifest {
            version: bundle::MANIFEST_VERSION,
            url,
            source_content_type: content.content_type().to_string(),
            encoding: decoded.encoding_label.clone(),
            title: page.title.clone(),
            captured_utc: captured_utc.clone(),
            word_count: page.word_count,
            entries: vec![
                ManifestEntry {
                    path: INDEX_ENTRY.to_string(),
                    content_type: "text/html; charset=utf-8".to_string(),
                },
                ManifestEntry {
                    path: READABLE_ENTRY.to_string(),
                    content_type: "text/markdown; charset=utf-8".to_string(),
                },
                ManifestEntry {
                    path: MANIFEST_ENTRY.to_string(),
                    content_type: MANIFEST_CONTENT_TYPE.to_string(),
                },
            ],
        };
        let manifest_json =
            serde_json::to_vec_pretty(&manifest).map_err(|err| EncodeError::Bundle(err.to_string()))?;

        let staged = self.store.stage(bookmark.id, PAGE_CAPTURE)?;
        let staged = bundle::write_bundle(
            staged,
            &[
                (INDEX_ENTRY, decoded.html.as_bytes()),
                (READABLE_ENTRY, readable_doc.as_bytes()),
                (MANIFEST_ENTRY, manifest_json.as_slice()),
            ],
        )
        .map_err(|err| EncodeError::Bundle(err.to_string()))?;
        let path = staged.commit(cancel).map_err(|err| match err {
            PersistError::Cancelled => EncodeError::Cancelled,
            other => EncodeError::Persist(other),
        })?;
        archive_debug!("page capture for bookmark {} written to {}", bookmark.id, path.display());

        if bookmark.title.trim().is_empty() {
            if let Some(title) = page.title {
                bookmark.title = title;
            }
        }
        if bookmark.excerpt.trim().is_empty() {
            if let Some(excerpt) = page.excerpt {
                bookmark.excerpt = excerpt;
            }
        }
        bookmark.mark_archived(PAGE_CAPTURE, captured_utc);
        Ok(bookmark)
    }

    fn get_archive_file(
        &self,
        bookmark: &BookmarkRecord,
        resource_path: &str,
    ) -> Result<ArchiveFile, ArchiveError> {
        let not_found = || ArchiveError::ResourceNotFound {
            bookmark_id: bookmark.id,
            encoder: PAGE_CAPTURE.to_string(),
            path: resource_path.to_string(),
        };
        let entry = match ResourcePath::parse(resource_path).ok_or_else(not_found)? {
            ResourcePath::Root => INDEX_ENTRY.to_string(),
            ResourcePath::Entry(path) => path,
        };

        let (manifest, mut entries) = self.open_bundle(bookmark)?;
        let content = entries.remove(&entry).ok_or_else(not_found)?;
        let content_type = match manifest.content_type_of(&entry) {
            Some(content_type) => content_type,
            None if entry == MANIFEST_ENTRY => MANIFEST_CONTENT_TYPE,
            None => "application/octet-stream",
        }
        .to_string();

        Ok(ArchiveFile {
            path: entry,
            content_type,
            content: Bytes::from(content),
        })
    }

    fn readable_markdown(&self, bookmark: &BookmarkRecord) -> Result<Option<String>, ArchiveError> {
        let (_, mut entries) = self.open_bundle(bookmark)?;
        let Some(doc) = entries.remove(READABLE_ENTRY) else {
            return Ok(None);
        };
        let doc = String::from_utf8(doc).map_err(|_| ArchiveError::ArchiveCorrupt {
            bookmark_id: bookmark.id,
            encoder: PAGE_CAPTURE.to_string(),
            reason: "readable.md is not valid UTF-8".to_string(),
        })?;
        let body = strip_frontmatter(&doc).trim();
        Ok((!body.is_empty()).then(|| body.to_string()))
    }
}
