//! Dispatch domain: fetch, pick an encoder, encode; and the read-side lookups.

use std::sync::Arc;

use archive_logging::{archive_debug, archive_error, archive_info, archive_warn};
use tokio_util::sync::CancellationToken;

use crate::config::{Clock, EngineConfig};
use crate::ebook::{self, BookmarkSource, Chapter};
use crate::encoder::ArchiveEncoder;
use crate::error::{ArchiveError, EncodeError, ExportError, FailedAttempt};
use crate::fetch::{Fetcher, ReqwestFetcher};
use crate::locks::KeyedLocks;
use crate::registry::ArchiverRegistry;
use crate::store::ArchiveStore;
use crate::types::{ArchiveFile, BookmarkRecord, ContentStream, EbookExportRequest, ExportSummary};

pub struct ArchiverDomain {
    fetcher: Arc<dyn Fetcher>,
    registry: ArchiverRegistry,
    locks: KeyedLocks,
    clock: Clock,
}

impl ArchiverDomain {
    pub fn new(fetcher: Arc<dyn Fetcher>, registry: ArchiverRegistry, clock: Clock) -> Self {
        Self {
            fetcher,
            registry,
            locks: KeyedLocks::default(),
            clock,
        }
    }

    /// Reqwest fetcher plus the default encoders writing under `config.archive_dir()`.
    pub fn from_config(config: &EngineConfig) -> Self {
        let store = ArchiveStore::new(config.archive_dir());
        let registry = ArchiverRegistry::with_default_encoders(store, config.clock.clone());
        Self::new(
            Arc::new(ReqwestFetcher::new(config.fetch.clone())),
            registry,
            config.clock.clone(),
        )
    }

    pub fn registry(&self) -> &ArchiverRegistry {
        &self.registry
    }

    /// Fetch the bookmark's URL and archive whatever comes back.
    pub async fn generate_archive(
        &self,
        bookmark: BookmarkRecord,
        cancel: &CancellationToken,
    ) -> Result<BookmarkRecord, ArchiveError> {
        archive_debug!("fetching {} for bookmark {}", bookmark.url, bookmark.id);
        let content = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                archive_info!("bookmark {} cancelled while fetching", bookmark.id);
                return Err(ArchiveError::Cancelled { bookmark_id: bookmark.id });
            }
            fetched = self.fetcher.fetch(&bookmark.url) => fetched.map_err(|source| {
                ArchiveError::FetchFailed {
                    url: bookmark.url.clone(),
                    source,
                }
            })?,
        };
        self.process_archive(content, bookmark, cancel).await
    }

    /// Archive content the caller already holds.
    ///
    /// Encoders are tried in registration order. A matching encoder that fails
    /// is logged and skipped in favor of the next matching one; only when none
    /// is left does the call fail with [`ArchiveError::NoEncoderAvailable`].
    pub async fn process_archive(
        &self,
        content: ContentStream,
        bookmark: BookmarkRecord,
        cancel: &CancellationToken,
    ) -> Result<BookmarkRecord, ArchiveError> {
        let bookmark_id = bookmark.id;
        let content = Arc::new(content);
        let _guard = self.locks.lock(bookmark_id).await;

        let mut failed_attempts = Vec::new();
        for encoder in self.registry.matching(content.content_type()) {
            if cancel.is_cancelled() {
                return Err(ArchiveError::Cancelled { bookmark_id });
            }
            archive_debug!(
                "trying encoder {} for bookmark {} ({})",
                encoder.name(),
                bookmark_id,
                content.content_type()
            );
            match run_encode(encoder.clone(), content.clone(), bookmark.clone(), cancel.clone()).await {
                Ok(updated) => {
                    archive_info!("bookmark {} archived with {}", bookmark_id, encoder.name());
                    return Ok(updated);
                }
                Err(EncodeError::Cancelled) => {
                    archive_info!("bookmark {} cancelled during {}", bookmark_id, encoder.name());
                    return Err(ArchiveError::Cancelled { bookmark_id });
                }
                Err(err) => {
                    archive_error!(
                        "encoder {} failed for bookmark {} ({}): {}",
                        encoder.name(),
                        bookmark_id,
                        bookmark.url,
                        err
                    );
                    failed_attempts.push(FailedAttempt {
                        encoder: encoder.name().to_string(),
                        reason: err.to_string(),
                    });
                }
            }
        }

        if failed_attempts.is_empty() {
            archive_warn!(
                "no encoder matches content type {:?} for bookmark {}",
                content.content_type(),
                bookmark_id
            );
        } else {
            archive_error!(
                "all {} matching encoders failed for bookmark {} ({:?})",
                failed_attempts.len(),
                bookmark_id,
                content.content_type()
            );
        }
        Err(ArchiveError::NoEncoderAvailable {
            bookmark_id,
            content_type: content.content_type().to_string(),
            failed_attempts,
        })
    }

    /// Look up a resource inside the bookmark's archive.
    pub async fn resolve_archive_file(
        &self,
        bookmark: &BookmarkRecord,
        resource_path: &str,
    ) -> Result<ArchiveFile, ArchiveError> {
        let encoder = self.encoder_for(bookmark)?;
        let bookmark = bookmark.clone();
        let resource_path = resource_path.to_string();
        tokio::task::spawn_blocking(move || encoder.get_archive_file(&bookmark, &resource_path))
            .await
            .map_err(|err| ArchiveError::Internal(format!("archive lookup task failed: {err}")))?
    }

    pub fn get_encoder(&self, name: &str) -> Result<Arc<dyn ArchiveEncoder>, ArchiveError> {
        self.registry
            .get(name)
            .cloned()
            .ok_or_else(|| ArchiveError::UnknownEncoder {
                name: name.to_string(),
            })
    }

    /// Fold the requested bookmarks into one long-form document.
    ///
    /// Bookmarks that cannot be rendered are logged and skipped; only failing
    /// to gather the bookmarks or to write the document is fatal.
    pub async fn export_to_document<S>(
        &self,
        source: &S,
        request: EbookExportRequest,
    ) -> Result<ExportSummary, ExportError>
    where
        S: BookmarkSource + ?Sized,
    {
        let records = source.get_bookmarks(&request.bookmark_ids)?;
        let mut chapters = Vec::with_capacity(request.bookmark_ids.len());
        let mut skipped = Vec::new();

        for id in &request.bookmark_ids {
            let Some(bookmark) = records.iter().find(|record| record.id == *id) else {
                archive_warn!("bookmark {} not found, leaving it out of the export", id);
                skipped.push(*id);
                continue;
            };
            match self.render_chapter(bookmark).await {
                Ok(chapter) => chapters.push(chapter),
                Err(err) => {
                    archive_warn!("skipping bookmark {} in export: {}", id, err);
                    skipped.push(*id);
                }
            }
        }

        ebook::write_document(&request, &chapters, skipped, &(self.clock)())
    }

    async fn render_chapter(&self, bookmark: &BookmarkRecord) -> Result<Chapter, ArchiveError> {
        let encoder = self.encoder_for(bookmark)?;
        let owned = bookmark.clone();
        let markdown = tokio::task::spawn_blocking(move || encoder.readable_markdown(&owned))
            .await
            .map_err(|err| ArchiveError::Internal(format!("render task failed: {err}")))??;
        let encoder_name = bookmark.archiver_kind().unwrap_or_default().to_string();
        let body = markdown.ok_or_else(|| ArchiveError::ResourceNotFound {
            bookmark_id: bookmark.id,
            encoder: encoder_name,
            path: "readable text".to_string(),
        })?;
        Ok(Chapter::new(bookmark, body))
    }

    fn encoder_for(&self, bookmark: &BookmarkRecord) -> Result<Arc<dyn ArchiveEncoder>, ArchiveError> {
        let kind = bookmark.archiver_kind().ok_or(ArchiveError::NotArchived {
            bookmark_id: bookmark.id,
        })?;
        self.get_encoder(kind)
    }
}

async fn run_encode(
    encoder: Arc<dyn ArchiveEncoder>,
    content: Arc<ContentStream>,
    bookmark: BookmarkRecord,
    cancel: CancellationToken,
) -> Result<BookmarkRecord, EncodeError> {
    tokio::task::spawn_blocking(move || encoder.encode(&content, bookmark, &cancel))
        .await
        .map_err(|err| EncodeError::Aborted(err.to_string()))?
}
