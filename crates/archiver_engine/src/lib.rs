//! Archiver engine: fetches bookmarked pages, dispatches them to archive
//! encoders, serves resources back out of stored archives, and exports
//! long-form reading documents.
mod config;
mod document_export;
mod domain;
mod ebook;
mod encoder;
mod error;
mod fetch;
mod filename;
mod locks;
mod page_capture;
mod persist;
mod registry;
mod service;
mod store;
mod types;

pub use config::{system_clock, Clock, EngineConfig};
pub use document_export::{DocumentExportEncoder, DOCUMENT_ENTRY, DOCUMENT_EXPORT};
pub use domain::ArchiverDomain;
pub use ebook::{render_document, BookmarkSource, Chapter};
pub use encoder::{mime_essence, ArchiveEncoder, ResourcePath};
pub use error::{
    ArchiveError, EncodeError, ExportError, FailedAttempt, FailureKind, FetchError, RegistryError,
    SourceError,
};
pub use fetch::{FetchSettings, Fetcher, ReqwestFetcher, UNKNOWN_CONTENT_TYPE};
pub use filename::deterministic_filename;
pub use page_capture::{
    decode_html, extract_readable, strip_frontmatter, CaptureManifest, DecodeError, DecodedHtml,
    ManifestEntry, PageCaptureEncoder, ReadablePage, INDEX_ENTRY, MANIFEST_ENTRY, PAGE_CAPTURE,
    READABLE_ENTRY,
};
pub use persist::{ensure_output_dir, AtomicFileWriter, PersistError, StagedFile};
pub use registry::{ArchiverRegistry, RegistryBuilder};
pub use service::{ArchiveEvent, ArchiveService};
pub use store::ArchiveStore;
pub use types::{
    ArchiveFile, BookmarkId, BookmarkRecord, ContentStream, EbookExportRequest, ExportSummary,
};

pub use tokio_util::sync::CancellationToken;
