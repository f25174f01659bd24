#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use archiver_engine::{
    ArchiveEncoder, ArchiveError, ArchiveFile, BookmarkId, BookmarkRecord, BookmarkSource, Clock,
    ContentStream, EncodeError, FailureKind, FetchError, Fetcher, SourceError,
};
use bytes::Bytes;
use tokio_util::sync::CancellationToken;

pub const FIXED_TIME: &str = "2024-01-01T00:00:00Z";

pub fn fixed_clock() -> Clock {
    Arc::new(|| FIXED_TIME.to_string())
}

pub fn init_logging() {
    archive_logging::initialize_for_tests();
}

/// Serves canned responses keyed by URL.
#[derive(Default)]
pub struct StaticFetcher {
    responses: HashMap<String, (String, Vec<u8>)>,
    pub calls: AtomicUsize,
}

impl StaticFetcher {
    pub fn with(mut self, url: &str, content_type: &str, body: &[u8]) -> Self {
        self.responses
            .insert(url.to_string(), (content_type.to_string(), body.to_vec()));
        self
    }
}

#[async_trait::async_trait]
impl Fetcher for StaticFetcher {
    async fn fetch(&self, url: &str) -> Result<ContentStream, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.responses.get(url) {
            Some((content_type, body)) => Ok(ContentStream::new(body.clone(), content_type.clone())),
            None => Err(FetchError {
                kind: FailureKind::HttpStatus(404),
                message: "404 Not Found".to_string(),
            }),
        }
    }
}

/// Never answers; used to observe cancellation during fetch.
pub struct HangingFetcher;

#[async_trait::async_trait]
impl Fetcher for HangingFetcher {
    async fn fetch(&self, _url: &str) -> Result<ContentStream, FetchError> {
        std::future::pending().await
    }
}

/// Encoder with scripted behavior that records every encode call.
pub struct ScriptedEncoder {
    pub name: &'static str,
    pub content_type: &'static str,
    pub fail: bool,
    pub calls: Arc<Mutex<Vec<&'static str>>>,
}

impl ScriptedEncoder {
    pub fn new(
        name: &'static str,
        content_type: &'static str,
        fail: bool,
        calls: Arc<Mutex<Vec<&'static str>>>,
    ) -> Self {
        Self {
            name,
            content_type,
            fail,
            calls,
        }
    }
}

impl ArchiveEncoder for ScriptedEncoder {
    fn name(&self) -> &str {
        self.name
    }

    fn matches(&self, content_type: &str) -> bool {
        archiver_engine::mime_essence(content_type) == self.content_type
    }

    fn encode(
        &self,
        content: &ContentStream,
        mut bookmark: BookmarkRecord,
        _cancel: &CancellationToken,
    ) -> Result<BookmarkRecord, EncodeError> {
        self.calls.lock().unwrap().push(self.name);
        // Each attempt must see the whole body from the start.
        assert!(!content.is_empty());
        if self.fail {
            return Err(EncodeError::Rejected(format!("{} always fails", self.name)));
        }
        bookmark.archiver_kind = Some(self.name.to_string());
        bookmark.has_archive = true;
        Ok(bookmark)
    }

    fn get_archive_file(
        &self,
        bookmark: &BookmarkRecord,
        resource_path: &str,
    ) -> Result<ArchiveFile, ArchiveError> {
        if resource_path.is_empty() || resource_path == "/" {
            Ok(ArchiveFile {
                path: "root".to_string(),
                content_type: "text/plain".to_string(),
                content: Bytes::from(format!("{}:{}", self.name, bookmark.id)),
            })
        } else {
            Err(ArchiveError::ResourceNotFound {
                bookmark_id: bookmark.id,
                encoder: self.name.to_string(),
                path: resource_path.to_string(),
            })
        }
    }
}

/// In-memory bookmark metadata store.
#[derive(Default)]
pub struct MemorySource {
    pub records: Vec<BookmarkRecord>,
    pub broken: bool,
}

impl BookmarkSource for MemorySource {
    fn get_bookmarks(&self, ids: &[BookmarkId]) -> Result<Vec<BookmarkRecord>, SourceError> {
        if self.broken {
            return Err(SourceError("store offline".into()));
        }
        Ok(self
            .records
            .iter()
            .filter(|record| ids.contains(&record.id))
            .cloned()
            .collect())
    }
}

pub fn html_page(title: &str, body: &str) -> Vec<u8> {
    format!(
        "<html><head><title>{title}</title></head><body><article>{body}</article></body></html>"
    )
    .into_bytes()
}
