use std::fmt;
use std::io;

use crate::page_capture::DecodeError;
use crate::persist::PersistError;
use crate::types::BookmarkId;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct FetchError {
    pub kind: FailureKind,
    pub message: String,
}

impl FetchError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    RedirectLimitExceeded,
    TooLarge { max_bytes: u64, actual: Option<u64> },
    Network,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::RedirectLimitExceeded => write!(f, "redirect limit exceeded"),
            FailureKind::TooLarge { max_bytes, actual } => {
                write!(f, "response too large (max {max_bytes}, actual {actual:?})")
            }
            FailureKind::Network => write!(f, "network error"),
        }
    }
}

/// Failure of a single encoder's encode step.
///
/// The dispatch loop logs these and moves on to the next matching encoder,
/// except for [`EncodeError::Cancelled`] which ends the whole call.
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("content rejected: {0}")]
    Rejected(String),
    #[error("decode failed: {0}")]
    Decode(#[from] DecodeError),
    #[error("persist failed: {0}")]
    Persist(#[from] PersistError),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("bundle error: {0}")]
    Bundle(String),
    #[error("cancelled before commit")]
    Cancelled,
    #[error("encoder task aborted: {0}")]
    Aborted(String),
}

/// One encoder that matched the content type but failed to encode it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedAttempt {
    pub encoder: String,
    pub reason: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("failed to fetch {url}: {source}")]
    FetchFailed {
        url: String,
        #[source]
        source: FetchError,
    },
    #[error(
        "no encoder available for content type {content_type:?} (bookmark {bookmark_id}, {} failed attempt(s))",
        failed_attempts.len()
    )]
    NoEncoderAvailable {
        bookmark_id: BookmarkId,
        content_type: String,
        failed_attempts: Vec<FailedAttempt>,
    },
    #[error("unknown encoder {name:?}")]
    UnknownEncoder { name: String },
    #[error("bookmark {bookmark_id} has no archive")]
    NotArchived { bookmark_id: BookmarkId },
    #[error("resource {path:?} not found in {encoder} archive of bookmark {bookmark_id}")]
    ResourceNotFound {
        bookmark_id: BookmarkId,
        encoder: String,
        path: String,
    },
    #[error("{encoder} archive of bookmark {bookmark_id} is corrupt: {reason}")]
    ArchiveCorrupt {
        bookmark_id: BookmarkId,
        encoder: String,
        reason: String,
    },
    #[error("storage error for bookmark {bookmark_id}: {source}")]
    Storage {
        bookmark_id: BookmarkId,
        #[source]
        source: io::Error,
    },
    #[error("archive operation for bookmark {bookmark_id} was cancelled")]
    Cancelled { bookmark_id: BookmarkId },
    #[error("internal error: {0}")]
    Internal(String),
}

impl ArchiveError {
    /// True when [`ArchiveError::NoEncoderAvailable`] followed real encode attempts,
    /// as opposed to no registered encoder matching at all.
    pub fn is_fall_through(&self) -> bool {
        matches!(self, ArchiveError::NoEncoderAvailable { failed_attempts, .. } if !failed_attempts.is_empty())
    }
}

/// Construction-time registry errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("encoder name {0:?} registered more than once")]
    DuplicateName(String),
    #[error("encoder name must not be empty")]
    EmptyName,
}

#[derive(Debug, thiserror::Error)]
#[error("bookmark source error: {0}")]
pub struct SourceError(pub Box<dyn std::error::Error + Send + Sync>);

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error("persist error: {0}")]
    Persist(#[from] PersistError),
    #[error("manifest serialization failed: {0}")]
    Manifest(#[from] serde_json::Error),
}
