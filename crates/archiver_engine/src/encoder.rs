//! The contract every archive format implements.

use tokio_util::sync::CancellationToken;

use crate::error::{ArchiveError, EncodeError};
use crate::types::{ArchiveFile, BookmarkRecord, ContentStream};

/// Turns fetched content into a persisted archive and reads resources back out of it.
///
/// An encoder's [`name`](Self::name) is what gets stored in
/// [`BookmarkRecord::archiver_kind`]; renaming one orphans every archive it made.
pub trait ArchiveEncoder: Send + Sync {
    fn name(&self) -> &str;

    /// Pure capability check against the declared content type.
    fn matches(&self, content_type: &str) -> bool;

    /// Persist an archive for `bookmark` and return it with `archiver_kind` set.
    ///
    /// On any error nothing may be left where [`get_archive_file`](Self::get_archive_file)
    /// would find it.
    fn encode(
        &self,
        content: &ContentStream,
        bookmark: BookmarkRecord,
        cancel: &CancellationToken,
    ) -> Result<BookmarkRecord, EncodeError>;

    /// Resolve `resource_path` inside the archive. `""` and `"/"` mean the root document.
    fn get_archive_file(
        &self,
        bookmark: &BookmarkRecord,
        resource_path: &str,
    ) -> Result<ArchiveFile, ArchiveError>;

    /// Markdown suitable for long-form reading, if this format can produce it.
    fn readable_markdown(&self, _bookmark: &BookmarkRecord) -> Result<Option<String>, ArchiveError> {
        Ok(None)
    }
}

/// Lower-cased media type without parameters: `"Text/HTML; charset=utf-8"` -> `"text/html"`.
pub fn mime_essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or(content_type)
        .trim()
        .to_ascii_lowercase()
}

/// Normalized location of a resource inside an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourcePath {
    Root,
    Entry(String),
}

impl ResourcePath {
    /// Returns `None` for paths that try to climb out of the archive.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim().trim_start_matches('/');
        if trimmed.is_empty() {
            return Some(ResourcePath::Root);
        }
        let mut parts = Vec::new();
        for part in trimmed.split('/') {
            match part {
                "" | "." => {}
                ".." => return None,
                other => parts.push(other),
            }
        }
        if parts.is_empty() {
            Some(ResourcePath::Root)
        } else {
            Some(ResourcePath::Entry(parts.join("/")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn essence_strips_parameters_and_case() {
        assert_eq!(mime_essence("Text/HTML; charset=UTF-8"), "text/html");
        assert_eq!(mime_essence("  application/pdf "), "application/pdf");
        assert_eq!(mime_essence(""), "");
    }

    #[test]
    fn empty_and_slash_are_root() {
        assert_eq!(ResourcePath::parse(""), Some(ResourcePath::Root));
        assert_eq!(ResourcePath::parse("/"), Some(ResourcePath::Root));
        assert_eq!(ResourcePath::parse("/./"), Some(ResourcePath::Root));
    }

    #[test]
    fn entries_are_normalized() {
        assert_eq!(
            ResourcePath::parse("/assets//img.png"),
            Some(ResourcePath::Entry("assets/img.png".into()))
        );
        assert_eq!(
            ResourcePath::parse("readable.md"),
            Some(ResourcePath::Entry("readable.md".into()))
        );
    }

    #[test]
    fn parent_segments_are_rejected() {
        assert_eq!(ResourcePath::parse("../etc/passwd"), None);
        assert_eq!(ResourcePath::parse("a/../../b"), None);
    }
}
