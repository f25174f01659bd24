//! Long-form reading export: many archived bookmarks folded into one Markdown document.

use std::path::PathBuf;

use serde_json::json;

use crate::error::{ExportError, SourceError};
use crate::filename::deterministic_filename;
use crate::persist::AtomicFileWriter;
use crate::types::{BookmarkId, BookmarkRecord, EbookExportRequest, ExportSummary};

const CHAPTER_START: &str = "===== CHAPTER START =====";
const CHAPTER_END: &str = "===== CHAPTER END =====";

/// Read access to the bookmark metadata store.
pub trait BookmarkSource: Send + Sync {
    /// Records for the given ids. Unknown ids are simply absent from the result.
    fn get_bookmarks(&self, ids: &[BookmarkId]) -> Result<Vec<BookmarkRecord>, SourceError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chapter {
    pub bookmark_id: BookmarkId,
    pub url: String,
    pub title: String,
    pub body: String,
    pub word_count: u64,
}

impl Chapter {
    pub fn new(bookmark: &BookmarkRecord, body: String) -> Self {
        let title = if bookmark.title.trim().is_empty() {
            bookmark.url.clone()
        } else {
            bookmark.title.clone()
        };
        Self {
            bookmark_id: bookmark.id,
            url: bookmark.url.clone(),
            title,
            word_count: body.split_whitespace().count() as u64,
            body,
        }
    }
}

pub fn render_document(title: &str, generated_utc: &str, chapters: &[Chapter]) -> String {
    let mut buffer = format!(
        "---\ntitle: {title}\ngenerated_utc: {generated_utc}\nchapters: {}\n---\n\n# {title}\n\n",
        chapters.len()
    );
    for chapter in chapters {
        buffer.push_str(CHAPTER_START);
        buffer.push('\n');
        buffer.push_str(&format!(
            "url: {}\ntitle: {}\nbookmark_id: {}\n\n## {}\n\n",
            chapter.url, chapter.title, chapter.bookmark_id, chapter.title
        ));
        buffer.push_str(chapter.body.trim_end());
        buffer.push('\n');
        buffer.push_str(CHAPTER_END);
        buffer.push_str("\n\n");
    }
    buffer
}

pub(crate) fn write_document(
    request: &EbookExportRequest,
    chapters: &[Chapter],
    skipped: Vec<BookmarkId>,
    generated_utc: &str,
) -> Result<ExportSummary, ExportError> {
    let filename = request
        .output_filename
        .clone()
        .unwrap_or_else(|| default_filename(request));
    let document = render_document(&request.title, generated_utc, chapters);
    let total_words = chapters.iter().map(|c| c.word_count).sum();

    let writer = AtomicFileWriter::new(request.output_dir.clone());
    let output_path = writer.write(&filename, &document)?;

    let manifest_path = if request.write_manifest {
        let manifest = json!({
            "title": request.title,
            "generated_utc": generated_utc,
            "chapter_count": chapters.len(),
            "total_words": total_words,
            "skipped": skipped,
            "chapters": chapters.iter().map(|c| {
                json!({
                    "bookmark_id": c.bookmark_id,
                    "title": c.title,
                    "url": c.url,
                    "words": c.word_count,
                })
            }).collect::<Vec<_>>()
        });
        let name = manifest_filename(&filename);
        Some(writer.write(&name, serde_json::to_string_pretty(&manifest)?)?)
    } else {
        None
    };

    Ok(ExportSummary {
        chapter_count: chapters.len(),
        total_words,
        skipped,
        output_path,
        manifest_path,
    })
}

fn default_filename(request: &EbookExportRequest) -> String {
    let key = request
        .bookmark_ids
        .iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(",");
    deterministic_filename(&request.title, &key, "md")
}

fn manifest_filename(document: &str) -> String {
    let stem = PathBuf::from(document)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| document.to_string());
    format!("{stem}.manifest.json")
}
