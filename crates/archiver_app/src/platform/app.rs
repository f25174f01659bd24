//! Command execution: wires the bookmark store to the archiver engine.

use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context};
use archive_logging::{archive_error, archive_info};
use archiver_engine::{
    AtomicFileWriter, ArchiveEvent, ArchiveService, ArchiverDomain, BookmarkId, BookmarkRecord,
    CancellationToken, ContentStream, EbookExportRequest,
};
use tokio::runtime::Runtime;

use super::config::AppConfig;
use super::persistence::BookmarkStore;
use crate::cli::Command;

pub fn run(command: Command, config: &AppConfig) -> anyhow::Result<()> {
    let mut store = BookmarkStore::open(&config.bookmarks_path())?;
    let domain = Arc::new(ArchiverDomain::from_config(&config.engine_config()));

    match command {
        Command::Add {
            url,
            title,
            excerpt,
        } => {
            let id = store.add(&url, title, excerpt);
            store.save()?;
            println!("{id}");
        }
        Command::List => {
            for bookmark in store.list() {
                println!("{}", describe(bookmark));
            }
        }
        Command::Archive { ids } => {
            let bookmarks = ids
                .iter()
                .map(|id| store.get(*id).cloned())
                .collect::<Result<Vec<_>, _>>()?;
            archive_bookmarks(&mut store, domain, config.max_concurrent_jobs, bookmarks)?;
        }
        Command::ArchiveAll => {
            let pending: Vec<BookmarkRecord> = store
                .list()
                .iter()
                .filter(|b| !b.has_archive)
                .cloned()
                .collect();
            if pending.is_empty() {
                println!("nothing to archive");
                return Ok(());
            }
            archive_bookmarks(&mut store, domain, config.max_concurrent_jobs, pending)?;
        }
        Command::Import {
            id,
            file,
            content_type,
        } => {
            let bookmark = store.get(id)?.clone();
            let body = fs::read(&file).with_context(|| format!("reading {}", file.display()))?;
            let content = ContentStream::new(body, content_type).with_source_url(bookmark.url.clone());
            let updated = runtime()?.block_on(domain.process_archive(
                content,
                bookmark,
                &CancellationToken::new(),
            ))?;
            println!("{}", describe(&updated));
            store.update(updated)?;
            store.save()?;
        }
        Command::File { id, path, out } => {
            let bookmark = store.get(id)?;
            let file = runtime()?.block_on(domain.resolve_archive_file(bookmark, &path))?;
            match out {
                Some(target) => write_output(&target, &file.content)?,
                None => io::stdout().write_all(&file.content)?,
            }
            archive_info!(
                "resolved {} ({}, {} bytes) for bookmark {}",
                file.path,
                file.content_type,
                file.content.len(),
                id
            );
        }
        Command::Ebook {
            ids,
            title,
            out_dir,
            file_name,
            manifest,
        } => {
            let mut request = EbookExportRequest::new(title, ids, out_dir);
            request.output_filename = file_name;
            request.write_manifest = manifest;
            let summary = runtime()?.block_on(domain.export_to_document(&store, request))?;
            println!(
                "wrote {} chapter(s), {} words to {}",
                summary.chapter_count,
                summary.total_words,
                summary.output_path.display()
            );
            if let Some(path) = summary.manifest_path {
                println!("manifest: {}", path.display());
            }
            if !summary.skipped.is_empty() {
                println!("skipped: {}", join_ids(&summary.skipped));
            }
        }
        Command::Encoders => {
            for name in domain.registry().names() {
                println!("{name}");
            }
        }
    }
    Ok(())
}

/// Run the bookmarks through the archive service and record every success.
fn archive_bookmarks(
    store: &mut BookmarkStore,
    domain: Arc<ArchiverDomain>,
    max_concurrent_jobs: usize,
    bookmarks: Vec<BookmarkRecord>,
) -> anyhow::Result<()> {
    let service = ArchiveService::new(domain, max_concurrent_jobs)?;
    let total = bookmarks.len();
    let ids: Vec<BookmarkId> = bookmarks.iter().map(|b| b.id).collect();
    for bookmark in bookmarks {
        service.enqueue(bookmark);
    }

    let (archived, failed) = collect_outcomes(std::iter::from_fn(|| service.recv()), &ids);
    service.shutdown();
    for updated in archived {
        println!("{}", describe(&updated));
        store.update(updated)?;
    }
    store.save()?;

    if !failed.is_empty() {
        bail!(
            "{} of {} bookmark(s) could not be archived: {}",
            failed.len(),
            total,
            join_ids(&failed)
        );
    }
    Ok(())
}

/// Split service events into archived records and failed ids.
///
/// Any id in `expected` without an event, because the service stopped
/// early, counts as failed.
fn collect_outcomes(
    events: impl Iterator<Item = ArchiveEvent>,
    expected: &[BookmarkId],
) -> (Vec<BookmarkRecord>, Vec<BookmarkId>) {
    let mut pending = expected.to_vec();
    let mut archived = Vec::new();
    let mut failed = Vec::new();
    for ArchiveEvent::Completed { bookmark_id, result } in events.take(expected.len()) {
        if let Some(pos) = pending.iter().position(|id| *id == bookmark_id) {
            pending.remove(pos);
        }
        match result {
            Ok(updated) => archived.push(updated),
            Err(err) => {
                archive_error!("bookmark {} not archived: {}", bookmark_id, err);
                eprintln!("{bookmark_id}: {err}");
                failed.push(bookmark_id);
            }
        }
    }
    for bookmark_id in pending {
        archive_error!("archive service stopped before bookmark {} finished", bookmark_id);
        eprintln!("{bookmark_id}: no result from archive service");
        failed.push(bookmark_id);
    }
    (archived, failed)
}

fn runtime() -> io::Result<Runtime> {
    tokio::runtime::Builder::new_multi_thread().enable_all().build()
}

fn write_output(target: &Path, content: &[u8]) -> anyhow::Result<()> {
    let dir = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::path::PathBuf::from("."),
    };
    let name = target
        .file_name()
        .with_context(|| format!("{} is not a file path", target.display()))?
        .to_string_lossy();
    AtomicFileWriter::new(dir).write(&name, content)?;
    Ok(())
}

fn describe(bookmark: &BookmarkRecord) -> String {
    let label = if bookmark.title.is_empty() {
        &bookmark.url
    } else {
        &bookmark.title
    };
    format!(
        "{}\t{}\t{}",
        bookmark.id,
        bookmark.archiver_kind().unwrap_or("-"),
        label
    )
}

fn join_ids(ids: &[BookmarkId]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn describe_prefers_title_and_marks_unarchived() {
        let mut bookmark = BookmarkRecord::new(5, "https://example.com/");
        assert_eq!(describe(&bookmark), "5\t-\thttps://example.com/");

        bookmark.title = "Example".into();
        bookmark.archiver_kind = Some("page-capture".into());
        assert_eq!(describe(&bookmark), "5\tpage-capture\tExample");
    }

    #[test]
    fn import_then_extract_round_trips_through_the_store() {
        let temp = tempfile::TempDir::new().unwrap();
        let config = AppConfig {
            data_dir: temp.path().join("data"),
            ..AppConfig::default()
        };
        let mut store = BookmarkStore::open(&config.bookmarks_path()).unwrap();
        let id = store.add("https://example.com/post", None, None);
        store.save().unwrap();

        let page = temp.path().join("post.html");
        fs::write(
            &page,
            "<html><head><title>Saved Post</title></head><body><p>Offline copy.</p></body></html>",
        )
        .unwrap();
        run(
            Command::Import {
                id,
                file: page,
                content_type: "text/html".into(),
            },
            &config,
        )
        .unwrap();

        let reopened = BookmarkStore::open(&config.bookmarks_path()).unwrap();
        let record = reopened.get(id).unwrap();
        assert_eq!(record.archiver_kind(), Some("page-capture"));
        assert_eq!(record.title, "Saved Post");

        let out = temp.path().join("extract").join("index.html");
        run(
            Command::File {
                id,
                path: String::new(),
                out: Some(out.clone()),
            },
            &config,
        )
        .unwrap();
        assert!(fs::read_to_string(out).unwrap().contains("Offline copy."));
    }

    #[test]
    fn missing_service_events_count_as_failures() {
        let mut done = BookmarkRecord::new(1, "https://a.example/");
        done.archiver_kind = Some("page-capture".into());
        let events = vec![
            ArchiveEvent::Completed {
                bookmark_id: 1,
                result: Ok(done.clone()),
            },
            ArchiveEvent::Completed {
                bookmark_id: 3,
                result: Err(archiver_engine::ArchiveError::Cancelled { bookmark_id: 3 }),
            },
        ];

        let (archived, failed) = collect_outcomes(events.into_iter(), &[1, 2, 3, 4]);

        assert_eq!(archived, vec![done]);
        assert_eq!(failed, vec![3, 2, 4]);
    }

    #[test]
    fn archive_of_unknown_id_fails_before_fetching() {
        let temp = tempfile::TempDir::new().unwrap();
        let config = AppConfig {
            data_dir: temp.path().to_path_buf(),
            ..AppConfig::default()
        };
        assert!(run(Command::Archive { ids: vec![77] }, &config).is_err());
    }
}
