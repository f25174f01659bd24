mod common;

use std::fs;

use archiver_engine::{
    deterministic_filename, ArchiverDomain, BookmarkRecord, CancellationToken, ContentStream,
    EbookExportRequest, EngineConfig, ExportError,
};
use common::{fixed_clock, html_page, init_logging, MemorySource, FIXED_TIME};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

async fn archived(domain: &ArchiverDomain, id: i64, title: &str, body: &str) -> BookmarkRecord {
    domain
        .process_archive(
            ContentStream::new(html_page(title, body), "text/html"),
            BookmarkRecord::new(id, format!("https://example.com/{id}")),
            &CancellationToken::new(),
        )
        .await
        .unwrap()
}

fn domain_in(temp: &TempDir) -> ArchiverDomain {
    ArchiverDomain::from_config(&EngineConfig {
        clock: fixed_clock(),
        ..EngineConfig::default_with_data_dir(temp.path().join("data"))
    })
}

#[tokio::test]
async fn export_folds_chapters_in_request_order() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let domain = domain_in(&temp);
    let first = archived(&domain, 1, "Alpha", "<p>alpha words here</p>").await;
    let second = archived(&domain, 2, "Beta", "<p>beta text</p>").await;
    let source = MemorySource {
        records: vec![first, second],
        ..MemorySource::default()
    };

    let out_dir = temp.path().join("out");
    let summary = domain
        .export_to_document(&source, EbookExportRequest::new("Reading", vec![2, 1], out_dir.clone()))
        .await
        .unwrap();

    assert_eq!(summary.chapter_count, 2);
    assert!(summary.skipped.is_empty());
    assert!(summary.total_words >= 5);
    assert_eq!(summary.manifest_path, None);
    assert_eq!(
        summary.output_path,
        out_dir.join(deterministic_filename("Reading", "2,1", "md"))
    );

    let doc = fs::read_to_string(&summary.output_path).unwrap();
    assert!(doc.starts_with("---\ntitle: Reading\n"));
    assert!(doc.contains(&format!("generated_utc: {FIXED_TIME}")));
    let beta = doc.find("beta text").unwrap();
    let alpha = doc.find("alpha words here").unwrap();
    assert!(beta < alpha);
}

#[tokio::test]
async fn unarchived_and_unknown_bookmarks_are_skipped() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let domain = domain_in(&temp);
    let kept = archived(&domain, 1, "Kept", "<p>kept body</p>").await;
    let source = MemorySource {
        records: vec![kept, BookmarkRecord::new(2, "https://example.com/never")],
        ..MemorySource::default()
    };

    let summary = domain
        .export_to_document(
            &source,
            EbookExportRequest::new("Mixed", vec![1, 2, 99], temp.path().join("out")),
        )
        .await
        .unwrap();

    assert_eq!(summary.chapter_count, 1);
    assert_eq!(summary.skipped, vec![2, 99]);
    let doc = fs::read_to_string(&summary.output_path).unwrap();
    assert!(doc.contains("chapters: 1"));
    assert!(doc.contains("kept body"));
}

#[tokio::test]
async fn manifest_and_explicit_filename_are_honored() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let domain = domain_in(&temp);
    let record = archived(&domain, 7, "Seven", "<p>lucky number</p>").await;
    let source = MemorySource {
        records: vec![record],
        ..MemorySource::default()
    };
    let mut request = EbookExportRequest::new("Digest", vec![7], temp.path().join("out"));
    request.output_filename = Some("digest.md".to_string());
    request.write_manifest = true;

    let summary = domain.export_to_document(&source, request).await.unwrap();

    assert_eq!(summary.output_path.file_name().unwrap(), "digest.md");
    let manifest_path = summary.manifest_path.expect("manifest written");
    assert_eq!(manifest_path.file_name().unwrap(), "digest.manifest.json");
    let manifest: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(manifest_path).unwrap()).unwrap();
    assert_eq!(manifest["chapter_count"], 1);
    assert_eq!(manifest["chapters"][0]["bookmark_id"], 7);
    assert_eq!(manifest["chapters"][0]["title"], "Seven");
}

#[tokio::test]
async fn failing_source_aborts_the_export() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let domain = domain_in(&temp);
    let source = MemorySource {
        broken: true,
        ..MemorySource::default()
    };
    let out_dir = temp.path().join("out");

    let err = domain
        .export_to_document(&source, EbookExportRequest::new("Nope", vec![1], out_dir.clone()))
        .await
        .unwrap_err();

    assert!(matches!(err, ExportError::Source(_)));
    assert!(!out_dir.exists());
}

#[tokio::test]
async fn unusable_output_dir_is_a_persist_error() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let domain = domain_in(&temp);
    let blocker = temp.path().join("blocker");
    fs::write(&blocker, "not a directory").unwrap();

    let err = domain
        .export_to_document(
            &MemorySource::default(),
            EbookExportRequest::new("Empty", vec![], blocker),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, ExportError::Persist(_)));
}
