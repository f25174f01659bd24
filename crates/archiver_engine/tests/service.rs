mod common;

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use archiver_engine::{ArchiveError, ArchiveEvent, ArchiveService, ArchiverDomain, ArchiverRegistry, BookmarkRecord};
use common::{fixed_clock, init_logging, HangingFetcher, ScriptedEncoder, StaticFetcher};
use pretty_assertions::assert_eq;

fn scripted_domain(fetcher: StaticFetcher) -> Arc<ArchiverDomain> {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let registry = ArchiverRegistry::builder()
        .register(ScriptedEncoder::new("page", "text/html", false, calls))
        .build()
        .unwrap();
    Arc::new(ArchiverDomain::new(Arc::new(fetcher), registry, fixed_clock()))
}

#[test]
fn service_reports_each_enqueued_bookmark() {
    init_logging();
    let domain = scripted_domain(
        StaticFetcher::default()
            .with("https://a.example/", "text/html", b"<p>a</p>")
            .with("https://b.example/", "text/html", b"<p>b</p>"),
    );
    let service = ArchiveService::new(domain, 2).unwrap();

    service.enqueue(BookmarkRecord::new(1, "https://a.example/"));
    service.enqueue(BookmarkRecord::new(2, "https://b.example/"));
    service.enqueue(BookmarkRecord::new(3, "https://missing.example/"));

    let mut results = BTreeMap::new();
    for _ in 0..3 {
        let ArchiveEvent::Completed { bookmark_id, result } = service.recv().expect("event");
        results.insert(bookmark_id, result);
    }

    assert_eq!(results[&1].as_ref().unwrap().archiver_kind(), Some("page"));
    assert_eq!(results[&2].as_ref().unwrap().archiver_kind(), Some("page"));
    assert!(matches!(results[&3], Err(ArchiveError::FetchFailed { .. })));
    assert!(service.shutdown().is_empty());
}

#[test]
fn cancel_all_ends_hanging_jobs() {
    init_logging();
    let calls = Arc::new(Mutex::new(Vec::new()));
    let registry = ArchiverRegistry::builder()
        .register(ScriptedEncoder::new("page", "text/html", false, calls.clone()))
        .build()
        .unwrap();
    let domain = Arc::new(ArchiverDomain::new(Arc::new(HangingFetcher), registry, fixed_clock()));
    let service = ArchiveService::new(domain, 1).unwrap();

    service.enqueue(BookmarkRecord::new(4, "https://slow.example/"));
    service.cancel_all();

    let ArchiveEvent::Completed { bookmark_id, result } = service.recv().expect("event");
    assert_eq!(bookmark_id, 4);
    assert!(matches!(result, Err(ArchiveError::Cancelled { bookmark_id: 4 })));
    assert!(calls.lock().unwrap().is_empty());
}
