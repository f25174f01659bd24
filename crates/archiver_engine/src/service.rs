use std::io;
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};

use archive_logging::archive_debug;
use tokio::sync::{mpsc as async_mpsc, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::domain::ArchiverDomain;
use crate::error::ArchiveError;
use crate::types::{BookmarkId, BookmarkRecord};

enum ServiceCommand {
    Generate { bookmark: BookmarkRecord },
}

#[derive(Debug)]
pub enum ArchiveEvent {
    Completed {
        bookmark_id: BookmarkId,
        result: Result<BookmarkRecord, ArchiveError>,
    },
}

/// Runs archive generation on a dedicated worker thread with its own runtime.
///
/// Callers on plain threads enqueue bookmarks and collect [`ArchiveEvent`]s.
pub struct ArchiveService {
    cmd_tx: Option<async_mpsc::UnboundedSender<ServiceCommand>>,
    event_rx: mpsc::Receiver<ArchiveEvent>,
    cancel: CancellationToken,
    worker: Option<JoinHandle<()>>,
}

impl ArchiveService {
    pub fn new(domain: Arc<ArchiverDomain>, max_concurrent_jobs: usize) -> io::Result<Self> {
        let (cmd_tx, mut cmd_rx) = async_mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::channel();
        let cancel = CancellationToken::new();
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .thread_name("archive-worker")
            .build()?;

        let worker_cancel = cancel.clone();
        let permits = Arc::new(Semaphore::new(max_concurrent_jobs.max(1)));
        let worker = thread::Builder::new()
            .name("archive-service".to_string())
            .spawn(move || {
                runtime.block_on(async move {
                    let mut tasks = JoinSet::new();
                    while let Some(command) = cmd_rx.recv().await {
                        match command {
                            ServiceCommand::Generate { bookmark } => {
                                let domain = domain.clone();
                                let event_tx = event_tx.clone();
                                let cancel = worker_cancel.clone();
                                let permits = permits.clone();
                                tasks.spawn(async move {
                                    let bookmark_id = bookmark.id;
                                    let result = match permits.acquire_owned().await {
                                        Ok(_permit) => domain.generate_archive(bookmark, &cancel).await,
                                        Err(_) => Err(ArchiveError::Cancelled { bookmark_id }),
                                    };
                                    let _ = event_tx.send(ArchiveEvent::Completed { bookmark_id, result });
                                });
                            }
                        }
                        while tasks.try_join_next().is_some() {}
                    }
                    archive_debug!("archive service draining {} job(s)", tasks.len());
                    while tasks.join_next().await.is_some() {}
                });
            })?;

        Ok(Self {
            cmd_tx: Some(cmd_tx),
            event_rx,
            cancel,
            worker: Some(worker),
        })
    }

    pub fn enqueue(&self, bookmark: BookmarkRecord) {
        if let Some(tx) = &self.cmd_tx {
            let _ = tx.send(ServiceCommand::Generate { bookmark });
        }
    }

    /// Block until the next job finishes. `None` once the worker has exited.
    pub fn recv(&self) -> Option<ArchiveEvent> {
        self.event_rx.recv().ok()
    }

    pub fn try_recv(&self) -> Option<ArchiveEvent> {
        self.event_rx.try_recv().ok()
    }

    /// Cancel every queued and in-flight job.
    pub fn cancel_all(&self) {
        self.cancel.cancel();
    }

    /// Stop accepting work and wait for in-flight jobs to report.
    pub fn shutdown(mut self) -> Vec<ArchiveEvent> {
        self.cmd_tx.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
        self.event_rx.try_iter().collect()
    }
}

impl Drop for ArchiveService {
    fn drop(&mut self) {
        self.cmd_tx.take();
        if let Some(worker) = self.worker.take() {
            self.cancel.cancel();
            let _ = worker.join();
        }
    }
}
