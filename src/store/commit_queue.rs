//! Commit coalescing
//!
//! Mutations buffer in memory and flush as one batched writer transaction
//! when either timer fires: the small timer restarts on every enqueue and
//! merges bursts; the large timer runs once per commit cycle and bounds
//! worst-case latency under continuous arrival. Dropping the queue
//! performs a final synchronous commit.

use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;

use parking_lot::{Condvar, Mutex, MutexGuard};
use tracing::{debug, warn};

use crate::config::CommitConfig;
use crate::index::{DocumentId, IndexDocument};
use crate::store::IndexStore;

struct State {
    adds: Vec<(DocumentId, IndexDocument)>,
    removes: Vec<DocumentId>,
    small_deadline: Option<Instant>,
    large_deadline: Option<Instant>,
    shutdown: bool,
    commits: u64,
    subscribers: Vec<Sender<u64>>,
}

struct Inner {
    store: Arc<IndexStore>,
    config: CommitConfig,
    state: Mutex<State>,
    cond: Condvar,
}

impl Inner {
    /// Swap out the buffers and apply them as one batch. Runs with the
    /// state lock held but releases it around the actual commit so
    /// enqueues keep flowing.
    fn commit_locked(self: &Arc<Self>, state: &mut MutexGuard<'_, State>) {
        state.small_deadline = None;
        state.large_deadline = None;

        let adds = std::mem::take(&mut state.adds);
        let removes = std::mem::take(&mut state.removes);
        if adds.is_empty() && removes.is_empty() {
            return;
        }

        debug!(adds = adds.len(), removes = removes.len(), "committing batch");
        let result =
            MutexGuard::unlocked(state, || self.store.apply_batch(&adds, &removes));

        match result {
            Ok(()) => {
                state.commits += 1;
                let seq = state.commits;
                state.subscribers.retain(|tx| tx.send(seq).is_ok());
            }
            Err(err) => {
                // The batch is discarded; the previous snapshot stays intact
                warn!(error = %err, "batch commit failed");
            }
        }
    }

    fn run(self: Arc<Self>) {
        let mut state = self.state.lock();
        loop {
            if state.shutdown {
                break;
            }
            let deadline = match (state.small_deadline, state.large_deadline) {
                (Some(s), Some(l)) => Some(s.min(l)),
                (s, l) => s.or(l),
            };
            match deadline {
                None => {
                    self.cond.wait(&mut state);
                }
                Some(at) if Instant::now() >= at => {
                    self.commit_locked(&mut state);
                }
                Some(at) => {
                    self.cond.wait_until(&mut state, at);
                }
            }
        }
    }
}

/// Single-owner queue coalescing index mutations into periodic commits
pub struct CommitQueue {
    inner: Arc<Inner>,
    worker: Option<JoinHandle<()>>,
}

impl CommitQueue {
    pub fn new(store: Arc<IndexStore>) -> Self {
        let config = store.config().commit.clone();
        Self::with_config(store, config)
    }

    pub fn with_config(store: Arc<IndexStore>, config: CommitConfig) -> Self {
        let inner = Arc::new(Inner {
            store,
            config,
            state: Mutex::new(State {
                adds: Vec::new(),
                removes: Vec::new(),
                small_deadline: None,
                large_deadline: None,
                shutdown: false,
                commits: 0,
                subscribers: Vec::new(),
            }),
            cond: Condvar::new(),
        });

        let worker_inner = inner.clone();
        let worker = std::thread::Builder::new()
            .name("fathom-commit".into())
            .spawn(move || worker_inner.run())
            .expect("failed to spawn commit worker");

        Self {
            inner,
            worker: Some(worker),
        }
    }

    /// Enqueue a document replacement
    pub fn add(&self, id: DocumentId, doc: IndexDocument) {
        let mut state = self.inner.state.lock();
        state.adds.push((id, doc));
        self.start_timers(&mut state);
    }

    /// Enqueue a document removal
    pub fn remove(&self, id: DocumentId) {
        let mut state = self.inner.state.lock();
        state.removes.push(id);
        self.start_timers(&mut state);
    }

    fn start_timers(&self, state: &mut MutexGuard<'_, State>) {
        let now = Instant::now();
        state.small_deadline = Some(now + self.inner.config.small_interval());
        if state.large_deadline.is_none() {
            state.large_deadline = Some(now + self.inner.config.large_interval());
        }
        self.inner.cond.notify_one();
    }

    /// Commit any pending mutations synchronously
    pub fn flush(&self) {
        let mut state = self.inner.state.lock();
        self.inner.commit_locked(&mut state);
    }

    /// Number of batches committed so far
    pub fn commit_count(&self) -> u64 {
        self.inner.state.lock().commits
    }

    /// Pending mutations not yet committed
    pub fn pending(&self) -> usize {
        let state = self.inner.state.lock();
        state.adds.len() + state.removes.len()
    }

    /// Receive the commit sequence number after each batch lands;
    /// subscribers reopen their retained readers on delivery
    pub fn subscribe(&self) -> Receiver<u64> {
        let (tx, rx) = channel();
        self.inner.state.lock().subscribers.push(tx);
        rx
    }
}

impl Drop for CommitQueue {
    fn drop(&mut self) {
        {
            let mut state = self.inner.state.lock();
            state.shutdown = true;
            self.inner.cond.notify_one();
        }
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
        // Final synchronous commit
        self.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use crate::index::DocumentBuilder;
    use std::path::Path;
    use std::time::Duration;
    use tempfile::TempDir;

    fn open_store(tmp: &TempDir) -> Arc<IndexStore> {
        IndexStore::open_file_store(StoreConfig::new(tmp.path(), "file")).unwrap()
    }

    fn text_doc(text: &str) -> IndexDocument {
        let mut builder = DocumentBuilder::new();
        builder.index_text(text, None, 1);
        builder.into_document()
    }

    #[test]
    fn test_burst_coalesces_into_one_commit() {
        let tmp = TempDir::new().unwrap();
        let store = open_store(&tmp);
        let queue = CommitQueue::with_config(
            store.clone(),
            CommitConfig {
                small_interval_ms: 100,
                large_interval_ms: 5_000,
            },
        );

        for i in 0..100u64 {
            let id = store
                .create_path_mapping(Path::new(&format!("/burst/{i}")))
                .unwrap();
            queue.add(id, text_doc("burst doc"));
        }

        std::thread::sleep(Duration::from_millis(400));
        assert_eq!(queue.commit_count(), 1);
        assert_eq!(queue.pending(), 0);
        assert_eq!(store.reader().reopen().unwrap().doc_count(), 100);
    }

    #[test]
    fn test_large_timer_bounds_latency() {
        let tmp = TempDir::new().unwrap();
        let store = open_store(&tmp);
        let queue = CommitQueue::with_config(
            store.clone(),
            CommitConfig {
                small_interval_ms: 100,
                large_interval_ms: 300,
            },
        );

        // Keep the small timer from ever firing; the large timer must
        // still bound the wait
        let started = Instant::now();
        let mut i = 0u64;
        while started.elapsed() < Duration::from_millis(900) {
            let id = store
                .create_path_mapping(Path::new(&format!("/stream/{i}")))
                .unwrap();
            queue.add(id, text_doc("stream doc"));
            i += 1;
            std::thread::sleep(Duration::from_millis(30));
        }

        assert!(queue.commit_count() >= 1);
    }

    #[test]
    fn test_drop_commits_pending() {
        let tmp = TempDir::new().unwrap();
        let store = open_store(&tmp);
        let id = store.create_path_mapping(Path::new("/pending")).unwrap();

        {
            let queue = CommitQueue::with_config(
                store.clone(),
                CommitConfig {
                    small_interval_ms: 60_000,
                    large_interval_ms: 60_000,
                },
            );
            queue.add(id, text_doc("pending doc"));
        }

        assert!(store.reader().reopen().unwrap().contains(id));
    }

    #[test]
    fn test_committed_notification() {
        let tmp = TempDir::new().unwrap();
        let store = open_store(&tmp);
        let queue = CommitQueue::with_config(
            store.clone(),
            CommitConfig {
                small_interval_ms: 50,
                large_interval_ms: 5_000,
            },
        );
        let committed = queue.subscribe();

        let id = store.create_path_mapping(Path::new("/notified")).unwrap();
        queue.add(id, text_doc("notified doc"));

        let seq = committed.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(seq, 1);
    }

    #[test]
    fn test_removals_apply_after_adds() {
        let tmp = TempDir::new().unwrap();
        let store = open_store(&tmp);
        let queue = CommitQueue::with_config(
            store.clone(),
            CommitConfig {
                small_interval_ms: 50,
                large_interval_ms: 5_000,
            },
        );

        let keep = store.create_path_mapping(Path::new("/keep")).unwrap();
        let gone = store.create_path_mapping(Path::new("/gone")).unwrap();
        queue.add(keep, text_doc("keep"));
        queue.add(gone, text_doc("gone"));
        queue.remove(gone);
        queue.flush();

        let snapshot = store.reader().reopen().unwrap();
        assert!(snapshot.contains(keep));
        assert!(!snapshot.contains(gone));
    }
}
