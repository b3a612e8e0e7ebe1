//! Short-window request batching.
//!
//! Calls submitted through `batch_request` within one window are grouped
//! by method + path-without-query and dispatched individually, in
//! submission order within each group. The contract is ordering, not
//! payload coalescing; merging group payloads is an extension point.

use std::sync::Mutex;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::time::sleep;

use super::key;
use super::{CallError, CallResult, RequestOptions, RequestPipeline};

struct BatchEntry {
    group: String,
    url: String,
    options: RequestOptions,
    tx: oneshot::Sender<CallResult>,
}

pub(super) struct Batcher {
    window: Duration,
    queue: Mutex<Vec<BatchEntry>>,
}

impl Batcher {
    pub(super) fn new(window: Duration) -> Self {
        Self {
            window,
            queue: Mutex::new(Vec::new()),
        }
    }
}

/// Held by the flusher across the window sleep. If the flusher future is
/// dropped before it drains the queue, the guard clears the queue so the
/// stranded entries' senders drop and their callers get an error instead
/// of waiting on a window nobody will flush.
struct WindowGuard<'a> {
    queue: &'a Mutex<Vec<BatchEntry>>,
    armed: bool,
}

impl Drop for WindowGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.queue.lock().unwrap().clear();
        }
    }
}

impl RequestPipeline {
    /// Submit a request into the current batch window.
    ///
    /// The first caller of a window becomes its flusher: it sleeps out the
    /// window, drains the queue, and dispatches every collected entry
    /// through the normal `request` path (so dedup, ceiling, and retries
    /// all still apply). Groups run in first-seen order; entries within a
    /// group run sequentially in submission order.
    pub async fn batch_request(&self, url: &str, options: RequestOptions) -> CallResult {
        let (tx, rx) = oneshot::channel();
        let is_flusher = {
            let mut queue = self.batcher.queue.lock().unwrap();
            let first = queue.is_empty();
            queue.push(BatchEntry {
                group: key::group_key(&options.method, url),
                url: url.to_string(),
                options,
                tx,
            });
            first
        };

        if is_flusher {
            let mut guard = WindowGuard {
                queue: &self.batcher.queue,
                armed: true,
            };
            sleep(self.batcher.window).await;
            let entries = std::mem::take(&mut *self.batcher.queue.lock().unwrap());
            // Entries are local now; dropping this future drops their
            // senders too, so the guard has nothing left to cover.
            guard.armed = false;
            let mut groups: Vec<(String, Vec<BatchEntry>)> = Vec::new();
            for entry in entries {
                match groups.iter_mut().find(|(g, _)| *g == entry.group) {
                    Some((_, members)) => members.push(entry),
                    None => groups.push((entry.group.clone(), vec![entry])),
                }
            }
            for (_, members) in groups {
                for entry in members {
                    let result = self.request(&entry.url, entry.options).await;
                    let _ = entry.tx.send(result);
                }
            }
        }

        rx.await
            .map_err(|_| CallError::Transport("batch window dropped".to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::events::EventBus;
    use crate::testutil::{self, Response};
    use std::sync::Arc;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn batched_calls_keep_submission_order_within_group() {
        let server = testutil::start(|_req| Response::ok(b"ok".to_vec()));
        let cfg = PipelineConfig {
            max_concurrent: 6,
            request_timeout_secs: 5,
            request_retries: 0,
            batch_window_ms: 20,
        };
        let p = Arc::new(RequestPipeline::new(&cfg, EventBus::default()));

        let mut handles = Vec::new();
        for i in 0..4 {
            let p = Arc::clone(&p);
            let url = format!("{}/api/v1/files?page={}", server.base, i);
            handles.push(tokio::spawn(async move {
                p.batch_request(&url, RequestOptions::get()).await
            }));
            // Stagger submissions inside the window so order is defined.
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        for h in handles {
            h.await.unwrap().unwrap();
        }

        let hits = server.hits.lock().unwrap().clone();
        assert_eq!(hits.len(), 4);
        for (i, hit) in hits.iter().enumerate() {
            assert_eq!(hit, &format!("GET /api/v1/files?page={}", i));
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn aborted_flusher_fails_queued_entries_instead_of_stranding_them() {
        let server = testutil::start(|_req| Response::ok(b"ok".to_vec()));
        let cfg = PipelineConfig {
            max_concurrent: 6,
            request_timeout_secs: 5,
            request_retries: 0,
            batch_window_ms: 100,
        };
        let p = Arc::new(RequestPipeline::new(&cfg, EventBus::default()));

        let flusher = {
            let p = Arc::clone(&p);
            let url = format!("{}/a", server.base);
            tokio::spawn(async move { p.batch_request(&url, RequestOptions::get()).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        let queued = {
            let p = Arc::clone(&p);
            let url = format!("{}/b", server.base);
            tokio::spawn(async move { p.batch_request(&url, RequestOptions::get()).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;

        // Kill the flusher mid-window; the queued entry must fail rather
        // than wait forever on a window nobody will flush.
        flusher.abort();
        let _ = flusher.await;

        let outcome = tokio::time::timeout(Duration::from_secs(3), queued)
            .await
            .expect("queued entry stranded behind an aborted flusher")
            .unwrap();
        assert!(matches!(outcome, Err(CallError::Transport(_))));

        // A fresh submission opens a new window and goes through.
        let resp = p
            .batch_request(&format!("{}/c", server.base), RequestOptions::get())
            .await
            .unwrap();
        assert_eq!(resp.status, 200);
    }
}
