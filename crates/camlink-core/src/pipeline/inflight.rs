//! In-flight request map for deduplication.
//!
//! The first caller for a key becomes the leader and runs the transport
//! call; later callers with the same key register a waiter and receive a
//! clone of the leader's settled result. The entry is removed on settle,
//! whatever the outcome, so a subsequent identical call starts fresh.
//!
//! The leader holds its obligation as an RAII pledge: if the leader
//! future is dropped before settling (its task was cancelled mid-call),
//! the pledge's drop fails the waiters and frees the key, so the map
//! never wedges on a leader that no longer exists.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::oneshot;

use super::{CallError, CallResult};

type WaiterMap = Mutex<HashMap<String, Vec<oneshot::Sender<CallResult>>>>;

pub(super) enum Joined {
    /// No call with this key is in flight; the holder must dispatch and
    /// settle through the pledge.
    Leader(SettlePledge),
    /// A call is in flight; await its settled result.
    Follower(oneshot::Receiver<CallResult>),
}

#[derive(Default)]
pub(super) struct InflightMap {
    // Locked only between await points; never held across one.
    inner: Arc<WaiterMap>,
}

impl InflightMap {
    pub(super) fn join(&self, key: &str) -> Joined {
        let mut map = self.inner.lock().unwrap();
        match map.get_mut(key) {
            Some(waiters) => {
                let (tx, rx) = oneshot::channel();
                waiters.push(tx);
                Joined::Follower(rx)
            }
            None => {
                map.insert(key.to_string(), Vec::new());
                Joined::Leader(SettlePledge {
                    map: Arc::clone(&self.inner),
                    key: key.to_string(),
                    settled: false,
                })
            }
        }
    }
}

/// The leader's obligation to settle its key, fulfilled explicitly via
/// `settle` or implicitly on drop.
pub(super) struct SettlePledge {
    map: Arc<WaiterMap>,
    key: String,
    settled: bool,
}

impl SettlePledge {
    pub(super) fn settle(mut self, result: &CallResult) {
        self.settled = true;
        for tx in self.take_waiters() {
            // A dropped follower just stops waiting; nothing to do.
            let _ = tx.send(result.clone());
        }
    }

    fn take_waiters(&self) -> Vec<oneshot::Sender<CallResult>> {
        self.map.lock().unwrap().remove(&self.key).unwrap_or_default()
    }
}

impl Drop for SettlePledge {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        for tx in self.take_waiters() {
            let _ = tx.send(Err(CallError::Transport(
                "request cancelled before completion".to_string(),
            )));
        }
    }
}
