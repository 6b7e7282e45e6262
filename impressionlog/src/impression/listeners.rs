//! Per-key impression callbacks.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tracing::warn;

use super::item::{ImpressionItem, ImpressionKey};

/// Callback invoked when a tracked key is impressed.
pub type ImpressionCallback<K> = Arc<dyn Fn(&ImpressionItem<K>) + Send + Sync>;

/// Handle identifying one registered callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Registry of callbacks keyed by element key.
///
/// Several callbacks may watch the same key; they run in registration order.
pub(crate) struct ImpressionListeners<K: ImpressionKey> {
    next_id: AtomicU64,
    by_key: DashMap<K, Vec<(ListenerId, ImpressionCallback<K>)>>,
}

impl<K: ImpressionKey> ImpressionListeners<K> {
    pub(crate) fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            by_key: DashMap::new(),
        }
    }

    pub(crate) fn add(&self, key: K, callback: ImpressionCallback<K>) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.by_key.entry(key).or_default().push((id, callback));
        id
    }

    /// Remove one callback. Returns `false` if it was not registered.
    pub(crate) fn remove(&self, key: &K, id: ListenerId) -> bool {
        let mut removed = false;
        let now_empty = match self.by_key.get_mut(key) {
            Some(mut callbacks) => {
                let before = callbacks.len();
                callbacks.retain(|(existing, _)| *existing != id);
                removed = callbacks.len() != before;
                callbacks.is_empty()
            }
            None => false,
        };
        if now_empty {
            self.by_key.remove_if(key, |_, callbacks| callbacks.is_empty());
        }
        removed
    }

    /// Run every callback registered for `item.key`.
    ///
    /// Callbacks are cloned out first so none runs under a shard lock and a
    /// callback may register or remove listeners itself. A panicking callback
    /// is logged and skipped; the remaining callbacks still run.
    ///
    /// Returns the number of callbacks that panicked.
    pub(crate) fn notify(&self, item: &ImpressionItem<K>) -> usize {
        let callbacks: Vec<ImpressionCallback<K>> = match self.by_key.get(&item.key) {
            Some(entry) => entry.iter().map(|(_, cb)| Arc::clone(cb)).collect(),
            None => return 0,
        };

        let mut panicked = 0;
        for callback in callbacks {
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| callback(item))) {
                panicked += 1;
                warn!(
                    key = ?item.key,
                    panic = panic_message(payload.as_ref()),
                    "Impression listener panicked"
                );
            }
        }
        panicked
    }

    pub(crate) fn len(&self) -> usize {
        self.by_key.iter().map(|entry| entry.len()).sum()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}
