//! Per-element tracking handle.

use std::sync::Arc;

use tracing::trace;

use crate::geometry::{Rect, Size};
use crate::impression::{
    ImpressionCallback, ImpressionEngine, ImpressionItem, ImpressionKey, LayoutOutcome, ListenerId,
};

/// Callback receiving the visible ratio on every geometry evaluation.
pub type RatioCallback = Arc<dyn Fn(f32) + Send + Sync>;

impl<K: ImpressionKey> ImpressionEngine<K> {
    /// Begin registering an element for impression tracking.
    pub fn track(self: &Arc<Self>, item: ImpressionItem<K>) -> TrackerBuilder<K> {
        TrackerBuilder {
            engine: Arc::clone(self),
            item,
            on_ratio_changed: None,
            on_impression: None,
        }
    }
}

/// Builder returned by [`ImpressionEngine::track`].
#[must_use = "call register() to start tracking"]
pub struct TrackerBuilder<K: ImpressionKey> {
    engine: Arc<ImpressionEngine<K>>,
    item: ImpressionItem<K>,
    on_ratio_changed: Option<RatioCallback>,
    on_impression: Option<ImpressionCallback<K>>,
}

impl<K: ImpressionKey> TrackerBuilder<K> {
    /// Receive the visible ratio on every evaluated layout change.
    pub fn on_ratio_changed<F>(mut self, callback: F) -> Self
    where
        F: Fn(f32) + Send + Sync + 'static,
    {
        self.on_ratio_changed = Some(Arc::new(callback));
        self
    }

    /// Receive this element's impression, synchronously from the poll cycle.
    pub fn on_impression<F>(mut self, callback: F) -> Self
    where
        F: Fn(&ImpressionItem<K>) + Send + Sync + 'static,
    {
        self.on_impression = Some(Arc::new(callback));
        self
    }

    /// Register the element and return its handle.
    pub fn register(self) -> TrackedElement<K> {
        let listener = self.on_impression.map(|callback| {
            let key = self.item.key.clone();
            self.engine
                .add_impression_listener(key, move |item| callback(item))
        });
        trace!(key = ?self.item.key, "Element registered");

        TrackedElement {
            engine: self.engine,
            item: self.item,
            on_ratio_changed: self.on_ratio_changed,
            listener,
        }
    }
}

/// A mounted element reporting geometry to an engine.
///
/// Dropping the handle disposes the element: its candidacy is removed and
/// its impression callback unregistered. Impressions already recorded for
/// the key are kept.
pub struct TrackedElement<K: ImpressionKey> {
    engine: Arc<ImpressionEngine<K>>,
    item: ImpressionItem<K>,
    on_ratio_changed: Option<RatioCallback>,
    listener: Option<ListenerId>,
}

impl<K: ImpressionKey> TrackedElement<K> {
    /// Report a geometry change.
    pub fn layout_changed(&self, size: Size, bounds: Rect, viewport: Rect) -> LayoutOutcome {
        let on_ratio = self.on_ratio_changed.as_deref();
        self.engine
            .on_layout_changed(&self.item, size, bounds, viewport, |ratio| {
                if let Some(callback) = on_ratio {
                    callback(ratio);
                }
            })
    }

    pub fn item(&self) -> &ImpressionItem<K> {
        &self.item
    }

    pub fn key(&self) -> &K {
        &self.item.key
    }

    pub fn is_impressed(&self) -> bool {
        self.engine.is_impressed(&self.item.key)
    }

    pub fn is_candidate(&self) -> bool {
        self.engine.is_candidate(&self.item.key)
    }

    /// Unmount the element.
    pub fn dispose(self) {
        drop(self);
    }
}

impl<K: ImpressionKey> Drop for TrackedElement<K> {
    fn drop(&mut self) {
        self.engine.on_dispose(&self.item);
        if let Some(id) = self.listener.take() {
            self.engine.remove_impression_listener(&self.item.key, id);
        }
        trace!(key = ?self.item.key, "Element disposed");
    }
}

impl<K: ImpressionKey> std::fmt::Debug for TrackedElement<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackedElement")
            .field("item", &self.item)
            .field("listener", &self.listener)
            .finish_non_exhaustive()
    }
}
