//! The impression engine.
//!
//! [`ImpressionEngine`] owns the candidate set, the impressed set and the
//! impression broadcast channel for one scope (a screen, a list). Geometry
//! callbacks are synchronous and may arrive concurrently from any thread;
//! dwell time is checked by a single polling task instead of per-element
//! timers, trading up to one poll interval of latency for constant timer
//! overhead however many elements are visible.
//!
//! # Architecture
//!
//! ```text
//!  on_layout_changed ──► geometry::visibility ──► CandidateSet ◄── snapshot ── poll loop
//!  on_dispose ─────────────────────────────────► (DashMap)                       │
//!                                                                               ▼
//!  clear_cache ───────────────────────────────► ImpressedSet ◄── mark ── due candidates
//!                                                                               │
//!                                                        listeners + broadcast ◄┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! let engine = Arc::new(ImpressionEngine::new(EngineConfig::default()));
//! engine.start()?;
//!
//! let mut rx = engine.subscribe();
//! engine.on_layout_changed(&item, size, bounds, viewport, |ratio| {
//!     tracing::trace!(ratio, "visible");
//! });
//!
//! let impressed = rx.recv().await?;
//! engine.stop().await;
//! ```

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Weak};
use std::time::Duration;

use futures::Stream;
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use super::candidates::{Admission, CandidateSet, VisibleItem};
use super::config::EngineConfig;
use super::error::EngineError;
use super::impressed::ImpressedSet;
use super::item::{ImpressionItem, ImpressionKey};
use super::listeners::{ImpressionCallback, ImpressionListeners, ListenerId};
use crate::geometry::{self, Rect, Size};
use crate::telemetry::{EngineMetrics, MetricsSnapshot};

/// What a geometry notification did to an element.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LayoutOutcome {
    /// The key was already impressed; nothing was evaluated.
    AlreadyImpressed,
    /// Element and viewport do not overlap; any candidacy was dropped.
    Hidden,
    /// Visible, but under the item's ratio threshold; any candidacy was dropped.
    BelowThreshold { ratio: f32 },
    /// The element is a candidate.
    Candidate {
        ratio: f32,
        start_time: u64,
        /// `true` if this notification started the dwell timer.
        newly_added: bool,
    },
}

/// Running poll loop.
struct PollTask {
    cancellation: CancellationToken,
    handle: JoinHandle<()>,
}

/// Detects impressions for a dynamic set of elements.
///
/// Share it through an `Arc`: [`start`](Self::start) and element tracking
/// need one. The poll loop only holds a weak reference, so dropping the last
/// `Arc` also ends the loop.
pub struct ImpressionEngine<K: ImpressionKey> {
    config: EngineConfig,
    candidates: CandidateSet<K>,
    impressed: ImpressedSet<K>,
    listeners: ImpressionListeners<K>,
    events: broadcast::Sender<ImpressionItem<K>>,
    metrics: EngineMetrics,
    poller: Mutex<Option<PollTask>>,
}

impl<K: ImpressionKey> std::fmt::Debug for ImpressionEngine<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImpressionEngine")
            .field("config", &self.config)
            .field("candidates", &self.candidates.len())
            .field("impressed", &self.impressed.len())
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

impl<K: ImpressionKey> Default for ImpressionEngine<K> {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl<K: ImpressionKey> ImpressionEngine<K> {
    /// Create a stopped engine.
    pub fn new(config: EngineConfig) -> Self {
        let (events, _) = broadcast::channel(config.channel_capacity.max(1));
        Self {
            config,
            candidates: CandidateSet::new(),
            impressed: ImpressedSet::new(),
            listeners: ImpressionListeners::new(),
            events,
            metrics: EngineMetrics::new(),
            poller: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // =========================================================================
    // Geometry notifications
    // =========================================================================

    /// Evaluate a geometry change for `item`.
    ///
    /// `on_ratio_changed` receives the visible ratio (`0.0` when disjoint)
    /// synchronously, unless the key is already impressed, in which case the
    /// call is a no-op.
    ///
    /// Crossing the item's threshold makes it a candidate with a start time
    /// from the item's clock. Later notifications while still above the
    /// threshold keep that start time; dropping below it (or out of the
    /// viewport) removes the candidate, so the next crossing starts afresh.
    pub fn on_layout_changed<F>(
        &self,
        item: &ImpressionItem<K>,
        size: Size,
        bounds: Rect,
        viewport: Rect,
        on_ratio_changed: F,
    ) -> LayoutOutcome
    where
        F: FnOnce(f32),
    {
        if self.impressed.contains(&item.key) {
            self.metrics.layout_skipped();
            return LayoutOutcome::AlreadyImpressed;
        }
        self.metrics.layout_evaluated();

        let visibility = geometry::visibility(&bounds, &viewport, size);
        let ratio = visibility.ratio();
        on_ratio_changed(ratio);
        trace!(key = ?item.key, ratio, "Layout evaluated");

        if visibility.is_disjoint() {
            self.on_dispose(item);
            return LayoutOutcome::Hidden;
        }

        if !item.is_ratio_satisfied(ratio) {
            self.on_dispose(item);
            return LayoutOutcome::BelowThreshold { ratio };
        }

        match self.candidates.admit(item) {
            Admission::Inserted { start_time } => {
                self.metrics.candidate_added();
                debug!(
                    key = ?item.key,
                    ratio,
                    start_time,
                    delay_ms = item.delay_time_ms,
                    "Candidate added"
                );
                LayoutOutcome::Candidate {
                    ratio,
                    start_time,
                    newly_added: true,
                }
            }
            Admission::AlreadyCandidate { start_time } => LayoutOutcome::Candidate {
                ratio,
                start_time,
                newly_added: false,
            },
        }
    }

    /// Drop `item`'s candidacy. Unknown keys are a no-op.
    ///
    /// Returns whether a candidate was removed.
    pub fn on_dispose(&self, item: &ImpressionItem<K>) -> bool {
        self.dispose_key(&item.key)
    }

    /// Drop the candidacy of `key`. Unknown keys are a no-op.
    pub fn dispose_key(&self, key: &K) -> bool {
        if self.candidates.remove(key).is_some() {
            self.metrics.candidate_removed();
            debug!(key = ?key, "Candidate removed");
            true
        } else {
            false
        }
    }

    /// Forget every impression so far.
    ///
    /// Candidates are untouched; impressed keys become eligible again on
    /// their next qualifying layout.
    pub fn clear_cache(&self) {
        let cleared = self.impressed.clear();
        self.metrics.cache_cleared();
        info!(cleared, "Impression cache cleared");
    }

    // =========================================================================
    // Evaluation
    // =========================================================================

    /// Run one poll cycle and return the number of impressions emitted.
    ///
    /// Each due candidate is marked impressed, removed from the candidate
    /// set, broadcast and then handed to its key's listeners. A panicking
    /// listener is logged and skipped. The order among keys that fall due in
    /// the same cycle is unspecified.
    pub fn evaluate(&self) -> usize {
        self.metrics.poll_cycle();

        let mut emitted = 0;
        for visible in self.candidates.snapshot() {
            if self.try_impress(&visible) {
                emitted += 1;
            }
        }

        if emitted > 0 {
            trace!(emitted, remaining = self.candidates.len(), "Poll cycle");
        }
        emitted
    }

    fn try_impress(&self, visible: &VisibleItem<K>) -> bool {
        let key = &visible.item.key;

        if self.impressed.contains(key) {
            // Re-admitted by a layout callback that raced the impression.
            if self.candidates.remove_if_started_at(key, visible.start_time) {
                self.metrics.candidate_removed();
            }
            return false;
        }

        let now = visible.item.observe_start_time();
        if !visible.is_due(now) {
            return false;
        }

        if !self.impressed.mark(key.clone()) {
            return false;
        }
        // A layout pass may have replaced this candidacy since the snapshot;
        // the replacement is removed on the next cycle and counted then.
        if self.candidates.remove_if_started_at(key, visible.start_time) {
            self.metrics.candidate_removed();
        }
        self.metrics.impression_emitted();
        debug!(
            key = ?key,
            elapsed_ms = visible.elapsed_ms(now),
            delay_ms = visible.item.delay_time_ms,
            "Impression emitted"
        );

        // No subscribers is not an error; events are fire-and-forget.
        let _ = self.events.send(visible.item.clone());
        self.listeners.notify(&visible.item);
        true
    }

    // =========================================================================
    // Poll loop lifecycle
    // =========================================================================

    /// Start the poll loop on the current Tokio runtime.
    ///
    /// Idempotent: returns `Ok(false)` if the loop is already running.
    pub fn start(self: &Arc<Self>) -> Result<bool, EngineError> {
        let runtime = Handle::try_current()?;

        let mut poller = self.poller.lock();
        if poller.as_ref().is_some_and(|task| !task.handle.is_finished()) {
            return Ok(false);
        }

        let cancellation = CancellationToken::new();
        let handle = runtime.spawn(Self::run_poll_loop(
            Arc::downgrade(self),
            self.config.poll_interval,
            cancellation.clone(),
        ));
        *poller = Some(PollTask {
            cancellation,
            handle,
        });

        info!(
            poll_interval_ms = self.config.poll_interval.as_millis() as u64,
            candidates = self.candidates.len(),
            impressed = self.impressed.len(),
            "Impression poll loop started"
        );
        Ok(true)
    }

    /// Stop the poll loop and wait until it has exited.
    ///
    /// No impression is emitted after this returns. State is kept, so a
    /// later [`start`](Self::start) resumes against the same candidates and
    /// impressed keys. Returns `false` if the loop was not running.
    pub async fn stop(&self) -> bool {
        let task = self.poller.lock().take();
        let Some(task) = task else {
            return false;
        };

        task.cancellation.cancel();
        if let Err(e) = task.handle.await {
            warn!(error = %e, "Impression poll loop ended abnormally");
        }
        info!("Impression poll loop stopped");
        true
    }

    /// Whether the poll loop is currently running.
    pub fn is_running(&self) -> bool {
        self.poller
            .lock()
            .as_ref()
            .is_some_and(|task| !task.handle.is_finished())
    }

    async fn run_poll_loop(
        engine: Weak<Self>,
        interval: Duration,
        cancellation: CancellationToken,
    ) {
        loop {
            if cancellation.is_cancelled() {
                break;
            }

            match engine.upgrade() {
                Some(engine) => {
                    engine.evaluate();
                }
                None => {
                    debug!("Impression engine dropped, poll loop exiting");
                    break;
                }
            }

            tokio::select! {
                biased;

                _ = cancellation.cancelled() => break,
                _ = tokio::time::sleep(interval) => {}
            }
        }
    }

    // =========================================================================
    // Outputs
    // =========================================================================

    /// Subscribe to impressions emitted from now on.
    ///
    /// Late subscribers miss earlier events. A receiver more than
    /// `channel_capacity` events behind gets `RecvError::Lagged`.
    pub fn subscribe(&self) -> broadcast::Receiver<ImpressionItem<K>> {
        self.events.subscribe()
    }

    /// Impressions emitted from now on, as a stream.
    ///
    /// Lag is logged and skipped; the stream ends when the engine is dropped.
    pub fn impression_stream(&self) -> impl Stream<Item = ImpressionItem<K>> + Send + 'static {
        futures::stream::unfold(self.events.subscribe(), |mut rx| async move {
            loop {
                match rx.recv().await {
                    Ok(item) => return Some((item, rx)),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Impression stream lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }
        })
    }

    /// Number of live broadcast subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.events.receiver_count()
    }

    /// Call `callback` synchronously from the poll cycle whenever `key` is
    /// impressed.
    pub fn add_impression_listener<F>(&self, key: K, callback: F) -> ListenerId
    where
        F: Fn(&ImpressionItem<K>) + Send + Sync + 'static,
    {
        let callback: ImpressionCallback<K> = Arc::new(callback);
        self.listeners.add(key, callback)
    }

    /// Unregister a listener added with
    /// [`add_impression_listener`](Self::add_impression_listener).
    pub fn remove_impression_listener(&self, key: &K, id: ListenerId) -> bool {
        self.listeners.remove(key, id)
    }

    /// Number of registered impression listeners across all keys.
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    pub fn is_impressed(&self, key: &K) -> bool {
        self.impressed.contains(key)
    }

    pub fn is_candidate(&self, key: &K) -> bool {
        self.candidates.contains(key)
    }

    /// Snapshot of the impressed keys.
    pub fn impressed_keys(&self) -> HashSet<K> {
        self.impressed.snapshot()
    }

    /// Snapshot of the candidate set.
    pub fn candidates(&self) -> HashMap<K, VisibleItem<K>> {
        self.candidates
            .snapshot()
            .into_iter()
            .map(|visible| (visible.item.key.clone(), visible))
            .collect()
    }

    pub fn candidate_count(&self) -> usize {
        self.candidates.len()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

impl<K: ImpressionKey> Drop for ImpressionEngine<K> {
    fn drop(&mut self) {
        if let Some(task) = self.poller.get_mut().take() {
            task.cancellation.cancel();
        }
    }
}
