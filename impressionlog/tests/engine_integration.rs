//! Integration tests for the impression engine.
//!
//! These tests drive the real background poll loop:
//! - Layout notifications → candidate set → poll loop → broadcast
//! - Start/stop/restart of the poll loop
//! - Concurrent registration from many threads
//! - Independence of engine instances
//!
//! Dwell time is driven by a `ManualClock` so only the poll interval is real.
//!
//! Run with: `cargo test --test engine_integration`

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::sync::broadcast;

use impressionlog::geometry::{Rect, Size};
use impressionlog::impression::{
    EngineConfig, ImpressionEngine, ImpressionItem, LayoutOutcome, ManualClock,
};

// ============================================================================
// Helper Functions
// ============================================================================

const VIEWPORT: Rect = Rect {
    left: 0.0,
    top: 0.0,
    right: 100.0,
    bottom: 100.0,
};

const SIZE: Size = Size {
    width: 100.0,
    height: 100.0,
};

/// Engine polling every 2ms.
fn fast_engine<K: impressionlog::ImpressionKey>() -> Arc<ImpressionEngine<K>> {
    Arc::new(ImpressionEngine::new(
        EngineConfig::default()
            .with_poll_interval(Duration::from_millis(2))
            .with_channel_capacity(4096),
    ))
}

fn item<K>(key: K, clock: &Arc<ManualClock>) -> ImpressionItem<K> {
    ImpressionItem::new(key)
        .with_delay_ms(1000)
        .with_ratio(0.5)
        .with_clock(clock.clone())
}

/// Wait for the next impression, failing after one second.
async fn next_impression<K: Clone>(rx: &mut broadcast::Receiver<ImpressionItem<K>>) -> K {
    match tokio::time::timeout(Duration::from_secs(1), rx.recv()).await {
        Ok(Ok(item)) => item.key,
        Ok(Err(e)) => panic!("Impression receiver failed: {e}"),
        Err(_) => panic!("Timeout waiting for impression"),
    }
}

/// Give the poll loop several cycles.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(30)).await;
}

// ============================================================================
// Integration Tests
// ============================================================================

/// Item fully inside the viewport is impressed once its dwell time elapses.
#[tokio::test]
async fn test_poll_loop_emits_after_delay() {
    let engine = fast_engine::<&'static str>();
    let clock = Arc::new(ManualClock::new(0));
    let mut rx = engine.subscribe();

    assert!(engine.start().unwrap());

    let a = item("A", &clock);
    let outcome = engine.on_layout_changed(&a, SIZE, VIEWPORT, VIEWPORT, |_| {});
    assert!(matches!(
        outcome,
        LayoutOutcome::Candidate {
            start_time: 0,
            newly_added: true,
            ..
        }
    ));

    clock.set(999);
    settle().await;
    assert!(rx.try_recv().is_err(), "Nothing is due before 1000ms");

    clock.set(1000);
    assert_eq!(next_impression(&mut rx).await, "A");
    assert!(engine.impressed_keys().contains(&"A"));

    clock.set(10_000);
    engine.on_layout_changed(&a, SIZE, VIEWPORT, VIEWPORT, |_| {});
    settle().await;
    assert!(rx.try_recv().is_err(), "A must fire only once");

    assert!(engine.stop().await);
}

/// Stopping halts emissions; restarting resumes with state intact.
#[tokio::test]
async fn test_stop_and_restart_preserve_state() {
    let engine = fast_engine::<&'static str>();
    let clock = Arc::new(ManualClock::new(0));
    let mut rx = engine.subscribe();

    engine.start().unwrap();
    assert!(engine.is_running());
    assert!(!engine.start().unwrap(), "start is idempotent");

    assert!(engine.stop().await);
    assert!(!engine.is_running());
    assert!(!engine.stop().await, "second stop is a no-op");

    let a = item("A", &clock);
    engine.on_layout_changed(&a, SIZE, VIEWPORT, VIEWPORT, |_| {});
    clock.set(5000);
    settle().await;

    assert!(rx.try_recv().is_err(), "No emission while stopped");
    assert!(engine.is_candidate(&"A"));

    assert!(engine.start().unwrap());
    assert_eq!(next_impression(&mut rx).await, "A");

    engine.stop().await;
}

/// Many elements registering concurrently are each impressed exactly once.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_registration_no_duplicates_no_drops() {
    const THREADS: usize = 10;
    const PER_THREAD: usize = 100;

    let engine = fast_engine::<usize>();
    let clock = Arc::new(ManualClock::new(0));
    let mut rx = engine.subscribe();
    engine.start().unwrap();

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let engine = Arc::clone(&engine);
            let clock = Arc::clone(&clock);
            std::thread::spawn(move || {
                for i in 0..PER_THREAD {
                    let key = t * PER_THREAD + i;
                    let item = item(key, &clock);
                    // Repeated notifications must not create duplicates.
                    engine.on_layout_changed(&item, SIZE, VIEWPORT, VIEWPORT, |_| {});
                    engine.on_layout_changed(&item, SIZE, VIEWPORT, VIEWPORT, |_| {});
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(engine.candidate_count(), THREADS * PER_THREAD);
    clock.set(1000);

    let mut seen = HashSet::new();
    for _ in 0..THREADS * PER_THREAD {
        let key = next_impression(&mut rx).await;
        assert!(seen.insert(key), "Duplicate impression for {key}");
    }

    settle().await;
    assert!(rx.try_recv().is_err(), "No extra impressions");
    assert_eq!(seen.len(), THREADS * PER_THREAD);
    assert_eq!(engine.candidate_count(), 0);
    assert_eq!(engine.metrics().impressions_emitted, 1000);

    engine.stop().await;
}

/// Clearing the cache allows exactly one more impression per key.
#[tokio::test]
async fn test_clear_cache_cycle() {
    let engine = fast_engine::<&'static str>();
    let clock = Arc::new(ManualClock::new(0));
    let mut rx = engine.subscribe();
    engine.start().unwrap();

    let a = item("A", &clock).with_delay_ms(0);
    for _round in 0..3 {
        for _ in 0..5 {
            engine.on_layout_changed(&a, SIZE, VIEWPORT, VIEWPORT, |_| {});
        }
        assert_eq!(next_impression(&mut rx).await, "A");
        settle().await;
        assert!(rx.try_recv().is_err());

        engine.clear_cache();
        assert!(engine.impressed_keys().is_empty());
    }

    engine.stop().await;
}

/// Engines never share state.
#[tokio::test]
async fn test_engines_are_independent() {
    let first = fast_engine::<&'static str>();
    let second = fast_engine::<&'static str>();
    let clock = Arc::new(ManualClock::new(0));
    let mut first_rx = first.subscribe();
    let mut second_rx = second.subscribe();
    first.start().unwrap();
    second.start().unwrap();

    let a = item("A", &clock).with_delay_ms(0);
    first.on_layout_changed(&a, SIZE, VIEWPORT, VIEWPORT, |_| {});

    assert_eq!(next_impression(&mut first_rx).await, "A");
    settle().await;
    assert!(second_rx.try_recv().is_err());
    assert!(!second.is_impressed(&"A"));

    second.on_layout_changed(&a, SIZE, VIEWPORT, VIEWPORT, |_| {});
    assert_eq!(next_impression(&mut second_rx).await, "A");

    first.clear_cache();
    assert!(second.is_impressed(&"A"));

    first.stop().await;
    second.stop().await;
}

/// Subscribers see only impressions emitted after they subscribe.
#[tokio::test]
async fn test_late_subscriber_misses_earlier_events() {
    let engine = fast_engine::<&'static str>();
    let clock = Arc::new(ManualClock::new(0));
    let mut early = engine.subscribe();
    engine.start().unwrap();

    let a = item("A", &clock).with_delay_ms(0);
    engine.on_layout_changed(&a, SIZE, VIEWPORT, VIEWPORT, |_| {});
    assert_eq!(next_impression(&mut early).await, "A");

    let mut late = engine.subscribe();
    assert_eq!(engine.subscriber_count(), 2);

    let b = item("B", &clock).with_delay_ms(0);
    engine.on_layout_changed(&b, SIZE, VIEWPORT, VIEWPORT, |_| {});
    assert_eq!(next_impression(&mut late).await, "B");
    assert_eq!(next_impression(&mut early).await, "B");

    engine.stop().await;
}

/// The stream adapter yields impressions in emission order per key.
#[tokio::test]
async fn test_impression_stream() {
    let engine = fast_engine::<u32>();
    let clock = Arc::new(ManualClock::new(0));
    let mut stream = Box::pin(engine.impression_stream());
    engine.start().unwrap();

    let one = item(1_u32, &clock).with_delay_ms(0);
    engine.on_layout_changed(&one, SIZE, VIEWPORT, VIEWPORT, |_| {});

    let next = tokio::time::timeout(Duration::from_secs(1), stream.next())
        .await
        .expect("Timeout waiting for stream item");
    assert_eq!(next.map(|item| item.key), Some(1));

    engine.stop().await;
}

/// Tracked elements receive their own impression callback from the loop.
#[tokio::test]
async fn test_tracked_element_callbacks() {
    let engine = fast_engine::<&'static str>();
    let clock = Arc::new(ManualClock::new(0));
    let hits = Arc::new(AtomicUsize::new(0));
    let mut rx = engine.subscribe();
    engine.start().unwrap();

    let counter = Arc::clone(&hits);
    let seen = engine
        .track(item("row-1", &clock).with_delay_ms(100))
        .on_impression(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .register();
    let other = engine.track(item("row-2", &clock)).register();

    seen.layout_changed(SIZE, VIEWPORT, VIEWPORT);
    other.layout_changed(SIZE, VIEWPORT, VIEWPORT);
    other.dispose();

    clock.set(2000);
    assert_eq!(next_impression(&mut rx).await, "row-1");
    settle().await;

    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert!(rx.try_recv().is_err(), "Disposed row-2 never impresses");
    assert!(seen.is_impressed());

    engine.stop().await;
}

/// A panicking impression listener neither loses the broadcast nor ends the loop.
#[tokio::test]
async fn test_panicking_listener_keeps_poll_loop_alive() {
    let engine = fast_engine::<&'static str>();
    let clock = Arc::new(ManualClock::new(0));
    let mut rx = engine.subscribe();
    engine.start().unwrap();

    engine.add_impression_listener("A", |_| panic!("listener failure"));

    let a = item("A", &clock).with_delay_ms(0);
    engine.on_layout_changed(&a, SIZE, VIEWPORT, VIEWPORT, |_| {});
    assert_eq!(next_impression(&mut rx).await, "A");

    settle().await;
    assert!(engine.is_running());

    let b = item("B", &clock).with_delay_ms(0);
    engine.on_layout_changed(&b, SIZE, VIEWPORT, VIEWPORT, |_| {});
    assert_eq!(next_impression(&mut rx).await, "B");
    assert!(engine.is_impressed(&"B"));

    assert!(engine.stop().await);
}

/// Dropping the last handle ends the poll loop without an explicit stop.
#[tokio::test]
async fn test_drop_engine_while_running() {
    let engine = fast_engine::<u32>();
    let rx = engine.subscribe();
    engine.start().unwrap();

    drop(engine);
    settle().await;

    let mut rx = rx;
    assert!(matches!(
        rx.recv().await,
        Err(broadcast::error::RecvError::Closed)
    ));
}
