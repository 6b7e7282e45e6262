//! Simulate command - scroll a virtualized list through a live engine.
//!
//! # Architecture
//!
//! ```text
//! frame ticker ──► scroll offset ──► render window ──► mount / drop rows
//!                                                        │
//!                                    layout_changed ◄────┘
//!                                          │
//!                                          ▼
//!                                  ImpressionEngine ──► broadcast ──► printer
//! ```
//!
//! Rows are only tracked while inside the render window (viewport plus
//! overscan), the way a lazy list composes and disposes its children. The
//! list scrolls at a constant speed and bounces at both ends.

use std::collections::BTreeMap;
use std::ops::Range;
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Args;
use impressionlog::config::ConfigFile;
use impressionlog::geometry::{Rect, Size};
use impressionlog::telemetry::MetricsSnapshot;
use impressionlog::tracker::TrackedElement;
use impressionlog::{ImpressionEngine, ImpressionItem};
use serde::Serialize;
use tokio::sync::broadcast;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::common::OutputFormat;
use crate::error::CliError;

/// Arguments for the simulate command.
#[derive(Debug, Args)]
pub struct SimulateArgs {
    /// Number of rows in the list
    #[arg(long, default_value_t = 200)]
    pub rows: usize,

    /// Row height in pixels
    #[arg(long, default_value_t = 80.0)]
    pub row_height: f32,

    /// Viewport width in pixels
    #[arg(long, default_value_t = 360.0)]
    pub viewport_width: f32,

    /// Viewport height in pixels
    #[arg(long, default_value_t = 640.0)]
    pub viewport_height: f32,

    /// Scroll speed in pixels per second
    #[arg(long, default_value_t = 240.0)]
    pub speed: f32,

    /// Frame interval in milliseconds
    #[arg(long, default_value_t = 16)]
    pub frame_ms: u64,

    /// Rows kept mounted beyond each viewport edge
    #[arg(long, default_value_t = 2)]
    pub overscan: usize,

    /// Stop after this many seconds (0 runs until Ctrl-C)
    #[arg(long, default_value_t = 10, value_name = "SECS")]
    pub duration: u64,

    /// Dwell time before a row counts as impressed (overrides config)
    #[arg(long)]
    pub delay_ms: Option<u64>,

    /// Minimum visible fraction of a row (overrides config)
    #[arg(long)]
    pub ratio: Option<f32>,

    /// Clear the impression cache every N seconds
    #[arg(long, value_name = "SECS")]
    pub clear_every: Option<u64>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

impl SimulateArgs {
    fn validate(&self) -> Result<(), CliError> {
        let invalid =
            |msg: &str| -> Result<(), CliError> { Err(CliError::InvalidArgument(msg.to_string())) };

        if self.rows == 0 {
            return invalid("--rows must be greater than 0");
        }
        if !(self.row_height > 0.0) {
            return invalid("--row-height must be greater than 0");
        }
        if !(self.viewport_width > 0.0 && self.viewport_height > 0.0) {
            return invalid("viewport dimensions must be greater than 0");
        }
        if !(self.speed >= 0.0) {
            return invalid("--speed must not be negative");
        }
        if self.frame_ms == 0 {
            return invalid("--frame-ms must be greater than 0");
        }
        if self.ratio.is_some_and(|r| !(0.0..=1.0).contains(&r)) {
            return invalid("--ratio must be between 0 and 1");
        }
        if self.clear_every == Some(0) {
            return invalid("--clear-every must be greater than 0");
        }
        Ok(())
    }
}

// ============================================================================
// List geometry
// ============================================================================

/// Geometry of a vertical list of equal-height rows.
#[derive(Debug, Clone, Copy, PartialEq)]
struct ListLayout {
    rows: usize,
    row_height: f32,
    viewport: Rect,
    overscan: usize,
}

impl ListLayout {
    fn from_args(args: &SimulateArgs) -> Self {
        Self {
            rows: args.rows,
            row_height: args.row_height,
            viewport: Rect::new(0.0, 0.0, args.viewport_width, args.viewport_height),
            overscan: args.overscan,
        }
    }

    fn max_offset(&self) -> f32 {
        (self.rows as f32 * self.row_height - self.viewport.height()).max(0.0)
    }

    /// Scroll offset after travelling `distance` pixels, reflecting at both ends.
    fn offset_at(&self, distance: f32) -> f32 {
        let max = self.max_offset();
        if max <= 0.0 {
            return 0.0;
        }
        let position = distance.max(0.0) % (2.0 * max);
        if position <= max {
            position
        } else {
            2.0 * max - position
        }
    }

    /// Rows composed at `offset`: those intersecting the viewport plus overscan.
    fn render_window(&self, offset: f32) -> Range<usize> {
        let first = (offset / self.row_height).floor().max(0.0) as usize;
        let end = ((offset + self.viewport.height()) / self.row_height).ceil() as usize;

        let start = first.saturating_sub(self.overscan).min(self.rows);
        let end = end.saturating_add(self.overscan).min(self.rows);
        start..end.max(start)
    }

    /// Bounds of `row` in viewport coordinates.
    fn row_bounds(&self, row: usize, offset: f32) -> Rect {
        Rect::from_origin_size(0.0, row as f32 * self.row_height, self.row_size())
            .translate(0.0, -offset)
    }

    fn row_size(&self) -> Size {
        Size::new(self.viewport.width(), self.row_height)
    }
}

// ============================================================================
// Output
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum OutputEvent {
    Impression {
        row: usize,
        elapsed_ms: u64,
        delay_ms: u64,
        ratio: f32,
    },
    Summary {
        elapsed_ms: u64,
        rows_mounted: u64,
        impressed_rows: usize,
        events_printed: u64,
        metrics: MetricsSnapshot,
    },
}

fn emit(format: OutputFormat, event: &OutputEvent) -> Result<(), CliError> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string(event)?),
        OutputFormat::Text => match event {
            OutputEvent::Impression {
                row,
                elapsed_ms,
                delay_ms,
                ratio,
            } => println!(
                "[{:>8.3}s] row {:>5} impressed (delay {}ms, ratio {:.2})",
                *elapsed_ms as f64 / 1000.0,
                row,
                delay_ms,
                ratio
            ),
            OutputEvent::Summary {
                elapsed_ms,
                rows_mounted,
                impressed_rows,
                events_printed,
                metrics,
            } => {
                println!();
                println!("Simulation Summary");
                println!("==================");
                println!("  Duration:        {:.1}s", *elapsed_ms as f64 / 1000.0);
                println!("  Rows mounted:    {}", rows_mounted);
                println!("  Impressed rows:  {}", impressed_rows);
                println!("  Events printed:  {}", events_printed);
                println!("  Engine metrics:  {}", metrics);
            }
        },
    }
    Ok(())
}

/// Print impressions until the engine is dropped. Returns the number printed.
async fn print_impressions(
    mut rx: broadcast::Receiver<ImpressionItem<usize>>,
    format: OutputFormat,
    started: Instant,
) -> Result<u64, CliError> {
    let mut printed = 0;
    loop {
        match rx.recv().await {
            Ok(item) => {
                emit(
                    format,
                    &OutputEvent::Impression {
                        row: item.key,
                        elapsed_ms: started.elapsed().as_millis() as u64,
                        delay_ms: item.delay_time_ms,
                        ratio: item.ratio,
                    },
                )?;
                printed += 1;
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "Output fell behind, impressions not printed");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
    Ok(printed)
}

// ============================================================================
// Command
// ============================================================================

/// Run the simulate command.
pub fn run(args: SimulateArgs, config: &ConfigFile) -> Result<(), CliError> {
    args.validate()?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(CliError::RuntimeCreation)?;

    let shutdown = CancellationToken::new();
    let handler_token = shutdown.clone();
    ctrlc::set_handler(move || handler_token.cancel())?;

    runtime.block_on(simulate(args, config, shutdown))
}

async fn simulate(
    args: SimulateArgs,
    config: &ConfigFile,
    shutdown: CancellationToken,
) -> Result<(), CliError> {
    let layout = ListLayout::from_args(&args);
    let mut defaults = config.clone();
    if let Some(delay_ms) = args.delay_ms {
        defaults.impression.delay_ms = delay_ms;
    }
    if let Some(ratio) = args.ratio {
        defaults.impression.ratio = ratio;
    }

    let engine = Arc::new(ImpressionEngine::<usize>::new(config.to_engine_config()));
    let started = Instant::now();
    let printer = tokio::spawn(print_impressions(engine.subscribe(), args.format, started));
    engine.start()?;

    info!(
        rows = layout.rows,
        speed = args.speed,
        delay_ms = defaults.impression.delay_ms,
        ratio = defaults.impression.ratio,
        "Simulation started"
    );

    let deadline = (args.duration > 0).then(|| Duration::from_secs(args.duration));
    let clear_every = args.clear_every.map(Duration::from_secs);
    let mut last_clear = Duration::ZERO;
    let mut rows_mounted = 0u64;
    let mut mounted: BTreeMap<usize, TrackedElement<usize>> = BTreeMap::new();

    let mut frames = tokio::time::interval(Duration::from_millis(args.frame_ms));
    frames.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;

            _ = shutdown.cancelled() => {
                info!("Interrupted, stopping simulation");
                break;
            }
            _ = frames.tick() => {}
        }

        let elapsed = started.elapsed();
        if deadline.is_some_and(|deadline| elapsed >= deadline) {
            break;
        }

        let offset = layout.offset_at(args.speed * elapsed.as_secs_f32());
        let window = layout.render_window(offset);

        // Dropping a handle disposes the row.
        mounted.retain(|row, _| window.contains(row));
        for row in window {
            mounted.entry(row).or_insert_with(|| {
                rows_mounted += 1;
                engine
                    .track(defaults.item(row))
                    .on_impression(|item| debug!(row = item.key, "Row impressed"))
                    .register()
            });
        }

        for (&row, element) in &mounted {
            element.layout_changed(
                layout.row_size(),
                layout.row_bounds(row, offset),
                layout.viewport,
            );
        }

        if let Some(every) = clear_every {
            if elapsed.saturating_sub(last_clear) >= every {
                engine.clear_cache();
                last_clear = elapsed;
            }
        }
    }

    engine.stop().await;
    let metrics = engine.metrics();
    let impressed_rows = engine.impressed_keys().len();

    // Last engine handle gone closes the channel, which ends the printer.
    drop(mounted);
    drop(engine);
    let events_printed = match printer.await {
        Ok(result) => result?,
        Err(e) => {
            warn!(error = %e, "Impression printer ended abnormally");
            0
        }
    };

    emit(
        args.format,
        &OutputEvent::Summary {
            elapsed_ms: started.elapsed().as_millis() as u64,
            rows_mounted,
            impressed_rows,
            events_printed,
            metrics,
        },
    )
}
