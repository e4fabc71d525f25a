//! Progress bar wrapper that appends live GPU telemetry.
//!
//! Wraps an indicatif bar rather than replacing it: telemetry lands in the
//! bar's `{msg}` slot, re-queried on an interval so iteration speed never
//! drowns in driver queries. Single-threaded use only; one instance belongs
//! to one driving loop.
//!
//! ## Usage
//!
//! ```rust
//! use cgpu_common::progress::GpuProgressBar;
//!
//! let progress = GpuProgressBar::new(3);
//! for _batch in progress.wrap_iter(0..3) {
//!     // train on the batch
//! }
//! ```

use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};

use crate::telemetry::TelemetrySnapshot;

/// How often telemetry is re-queried unless overridden.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_millis(500);

/// Progress bar with interval-gated GPU stats in its message slot.
pub struct GpuProgressBar {
    bar: ProgressBar,
    device_index: u32,
    refresh_interval: Duration,
    last_refresh: Option<Instant>,
    stats_line: String,
}

impl GpuProgressBar {
    /// Create a bar of known length with the default template.
    pub fn new(len: u64) -> Self {
        let bar = ProgressBar::new(len);
        if let Ok(style) =
            ProgressStyle::default_bar().template("{prefix}[{bar:40.cyan/blue}] {pos}/{len} {msg}")
        {
            bar.set_style(style.progress_chars("=>-"));
        }
        Self::wrap(bar)
    }

    /// Wrap an existing bar. Its template should keep a `{msg}` slot for the
    /// stats suffix.
    pub fn wrap(bar: ProgressBar) -> Self {
        GpuProgressBar {
            bar,
            device_index: 0,
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            last_refresh: None,
            stats_line: String::new(),
        }
    }

    /// Monitor a different device index (default 0).
    pub fn with_device(mut self, device_index: u32) -> Self {
        self.device_index = device_index;
        self
    }

    /// Re-query telemetry at a different interval (default 500ms).
    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    /// Advance the bar, refreshing telemetry when the interval has elapsed.
    pub fn inc(&mut self, delta: u64) {
        self.before_render();
        self.bar.inc(delta);
    }

    /// Move the bar to an absolute position.
    pub fn set_position(&mut self, pos: u64) {
        self.before_render();
        self.bar.set_position(pos);
    }

    /// Redraw without advancing.
    pub fn tick(&mut self) {
        self.before_render();
        self.bar.tick();
    }

    /// Last rendered stats line; empty until a telemetry query succeeds.
    pub fn stats_line(&self) -> &str {
        &self.stats_line
    }

    /// The wrapped widget, for prefix or length adjustments.
    pub fn bar(&self) -> &ProgressBar {
        &self.bar
    }

    pub fn finish(&self) {
        self.bar.finish();
    }

    pub fn finish_and_clear(&self) {
        self.bar.finish_and_clear();
    }

    /// Drive an iterator through the bar, one increment per item.
    pub fn wrap_iter<I: Iterator>(self, iter: I) -> GpuProgressIter<I> {
        GpuProgressIter {
            inner: iter,
            progress: self,
        }
    }

    fn before_render(&mut self) {
        self.before_render_at(Instant::now(), TelemetrySnapshot::capture);
    }

    /// Interval gate: re-query at most once per `refresh_interval`, then put
    /// the cached line in the message slot without forcing an extra redraw.
    fn before_render_at<F>(&mut self, now: Instant, capture: F)
    where
        F: FnOnce(u32) -> TelemetrySnapshot,
    {
        let due = match self.last_refresh {
            None => true,
            Some(last) => now.duration_since(last) >= self.refresh_interval,
        };

        if due {
            self.stats_line = capture(self.device_index).render();
            self.last_refresh = Some(now);
        }

        if !self.stats_line.is_empty() {
            self.bar.set_message(self.stats_line.clone());
        }
    }
}

/// Iterator adapter produced by [`GpuProgressBar::wrap_iter`].
pub struct GpuProgressIter<I> {
    inner: I,
    progress: GpuProgressBar,
}

impl<I: Iterator> Iterator for GpuProgressIter<I> {
    type Item = I::Item;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.inner.next();
        match item {
            Some(_) => self.progress.inc(1),
            None => self.progress.bar.finish_using_style(),
        }
        item
    }
}
