//! Shared stereo sample window.
//!
//! Holds the most recent `N` samples per channel at the engine sample
//! rate. Filled once per render tick from the real-time audio thread's
//! analyzer ring, then read by every metering engine for that tick.

use std::sync::Arc;

use parking_lot::RwLock;

/// Number of samples held per channel (~85ms at 48kHz).
pub const WINDOW_SIZE: usize = 4096;

/// A single snapshot of the most recent stereo samples.
///
/// Both channel buffers are guaranteed to originate from the same
/// underlying capture instant: the window is filled as one atomic swap,
/// never read half-updated.
#[derive(Clone)]
pub struct WindowSnapshot {
    pub left: Arc<[f32; WINDOW_SIZE]>,
    pub right: Arc<[f32; WINDOW_SIZE]>,
    /// Monotonic counter incremented every time the window is filled.
    /// Lets a consumer detect "no new data since last tick" cheaply.
    pub generation: u64,
}

impl Default for WindowSnapshot {
    fn default() -> Self {
        Self {
            left: Arc::new([0.0; WINDOW_SIZE]),
            right: Arc::new([0.0; WINDOW_SIZE]),
            generation: 0,
        }
    }
}

/// Single-producer, multi-reader sample window.
///
/// The real-time audio thread (or its snapshot primitive) calls
/// [`SampleWindow::publish`] once per render tick; any number of
/// metering engines call [`SampleWindow::snapshot`] to read the latest
/// published buffers without blocking the writer.
pub struct SampleWindow {
    inner: RwLock<WindowSnapshot>,
}

impl SampleWindow {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(WindowSnapshot::default()),
        }
    }

    /// Publish a freshly captured stereo window. `left`/`right` must be
    /// exactly [`WINDOW_SIZE`] samples, sourced from the same capture
    /// instant.
    pub fn publish(&self, left: [f32; WINDOW_SIZE], right: [f32; WINDOW_SIZE]) {
        let mut guard = self.inner.write();
        guard.generation = guard.generation.wrapping_add(1);
        guard.left = Arc::new(left);
        guard.right = Arc::new(right);
    }

    /// Take a cheap clone of the latest published snapshot (`Arc` clone
    /// of each channel buffer, not a deep copy).
    pub fn snapshot(&self) -> WindowSnapshot {
        self.inner.read().clone()
    }
}

impl Default for SampleWindow {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_window_is_silent() {
        let window = SampleWindow::new();
        let snap = window.snapshot();
        assert!(snap.left.iter().all(|&s| s == 0.0));
        assert_eq!(snap.generation, 0);
    }

    #[test]
    fn publish_bumps_generation_and_is_visible_atomically() {
        let window = SampleWindow::new();
        window.publish([0.5; WINDOW_SIZE], [-0.5; WINDOW_SIZE]);
        let snap = window.snapshot();
        assert_eq!(snap.generation, 1);
        assert!(snap.left.iter().all(|&s| s == 0.5));
        assert!(snap.right.iter().all(|&s| s == -0.5));
    }
}
