use std::time::{Duration, Instant};

/// Frames per window before the rate is recomputed
pub const FPS_WINDOW: u32 = 30;

/// Frame rate measured over fixed windows of [`FPS_WINDOW`] frames.
///
/// The reported rate stays at the last completed window's value until the
/// next window closes.
pub struct FpsTracker {
    window_start: Instant,
    frames_in_window: u32,
    current: Option<f64>,
}

impl FpsTracker {
    pub fn new(now: Instant) -> Self {
        Self {
            window_start: now,
            frames_in_window: 0,
            current: None,
        }
    }

    /// Count one frame. Returns the new rate when this frame closes a window.
    pub fn tick(&mut self, now: Instant) -> Option<f64> {
        self.frames_in_window += 1;
        if self.frames_in_window < FPS_WINDOW {
            return None;
        }

        let elapsed = now.duration_since(self.window_start).max(Duration::from_micros(1));
        let fps = self.frames_in_window as f64 / elapsed.as_secs_f64();
        self.current = Some(fps);
        self.window_start = now;
        self.frames_in_window = 0;
        Some(fps)
    }

    pub fn current(&self) -> Option<f64> {
        self.current
    }
}
