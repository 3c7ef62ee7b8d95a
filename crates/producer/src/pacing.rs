use std::time::{Duration, Instant};

/// Fixed-rate frame pacing.
///
/// Deadlines advance by one interval per frame. When the loop falls more
/// than one interval behind (e.g. the queue was full), the schedule restarts
/// from now instead of bursting to catch up.
pub struct FramePacer {
    interval: Duration,
    next_deadline: Instant,
}

impl FramePacer {
    pub fn new(target_fps: f64) -> Self {
        Self {
            interval: Duration::from_secs_f64(1.0 / target_fps),
            next_deadline: Instant::now(),
        }
    }

    pub fn frame_duration(&self) -> Duration {
        self.interval
    }

    /// How long to sleep before the next frame is due. Advances the schedule.
    pub fn next_delay(&mut self, now: Instant) -> Duration {
        if now > self.next_deadline + self.interval {
            self.next_deadline = now;
        }
        let delay = self.next_deadline.saturating_duration_since(now);
        self.next_deadline += self.interval;
        delay
    }

    pub fn wait(&mut self) {
        let delay = self.next_delay(Instant::now());
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
    }
}
