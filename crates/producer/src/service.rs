use crate::config::ProducerConfig;
use crate::metrics::ProducerMetrics;
use crate::pacing::FramePacer;
use crate::scaling::BoxScaler;
use crate::source::{SyntheticSource, render_frame};
use anyhow::{Context, Result};
use shmqueue::{FrameView, SharedQueue, SlotPublisher};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Bounded wait on a full queue, so shutdown requests are noticed promptly
const PUBLISH_TIMEOUT: Duration = Duration::from_millis(200);

/// Status is logged once per this many frames
const REPORT_INTERVAL: u32 = 30;

/// Frame ids count up from 1 and wrap at `u32::MAX`.
fn next_frame_id(frame_id: u32) -> u32 {
    frame_id.wrapping_add(1)
}

pub struct ProducerService {
    config: ProducerConfig,
    publisher: SlotPublisher,
    source: SyntheticSource,
    scaler: BoxScaler,
    payload: Vec<u8>,
    metrics: ProducerMetrics,
}

impl ProducerService {
    pub fn build(config: ProducerConfig) -> Result<Self> {
        let queue = &config.queue;

        if config.reset_stale {
            SharedQueue::remove(&queue.names).context("Failed to remove stale queue objects")?;
        }

        let publisher = SlotPublisher::create(queue).with_context(|| {
            format!(
                "Failed to create shared queue {} (stale objects from a crashed run? set RESET_STALE=true)",
                queue.names.region
            )
        })?;

        let geometry = *publisher.geometry();
        tracing::info!(
            region = %queue.names.region,
            role = ?publisher.queue().role(),
            capacity = geometry.capacity,
            max_detections = geometry.max_detections,
            width = geometry.width,
            height = geometry.height,
            channels = geometry.channels,
            slot_size = geometry.slot_size(),
            "Queue ready"
        );

        Ok(Self {
            source: SyntheticSource::new(
                config.source_width,
                config.source_height,
                config.objects_per_frame,
                config.seed,
            ),
            scaler: BoxScaler::new(
                config.source_width,
                config.source_height,
                geometry.width,
                geometry.height,
            ),
            payload: vec![0; geometry.payload_size()],
            metrics: ProducerMetrics::new(geometry.capacity),
            publisher,
            config,
        })
    }

    /// Publish frames until `shutdown` is raised or the frame limit is hit.
    /// Returns the number of frames published.
    pub fn run(&mut self, shutdown: &AtomicBool) -> Result<u64> {
        let mut pacer = FramePacer::new(self.config.target_fps);
        let mut window_start = Instant::now();
        let mut frame_id: u32 = 0;

        tracing::info!(
            target_fps = self.config.target_fps,
            frame_interval_ms = pacer.frame_duration().as_secs_f64() * 1000.0,
            frame_limit = ?self.config.frame_limit,
            "Starting producer loop"
        );

        while !shutdown.load(Ordering::Relaxed) {
            if self.config.frame_limit.is_some_and(|limit| frame_id >= limit) {
                tracing::info!(frame_limit = frame_id, "Frame limit reached");
                break;
            }
            pacer.wait();

            frame_id = next_frame_id(frame_id);
            if !self.publish_next(frame_id, shutdown)? {
                break;
            }

            if frame_id % REPORT_INTERVAL == 0 {
                let elapsed = window_start.elapsed().as_secs_f64();
                let status = self.publisher.status()?;
                tracing::info!(
                    frame_id,
                    fps = REPORT_INTERVAL as f64 / elapsed,
                    occupied = status.occupied_count,
                    write_index = status.write_index,
                    read_index = status.read_index,
                    "Producer status"
                );
                window_start = Instant::now();
            }
        }

        Ok(self.publisher.published())
    }

    /// Generate and publish one frame, retrying while the queue is full.
    /// Returns `false` if shutdown was requested before it went out.
    fn publish_next(&mut self, frame_id: u32, shutdown: &AtomicBool) -> Result<bool> {
        let _span = common::span_debug!("publish_frame");

        let raw = self.source.next_detections();
        let detections = self.scaler.scale_all(&raw);
        let geometry = *self.publisher.geometry();
        render_frame(&mut self.payload, &geometry, frame_id, &detections);

        let view = FrameView {
            frame_id,
            width: geometry.width,
            height: geometry.height,
            channels: geometry.channels,
            detections: &detections,
            payload: &self.payload,
        };

        let stored = loop {
            if let Some(stored) = self
                .publisher
                .publish_timeout(&view, PUBLISH_TIMEOUT)
                .with_context(|| format!("Failed to publish frame {}", frame_id))?
            {
                break stored;
            }
            self.metrics.queue_full_waits.add(1, &[]);
            tracing::debug!(frame_id, "Queue full, consumer not keeping up");
            if shutdown.load(Ordering::Relaxed) {
                return Ok(false);
            }
        };

        self.metrics.frames_published.add(1, &[]);
        let truncated = detections.len() - stored;
        if truncated > 0 {
            self.metrics.detections_truncated.add(truncated as u64, &[]);
        }
        self.metrics
            .occupancy
            .record(self.publisher.status()?.filled_slots.max(0) as u64, &[]);

        tracing::debug!(frame_id, detections = stored, "Published frame");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_id_wraps_instead_of_overflowing() {
        assert_eq!(next_frame_id(0), 1);
        assert_eq!(next_frame_id(41), 42);
        assert_eq!(next_frame_id(u32::MAX), 0);
    }
}
