use crate::config::ConsumerConfig;
use crate::fps::FpsTracker;
use crate::labels::ClassLabels;
use crate::metrics::ConsumerMetrics;
use crate::report::{FrameReport, Sequence, SequenceTracker};
use anyhow::{Context, Result};
use common::wait_for_resource;
use shmqueue::{Frame, QueueError, SlotReader};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

pub struct ConsumerService {
    config: ConsumerConfig,
    reader: SlotReader,
    labels: ClassLabels,
    fps: FpsTracker,
    sequence: SequenceTracker,
    metrics: ConsumerMetrics,
}

impl ConsumerService {
    /// Attach to the producer's queue, polling until it exists.
    ///
    /// Only a missing queue is waited out; a queue with the wrong geometry is
    /// a configuration error and fails immediately. Returns `None` if
    /// `shutdown` is raised while waiting.
    pub fn attach(config: ConsumerConfig, shutdown: &AtomicBool) -> Result<Option<Self>> {
        let poll = Duration::from_millis(config.poll_interval_ms);

        let attached = wait_for_resource(
            || match SlotReader::attach(&config.queue) {
                Err(e @ QueueError::NotFound { .. }) => Err(e),
                other => Ok(other),
            },
            poll,
            "producer",
            shutdown,
        );
        let Some(attached) = attached else {
            return Ok(None);
        };
        let reader = attached.with_context(|| {
            format!(
                "Failed to attach to shared queue {} (do producer and consumer agree on the geometry?)",
                config.queue.names.region
            )
        })?;

        let geometry = *reader.geometry();
        tracing::info!(
            region = %config.queue.names.region,
            capacity = geometry.capacity,
            slot_size = geometry.slot_size(),
            region_size = geometry.region_size(),
            "Attached to producer queue"
        );

        Ok(Some(Self {
            labels: ClassLabels::load(config.class_names_path.as_deref()),
            fps: FpsTracker::new(Instant::now()),
            sequence: SequenceTracker::default(),
            metrics: ConsumerMetrics::new(geometry.capacity),
            reader,
            config,
        }))
    }

    /// Consume frames until `shutdown` is raised or the frame limit is hit.
    /// Returns the number of frames consumed.
    pub fn run(&mut self, shutdown: &AtomicBool) -> Result<u64> {
        let poll = Duration::from_millis(self.config.poll_interval_ms);
        tracing::info!("Starting consumer loop");

        while !shutdown.load(Ordering::Relaxed) {
            if self
                .config
                .frame_limit
                .is_some_and(|limit| self.reader.consumed() >= limit)
            {
                tracing::info!(frame_limit = self.reader.consumed(), "Frame limit reached");
                break;
            }

            match self.reader.consume_timeout(poll) {
                Ok(Some(frame)) => self.handle_frame(frame)?,
                Ok(None) => tracing::trace!("No frame within poll interval"),
                Err(e @ QueueError::LayoutMismatch { .. }) => {
                    // The slot was already released; carry on with the next one
                    tracing::warn!(error = %e, "Skipped corrupt slot");
                }
                Err(e) => return Err(e).context("Failed to consume frame"),
            }
        }

        Ok(self.reader.consumed())
    }

    fn handle_frame(&mut self, frame: Frame) -> Result<()> {
        let _span = common::span_debug!("handle_frame");

        if let Some(fps) = self.fps.tick(Instant::now()) {
            tracing::info!(fps = %format!("{:.1}", fps), "Consumer frame rate");
        }

        match self.sequence.observe(frame.frame_id) {
            Sequence::First | Sequence::Next => {}
            Sequence::Gap(missing) => {
                self.metrics.sequence_gaps.add(1, &[]);
                tracing::warn!(frame_id = frame.frame_id, missing, "Gap in frame ids");
            }
            Sequence::Regressed { previous } => {
                self.metrics.sequence_gaps.add(1, &[]);
                tracing::warn!(
                    frame_id = frame.frame_id,
                    previous,
                    "Frame id went backwards (producer restarted?)"
                );
            }
        }

        let report = FrameReport::new(&frame, &self.labels, self.fps.current());
        report.emit(self.config.output_json)?;

        self.metrics.frames_consumed.add(1, &[]);
        self.metrics
            .detections
            .add(frame.detections.len() as u64, &[]);
        self.metrics
            .occupancy
            .record(self.reader.status()?.filled_slots.max(0) as u64, &[]);
        Ok(())
    }
}
