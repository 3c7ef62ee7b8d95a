use crate::labels::ClassLabels;
use serde::Serialize;
use shmqueue::Frame;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabeledDetection {
    pub label: String,
    pub class_id: u32,
    pub confidence: f32,
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

/// What the consumer reports for each frame it takes off the queue.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameReport {
    pub frame_id: u32,
    pub width: u32,
    pub height: u32,
    pub channels: u32,
    /// Mean pixel value, a cheap check that the payload arrived
    pub mean_intensity: f64,
    pub fps: Option<f64>,
    pub detections: Vec<LabeledDetection>,
}

impl FrameReport {
    pub fn new(frame: &Frame, labels: &ClassLabels, fps: Option<f64>) -> Self {
        let mean_intensity = if frame.payload.is_empty() {
            0.0
        } else {
            frame.payload.iter().map(|&b| b as u64).sum::<u64>() as f64 / frame.payload.len() as f64
        };

        Self {
            frame_id: frame.frame_id,
            width: frame.width,
            height: frame.height,
            channels: frame.channels,
            mean_intensity,
            fps,
            detections: frame
                .detections
                .iter()
                .map(|d| LabeledDetection {
                    label: labels.name(d.class_id).into_owned(),
                    class_id: d.class_id,
                    confidence: d.confidence,
                    x: d.x,
                    y: d.y,
                    width: d.width,
                    height: d.height,
                })
                .collect(),
        }
    }

    /// Emit the report: a JSON line on stdout, or a structured log event.
    pub fn emit(&self, as_json: bool) -> anyhow::Result<()> {
        if as_json {
            println!("{}", serde_json::to_string(self)?);
            return Ok(());
        }

        tracing::info!(
            frame_id = self.frame_id,
            detections = self.detections.len(),
            fps = self.fps,
            "Read frame"
        );
        for det in &self.detections {
            tracing::debug!(
                frame_id = self.frame_id,
                label = %det.label,
                confidence = det.confidence as f64,
                x = det.x,
                y = det.y,
                width = det.width,
                height = det.height,
                "Detection"
            );
        }
        Ok(())
    }
}

/// Where a received frame id sits relative to the previous one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sequence {
    First,
    Next,
    /// Frames skipped between the previous id and this one
    Gap(u32),
    /// Not greater than the previous id, e.g. after a producer restart
    Regressed { previous: u32 },
}

#[derive(Debug, Default)]
pub struct SequenceTracker {
    last: Option<u32>,
}

impl SequenceTracker {
    pub fn observe(&mut self, frame_id: u32) -> Sequence {
        let result = match self.last {
            None => Sequence::First,
            Some(prev) if frame_id == prev.wrapping_add(1) => Sequence::Next,
            Some(prev) if frame_id > prev => Sequence::Gap(frame_id - prev - 1),
            Some(prev) => Sequence::Regressed { previous: prev },
        };
        self.last = Some(frame_id);
        result
    }
}
