use serde::{Deserialize, Serialize};
use std::fmt;

/// One object-detection result attached to a frame.
///
/// The bounding box is in payload pixel coordinates. Confidence is carried
/// as-is, never clamped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize, Serialize)]
pub struct Detection {
    pub class_id: u32,
    pub confidence: f32,
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Detection {
    pub fn new(class_id: u32, confidence: f32, x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            class_id,
            confidence,
            x,
            y,
            width,
            height,
        }
    }
}

/// A decoded slot: header, the valid detections, and an owned copy of the pixels.
#[derive(Clone, PartialEq)]
pub struct Frame {
    pub frame_id: u32,
    pub width: u32,
    pub height: u32,
    pub channels: u32,
    pub detections: Vec<Detection>,
    pub payload: Vec<u8>,
}

impl Frame {
    pub fn view(&self) -> FrameView<'_> {
        FrameView {
            frame_id: self.frame_id,
            width: self.width,
            height: self.height,
            channels: self.channels,
            detections: &self.detections,
            payload: &self.payload,
        }
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("frame_id", &self.frame_id)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("channels", &self.channels)
            .field("detections", &self.detections)
            .field("payload_len", &self.payload.len())
            .finish()
    }
}

/// Borrowed frame handed to the publisher.
///
/// `detections` may be longer than the queue's detection capacity; the
/// excess is dropped on write.
#[derive(Debug, Clone, Copy)]
pub struct FrameView<'a> {
    pub frame_id: u32,
    pub width: u32,
    pub height: u32,
    pub channels: u32,
    pub detections: &'a [Detection],
    pub payload: &'a [u8],
}

/// Snapshot of the control block plus the semaphore counts.
///
/// Every field is diagnostic; none of them may drive protocol decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QueueStatus {
    pub write_index: u32,
    pub read_index: u32,
    pub occupied_count: u32,
    pub holders: u32,
    pub free_slots: i32,
    pub filled_slots: i32,
}
