//! Binary layout of the shared region.
//!
//! ```text
//! +--------------------+ 0
//! | control block (64) |
//! +--------------------+ CONTROL_BLOCK_SIZE
//! | slot 0             |
//! | slot 1             |
//! | ...                |
//! | slot N-1           |
//! +--------------------+ CONTROL_BLOCK_SIZE + N * slot_size
//! ```
//!
//! Every field is 4 bytes, little-endian. Both processes must be built with
//! the same layout; the control block header catches geometry drift at attach
//! time, not byte-order drift.

use crate::errors::{QueueError, Result};
use std::ops::Range;

/// `"YMSQ"` read as a little-endian u32.
pub const MAGIC: u32 = 0x5153_4D59;
pub const LAYOUT_VERSION: u32 = 1;

pub const CONTROL_BLOCK_SIZE: usize = 64;
pub const SLOT_HEADER_SIZE: usize = 20;
pub const DETECTION_RECORD_SIZE: usize = 24;

pub const DEFAULT_CAPACITY: u32 = 5;
pub const DEFAULT_MAX_DETECTIONS: u32 = 200;
pub const DEFAULT_WIDTH: u32 = 640;
pub const DEFAULT_HEIGHT: u32 = 640;
pub const DEFAULT_CHANNELS: u32 = 3;

/// Control block field offsets.
pub mod control {
    pub const MAGIC: usize = 0;
    pub const LAYOUT_VERSION: usize = 4;
    pub const CAPACITY: usize = 8;
    pub const MAX_DETECTIONS: usize = 12;
    pub const WIDTH: usize = 16;
    pub const HEIGHT: usize = 20;
    pub const CHANNELS: usize = 24;
    pub const SLOT_SIZE: usize = 28;
    pub const HOLDERS: usize = 32;
    pub const WRITE_INDEX: usize = 36;
    pub const READ_INDEX: usize = 40;
    pub const OCCUPIED_COUNT: usize = 44;
    pub const RESERVED: usize = 48;
}

/// Slot field offsets, relative to the start of the slot.
pub mod slot {
    pub const FRAME_ID: usize = 0;
    pub const WIDTH: usize = 4;
    pub const HEIGHT: usize = 8;
    pub const CHANNELS: usize = 12;
    pub const DETECTION_COUNT: usize = 16;
    pub const DETECTIONS: usize = super::SLOT_HEADER_SIZE;
}

/// Detection record field offsets, relative to the start of the record.
pub mod detection {
    pub const CLASS_ID: usize = 0;
    pub const CONFIDENCE: usize = 4;
    pub const X: usize = 8;
    pub const Y: usize = 12;
    pub const WIDTH: usize = 16;
    pub const HEIGHT: usize = 20;
}

/// Fixed dimensions of a queue. Producer and consumer must agree on every field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueGeometry {
    /// Number of slots (N).
    pub capacity: u32,
    pub max_detections: u32,
    pub width: u32,
    pub height: u32,
    pub channels: u32,
}

impl Default for QueueGeometry {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            max_detections: DEFAULT_MAX_DETECTIONS,
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            channels: DEFAULT_CHANNELS,
        }
    }
}

impl QueueGeometry {
    /// Reject zero dimensions and layouts whose slot size does not fit the
    /// control block's 32-bit `slot_size` field.
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(QueueError::InvalidGeometry("capacity must be at least 1".into()));
        }
        if self.width == 0 || self.height == 0 || self.channels == 0 {
            return Err(QueueError::InvalidGeometry(format!(
                "image dimensions must be non-zero, got {}x{}x{}",
                self.width, self.height, self.channels
            )));
        }

        let slot_size = self.slot_size_u64();
        if slot_size > u32::MAX as u64 {
            return Err(QueueError::InvalidGeometry(format!(
                "slot size {} exceeds {} bytes",
                slot_size,
                u32::MAX
            )));
        }

        let region = CONTROL_BLOCK_SIZE as u64 + self.capacity as u64 * slot_size;
        if usize::try_from(region).is_err() {
            return Err(QueueError::InvalidGeometry(format!(
                "region size {} does not fit in memory",
                region
            )));
        }

        Ok(())
    }

    fn slot_size_u64(&self) -> u64 {
        SLOT_HEADER_SIZE as u64
            + self.max_detections as u64 * DETECTION_RECORD_SIZE as u64
            + self.width as u64 * self.height as u64 * self.channels as u64
    }

    /// Pixel bytes per slot: `width * height * channels`.
    pub fn payload_size(&self) -> usize {
        self.width as usize * self.height as usize * self.channels as usize
    }

    pub fn detections_size(&self) -> usize {
        self.max_detections as usize * DETECTION_RECORD_SIZE
    }

    /// Offset of the payload inside a slot.
    pub fn payload_offset(&self) -> usize {
        SLOT_HEADER_SIZE + self.detections_size()
    }

    pub fn slot_size(&self) -> usize {
        self.payload_offset() + self.payload_size()
    }

    /// Total bytes of the shared region: control block plus N slots.
    pub fn region_size(&self) -> usize {
        CONTROL_BLOCK_SIZE + self.capacity as usize * self.slot_size()
    }

    /// Byte range of slot `index` within the region.
    pub fn slot_range(&self, index: u32) -> Range<usize> {
        debug_assert!(index < self.capacity, "slot index {} out of range", index);
        let start = CONTROL_BLOCK_SIZE + index as usize * self.slot_size();
        start..start + self.slot_size()
    }

    /// `(index + 1) mod N`
    pub fn next_index(&self, index: u32) -> u32 {
        (index + 1) % self.capacity
    }

    pub fn dimensions(&self) -> (u32, u32, u32) {
        (self.width, self.height, self.channels)
    }
}
