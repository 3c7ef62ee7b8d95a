//! Encode/decode between structured records and their byte ranges in the region.
//!
//! This is the only module that reads or writes shared bytes. Nothing is ever
//! reinterpreted in place: values are copied in on encode and copied out on
//! decode.

use crate::errors::{QueueError, Result};
use crate::layout::{
    CONTROL_BLOCK_SIZE, DETECTION_RECORD_SIZE, LAYOUT_VERSION, MAGIC, QueueGeometry, control,
    detection, slot,
};
use crate::types::{Detection, Frame, FrameView};

#[inline]
fn put_u32(buf: &mut [u8], offset: usize, value: u32) {
    buf[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

#[inline]
fn put_i32(buf: &mut [u8], offset: usize, value: i32) {
    buf[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

#[inline]
fn put_f32(buf: &mut [u8], offset: usize, value: f32) {
    buf[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

#[inline]
fn get_bytes(buf: &[u8], offset: usize) -> [u8; 4] {
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(&buf[offset..offset + 4]);
    bytes
}

#[inline]
fn get_u32(buf: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes(get_bytes(buf, offset))
}

#[inline]
fn get_i32(buf: &[u8], offset: usize) -> i32 {
    i32::from_le_bytes(get_bytes(buf, offset))
}

#[inline]
fn get_f32(buf: &[u8], offset: usize) -> f32 {
    f32::from_le_bytes(get_bytes(buf, offset))
}

/// Decoded control block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlBlock {
    pub magic: u32,
    pub layout_version: u32,
    pub geometry: QueueGeometry,
    pub slot_size: u32,
    pub holders: u32,
    pub write_index: u32,
    pub read_index: u32,
    pub occupied_count: u32,
}

impl ControlBlock {
    /// Fresh control block for a newly created region: indices and count at
    /// zero, a single holder (the creator).
    pub fn new(geometry: QueueGeometry) -> Self {
        Self {
            magic: MAGIC,
            layout_version: LAYOUT_VERSION,
            geometry,
            slot_size: geometry.slot_size() as u32,
            holders: 1,
            write_index: 0,
            read_index: 0,
            occupied_count: 0,
        }
    }

    pub fn encode(&self, buf: &mut [u8]) {
        let buf = &mut buf[..CONTROL_BLOCK_SIZE];
        put_u32(buf, control::MAGIC, self.magic);
        put_u32(buf, control::LAYOUT_VERSION, self.layout_version);
        put_u32(buf, control::CAPACITY, self.geometry.capacity);
        put_u32(buf, control::MAX_DETECTIONS, self.geometry.max_detections);
        put_u32(buf, control::WIDTH, self.geometry.width);
        put_u32(buf, control::HEIGHT, self.geometry.height);
        put_u32(buf, control::CHANNELS, self.geometry.channels);
        put_u32(buf, control::SLOT_SIZE, self.slot_size);
        put_u32(buf, control::HOLDERS, self.holders);
        put_u32(buf, control::WRITE_INDEX, self.write_index);
        put_u32(buf, control::READ_INDEX, self.read_index);
        put_u32(buf, control::OCCUPIED_COUNT, self.occupied_count);
        buf[control::RESERVED..].fill(0);
    }

    pub fn decode(buf: &[u8]) -> Self {
        Self {
            magic: get_u32(buf, control::MAGIC),
            layout_version: get_u32(buf, control::LAYOUT_VERSION),
            geometry: QueueGeometry {
                capacity: get_u32(buf, control::CAPACITY),
                max_detections: get_u32(buf, control::MAX_DETECTIONS),
                width: get_u32(buf, control::WIDTH),
                height: get_u32(buf, control::HEIGHT),
                channels: get_u32(buf, control::CHANNELS),
            },
            slot_size: get_u32(buf, control::SLOT_SIZE),
            holders: get_u32(buf, control::HOLDERS),
            write_index: get_u32(buf, control::WRITE_INDEX),
            read_index: get_u32(buf, control::READ_INDEX),
            occupied_count: get_u32(buf, control::OCCUPIED_COUNT),
        }
    }

    /// Check that a region written by another process carries the layout
    /// this process was built for.
    pub fn check_compatible(&self, expected: &QueueGeometry) -> Result<()> {
        let checks = [
            ("magic", MAGIC, self.magic),
            ("layout_version", LAYOUT_VERSION, self.layout_version),
            ("capacity", expected.capacity, self.geometry.capacity),
            (
                "max_detections",
                expected.max_detections,
                self.geometry.max_detections,
            ),
            ("width", expected.width, self.geometry.width),
            ("height", expected.height, self.geometry.height),
            ("channels", expected.channels, self.geometry.channels),
            ("slot_size", expected.slot_size() as u32, self.slot_size),
        ];

        for (field, expected, actual) in checks {
            if expected != actual {
                return Err(QueueError::LayoutMismatch {
                    field,
                    expected,
                    actual,
                });
            }
        }
        self.check_indices(expected.capacity)
    }

    /// Indices must name a slot and the occupancy must fit in `capacity`.
    /// Checked before any slot is sliced, since both come from shared memory.
    pub fn check_indices(&self, capacity: u32) -> Result<()> {
        let checks = [
            ("write_index", self.write_index, self.write_index < capacity),
            ("read_index", self.read_index, self.read_index < capacity),
            ("occupied_count", self.occupied_count, self.occupied_count <= capacity),
        ];

        for (field, value, in_range) in checks {
            if !in_range {
                return Err(QueueError::CorruptControl {
                    field,
                    value,
                    capacity,
                });
            }
        }
        Ok(())
    }
}

pub fn encode_detection(buf: &mut [u8], det: &Detection) {
    put_u32(buf, detection::CLASS_ID, det.class_id);
    put_f32(buf, detection::CONFIDENCE, det.confidence);
    put_i32(buf, detection::X, det.x);
    put_i32(buf, detection::Y, det.y);
    put_i32(buf, detection::WIDTH, det.width);
    put_i32(buf, detection::HEIGHT, det.height);
}

pub fn decode_detection(buf: &[u8]) -> Detection {
    Detection {
        class_id: get_u32(buf, detection::CLASS_ID),
        confidence: get_f32(buf, detection::CONFIDENCE),
        x: get_i32(buf, detection::X),
        y: get_i32(buf, detection::Y),
        width: get_i32(buf, detection::WIDTH),
        height: get_i32(buf, detection::HEIGHT),
    }
}

/// Reject a frame whose dimensions or payload length differ from the queue's.
pub fn check_frame(geometry: &QueueGeometry, frame: &FrameView<'_>) -> Result<()> {
    let actual = (frame.width, frame.height, frame.channels);
    if actual != geometry.dimensions() {
        return Err(QueueError::GeometryMismatch {
            expected: geometry.dimensions(),
            actual,
        });
    }
    if frame.payload.len() != geometry.payload_size() {
        return Err(QueueError::PayloadSizeMismatch {
            expected: geometry.payload_size(),
            actual: frame.payload.len(),
        });
    }
    Ok(())
}

/// Write one frame into the slot bytes `buf`. Returns the number of detections stored.
///
/// Detections beyond `max_detections` are dropped. Unused records are zeroed
/// so a previous cycle's data is never mistaken for valid entries.
pub fn encode_slot(buf: &mut [u8], geometry: &QueueGeometry, frame: &FrameView<'_>) -> Result<usize> {
    check_frame(geometry, frame)?;
    debug_assert_eq!(buf.len(), geometry.slot_size());

    let stored = frame.detections.len().min(geometry.max_detections as usize);

    put_u32(buf, slot::FRAME_ID, frame.frame_id);
    put_u32(buf, slot::WIDTH, geometry.width);
    put_u32(buf, slot::HEIGHT, geometry.height);
    put_u32(buf, slot::CHANNELS, geometry.channels);
    put_u32(buf, slot::DETECTION_COUNT, stored as u32);

    let records = &mut buf[slot::DETECTIONS..geometry.payload_offset()];
    for (chunk, det) in records
        .chunks_exact_mut(DETECTION_RECORD_SIZE)
        .zip(&frame.detections[..stored])
    {
        encode_detection(chunk, det);
    }
    records[stored * DETECTION_RECORD_SIZE..].fill(0);

    buf[geometry.payload_offset()..].copy_from_slice(frame.payload);

    Ok(stored)
}

/// Convenience wrapper over [`encode_slot`] for an owned frame.
pub fn encode_frame(buf: &mut [u8], geometry: &QueueGeometry, frame: &Frame) -> Result<usize> {
    encode_slot(buf, geometry, &frame.view())
}

/// Copy one frame out of the slot bytes `buf`.
///
/// Only the first `detection_count` records are returned; a stored count
/// above `max_detections` is clamped.
pub fn decode_slot(buf: &[u8], geometry: &QueueGeometry) -> Result<Frame> {
    debug_assert_eq!(buf.len(), geometry.slot_size());

    let frame_id = get_u32(buf, slot::FRAME_ID);
    let width = get_u32(buf, slot::WIDTH);
    let height = get_u32(buf, slot::HEIGHT);
    let channels = get_u32(buf, slot::CHANNELS);

    let header_fields = [
        ("slot.width", geometry.width, width),
        ("slot.height", geometry.height, height),
        ("slot.channels", geometry.channels, channels),
    ];
    for (field, expected, actual) in header_fields {
        if expected != actual {
            return Err(QueueError::LayoutMismatch {
                field,
                expected,
                actual,
            });
        }
    }

    let mut count = get_u32(buf, slot::DETECTION_COUNT);
    if count > geometry.max_detections {
        tracing::warn!(
            frame_id,
            detection_count = count,
            max_detections = geometry.max_detections,
            "Clamping detection count"
        );
        count = geometry.max_detections;
    }

    let detections = buf[slot::DETECTIONS..]
        .chunks_exact(DETECTION_RECORD_SIZE)
        .take(count as usize)
        .map(decode_detection)
        .collect();

    let payload = buf[geometry.payload_offset()..].to_vec();

    Ok(Frame {
        frame_id,
        width,
        height,
        channels,
        detections,
        payload,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_geometry() -> QueueGeometry {
        QueueGeometry {
            capacity: 3,
            max_detections: 4,
            width: 4,
            height: 2,
            channels: 3,
        }
    }

    fn frame_with(geometry: &QueueGeometry, frame_id: u32, detections: usize) -> Frame {
        Frame {
            frame_id,
            width: geometry.width,
            height: geometry.height,
            channels: geometry.channels,
            detections: (0..detections)
                .map(|i| Detection::new(i as u32, 0.1 * i as f32, i as i32, -(i as i32), 5, 6))
                .collect(),
            payload: (0..geometry.payload_size()).map(|i| (i % 251) as u8).collect(),
        }
    }

    #[test]
    fn test_round_trip_without_detections() {
        let geometry = small_geometry();
        let frame = frame_with(&geometry, 1, 0);
        let mut buf = vec![0u8; geometry.slot_size()];

        let stored = encode_frame(&mut buf, &geometry, &frame).unwrap();
        assert_eq!(stored, 0);
        assert_eq!(decode_slot(&buf, &geometry).unwrap(), frame);
    }

    #[test]
    fn test_round_trip_at_detection_capacity() {
        let geometry = small_geometry();
        let frame = frame_with(&geometry, 42, geometry.max_detections as usize);
        let mut buf = vec![0u8; geometry.slot_size()];

        let stored = encode_frame(&mut buf, &geometry, &frame).unwrap();
        assert_eq!(stored, 4);
        assert_eq!(decode_slot(&buf, &geometry).unwrap(), frame);
    }

    #[test]
    fn test_round_trip_preserves_unclamped_confidence_and_negative_boxes() {
        let geometry = small_geometry();
        let mut frame = frame_with(&geometry, 9, 1);
        frame.detections[0] = Detection::new(79, 1.75, -3, -4, 0, 0);
        let mut buf = vec![0u8; geometry.slot_size()];

        encode_frame(&mut buf, &geometry, &frame).unwrap();
        let decoded = decode_slot(&buf, &geometry).unwrap();
        assert_eq!(decoded.detections[0].confidence, 1.75);
        assert_eq!(decoded.detections[0].x, -3);
    }

    #[test]
    fn test_excess_detections_are_truncated() {
        let geometry = small_geometry();
        let frame = frame_with(&geometry, 5, 10);
        let mut buf = vec![0u8; geometry.slot_size()];

        let stored = encode_frame(&mut buf, &geometry, &frame).unwrap();
        assert_eq!(stored, 4);

        let decoded = decode_slot(&buf, &geometry).unwrap();
        assert_eq!(decoded.detections, frame.detections[..4].to_vec());
    }

    #[test]
    fn test_unused_records_are_zero_filled() {
        let geometry = small_geometry();
        let mut buf = vec![0u8; geometry.slot_size()];

        // Full cycle first, then a sparse one over the same bytes
        encode_frame(&mut buf, &geometry, &frame_with(&geometry, 1, 4)).unwrap();
        encode_frame(&mut buf, &geometry, &frame_with(&geometry, 2, 1)).unwrap();

        let trailing = &buf[slot::DETECTIONS + DETECTION_RECORD_SIZE..geometry.payload_offset()];
        assert!(trailing.iter().all(|&b| b == 0), "Stale records must be cleared");
    }

    #[test]
    fn test_encode_uses_little_endian() {
        let geometry = small_geometry();
        let frame = frame_with(&geometry, 0x0102_0304, 0);
        let mut buf = vec![0u8; geometry.slot_size()];

        encode_frame(&mut buf, &geometry, &frame).unwrap();
        assert_eq!(&buf[0..4], &[0x04, 0x03, 0x02, 0x01]);
    }

    #[test]
    fn test_detection_record_layout() {
        let mut buf = [0u8; DETECTION_RECORD_SIZE];
        encode_detection(&mut buf, &Detection::new(2, 0.5, 10, 20, 30, 40));

        assert_eq!(&buf[0..4], &2u32.to_le_bytes());
        assert_eq!(&buf[4..8], &0.5f32.to_le_bytes());
        assert_eq!(&buf[8..12], &10i32.to_le_bytes());
        assert_eq!(&buf[20..24], &40i32.to_le_bytes());
    }

    #[test]
    fn test_payload_size_mismatch_is_rejected() {
        let geometry = small_geometry();
        let mut frame = frame_with(&geometry, 1, 0);
        frame.payload.pop();
        let mut buf = vec![0xFFu8; geometry.slot_size()];

        let result = encode_frame(&mut buf, &geometry, &frame);
        assert!(matches!(
            result,
            Err(QueueError::PayloadSizeMismatch {
                expected: 24,
                actual: 23
            })
        ));
        assert!(buf.iter().all(|&b| b == 0xFF), "Slot must be untouched on error");
    }

    #[test]
    fn test_dimension_mismatch_is_rejected() {
        let geometry = small_geometry();
        let mut frame = frame_with(&geometry, 1, 0);
        frame.width = 8;
        let mut buf = vec![0u8; geometry.slot_size()];

        assert!(matches!(
            encode_frame(&mut buf, &geometry, &frame),
            Err(QueueError::GeometryMismatch { .. })
        ));
    }

    #[test]
    fn test_decode_clamps_oversized_detection_count() {
        let geometry = small_geometry();
        let mut buf = vec![0u8; geometry.slot_size()];
        encode_frame(&mut buf, &geometry, &frame_with(&geometry, 1, 4)).unwrap();
        put_u32(&mut buf, slot::DETECTION_COUNT, 1000);

        let decoded = decode_slot(&buf, &geometry).unwrap();
        assert_eq!(decoded.detections.len(), 4);
    }

    #[test]
    fn test_decode_rejects_foreign_dimensions() {
        let geometry = small_geometry();
        let buf = vec![0u8; geometry.slot_size()];

        assert!(matches!(
            decode_slot(&buf, &geometry),
            Err(QueueError::LayoutMismatch {
                field: "slot.width",
                ..
            })
        ));
    }

    #[test]
    fn test_control_block_round_trip() {
        let mut block = ControlBlock::new(QueueGeometry::default());
        block.write_index = 3;
        block.read_index = 1;
        block.occupied_count = 2;
        block.holders = 2;

        let mut buf = vec![0xEEu8; CONTROL_BLOCK_SIZE];
        block.encode(&mut buf);

        assert_eq!(ControlBlock::decode(&buf), block);
        assert!(
            buf[control::RESERVED..].iter().all(|&b| b == 0),
            "Reserved bytes must be zeroed"
        );
    }

    #[test]
    fn test_new_control_block_is_zeroed() {
        let block = ControlBlock::new(QueueGeometry::default());
        assert_eq!(block.write_index, 0);
        assert_eq!(block.read_index, 0);
        assert_eq!(block.occupied_count, 0);
        assert_eq!(block.holders, 1);
    }

    #[test]
    fn test_check_compatible_reports_first_mismatch() {
        let block = ControlBlock::new(QueueGeometry::default());
        let other = QueueGeometry {
            capacity: 4,
            ..Default::default()
        };

        assert!(block.check_compatible(&QueueGeometry::default()).is_ok());
        assert!(matches!(
            block.check_compatible(&other),
            Err(QueueError::LayoutMismatch {
                field: "capacity",
                expected: 4,
                actual: 5
            })
        ));
    }

    #[test]
    fn test_check_compatible_rejects_uninitialized_region() {
        let block = ControlBlock::decode(&[0u8; CONTROL_BLOCK_SIZE]);
        assert!(matches!(
            block.check_compatible(&QueueGeometry::default()),
            Err(QueueError::LayoutMismatch { field: "magic", .. })
        ));
    }

    #[test]
    fn test_check_compatible_rejects_out_of_range_indices() {
        let geometry = small_geometry();

        let mut block = ControlBlock::new(geometry);
        block.read_index = 7;
        assert!(matches!(
            block.check_compatible(&geometry),
            Err(QueueError::CorruptControl {
                field: "read_index",
                value: 7,
                capacity: 3
            })
        ));

        let mut block = ControlBlock::new(geometry);
        block.write_index = 3;
        assert!(matches!(
            block.check_indices(3),
            Err(QueueError::CorruptControl { field: "write_index", .. })
        ));

        let mut block = ControlBlock::new(geometry);
        block.occupied_count = 3;
        block.write_index = 2;
        assert!(block.check_indices(3).is_ok());
        block.occupied_count = 4;
        assert!(matches!(
            block.check_indices(3),
            Err(QueueError::CorruptControl { field: "occupied_count", .. })
        ));
    }
}
