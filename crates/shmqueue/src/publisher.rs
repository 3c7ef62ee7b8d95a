use crate::codec::{check_frame, encode_slot};
use crate::config::QueueConfig;
use crate::errors::Result;
use crate::layout::QueueGeometry;
use crate::names::QueueNames;
use crate::queue::SharedQueue;
use crate::types::{Detection, Frame, FrameView, QueueStatus};
use std::time::Duration;

/// Producer end of the frame queue.
///
/// Every publish follows the same order: wait for a free slot, lock, encode
/// at `write_index`, advance, unlock, signal one filled slot.
pub struct SlotPublisher {
    queue: SharedQueue,
    published: u64,
}

impl SlotPublisher {
    /// Create the queue described by `config`, or attach if it already exists.
    pub fn create(config: &QueueConfig) -> Result<Self> {
        Self::open_or_create(&config.names, config.geometry)
    }

    pub fn open_or_create(names: &QueueNames, geometry: QueueGeometry) -> Result<Self> {
        Ok(Self::from_queue(SharedQueue::open_or_create(names, geometry)?))
    }

    pub fn from_queue(queue: SharedQueue) -> Self {
        Self {
            queue,
            published: 0,
        }
    }

    /// Publish one frame, blocking while the queue is full.
    ///
    /// Returns the number of detections stored, which is less than
    /// `detections.len()` when the frame carries more than `max_detections`.
    pub fn publish(
        &mut self,
        frame_id: u32,
        width: u32,
        height: u32,
        channels: u32,
        detections: &[Detection],
        payload: &[u8],
    ) -> Result<usize> {
        self.publish_view(&FrameView {
            frame_id,
            width,
            height,
            channels,
            detections,
            payload,
        })
    }

    pub fn publish_frame(&mut self, frame: &Frame) -> Result<usize> {
        self.publish_view(&frame.view())
    }

    pub fn publish_view(&mut self, frame: &FrameView<'_>) -> Result<usize> {
        check_frame(self.queue.geometry(), frame)?;
        self.queue.empty_slots().wait()?;
        self.write_acquired(frame)
    }

    /// Publish without blocking. `Ok(None)` means every slot was full.
    pub fn try_publish(&mut self, frame: &FrameView<'_>) -> Result<Option<usize>> {
        check_frame(self.queue.geometry(), frame)?;
        if !self.queue.empty_slots().try_wait()? {
            return Ok(None);
        }
        self.write_acquired(frame).map(Some)
    }

    /// Publish, waiting at most `timeout` for a free slot.
    pub fn publish_timeout(
        &mut self,
        frame: &FrameView<'_>,
        timeout: Duration,
    ) -> Result<Option<usize>> {
        check_frame(self.queue.geometry(), frame)?;
        if !self.queue.empty_slots().wait_timeout(timeout)? {
            return Ok(None);
        }
        self.write_acquired(frame).map(Some)
    }

    /// Caller holds one "empty" permit. On failure the permit is handed back
    /// so the slot count stays balanced.
    fn write_acquired(&mut self, frame: &FrameView<'_>) -> Result<usize> {
        let geometry = *self.queue.geometry();

        let written = self.queue.with_locked(|control, bytes| {
            control.check_indices(geometry.capacity)?;
            let index = control.write_index;
            let stored = encode_slot(&mut bytes[geometry.slot_range(index)], &geometry, frame)?;
            control.write_index = geometry.next_index(index);
            control.occupied_count += 1;
            Ok((index, stored, control.occupied_count))
        });

        let (index, stored, occupied) = match written {
            Ok(written) => written,
            Err(e) => {
                self.queue.empty_slots().post()?;
                return Err(e);
            }
        };
        self.queue.full_slots().post()?;
        self.published += 1;

        if stored < frame.detections.len() {
            tracing::debug!(
                frame_id = frame.frame_id,
                received = frame.detections.len(),
                stored,
                "Truncated detections"
            );
        }
        tracing::trace!(frame_id = frame.frame_id, slot = index, occupied, "Published frame");

        Ok(stored)
    }

    /// Frames published through this handle.
    pub fn published(&self) -> u64 {
        self.published
    }

    pub fn geometry(&self) -> &QueueGeometry {
        self.queue.geometry()
    }

    pub fn status(&self) -> Result<QueueStatus> {
        self.queue.status()
    }

    pub fn queue(&self) -> &SharedQueue {
        &self.queue
    }
}
