use crate::codec::decode_slot;
use crate::config::QueueConfig;
use crate::errors::Result;
use crate::layout::QueueGeometry;
use crate::names::QueueNames;
use crate::queue::SharedQueue;
use crate::types::{Frame, QueueStatus};
use std::time::Duration;

/// Consumer end of the frame queue.
///
/// Frames are copied out of the slot while the lock is held, so the slot is
/// free for the producer as soon as `consume` returns.
pub struct SlotReader {
    queue: SharedQueue,
    consumed: u64,
}

impl SlotReader {
    /// Attach to a queue some producer already created.
    pub fn attach(config: &QueueConfig) -> Result<Self> {
        Self::attach_with(&config.names, config.geometry)
    }

    pub fn attach_with(names: &QueueNames, geometry: QueueGeometry) -> Result<Self> {
        Ok(Self::from_queue(SharedQueue::attach(names, geometry)?))
    }

    pub fn from_queue(queue: SharedQueue) -> Self {
        Self { queue, consumed: 0 }
    }

    /// Take the oldest frame, blocking while the queue is empty.
    pub fn consume(&mut self) -> Result<Frame> {
        self.queue.full_slots().wait()?;
        self.read_acquired()
    }

    /// Take the oldest frame if one is ready.
    pub fn try_consume(&mut self) -> Result<Option<Frame>> {
        if !self.queue.full_slots().try_wait()? {
            return Ok(None);
        }
        self.read_acquired().map(Some)
    }

    /// Take the oldest frame, waiting at most `timeout` for one to arrive.
    pub fn consume_timeout(&mut self, timeout: Duration) -> Result<Option<Frame>> {
        if !self.queue.full_slots().wait_timeout(timeout)? {
            return Ok(None);
        }
        self.read_acquired().map(Some)
    }

    /// Caller holds one "full" permit. The slot is released even when its
    /// contents fail to decode, otherwise the producer would lose it for good.
    /// If no slot could be read at all, the permit is handed back instead.
    fn read_acquired(&mut self) -> Result<Frame> {
        let geometry = *self.queue.geometry();

        let read = self.queue.with_locked(|control, bytes| {
            control.check_indices(geometry.capacity)?;
            let index = control.read_index;
            let decoded = decode_slot(&bytes[geometry.slot_range(index)], &geometry);
            control.read_index = geometry.next_index(index);
            control.occupied_count = control.occupied_count.saturating_sub(1);
            Ok((index, decoded, control.occupied_count))
        });

        let (index, decoded, occupied) = match read {
            Ok(read) => read,
            Err(e) => {
                self.queue.full_slots().post()?;
                return Err(e);
            }
        };
        self.queue.empty_slots().post()?;

        let frame = match decoded {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!(slot = index, error = %e, "Discarded undecodable slot");
                return Err(e);
            }
        };
        self.consumed += 1;

        tracing::trace!(frame_id = frame.frame_id, slot = index, occupied, "Consumed frame");
        Ok(frame)
    }

    /// Frames consumed through this handle.
    pub fn consumed(&self) -> u64 {
        self.consumed
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
