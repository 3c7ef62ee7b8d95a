use crate::codec::ControlBlock;
use crate::errors::{QueueError, Result};
use crate::layout::{CONTROL_BLOCK_SIZE, QueueGeometry};
use crate::lock::NamedLock;
use crate::names::QueueNames;
use crate::region::SharedRegion;
use crate::semaphore::{NamedSemaphore, SemaphoreError};
use crate::types::QueueStatus;

/// How this process came to hold the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Created the region and zero-initialized the control block.
    Creator,
    /// Attached to a region some other process created.
    Attacher,
}

/// Shared region plus the synchronization triple, held by one process.
///
/// Lifetime is reference counted through the control block's `holders`
/// field: whichever holder drops last removes the names of the region and
/// of the three semaphores.
pub struct SharedQueue {
    names: QueueNames,
    geometry: QueueGeometry,
    role: Role,
    region: SharedRegion,
    lock: NamedLock,
    empty: NamedSemaphore,
    full: NamedSemaphore,
}

impl SharedQueue {
    /// Create the queue, or attach to it if the region already exists.
    ///
    /// On creation, leftover semaphores with the same names are removed
    /// first, then the lock is created held, the counting semaphores are set
    /// to `empty = N`, `full = 0`, and the control block is written before
    /// the lock is released. An attacher can therefore never observe a
    /// half-initialized region.
    pub fn open_or_create(names: &QueueNames, geometry: QueueGeometry) -> Result<Self> {
        names.validate()?;
        geometry.validate()?;

        let Some(mut region) = SharedRegion::create_exclusive(&names.region, geometry.region_size())?
        else {
            // A name collision with a wrongly sized region is reported as such,
            // not as missing semaphores
            SharedRegion::open(&names.region, geometry.region_size())?;
            tracing::info!(region = %names.region, "Region exists, attaching");
            return Self::attach(names, geometry);
        };

        let triple = create_sync_objects(names, &geometry);
        let (lock, empty, full) = match triple {
            Ok(triple) => triple,
            Err(e) => {
                let _ = SharedRegion::unlink(&names.region);
                return Err(e);
            }
        };

        ControlBlock::new(geometry).encode(region.bytes_mut());
        lock.unlock()?;

        tracing::info!(
            region = %names.region,
            size = region.len(),
            capacity = geometry.capacity,
            slot_size = geometry.slot_size(),
            "Created shared queue"
        );

        Ok(Self {
            names: names.clone(),
            geometry,
            role: Role::Creator,
            region,
            lock,
            empty,
            full,
        })
    }

    /// Attach to an existing queue. Never creates anything.
    ///
    /// Fails immediately with [`QueueError::NotFound`] if any of the four
    /// objects is missing, with [`QueueError::SizeMismatch`] or
    /// [`QueueError::LayoutMismatch`] if the region was built for a different
    /// geometry, and with [`QueueError::CorruptControl`] if its indices do not
    /// name a slot.
    pub fn attach(names: &QueueNames, geometry: QueueGeometry) -> Result<Self> {
        names.validate()?;
        geometry.validate()?;

        let lock = NamedLock::open(&names.mutex).map_err(not_found)?;
        let empty = NamedSemaphore::open(&names.empty).map_err(not_found)?;
        let full = NamedSemaphore::open(&names.full).map_err(not_found)?;

        let region = {
            // The creator holds the lock until the control block is written
            let _guard = lock.lock()?;
            let mut region = SharedRegion::open(&names.region, geometry.region_size())?;

            let mut control = ControlBlock::decode(region.bytes());
            control.check_compatible(&geometry)?;
            control.holders += 1;
            control.encode(region.bytes_mut());
            region
        };

        tracing::info!(
            region = %names.region,
            size = region.len(),
            capacity = geometry.capacity,
            "Attached to shared queue"
        );

        Ok(Self {
            names: names.clone(),
            geometry,
            role: Role::Attacher,
            region,
            lock,
            empty,
            full,
        })
    }

    /// Remove every name belonging to the queue, ignoring missing ones.
    ///
    /// Intended for clearing objects left behind by a crashed run. Processes
    /// still attached keep working on the unlinked objects.
    pub fn remove(names: &QueueNames) -> Result<()> {
        if SharedRegion::unlink(&names.region)? {
            tracing::info!(region = %names.region, "Removed stale region");
        }
        for name in [&names.mutex, &names.empty, &names.full] {
            if NamedSemaphore::unlink(name)? {
                tracing::info!(semaphore = %name, "Removed stale semaphore");
            }
        }
        Ok(())
    }

    pub fn names(&self) -> &QueueNames {
        &self.names
    }

    pub fn geometry(&self) -> &QueueGeometry {
        &self.geometry
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub(crate) fn empty_slots(&self) -> &NamedSemaphore {
        &self.empty
    }

    pub(crate) fn full_slots(&self) -> &NamedSemaphore {
        &self.full
    }

    /// Run `f` with the lock held, on the decoded control block and the raw
    /// region bytes. The control block is written back only if `f` succeeds.
    pub(crate) fn with_locked<R>(
        &mut self,
        f: impl FnOnce(&mut ControlBlock, &mut [u8]) -> Result<R>,
    ) -> Result<R> {
        let _guard = self.lock.lock()?;
        let bytes = self.region.bytes_mut();

        let mut control = ControlBlock::decode(&bytes[..CONTROL_BLOCK_SIZE]);
        let result = f(&mut control, bytes)?;
        control.encode(&mut bytes[..CONTROL_BLOCK_SIZE]);

        Ok(result)
    }

    /// Read the indices and counts under the lock.
    pub fn status(&self) -> Result<QueueStatus> {
        let control = {
            let _guard = self.lock.lock()?;
            ControlBlock::decode(&self.region.bytes()[..CONTROL_BLOCK_SIZE])
        };

        Ok(QueueStatus {
            write_index: control.write_index,
            read_index: control.read_index,
            occupied_count: control.occupied_count,
            holders: control.holders,
            free_slots: self.empty.value()?,
            filled_slots: self.full.value()?,
        })
    }

    /// Drop this process's hold; the last holder unlinks every name while
    /// still holding the lock, so no new attacher can slip in between.
    fn release(&mut self) -> Result<bool> {
        let _guard = self.lock.lock()?;
        let bytes = self.region.bytes_mut();

        let mut control = ControlBlock::decode(&bytes[..CONTROL_BLOCK_SIZE]);
        control.holders = control.holders.saturating_sub(1);
        control.encode(&mut bytes[..CONTROL_BLOCK_SIZE]);

        let last = control.holders == 0;
        if last {
            Self::remove(&self.names)?;
        }
        Ok(last)
    }
}

impl Drop for SharedQueue {
    fn drop(&mut self) {
        match self.release() {
            Ok(true) => tracing::info!(region = %self.names.region, "Last holder released queue"),
            Ok(false) => tracing::debug!(region = %self.names.region, "Released queue"),
            Err(e) => tracing::error!(region = %self.names.region, error = %e, "Failed to release queue"),
        }
    }
}

fn create_sync_objects(
    names: &QueueNames,
    geometry: &QueueGeometry,
) -> Result<(NamedLock, NamedSemaphore, NamedSemaphore)> {
    for name in [&names.mutex, &names.empty, &names.full] {
        if NamedSemaphore::unlink(name)? {
            tracing::warn!(semaphore = %name, "Removed stale semaphore");
        }
    }

    let lock = NamedLock::create_locked(&names.mutex)?;
    let empty = NamedSemaphore::create(&names.empty, geometry.capacity)?;
    let full = NamedSemaphore::create(&names.full, 0)?;
    Ok((lock, empty, full))
}

fn not_found(e: SemaphoreError) -> QueueError {
    match e {
        SemaphoreError::NotFound(name) => QueueError::NotFound { name },
        e => e.into(),
    }
}
