use crate::semaphore::{NamedSemaphore, SemaphoreError};

/// Cross-process mutual-exclusion lock, backed by a named binary semaphore.
///
/// Not reentrant, and not owner-checked: whichever process holds the guard
/// is the only one that releases it.
pub struct NamedLock {
    sem: NamedSemaphore,
}

impl NamedLock {
    /// Create the lock in the held state. The creator finishes its setup
    /// and then calls [`NamedLock::unlock`].
    pub(crate) fn create_locked(name: &str) -> Result<Self, SemaphoreError> {
        Ok(Self {
            sem: NamedSemaphore::create(name, 0)?,
        })
    }

    pub fn open(name: &str) -> Result<Self, SemaphoreError> {
        Ok(Self {
            sem: NamedSemaphore::open(name)?,
        })
    }

    pub fn name(&self) -> &str {
        self.sem.name()
    }

    /// Block until the lock is free.
    pub fn lock(&self) -> Result<LockGuard<'_>, SemaphoreError> {
        self.sem.wait()?;
        Ok(LockGuard { lock: self })
    }

    pub fn try_lock(&self) -> Result<Option<LockGuard<'_>>, SemaphoreError> {
        if self.sem.try_wait()? {
            Ok(Some(LockGuard { lock: self }))
        } else {
            Ok(None)
        }
    }

    pub(crate) fn unlock(&self) -> Result<(), SemaphoreError> {
        self.sem.post()
    }
}

/// Releases the lock on drop.
pub struct LockGuard<'a> {
    lock: &'a NamedLock,
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.lock.unlock() {
            tracing::error!(lock = self.lock.name(), error = %e, "Failed to release lock");
        }
    }
}
