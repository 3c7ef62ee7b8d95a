//! Well-known names of the shared region and its synchronization objects.
//!
//! Producer and consumer resolve the same four kernel objects by deriving
//! every name from one prefix.

use crate::errors::{QueueError, Result};

/// Default prefix for every IPC object of the frame queue
pub const DEFAULT_PREFIX: &str = "yolo_queue";

/// Longest name accepted by `sem_open` on Linux (NAME_MAX minus the `sem.` prefix)
const MAX_NAME_LEN: usize = 251;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueNames {
    /// POSIX shared memory object holding the control block and slots
    pub region: String,
    /// Binary semaphore used as the queue lock
    pub mutex: String,
    /// Counts free slots; starts at N
    pub empty: String,
    /// Counts filled slots; starts at 0
    pub full: String,
}

impl QueueNames {
    pub fn with_prefix(prefix: &str) -> Self {
        let prefix = prefix.trim_start_matches('/');
        Self {
            region: format!("/{}_shm", prefix),
            mutex: format!("/{}_mutex", prefix),
            empty: format!("/{}_empty", prefix),
            full: format!("/{}_full", prefix),
        }
    }

    pub fn all(&self) -> [&str; 4] {
        [&self.region, &self.mutex, &self.empty, &self.full]
    }

    /// Each name must be a single absolute component, e.g. `/yolo_queue_shm`.
    pub fn validate(&self) -> Result<()> {
        for name in self.all() {
            let valid = name.len() > 1
                && name.len() <= MAX_NAME_LEN
                && name.starts_with('/')
                && !name[1..].contains('/')
                && !name.contains('\0');
            if !valid {
                return Err(QueueError::InvalidName(name.to_string()));
            }
        }
        Ok(())
    }
}

impl Default for QueueNames {
    fn default() -> Self {
        Self::with_prefix(DEFAULT_PREFIX)
    }
}
