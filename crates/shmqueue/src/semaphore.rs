use nix::errno::Errno;
use nix::sys::time::TimeSpec;
use nix::time::{ClockId, clock_gettime};
use std::ffi::CString;
use std::os::raw::c_int;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SemaphoreError {
    #[error("Semaphore {name} failed: {errno}")]
    Os { name: String, errno: Errno },
    #[error("Semaphore {0} does not exist")]
    NotFound(String),
    #[error("Semaphore {0} already exists")]
    AlreadyExists(String),
    #[error("Invalid semaphore name: {0:?}")]
    InvalidName(String),
}

/// POSIX named counting semaphore (`sem_open`), shared by name across processes.
pub struct NamedSemaphore {
    sem: *mut libc::sem_t,
    name: String,
}

impl NamedSemaphore {
    /// Create a new semaphore, failing if one with the same name already exists.
    pub fn create(name: &str, initial_value: u32) -> Result<Self, SemaphoreError> {
        let c_name = c_name(name)?;

        let sem = unsafe {
            libc::sem_open(
                c_name.as_ptr(),
                libc::O_CREAT | libc::O_EXCL,
                0o600 as libc::c_uint,
                initial_value as libc::c_uint,
            )
        };

        if sem == libc::SEM_FAILED {
            return Err(match Errno::last() {
                Errno::EEXIST => SemaphoreError::AlreadyExists(name.to_string()),
                errno => os_error(name, errno),
            });
        }

        Ok(Self {
            sem,
            name: name.to_string(),
        })
    }

    /// Open an existing semaphore. Never creates.
    pub fn open(name: &str) -> Result<Self, SemaphoreError> {
        let c_name = c_name(name)?;

        let sem = unsafe { libc::sem_open(c_name.as_ptr(), 0) };

        if sem == libc::SEM_FAILED {
            return Err(match Errno::last() {
                Errno::ENOENT => SemaphoreError::NotFound(name.to_string()),
                errno => os_error(name, errno),
            });
        }

        Ok(Self {
            sem,
            name: name.to_string(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Block until the count is positive, then decrement it.
    ///
    /// Waits indefinitely. Interrupted waits are resumed.
    pub fn wait(&self) -> Result<(), SemaphoreError> {
        loop {
            let ret = unsafe { libc::sem_wait(self.sem) };
            if ret == 0 {
                return Ok(());
            }
            match Errno::last() {
                Errno::EINTR => continue,
                errno => return Err(os_error(&self.name, errno)),
            }
        }
    }

    /// Decrement without blocking. Returns `false` if the count was zero.
    pub fn try_wait(&self) -> Result<bool, SemaphoreError> {
        loop {
            let ret = unsafe { libc::sem_trywait(self.sem) };
            if ret == 0 {
                return Ok(true);
            }
            match Errno::last() {
                Errno::EAGAIN => return Ok(false),
                Errno::EINTR => continue,
                errno => return Err(os_error(&self.name, errno)),
            }
        }
    }

    /// Wait at most `timeout`. Returns `false` if the deadline passed.
    pub fn wait_timeout(&self, timeout: Duration) -> Result<bool, SemaphoreError> {
        // sem_timedwait takes an absolute CLOCK_REALTIME deadline
        let now = clock_gettime(ClockId::CLOCK_REALTIME).map_err(|e| os_error(&self.name, e))?;
        let deadline = now + TimeSpec::from_duration(timeout);

        loop {
            let ret = unsafe { libc::sem_timedwait(self.sem, deadline.as_ref()) };
            if ret == 0 {
                return Ok(true);
            }
            match Errno::last() {
                Errno::ETIMEDOUT => return Ok(false),
                Errno::EINTR => continue,
                errno => return Err(os_error(&self.name, errno)),
            }
        }
    }

    pub fn post(&self) -> Result<(), SemaphoreError> {
        let ret = unsafe { libc::sem_post(self.sem) };
        if ret != 0 {
            return Err(os_error(&self.name, Errno::last()));
        }
        Ok(())
    }

    /// Current count. Racy by nature; diagnostics only.
    pub fn value(&self) -> Result<i32, SemaphoreError> {
        let mut val: c_int = 0;
        let ret = unsafe { libc::sem_getvalue(self.sem, &mut val) };
        if ret != 0 {
            return Err(os_error(&self.name, Errno::last()));
        }
        Ok(val)
    }

    /// Remove the name. Processes that already opened it keep a valid handle.
    ///
    /// Returns `false` if nothing was registered under `name`.
    pub fn unlink(name: &str) -> Result<bool, SemaphoreError> {
        let c_name = c_name(name)?;
        let ret = unsafe { libc::sem_unlink(c_name.as_ptr()) };
        if ret != 0 {
            return match Errno::last() {
                Errno::ENOENT => Ok(false),
                errno => Err(os_error(name, errno)),
            };
        }
        Ok(true)
    }
}

impl Drop for NamedSemaphore {
    fn drop(&mut self) {
        unsafe {
            libc::sem_close(self.sem);
        }
    }
}

unsafe impl Send for NamedSemaphore {}
unsafe impl Sync for NamedSemaphore {}

fn c_name(name: &str) -> Result<CString, SemaphoreError> {
    CString::new(name).map_err(|_| SemaphoreError::InvalidName(name.to_string()))
}

fn os_error(name: &str, errno: Errno) -> SemaphoreError {
    SemaphoreError::Os {
        name: name.to_string(),
        errno,
    }
}
