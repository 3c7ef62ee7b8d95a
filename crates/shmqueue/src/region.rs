use crate::errors::{QueueError, Result};
use memmap2::{MmapMut, MmapOptions};
use nix::errno::Errno;
use nix::fcntl::OFlag;
use nix::sys::mman::{shm_open, shm_unlink};
use nix::sys::stat::Mode;
use std::fs::File;
use std::os::fd::AsRawFd;

/// A POSIX shared memory object mapped read-write into this process.
///
/// Dropping unmaps; the name stays registered until [`SharedRegion::unlink`].
pub struct SharedRegion {
    name: String,
    mmap: MmapMut,
}

impl SharedRegion {
    /// Create and map a new zero-filled region of `size` bytes.
    ///
    /// Returns `Ok(None)` if an object with this name already exists. The
    /// backing memory is reserved up front so an out-of-memory condition
    /// surfaces here instead of as a fault on first write.
    pub fn create_exclusive(name: &str, size: usize) -> Result<Option<Self>> {
        let fd = match shm_open(
            name,
            OFlag::O_CREAT | OFlag::O_EXCL | OFlag::O_RDWR,
            Mode::from_bits_truncate(0o600),
        ) {
            Ok(fd) => fd,
            Err(Errno::EEXIST) => return Ok(None),
            Err(Errno::EINVAL | Errno::ENAMETOOLONG) => {
                return Err(QueueError::InvalidName(name.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        let file = File::from(fd);

        let mapped = reserve(&file, size).and_then(|_| map(&file, size));
        match mapped {
            Ok(mmap) => Ok(Some(Self {
                name: name.to_string(),
                mmap,
            })),
            Err(e) => {
                // Don't leave a half-built object behind for the next attacher
                let _ = shm_unlink(name);
                Err(e)
            }
        }
    }

    /// Map an existing region, which must be exactly `expected_size` bytes.
    pub fn open(name: &str, expected_size: usize) -> Result<Self> {
        let fd = shm_open(name, OFlag::O_RDWR, Mode::empty()).map_err(|e| match e {
            Errno::ENOENT => QueueError::NotFound {
                name: name.to_string(),
            },
            Errno::EINVAL | Errno::ENAMETOOLONG => QueueError::InvalidName(name.to_string()),
            e => e.into(),
        })?;
        let file = File::from(fd);

        let actual = file.metadata()?.len() as usize;
        if actual != expected_size {
            return Err(QueueError::SizeMismatch {
                name: name.to_string(),
                expected: expected_size,
                actual,
            });
        }

        Ok(Self {
            name: name.to_string(),
            mmap: map(&file, expected_size)?,
        })
    }

    /// Remove the name. Existing mappings stay valid.
    ///
    /// Returns `false` if nothing was registered under `name`.
    pub fn unlink(name: &str) -> Result<bool> {
        match shm_unlink(name) {
            Ok(()) => Ok(true),
            Err(Errno::ENOENT) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.mmap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mmap.is_empty()
    }

    pub(crate) fn bytes(&self) -> &[u8] {
        &self.mmap
    }

    pub(crate) fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.mmap
    }
}

fn reserve(file: &File, size: usize) -> Result<()> {
    let ret = unsafe { libc::posix_fallocate(file.as_raw_fd(), 0, size as libc::off_t) };
    if ret != 0 {
        return Err(Errno::from_raw(ret).into());
    }
    Ok(())
}

fn map(file: &File, size: usize) -> Result<MmapMut> {
    let mmap = unsafe { MmapOptions::new().len(size).map_mut(file)? };
    Ok(mmap)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unique_name(tag: &str) -> String {
        format!("/shmqueue_region_test_{}_{}", std::process::id(), tag)
    }

    #[test]
    fn test_create_exclusive_zero_fills() {
        let name = unique_name("zero");
        let _ = SharedRegion::unlink(&name);

        let region = SharedRegion::create_exclusive(&name, 4096).unwrap().unwrap();
        assert_eq!(region.len(), 4096);
        assert!(region.bytes().iter().all(|&b| b == 0));

        SharedRegion::unlink(&name).unwrap();
    }

    #[test]
    fn test_create_exclusive_reports_existing() {
        let name = unique_name("existing");
        let _ = SharedRegion::unlink(&name);

        let _first = SharedRegion::create_exclusive(&name, 128).unwrap().unwrap();
        let second = SharedRegion::create_exclusive(&name, 128).unwrap();
        assert!(second.is_none(), "Second create should defer to the existing region");

        SharedRegion::unlink(&name).unwrap();
    }

    #[test]
    fn test_open_sees_creator_writes() {
        let name = unique_name("shared");
        let _ = SharedRegion::unlink(&name);

        let mut creator = SharedRegion::create_exclusive(&name, 256).unwrap().unwrap();
        creator.bytes_mut()[..5].copy_from_slice(b"hello");

        let opener = SharedRegion::open(&name, 256).unwrap();
        assert_eq!(&opener.bytes()[..5], b"hello");

        SharedRegion::unlink(&name).unwrap();
    }

    #[test]
    fn test_open_missing_is_not_found() {
        let name = unique_name("missing");
        let _ = SharedRegion::unlink(&name);

        let result = SharedRegion::open(&name, 64);
        assert!(matches!(result, Err(QueueError::NotFound { .. })));
    }

    #[test]
    fn test_open_with_wrong_size_fails() {
        let name = unique_name("size");
        let _ = SharedRegion::unlink(&name);

        let _creator = SharedRegion::create_exclusive(&name, 512).unwrap().unwrap();
        let result = SharedRegion::open(&name, 1024);
        assert!(matches!(
            result,
            Err(QueueError::SizeMismatch {
                expected: 1024,
                actual: 512,
                ..
            })
        ));

        SharedRegion::unlink(&name).unwrap();
    }

    #[test]
    fn test_mapping_survives_unlink() {
        let name = unique_name("unlinked");
        let _ = SharedRegion::unlink(&name);

        let mut creator = SharedRegion::create_exclusive(&name, 64).unwrap().unwrap();
        let opener = SharedRegion::open(&name, 64).unwrap();
        assert!(SharedRegion::unlink(&name).unwrap());

        creator.bytes_mut()[0] = 7;
        assert_eq!(opener.bytes()[0], 7);
        assert!(!SharedRegion::unlink(&name).unwrap());
    }
}
