//! POSIX shared memory wrapper

use crate::{Error, Result};
use shared_memory::{Shmem, ShmemConf};

/// Shared memory object mapped into this process.
///
/// The creating side owns the object name and unlinks it on drop; pages stay
/// valid for every other mapping until that mapping goes away.
pub struct SharedMemory {
    inner: Shmem,
    name: String,
    size: usize,
}

// Safety: the mapping is process-wide; callers coordinate access to its bytes
unsafe impl Send for SharedMemory {}
unsafe impl Sync for SharedMemory {}

impl SharedMemory {
    /// Create a new zero-filled shared memory object
    pub fn create(name: &str, size: usize) -> Result<Self> {
        let shmem = ShmemConf::new()
            .size(size)
            .os_id(name)
            .create()
            .map_err(|e| Error::AllocationFailure(format!("{}: {}", name, e)))?;

        Ok(Self {
            inner: shmem,
            name: name.to_string(),
            size,
        })
    }

    /// Establish another mapping of an existing object
    pub fn open(name: &str) -> Result<Self> {
        let shmem = ShmemConf::new()
            .os_id(name)
            .open()
            .map_err(|e| Error::MapFailed(format!("{}: {}", name, e)))?;

        let size = shmem.len();

        Ok(Self {
            inner: shmem,
            name: name.to_string(),
            size,
        })
    }

    /// Name of the object
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Mapped size
    pub fn size(&self) -> usize {
        self.size
    }

    /// Whether dropping this mapping unlinks the object
    pub fn is_owner(&self) -> bool {
        self.inner.is_owner()
    }

    pub fn as_ptr(&self) -> *const u8 {
        self.inner.as_ptr()
    }

    pub fn as_mut_ptr(&self) -> *mut u8 {
        self.inner.as_ptr()
    }
}
