//! Mapping-backed page

use crate::shm::SharedMemory;
use crate::Result;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

static NEXT_OBJECT: AtomicU64 = AtomicU64::new(0);

/// Unique shm object name for a page
fn unique_object_name(device: &str) -> String {
    let seq = NEXT_OBJECT.fetch_add(1, Ordering::Relaxed);
    format!("/{}_page_{}_{}", device, std::process::id(), seq)
}

/// One page of shared memory that clients map directly.
///
/// Allocated once per device and never resized. Its content is not
/// synchronized with anything; concurrent writers through different
/// mappings race.
pub struct MappingPage {
    shm: SharedMemory,
    /// Live mappings of this page
    active: Arc<AtomicUsize>,
}

impl MappingPage {
    /// Allocate the page under `object`, or a generated name when `None`
    pub fn allocate(device: &str, object: Option<&str>, page_size: usize) -> Result<Self> {
        let name = match object {
            Some(name) => name.to_string(),
            None => unique_object_name(device),
        };
        let shm = SharedMemory::create(&name, page_size)?;
        log::debug!("{}: page {} allocated ({} bytes)", device, name, page_size);

        Ok(Self {
            shm,
            active: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Name of the backing object
    pub fn object_name(&self) -> &str {
        self.shm.name()
    }

    /// Page size in bytes
    pub fn size(&self) -> usize {
        self.shm.size()
    }

    /// Number of live mappings
    pub fn active_mappings(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }

    pub(crate) fn liveness(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.active)
    }

    /// Copy of the first `len` bytes (clamped to the page)
    pub fn snapshot(&self, len: usize) -> Vec<u8> {
        let len = len.min(self.size());
        let mut out = vec![0u8; len];
        // Safety: `len` is within the mapping; writers through other mappings may race,
        // which only yields torn bytes.
        unsafe { std::ptr::copy_nonoverlapping(self.shm.as_ptr(), out.as_mut_ptr(), len) };
        out
    }
}
