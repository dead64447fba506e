//! Mapping exposer and client mapping views

use crate::ops::Mappable;
use crate::page::MappingPage;
use crate::shm::SharedMemory;
use crate::{Error, Result};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

/// Identity of one established mapping
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingInfo {
    /// Per-exposer sequence number
    pub id: u64,
    /// Device name
    pub device: String,
    /// Backing shm object
    pub object: String,
    /// Bytes visible through the mapping
    pub span: usize,
}

/// Callbacks run when a mapping is opened and torn down.
///
/// Accounting only; hooks must not assume any ordering with the byte channel.
pub trait MappingHooks: Send + Sync {
    fn on_open(&self, info: &MappingInfo);

    /// `contents` is the mapped span as seen at teardown
    fn on_close(&self, info: &MappingInfo, contents: &[u8]);
}

/// Hooks that write to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogHooks;

impl MappingHooks for LogHooks {
    fn on_open(&self, info: &MappingInfo) {
        log::debug!("{}: mapping {} opened ({} bytes)", info.device, info.id, info.span);
    }

    fn on_close(&self, info: &MappingInfo, contents: &[u8]) {
        let end = contents.iter().position(|&b| b == 0).unwrap_or(contents.len());
        log::info!(
            "{}: mapping {} closed, page holds: {}",
            info.device,
            info.id,
            String::from_utf8_lossy(&contents[..end])
        );
    }
}

/// Validates map requests and hands out shared views of the page
pub struct MappingExposer {
    device: String,
    object: String,
    page_size: usize,
    liveness: Arc<AtomicUsize>,
    hooks: Arc<dyn MappingHooks>,
    next_id: AtomicU64,
}

impl MappingExposer {
    pub fn new(device: &str, page: &MappingPage, hooks: Arc<dyn MappingHooks>) -> Self {
        Self {
            device: device.to_string(),
            object: page.object_name().to_string(),
            page_size: page.size(),
            liveness: page.liveness(),
            hooks,
            next_id: AtomicU64::new(0),
        }
    }

    /// Size limit for a single mapping
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Number of mappings still alive
    pub fn active(&self) -> usize {
        self.liveness.load(Ordering::Acquire)
    }
}

impl Mappable for MappingExposer {
    fn map(&self, span: usize) -> Result<PageMapping> {
        if span == 0 {
            return Err(Error::InvalidSpan);
        }
        if span > self.page_size {
            log::warn!(
                "{}: rejected mapping of {} bytes (page is {})",
                self.device,
                span,
                self.page_size
            );
            return Err(Error::OversizeMappingRequest {
                requested: span,
                page_size: self.page_size,
            });
        }

        let shm = SharedMemory::open(&self.object)?;
        if shm.size() < span {
            return Err(Error::MapFailed(format!(
                "{}: object holds {} bytes, need {}",
                self.object,
                shm.size(),
                span
            )));
        }

        let info = MappingInfo {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            device: self.device.clone(),
            object: self.object.clone(),
            span,
        };
        self.liveness.fetch_add(1, Ordering::AcqRel);
        self.hooks.on_open(&info);

        Ok(PageMapping {
            shm,
            info,
            liveness: Arc::clone(&self.liveness),
            hooks: Arc::clone(&self.hooks),
        })
    }
}

/// A client's shared, read-write view of the page.
///
/// Each view is an independent mapping of the same memory: writes show up in
/// every other view without synchronization. The view keeps its own mapping,
/// so it stays valid after the device is torn down.
pub struct PageMapping {
    shm: SharedMemory,
    info: MappingInfo,
    liveness: Arc<AtomicUsize>,
    hooks: Arc<dyn MappingHooks>,
}

impl PageMapping {
    pub fn info(&self) -> &MappingInfo {
        &self.info
    }

    /// Mapped span in bytes
    pub fn len(&self) -> usize {
        self.info.span
    }

    pub fn is_empty(&self) -> bool {
        self.info.span == 0
    }

    /// Read-only slice of the mapped span
    pub fn as_slice(&self) -> &[u8] {
        unsafe { std::slice::from_raw_parts(self.shm.as_ptr(), self.info.span) }
    }

    /// Mutable slice of the mapped span
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        unsafe { std::slice::from_raw_parts_mut(self.shm.as_mut_ptr(), self.info.span) }
    }
}

impl Drop for PageMapping {
    fn drop(&mut self) {
        self.hooks.on_close(&self.info, self.as_slice());
        self.liveness.fetch_sub(1, Ordering::AcqRel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl MappingHooks for Recorder {
        fn on_open(&self, info: &MappingInfo) {
            self.events.lock().push(format!("open {}", info.span));
        }

        fn on_close(&self, info: &MappingInfo, contents: &[u8]) {
            let end = contents.iter().position(|&b| b == 0).unwrap_or(contents.len());
            self.events.lock().push(format!(
                "close {} {}",
                info.span,
                String::from_utf8_lossy(&contents[..end])
            ));
        }
    }

    fn exposer(hooks: Arc<dyn MappingHooks>) -> (MappingPage, MappingExposer) {
        let page = MappingPage::allocate("khello_map", None, 4096).unwrap();
        let exposer = MappingExposer::new("khello_map", &page, hooks);
        (page, exposer)
    }

    #[test]
    fn test_oversize_rejected_without_side_effects() {
        let recorder = Arc::new(Recorder::default());
        let (page, exposer) = exposer(recorder.clone());

        let err = exposer.map(4097).err().unwrap();
        assert!(matches!(
            err,
            Error::OversizeMappingRequest { requested: 4097, page_size: 4096 }
        ));
        assert!(err.is_retryable());
        assert_eq!(exposer.active(), 0);
        assert!(recorder.events.lock().is_empty());
        assert!(page.snapshot(4096).iter().all(|&b| b == 0));
    }

    #[test]
    fn test_zero_span_rejected() {
        let (_page, exposer) = exposer(Arc::new(LogHooks));
        assert!(matches!(exposer.map(0), Err(Error::InvalidSpan)));
    }

    #[test]
    fn test_hooks_see_open_and_close() {
        let recorder = Arc::new(Recorder::default());
        let (_page, exposer) = exposer(recorder.clone());

        let mut view = exposer.map(32).unwrap();
        assert_eq!(view.len(), 32);
        assert!(!view.shm.is_owner());
        assert_eq!(exposer.active(), 1);
        view.as_mut_slice()[..5].copy_from_slice(b"haha\0");
        drop(view);

        assert_eq!(exposer.active(), 0);
        assert_eq!(*recorder.events.lock(), vec!["open 32", "close 32 haha"]);
    }

    #[test]
    fn test_full_page_mapping() {
        let (page, exposer) = exposer(Arc::new(LogHooks));
        let mut view = exposer.map(page.size()).unwrap();
        let last = view.len() - 1;
        view.as_mut_slice()[last] = 7;
        assert_eq!(page.snapshot(page.size())[last], 7);
    }
}
