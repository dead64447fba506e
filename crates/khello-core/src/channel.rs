//! Synchronized byte channel

use crate::buffer::DataBuffer;
use crate::ops::{ByteChannel, ReadinessSource};
use crate::readiness::PollFlags;
use crate::{Error, Result};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Read/write access to a [`DataBuffer`] serialized by one lock.
///
/// `busy` and `published_len` are only written with the lock held. `poll`
/// reads them without it; the result is advisory.
pub struct SyncChannel {
    name: String,
    buffer: Mutex<DataBuffer>,
    busy: AtomicBool,
    published_len: AtomicUsize,
}

impl SyncChannel {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            buffer: Mutex::new(DataBuffer::new()),
            busy: AtomicBool::new(false),
            published_len: AtomicUsize::new(0),
        }
    }

    /// Length of the stored payload
    pub fn len(&self) -> usize {
        self.published_len.load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether a read or write currently holds the buffer
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Relaxed)
    }
}

impl ByteChannel for SyncChannel {
    fn read(&self, dst: &mut [u8]) -> Result<usize> {
        let buffer = self.buffer.lock();
        self.busy.store(true, Ordering::Relaxed);

        let len = buffer.len();
        let result = if dst.len() < len {
            log::error!("{}: failed to send {} bytes", self.name, len);
            Err(Error::CopyFault {
                needed: len,
                available: dst.len(),
            })
        } else {
            dst[..len].copy_from_slice(buffer.as_bytes());
            log::info!("{}: sent {} bytes", self.name, len);
            Ok(len)
        };

        self.busy.store(false, Ordering::Relaxed);
        result
    }

    fn write(&self, src: &[u8]) -> usize {
        let mut buffer = self.buffer.lock();
        self.busy.store(true, Ordering::Relaxed);

        let kept = buffer.store(src);
        self.published_len.store(kept, Ordering::Release);
        log::info!("{}: received from user: {}", self.name, buffer.text());

        self.busy.store(false, Ordering::Relaxed);
        kept
    }
}

impl ReadinessSource for SyncChannel {
    fn poll(&self) -> PollFlags {
        PollFlags::compute(self.len(), self.is_busy())
    }
}
