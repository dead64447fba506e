//! Capability interfaces for the device's access paths
//!
//! Each path is its own trait so a component can be exercised without the
//! rest of the device.

use crate::mapping::PageMapping;
use crate::readiness::PollFlags;
use crate::Result;

/// Synchronous read/write access to the data buffer
pub trait ByteChannel {
    /// Copy the current payload into `dst`, returning its length
    fn read(&self, dst: &mut [u8]) -> Result<usize>;

    /// Replace the payload with `src` (clamped), returning bytes accepted
    fn write(&self, src: &[u8]) -> usize;
}

/// Non-blocking readiness query
pub trait ReadinessSource {
    fn poll(&self) -> PollFlags;
}

/// Shared mapping of the device page
pub trait Mappable {
    /// Map the first `span` bytes of the page, read-write and shared
    fn map(&self, span: usize) -> Result<PageMapping>;
}
