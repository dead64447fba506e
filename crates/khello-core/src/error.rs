//! Error types for khello

use nix::errno::Errno;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("{step} failed: {reason}")]
    ResourceUnavailable { step: &'static str, reason: String },

    #[error("copy fault: need {needed} bytes, destination holds {available}")]
    CopyFault { needed: usize, available: usize },

    #[error("mapping of {requested} bytes exceeds page size {page_size}")]
    OversizeMappingRequest { requested: usize, page_size: usize },

    #[error("mapping span must be non-zero")]
    InvalidSpan,

    #[error("page allocation failed: {0}")]
    AllocationFailure(String),

    #[error("mapping failed: {0}")]
    MapFailed(String),

    #[error("config error: {0}")]
    Config(String),
}

impl Error {
    /// Whether the caller may retry (possibly with different arguments)
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::OversizeMappingRequest { .. } | Error::MapFailed(_)
        )
    }

    /// Kernel-style negative errno for this error
    pub fn errno(&self) -> i32 {
        let errno = match self {
            Error::ResourceUnavailable { .. } => Errno::ENODEV,
            Error::CopyFault { .. } => Errno::EFAULT,
            Error::OversizeMappingRequest { .. } | Error::MapFailed(_) => Errno::EAGAIN,
            Error::InvalidSpan | Error::Config(_) => Errno::EINVAL,
            Error::AllocationFailure(_) => Errno::ENOMEM,
        };
        -(errno as i32)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
