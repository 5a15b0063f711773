//! Error Types
//!
//! Structured errors for the buffer adapter and the filesystem providers.
//! Host-facing builtins collapse `FsError` into false/absent results, see
//! [`crate::paths`].

use std::io;
use thiserror::Error;

/// Errors raised while marshalling between managed buffers and native strings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdapterError {
    /// Capacity cannot hold the content plus its terminator.
    #[error("invalid capacity {capacity}: at least {required} bytes are required")]
    InvalidCapacity { capacity: usize, required: usize },

    /// Content contains a NUL byte, so it has no native representation.
    #[error("interior NUL byte at offset {offset}")]
    InteriorNul { offset: usize },

    /// A native buffer handed over for adoption is not exactly `capacity` bytes.
    #[error("native buffer of {allocated} bytes adopted with capacity {capacity}")]
    CapacityMismatch { capacity: usize, allocated: usize },

    /// A native buffer handed over for adoption has no terminator.
    #[error("native buffer is not NUL-terminated")]
    MissingTerminator,
}

/// Errors reported by a filesystem provider.
#[derive(Debug, Error)]
pub enum FsError {
    /// The underlying system call failed.
    #[error("{op} failed: {source}")]
    Os {
        op: &'static str,
        #[source]
        source: io::Error,
    },

    /// A path or link target contains a NUL byte.
    #[error("interior NUL byte at offset {offset}")]
    InteriorNul { offset: usize },

    /// The platform has no implementation of this operation.
    #[error("unsupported operation on this platform: {op}")]
    Unsupported { op: &'static str },
}

impl FsError {
    /// Capture `errno` for a failed call.
    pub fn last_os_error(op: &'static str) -> Self {
        FsError::Os {
            op,
            source: io::Error::last_os_error(),
        }
    }

    /// Build from an explicit error code (e.g. the return value of `getpwuid_r`).
    pub fn from_raw(op: &'static str, code: i32) -> Self {
        FsError::Os {
            op,
            source: io::Error::from_raw_os_error(code),
        }
    }

    /// The `io::ErrorKind` of an OS failure, if this is one.
    pub fn kind(&self) -> Option<io::ErrorKind> {
        match self {
            FsError::Os { source, .. } => Some(source.kind()),
            _ => None,
        }
    }

    pub fn is_unsupported(&self) -> bool {
        matches!(self, FsError::Unsupported { .. })
    }
}

impl From<AdapterError> for FsError {
    fn from(e: AdapterError) -> Self {
        match e {
            AdapterError::InteriorNul { offset } => FsError::InteriorNul { offset },
            other => FsError::Os {
                op: "marshal",
                source: io::Error::new(io::ErrorKind::InvalidInput, other),
            },
        }
    }
}

/// Result type for provider operations.
pub type FsResult<T> = Result<T, FsError>;
