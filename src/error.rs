//! # Bucket Errors and Read Status
//!
//! Core bucket operations return [`BucketError`] rather than `eyre::Report` so
//! callers can branch on the outcome: `NotSupported` and `WouldBlock` are
//! ordinary control flow, `Io` means the bucket should be destroyed. The type
//! implements `std::error::Error`, so `?` lifts it into `eyre::Result` at the
//! edges of an application.
//!
//! End-of-stream is deliberately not an error. A short read still produces a
//! materialized bucket and is reported through [`ReadStatus::EndOfStream`].

use std::fmt;
use std::io;

use crate::memory::MemoryError;

/// Outcome of a successful read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadStatus {
    /// The view holds every byte that was asked for.
    Ready,
    /// The source ended early; the view holds whatever was obtained (possibly
    /// nothing) and no remainder follows.
    EndOfStream,
}

impl ReadStatus {
    pub fn is_eof(&self) -> bool {
        matches!(self, ReadStatus::EndOfStream)
    }
}

/// Whether a read may park the calling thread on I/O.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadMode {
    #[default]
    Blocking,
    NonBlocking,
}

#[derive(Debug)]
pub enum BucketError {
    /// Seek or read on the backing store failed. The bucket is unchanged.
    Io(io::Error),
    /// A non-blocking read would have stalled. The bucket is unchanged and the
    /// read may be retried.
    WouldBlock,
    /// The buffer for a materialization could not be obtained.
    OutOfMemory { requested: usize, available: usize },
    /// The bucket kind does not implement the operation.
    NotSupported {
        operation: &'static str,
        kind: &'static str,
    },
    /// A range or split point lies outside what the bucket covers.
    InvalidRange { start: u64, length: u64, at: u64 },
    /// The operation needs a known length but the bucket reads to end-of-stream.
    UnknownLength { operation: &'static str },
    /// The handle no longer refers to a live bucket of this brigade.
    StaleBucket,
    /// A configuration value makes the operation unable to progress.
    InvalidConfig { option: &'static str },
}

impl BucketError {
    pub fn is_not_supported(&self) -> bool {
        matches!(self, BucketError::NotSupported { .. })
    }

    pub fn is_would_block(&self) -> bool {
        matches!(self, BucketError::WouldBlock)
    }

    pub(crate) fn from_read(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::WouldBlock {
            BucketError::WouldBlock
        } else {
            BucketError::Io(err)
        }
    }
}

impl fmt::Display for BucketError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BucketError::Io(err) => write!(f, "backing store I/O failed: {}", err),
            BucketError::WouldBlock => write!(f, "read would block"),
            BucketError::OutOfMemory {
                requested,
                available,
            } => write!(
                f,
                "out of memory: requested {} bytes but only {} available",
                requested, available
            ),
            BucketError::NotSupported { operation, kind } => {
                write!(f, "{} is not supported by {} buckets", operation, kind)
            }
            BucketError::InvalidRange { start, length, at } => write!(
                f,
                "offset {} outside bucket range [{}, {})",
                at,
                start,
                start.saturating_add(*length)
            ),
            BucketError::UnknownLength { operation } => {
                write!(f, "{} requires a bucket of known length", operation)
            }
            BucketError::StaleBucket => write!(f, "bucket handle does not refer to a live bucket"),
            BucketError::InvalidConfig { option } => {
                write!(f, "invalid configuration: {} must be non-zero", option)
            }
        }
    }
}

impl std::error::Error for BucketError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BucketError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<MemoryError> for BucketError {
    fn from(err: MemoryError) -> Self {
        BucketError::OutOfMemory {
            requested: err.requested,
            available: err.available,
        }
    }
}

pub type Result<T, E = BucketError> = std::result::Result<T, E>;
