//! # Brigade Configuration Constants
//!
//! Default values for the materialization policy, grouped with the values they
//! depend on.
//!
//! ## Dependency Graph
//!
//! ```text
//! DEFAULT_MMAP_LOW_THRESHOLD (1 byte)
//!       │
//!       └─> DEFAULT_MMAP_HIGH_LIMIT (4 MiB, must be >)
//!             A file range of length L is mapped only when
//!             LOW <= L < HIGH. With HIGH <= LOW nothing is ever mapped.
//!
//! DEFAULT_BUFFER_CHUNK_SIZE (8000 bytes)
//!       │
//!       └─> Upper bound of one buffered materialization. A range larger
//!           than this is split into a heap head plus a file remainder.
//! ```
//!
//! ## Critical Invariants
//!
//! Enforced by compile-time assertions:
//!
//! 1. `DEFAULT_MMAP_LOW_THRESHOLD >= 1` (an empty range is never mapped)
//! 2. `DEFAULT_MMAP_LOW_THRESHOLD < DEFAULT_MMAP_HIGH_LIMIT`
//! 3. `DEFAULT_BUFFER_CHUNK_SIZE > 0` (buffered reads always progress)
//!
//! ## Platform Tuning
//!
//! The historical values came from systems where `mmap()` plus `munmap()` cost
//! more than a copy for small files, so some deployments raised the low
//! threshold to 8 KiB. These are defaults only; override them through
//! [`BucketConfig`](super::BucketConfig).

// ============================================================================
// MAPPING WINDOW
// Ranges inside [LOW, HIGH) are candidates for a single zero-copy mapping
// ============================================================================

/// Smallest range length (bytes) that is memory-mapped instead of copied.
pub const DEFAULT_MMAP_LOW_THRESHOLD: u64 = 1;

/// Range length (bytes) at and above which mapping is never attempted.
/// Large files are streamed through heap chunks instead of one huge mapping.
pub const DEFAULT_MMAP_HIGH_LIMIT: u64 = 4 * 1024 * 1024;

/// Whether mapping is attempted at all when the store supports it.
pub const DEFAULT_MMAP_ENABLED: bool = true;

const _: () = assert!(
    DEFAULT_MMAP_LOW_THRESHOLD >= 1,
    "DEFAULT_MMAP_LOW_THRESHOLD must be at least 1; empty ranges cannot be mapped"
);

const _: () = assert!(
    DEFAULT_MMAP_LOW_THRESHOLD < DEFAULT_MMAP_HIGH_LIMIT,
    "DEFAULT_MMAP_LOW_THRESHOLD must be below DEFAULT_MMAP_HIGH_LIMIT or mapping is dead"
);

// ============================================================================
// BUFFERED READS
// ============================================================================

/// Maximum bytes copied into one heap bucket by a single buffered read.
pub const DEFAULT_BUFFER_CHUNK_SIZE: usize = 8000;

const _: () = assert!(
    DEFAULT_BUFFER_CHUNK_SIZE > 0,
    "DEFAULT_BUFFER_CHUNK_SIZE must be non-zero"
);

// ============================================================================
// VECTORED OUTPUT
// ============================================================================

/// Inline capacity of the `SmallVec` returned by `Brigade::to_io_slices`.
/// Matches a typical `IOV_MAX`-friendly batch; longer batches spill to heap.
pub const IO_SLICE_INLINE: usize = 16;
