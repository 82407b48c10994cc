//! # Materialization Policy
//!
//! Decides how an unread file range becomes readable bytes.
//!
//! ```text
//! length L, mapping available?
//!     │
//!     ├─ Unknown ─────────────────────────────> Buffer { chunk_size }
//!     │
//!     ├─ Known, mapping on, low <= L < high,
//!     │  L > 0, L fits usize ─────────────────> Map { L }
//!     │
//!     └─ Known otherwise ─────────────────────> Buffer { min(L, chunk_size) }
//! ```
//!
//! The decision is pure: no I/O, no allocation. A `Map` decision is only a
//! first attempt; the caller falls back to a buffered read of
//! [`Strategy::fallback_chunk`] bytes when the mapping fails.

use super::Length;
use crate::config::BucketConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Map the whole remaining range in one step.
    Map { len: usize },
    /// Copy at most `chunk` bytes into a heap block.
    Buffer { chunk: usize },
}

impl Strategy {
    pub fn choose(config: &BucketConfig, length: Length, mapping_available: bool) -> Self {
        let len = match length {
            Length::Unknown => {
                return Strategy::Buffer {
                    chunk: config.buffer_chunk_size,
                }
            }
            Length::Known(len) => len,
        };

        let in_window = len >= config.mmap_low_threshold && len < config.mmap_high_limit;

        if mapping_available && config.mmap_enabled && in_window && len > 0 {
            if let Ok(len) = usize::try_from(len) {
                return Strategy::Map { len };
            }
        }

        Strategy::Buffer {
            chunk: buffered_chunk(config, len),
        }
    }

    /// Chunk to read when a `Map` attempt fails.
    pub fn fallback_chunk(&self, config: &BucketConfig) -> usize {
        match *self {
            Strategy::Map { len } => buffered_chunk(config, len as u64),
            Strategy::Buffer { chunk } => chunk,
        }
    }

    pub fn is_map(&self) -> bool {
        matches!(self, Strategy::Map { .. })
    }
}

fn buffered_chunk(config: &BucketConfig, len: u64) -> usize {
    // min() with a usize keeps the result in range even when len > usize::MAX
    len.min(config.buffer_chunk_size as u64) as usize
}
