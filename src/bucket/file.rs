//! # File Bucket Materialization
//!
//! Turns an unread file range into bytes, following the policy decision:
//!
//! 1. `Map`: ask the store for a mapping of the whole range. On success the
//!    bucket becomes an mmap bucket and no remainder is produced. On failure
//!    fall through to step 2 with the fallback chunk.
//! 2. `Buffer`: seek only if the cursor is not already at the range start,
//!    then read up to `chunk` bytes into a heap block sized to what arrived.
//! 3. Whatever of the range was not read becomes the remainder, unless the
//!    read came up short, which ends the stream.
//!
//! ## Failure Ordering
//!
//! A zero `buffer_chunk_size` is refused before the store is touched; it
//! could never make progress on a non-empty range.
//!
//! The seek happens before any buffer is allocated, and the budget charge and
//! buffer are owned values, so every error return leaves nothing allocated and
//! nothing charged. Callers only mutate the bucket once this returns `Ok`.

use tracing::{debug, trace};

use super::policy::Strategy;
use super::Length;
use crate::config::BucketConfig;
use crate::error::{BucketError, ReadMode, ReadStatus, Result};
use crate::memory::HeapBlock;
use crate::storage::{MappedView, SharedRef};

#[derive(Debug)]
pub(crate) enum Materialized {
    Mapped(MappedView),
    Buffered {
        block: HeapBlock,
        status: ReadStatus,
        /// `(start, length)` of the range still unread.
        remainder: Option<(u64, Length)>,
    },
}

pub(crate) fn materialize(
    shared: &SharedRef,
    start: u64,
    length: Length,
    config: &BucketConfig,
    mode: ReadMode,
) -> Result<Materialized> {
    if config.buffer_chunk_size == 0 {
        return Err(BucketError::InvalidConfig {
            option: "buffer_chunk_size",
        });
    }

    shared.with_store(|store| -> Result<Materialized> {
        let strategy = Strategy::choose(config, length, store.supports_mapping());

        if let Strategy::Map { len } = strategy {
            match store.map(start, len) {
                Ok(region) => {
                    debug!(start, len, "mapped file range");
                    return Ok(Materialized::Mapped(region.into_view()));
                }
                Err(err) => {
                    debug!(start, len, error = %err, "mapping failed, falling back to buffered read");
                }
            }
        }

        let chunk = strategy.fallback_chunk(config);

        if length == Length::Known(0) {
            return Ok(Materialized::Buffered {
                block: HeapBlock::from_vec(Vec::new()),
                status: ReadStatus::Ready,
                remainder: None,
            });
        }

        if store.position() != start {
            store.seek(start).map_err(BucketError::Io)?;
        }

        let scope = store.scope();
        let block = HeapBlock::fill(&scope, chunk, |buf| store.read(buf, mode))?;

        let got = block.len() as u64;
        let short = block.len() < chunk;

        let remainder = if short {
            None
        } else {
            match length {
                Length::Known(len) => {
                    let rest = len - got;
                    (rest > 0).then_some((start + got, Length::Known(rest)))
                }
                Length::Unknown => Some((start + got, Length::Unknown)),
            }
        };

        debug!(start, chunk, got, short, "buffered file range");
        if let Some((next, rest)) = remainder {
            trace!(next, ?rest, "file range has a remainder");
        }

        Ok(Materialized::Buffered {
            block,
            status: if short {
                ReadStatus::EndOfStream
            } else {
                ReadStatus::Ready
            },
            remainder,
        })
    })
}
