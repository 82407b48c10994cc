//! # Storage Module
//!
//! The backing-store side of the brigade: the interface a bucket consumes to
//! read or map its source, the concrete file implementation, and the
//! reference-counted handle split siblings share.
//!
//! ## Architecture Overview
//!
//! ```text
//! File bucket ──┐
//! File bucket ──┼──> SharedRef ──> Box<dyn BackingStore> ──> FileStore
//! File bucket ──┘    (Rc count)                               (File + cursor)
//!                                                                 │
//!                                          map(offset, len) ──────┘
//!                                                 │
//!                                                 v
//! Mmap bucket ──> MappedView ──> Rc<MappedRegion> (memmap2::Mmap)
//! ```
//!
//! ## The BackingStore Contract
//!
//! - `position()` reports the cursor; a read seeks only when the bucket's
//!   offset differs from it.
//! - `read(buf, mode)` fills as much of `buf` as it can. Returning fewer bytes
//!   than asked means end-of-stream; a store that can return short reads
//!   mid-stream must loop internally. In `NonBlocking` mode a store that would
//!   stall returns `io::ErrorKind::WouldBlock`.
//! - `scope()` names the scope heap blocks read from this store are charged to.
//! - `supports_mapping()` / `map()` expose zero-copy mapping. A mapping error
//!   is never fatal: the bucket falls back to a buffered read.
//!
//! ## Safety Model
//!
//! A mapped region stays valid for as long as any [`MappedView`] of it is
//! alive, independent of the store that produced it, since `memmap2` keeps its
//! own reference to the mapping. Views hand out `&[u8]` borrowed from the
//! bucket, so the borrow checker prevents reading a view after the bucket
//! holding it was mutated or destroyed.
//!
//! ## Thread Safety
//!
//! `SharedRef` uses `Rc` and `RefCell`; it is neither `Send` nor `Sync`. A
//! brigade and every bucket aliasing one store belong to one thread of control.
//! Cross-thread hand-off needs external serialization of the whole brigade.
//!
//! ## Module Organization
//!
//! - `file`: [`FileStore`], the `std::fs::File` backed store
//! - `mmap`: [`MappedRegion`] and [`MappedView`] over `memmap2`
//! - `shared`: [`SharedRef`], the acquire/release handle

use std::io;

use crate::error::ReadMode;
use crate::memory::Scope;

mod file;
mod mmap;
mod shared;

pub use file::FileStore;
pub use mmap::{MappedRegion, MappedView};
pub use shared::SharedRef;

/// An open source of bytes with a position cursor.
pub trait BackingStore {
    fn position(&self) -> u64;

    fn seek(&mut self, offset: u64) -> io::Result<()>;

    /// Reads up to `buf.len()` bytes at the cursor and advances it. Fewer bytes
    /// than requested means end-of-stream.
    fn read(&mut self, buf: &mut [u8], mode: ReadMode) -> io::Result<usize>;

    fn scope(&self) -> Scope;

    fn supports_mapping(&self) -> bool {
        false
    }

    fn map(&self, offset: u64, len: usize) -> io::Result<MappedRegion> {
        let _ = (offset, len);
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "store does not support memory mapping",
        ))
    }
}
