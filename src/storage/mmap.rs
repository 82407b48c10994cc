//! # Memory-Mapped Views
//!
//! This module implements `MappedRegion`, a read-only mapping of one file
//! range, and `MappedView`, the window into it that an mmap bucket holds.
//!
//! ## Design Philosophy
//!
//! A buffered read copies file data from the kernel page cache into a heap
//! block. Mapping the range instead hands out slices that point straight into
//! the page cache, so a bucket in the mapping window costs no copy and no
//! heap memory. The price is the `mmap()`/`munmap()` pair and page-fault
//! latency, which is why only ranges inside the configured window are mapped.
//!
//! ## Lifetime
//!
//! The region is reference counted. Splitting or copying an mmap bucket clones
//! the `Rc`, and the mapping is unmapped when the last view drops. The file
//! handle that produced the mapping may be closed earlier; the mapping keeps
//! the pages reachable on every platform `memmap2` supports.
//!
//! ## Offsets
//!
//! `memmap2` aligns the requested offset down to the page size internally and
//! exposes only `[offset, offset + len)`, so regions may start anywhere.
//!
//! ## Platform Behavior
//!
//! ### Linux/macOS
//! - Uses `mmap()` with `PROT_READ` and `MAP_SHARED`
//! - `madvise(MADV_SEQUENTIAL)` is issued after mapping since buckets are
//!   consumed front to back
//!
//! ### Windows
//! - Uses `CreateFileMapping` / `MapViewOfFile`; no access hint is given

use std::fmt;
use std::fs::File;
use std::io;
use std::rc::Rc;

use memmap2::{Mmap, MmapOptions};

pub struct MappedRegion {
    mmap: Mmap,
    file_offset: u64,
}

impl MappedRegion {
    /// Maps `[offset, offset + len)` of `file` read-only.
    ///
    /// The caller must make sure the file is at least `offset + len` bytes
    /// long; touching a mapped page past end-of-file raises `SIGBUS`.
    pub fn map(file: &File, offset: u64, len: usize) -> io::Result<Self> {
        if len == 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "cannot map an empty range",
            ));
        }

        // SAFETY: Mmap::map is unsafe because the file may be modified or
        // truncated by another process while mapped. This is acceptable because:
        // 1. The mapping is read-only; we never write through it
        // 2. The caller (FileStore::map) checks the file covers offset + len
        // 3. Buckets serve file content that is not rewritten while in flight,
        //    the same contract a buffered read relies on
        // 4. All access goes through MappedView::as_slice which bounds-checks
        let mmap = unsafe { MmapOptions::new().offset(offset).len(len).map(file)? };

        #[cfg(unix)]
        {
            // Advisory only; a refused hint changes nothing observable.
            let _ = mmap.advise(memmap2::Advice::Sequential);
        }

        Ok(Self {
            mmap,
            file_offset: offset,
        })
    }

    pub fn len(&self) -> usize {
        self.mmap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mmap.is_empty()
    }

    pub fn file_offset(&self) -> u64 {
        self.file_offset
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.mmap
    }

    /// Turns the region into a view covering all of it.
    pub fn into_view(self) -> MappedView {
        let len = self.len();
        MappedView {
            region: Rc::new(self),
            offset: 0,
            len,
        }
    }
}

impl fmt::Debug for MappedRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MappedRegion")
            .field("file_offset", &self.file_offset)
            .field("len", &self.mmap.len())
            .finish()
    }
}

/// A window `[offset, offset + len)` into a shared [`MappedRegion`].
#[derive(Clone)]
pub struct MappedView {
    region: Rc<MappedRegion>,
    offset: usize,
    len: usize,
}

impl MappedView {
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.region.as_slice()[self.offset..self.offset + self.len]
    }

    pub fn region(&self) -> &MappedRegion {
        &self.region
    }

    /// Source offset of the first byte of the view.
    pub fn file_offset(&self) -> u64 {
        self.region.file_offset + self.offset as u64
    }

    /// Number of views sharing the mapping.
    pub fn aliases(&self) -> usize {
        Rc::strong_count(&self.region)
    }

    /// Keeps `[0, at)` in `self` and returns a view of `[at, len)`.
    pub(crate) fn split_off(&mut self, at: usize) -> MappedView {
        debug_assert!(at <= self.len);
        let tail = MappedView {
            region: Rc::clone(&self.region),
            offset: self.offset + at,
            len: self.len - at,
        };
        self.len = at;
        tail
    }
}

impl fmt::Debug for MappedView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MappedView")
            .field("file_offset", &self.region.file_offset)
            .field("offset", &self.offset)
            .field("len", &self.len)
            .finish()
    }
}
