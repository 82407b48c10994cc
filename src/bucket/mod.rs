//! # Buckets
//!
//! A bucket describes one contiguous span `[start, start + length)` of a byte
//! stream plus the kind of storage behind it. The kind decides how the five
//! bucket operations behave:
//!
//! | Operation  | `File` (unread)                 | `Heap`                  | `Mmap`               |
//! |------------|---------------------------------|-------------------------|----------------------|
//! | `read`     | materializes, may add remainder | held bytes              | held view            |
//! | `destroy`  | releases the store alias        | drops the block alias   | drops the view alias |
//! | `setaside` | `NotSupported`                  | copies into other scope | no-op                |
//! | `split`    | both halves alias the store     | both halves alias block | both alias region    |
//! | `copy`     | acquires the store              | aliases the block       | aliases the region   |
//!
//! ## State Machine
//!
//! ```text
//!            read (in mapping window)
//!   File ──────────────────────────────> Mmap ──┐
//!     │                                          │
//!     │ read (buffered)                          │ destroy
//!     └──────────────────────────────> Heap ─────┤
//!     │                                          v
//!     └──────────── destroy ──────────────> (dropped)
//! ```
//!
//! `Heap` and `Mmap` are terminal: reading them again returns the same view.
//! Materialization replaces the kind inside the same `Bucket` value, so a
//! bucket stored in a brigade node keeps its identity and position.
//!
//! ## Offsets
//!
//! `start` is always the offset in the logical source, also after
//! materialization, and `split` takes an absolute source offset. Heap buckets
//! built from caller bytes start at 0.

mod file;
mod policy;

pub use policy::Strategy;

use tracing::trace;

use crate::config::BucketConfig;
use crate::error::{BucketError, ReadMode, ReadStatus, Result};
use crate::memory::{HeapBlock, Scope};
use crate::storage::{BackingStore, MappedView, SharedRef};

/// Number of bytes a bucket still represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Length {
    Known(u64),
    /// Read until end-of-stream.
    Unknown,
}

impl Length {
    pub fn known(self) -> Option<u64> {
        match self {
            Length::Known(len) => Some(len),
            Length::Unknown => None,
        }
    }

    pub fn is_unknown(self) -> bool {
        matches!(self, Length::Unknown)
    }
}

impl From<u64> for Length {
    fn from(len: u64) -> Self {
        Length::Known(len)
    }
}

#[derive(Debug)]
pub enum BucketKind {
    /// An unread range of a shared backing store.
    File(SharedRef),
    /// Bytes copied into a heap block.
    Heap(HeapBlock),
    /// A zero-copy window into a mapped region.
    Mmap(MappedView),
}

impl BucketKind {
    pub fn name(&self) -> &'static str {
        match self {
            BucketKind::File(_) => "FILE",
            BucketKind::Heap(_) => "HEAP",
            BucketKind::Mmap(_) => "MMAP",
        }
    }
}

/// Result of reading a detached bucket.
#[derive(Debug)]
pub struct BucketRead<'a> {
    pub data: &'a [u8],
    pub status: ReadStatus,
    /// Unread rest of the range, to be placed right after the bucket.
    pub remainder: Option<Bucket>,
}

#[derive(Debug)]
pub struct Bucket {
    start: u64,
    length: Length,
    kind: BucketKind,
}

impl Bucket {
    /// Creates a file bucket over `[offset, offset + length)` of a store it
    /// takes sole ownership of.
    pub fn file<S: BackingStore + 'static>(
        store: S,
        offset: u64,
        length: impl Into<Length>,
    ) -> Result<Self> {
        Self::from_shared(SharedRef::new(store), offset, length)
    }

    /// Creates a file bucket holding one alias of `shared`.
    pub fn from_shared(shared: SharedRef, offset: u64, length: impl Into<Length>) -> Result<Self> {
        let length = length.into();
        check_range(offset, length)?;

        Ok(Self {
            start: offset,
            length,
            kind: BucketKind::File(shared),
        })
    }

    /// Creates a heap bucket over caller-owned bytes.
    pub fn heap(bytes: Vec<u8>) -> Self {
        let block = HeapBlock::from_vec(bytes);
        Self {
            start: 0,
            length: Length::Known(block.len() as u64),
            kind: BucketKind::Heap(block),
        }
    }

    /// Creates a heap bucket holding a copy of `data` charged to `scope`.
    pub fn heap_in(scope: &Scope, data: &[u8]) -> Result<Self> {
        let block = HeapBlock::copy_in(scope, data)?;
        Ok(Self {
            start: 0,
            length: Length::Known(block.len() as u64),
            kind: BucketKind::Heap(block),
        })
    }

    pub fn mmap(view: MappedView) -> Self {
        Self {
            start: view.file_offset(),
            length: Length::Known(view.len() as u64),
            kind: BucketKind::Mmap(view),
        }
    }

    /// Re-initialises this bucket in place as a file bucket. The previous
    /// kind's resources are released.
    pub fn make_file(
        &mut self,
        shared: SharedRef,
        offset: u64,
        length: impl Into<Length>,
    ) -> Result<()> {
        *self = Self::from_shared(shared, offset, length)?;
        Ok(())
    }

    pub fn start(&self) -> u64 {
        self.start
    }

    pub fn length(&self) -> Length {
        self.length
    }

    pub fn kind(&self) -> &BucketKind {
        &self.kind
    }

    pub fn kind_name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn is_materialized(&self) -> bool {
        !matches!(self.kind, BucketKind::File(_))
    }

    /// The readable bytes of a materialized bucket, `None` for an unread file
    /// range.
    pub fn view(&self) -> Option<&[u8]> {
        match &self.kind {
            BucketKind::File(_) => None,
            BucketKind::Heap(block) => Some(block.as_slice()),
            BucketKind::Mmap(view) => Some(view.as_slice()),
        }
    }

    /// Reads the bucket, materializing it first if needed.
    ///
    /// A detached bucket hands the unread rest of its range back to the caller
    /// as `remainder`; [`Brigade::read`](crate::Brigade::read) inserts it into
    /// the chain instead.
    pub fn read(&mut self, config: &BucketConfig, mode: ReadMode) -> Result<BucketRead<'_>> {
        let (status, remainder) = self.materialize(config, mode)?;

        Ok(BucketRead {
            data: self.view().unwrap_or_default(),
            status,
            remainder,
        })
    }

    /// Turns a file bucket into a heap or mmap bucket in place. On error the
    /// bucket is unchanged.
    pub(crate) fn materialize(
        &mut self,
        config: &BucketConfig,
        mode: ReadMode,
    ) -> Result<(ReadStatus, Option<Bucket>)> {
        let shared = match &self.kind {
            BucketKind::File(shared) => shared,
            _ => return Ok((ReadStatus::Ready, None)),
        };

        match file::materialize(shared, self.start, self.length, config, mode)? {
            file::Materialized::Mapped(view) => {
                self.length = Length::Known(view.len() as u64);
                self.kind = BucketKind::Mmap(view);
                Ok((ReadStatus::Ready, None))
            }
            file::Materialized::Buffered {
                block,
                status,
                remainder,
            } => {
                let remainder = remainder.map(|(start, length)| Bucket {
                    start,
                    length,
                    kind: BucketKind::File(shared.acquire()),
                });

                self.length = Length::Known(block.len() as u64);
                self.kind = BucketKind::Heap(block);
                Ok((status, remainder))
            }
        }
    }

    /// Releases the bucket's resources.
    pub fn destroy(self) {
        trace!(kind = self.kind_name(), start = self.start, "destroying bucket");
        drop(self);
    }

    /// Makes the bucket independent of the scope its data was allocated in.
    ///
    /// Unread file buckets cannot be set aside and report `NotSupported`
    /// without being modified.
    pub fn setaside(&mut self, target: &Scope) -> Result<()> {
        match &mut self.kind {
            BucketKind::File(_) => Err(BucketError::NotSupported {
                operation: "setaside",
                kind: "FILE",
            }),
            BucketKind::Heap(block) => {
                let foreign = match block.scope() {
                    Some(scope) => !scope.same_as(target),
                    None => false,
                };

                if foreign {
                    *block = HeapBlock::copy_in(target, block.as_slice())?;
                }
                Ok(())
            }
            BucketKind::Mmap(_) => Ok(()),
        }
    }

    /// Splits at absolute source offset `at`: `self` keeps `[start, at)` and
    /// the returned bucket covers `[at, start + length)`.
    pub fn split(&mut self, at: u64) -> Result<Bucket> {
        let len = match self.length {
            Length::Known(len) => len,
            Length::Unknown => return Err(BucketError::UnknownLength { operation: "split" }),
        };

        if at < self.start || at - self.start > len {
            return Err(BucketError::InvalidRange {
                start: self.start,
                length: len,
                at,
            });
        }

        let point = at - self.start;
        let tail_kind = match &mut self.kind {
            BucketKind::File(shared) => BucketKind::File(shared.acquire()),
            BucketKind::Heap(block) => BucketKind::Heap(block.split_off(point as usize)),
            BucketKind::Mmap(view) => BucketKind::Mmap(view.split_off(point as usize)),
        };

        trace!(kind = self.kind_name(), start = self.start, at, "split bucket");

        self.length = Length::Known(point);
        Ok(Bucket {
            start: at,
            length: Length::Known(len - point),
            kind: tail_kind,
        })
    }

    /// Creates a second bucket over the same data without copying bytes.
    pub fn copy(&self) -> Bucket {
        let kind = match &self.kind {
            BucketKind::File(shared) => BucketKind::File(shared.acquire()),
            BucketKind::Heap(block) => BucketKind::Heap(block.clone()),
            BucketKind::Mmap(view) => BucketKind::Mmap(view.clone()),
        };

        Bucket {
            start: self.start,
            length: self.length,
            kind,
        }
    }
}

fn check_range(offset: u64, length: Length) -> Result<()> {
    if let Length::Known(len) = length {
        if offset.checked_add(len).is_none() {
            return Err(BucketError::InvalidRange {
                start: offset,
                length: len,
                at: offset,
            });
        }
    }
    Ok(())
}
