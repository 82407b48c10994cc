//! Reference-counted heap blocks.
//!
//! A [`HeapBlock`] is a view `[offset, offset + len)` into an immutable byte
//! block. Splitting and copying produce more views of the same block; the
//! bytes and their budget charge are freed when the last view drops.

use std::fmt;
use std::io;
use std::rc::Rc;

use super::scope::{Charge, Scope};
use crate::error::{BucketError, Result};

#[derive(Clone)]
pub struct HeapBlock {
    inner: Rc<BlockInner>,
    offset: usize,
    len: usize,
}

struct BlockInner {
    bytes: Box<[u8]>,
    scope: Option<Scope>,
    _charge: Option<Charge>,
}

impl HeapBlock {
    /// Wraps caller-owned bytes. The block belongs to no scope and is not
    /// charged to any budget.
    pub fn from_vec(bytes: Vec<u8>) -> Self {
        let len = bytes.len();
        Self {
            inner: Rc::new(BlockInner {
                bytes: bytes.into_boxed_slice(),
                scope: None,
                _charge: None,
            }),
            offset: 0,
            len,
        }
    }

    /// Copies `data` into a new block charged to `scope`.
    pub fn copy_in(scope: &Scope, data: &[u8]) -> Result<Self> {
        Self::fill(scope, data.len(), |buf| {
            buf.copy_from_slice(data);
            Ok(buf.len())
        })
    }

    /// Allocates `capacity` bytes in `scope`, lets `fill` write into them and
    /// keeps exactly the bytes it reports. Nothing stays allocated or charged
    /// if `fill` fails.
    pub(crate) fn fill<F>(scope: &Scope, capacity: usize, fill: F) -> Result<Self>
    where
        F: FnOnce(&mut [u8]) -> io::Result<usize>,
    {
        let mut charge = scope.charge(capacity)?;

        let mut buf = Vec::new();
        buf.try_reserve_exact(capacity)
            .map_err(|_| BucketError::OutOfMemory {
                requested: capacity,
                available: 0,
            })?;
        buf.resize(capacity, 0);

        let got = fill(&mut buf).map_err(BucketError::from_read)?;
        debug_assert!(got <= capacity, "fill reported more bytes than the buffer holds");
        let got = got.min(capacity);

        buf.truncate(got);
        charge.shrink_to(got);

        Ok(Self {
            inner: Rc::new(BlockInner {
                bytes: buf.into_boxed_slice(),
                scope: Some(scope.clone()),
                _charge: Some(charge),
            }),
            offset: 0,
            len: got,
        })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.inner.bytes[self.offset..self.offset + self.len]
    }

    /// The scope the block was allocated in, `None` for caller-owned bytes.
    pub fn scope(&self) -> Option<&Scope> {
        self.inner.scope.as_ref()
    }

    /// Number of views sharing the underlying block.
    pub fn aliases(&self) -> usize {
        Rc::strong_count(&self.inner)
    }

    /// Keeps `[0, at)` in `self` and returns a view of `[at, len)`.
    pub(crate) fn split_off(&mut self, at: usize) -> HeapBlock {
        debug_assert!(at <= self.len);
        let tail = HeapBlock {
            inner: Rc::clone(&self.inner),
            offset: self.offset + at,
            len: self.len - at,
        };
        self.len = at;
        tail
    }
}

impl fmt::Debug for HeapBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeapBlock")
            .field("offset", &self.offset)
            .field("len", &self.len)
            .field("aliases", &self.aliases())
            .finish()
    }
}
