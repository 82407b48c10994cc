//! # Brigade
//!
//! A brigade is an ordered chain of buckets that together form one byte
//! stream. Chain order is stream order.
//!
//! ## Storage Layout
//!
//! Buckets live by value in an arena of slots linked into a doubly linked
//! list. Handles are generational indices, so a handle to a removed bucket is
//! detected instead of aliasing whatever reuses its slot.
//!
//! ```text
//!   head                                              tail
//!    │                                                  │
//!    v                                                  v
//! ┌───────┐ next ┌───────┐ next ┌───────┐ next ┌───────────┐
//! │ slot 3│─────>│ slot 0│─────>│ slot 5│─────>│  slot 1   │
//! │ HEAP  │<─────│ MMAP  │<─────│ HEAP  │<─────│ FILE      │
//! └───────┘ prev └───────┘ prev └───────┘ prev └───────────┘
//!
//! free list: [2, 4]   (generation bumped on every removal)
//! ```
//!
//! Insertion and removal relink neighbours in O(1) and never move another
//! bucket's payload.
//!
//! ## Reading
//!
//! [`Brigade::read`] materializes a file bucket in its own slot, so the handle
//! the caller holds keeps denoting the materialized head span. If the file
//! range was larger than one chunk, the unread rest is inserted as a new file
//! bucket directly after it:
//!
//! ```text
//! before:  [FILE 0..20000] ─> [HEAP "trailer"]
//! after:   [HEAP 0..8000] ─> [FILE 8000..20000] ─> [HEAP "trailer"]
//! ```
//!
//! ## Thread Safety
//!
//! A brigade is single-threaded: buckets alias their stores through `Rc`, so
//! `Brigade` is neither `Send` nor `Sync`.

use std::fmt;
use std::io::IoSlice;

use smallvec::SmallVec;
use tracing::trace;

use crate::bucket::{Bucket, Length};
use crate::config::{BucketConfig, IO_SLICE_INLINE};
use crate::error::{BucketError, ReadMode, ReadStatus, Result};
use crate::memory::Scope;
use crate::storage::SharedRef;

/// Handle to a bucket inside a [`Brigade`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BucketId {
    index: u32,
    generation: u32,
}

struct Node {
    bucket: Bucket,
    prev: Option<BucketId>,
    next: Option<BucketId>,
}

struct Slot {
    generation: u32,
    node: Option<Node>,
}

pub struct Brigade {
    slots: Vec<Slot>,
    free: Vec<u32>,
    head: Option<BucketId>,
    tail: Option<BucketId>,
    len: usize,
    config: BucketConfig,
}

impl Brigade {
    pub fn new() -> Self {
        Self::from_valid_config(BucketConfig::default())
    }

    pub fn with_config(config: BucketConfig) -> eyre::Result<Self> {
        config.validate()?;
        Ok(Self::from_valid_config(config))
    }

    fn from_valid_config(config: BucketConfig) -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            head: None,
            tail: None,
            len: 0,
            config,
        }
    }

    pub fn config(&self) -> &BucketConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn first(&self) -> Option<BucketId> {
        self.head
    }

    pub fn last(&self) -> Option<BucketId> {
        self.tail
    }

    pub fn next(&self, id: BucketId) -> Result<Option<BucketId>> {
        Ok(self.node(id)?.next)
    }

    pub fn prev(&self, id: BucketId) -> Result<Option<BucketId>> {
        Ok(self.node(id)?.prev)
    }

    pub fn get(&self, id: BucketId) -> Option<&Bucket> {
        self.node(id).ok().map(|node| &node.bucket)
    }

    pub fn get_mut(&mut self, id: BucketId) -> Option<&mut Bucket> {
        self.node_mut(id).ok().map(|node| &mut node.bucket)
    }

    pub fn contains(&self, id: BucketId) -> bool {
        self.node(id).is_ok()
    }

    pub fn iter(&self) -> Iter<'_> {
        Iter {
            brigade: self,
            cursor: self.head,
        }
    }

    /// Total bytes the chain represents, `None` if any bucket reads to
    /// end-of-stream.
    pub fn byte_length(&self) -> Option<u64> {
        self.iter()
            .try_fold(0u64, |total, (_, bucket)| match bucket.length() {
                Length::Known(len) => Some(total.saturating_add(len)),
                Length::Unknown => None,
            })
    }

    pub fn push_back(&mut self, bucket: Bucket) -> BucketId {
        let id = self.alloc(Node {
            bucket,
            prev: self.tail,
            next: None,
        });

        match self.tail {
            Some(tail) => self.link_next(tail, Some(id)),
            None => self.head = Some(id),
        }
        self.tail = Some(id);
        self.len += 1;
        id
    }

    pub fn push_front(&mut self, bucket: Bucket) -> BucketId {
        let id = self.alloc(Node {
            bucket,
            prev: None,
            next: self.head,
        });

        match self.head {
            Some(head) => self.link_prev(head, Some(id)),
            None => self.tail = Some(id),
        }
        self.head = Some(id);
        self.len += 1;
        id
    }

    pub fn insert_after(&mut self, id: BucketId, bucket: Bucket) -> Result<BucketId> {
        let next = self.node(id)?.next;
        let new = self.alloc(Node {
            bucket,
            prev: Some(id),
            next,
        });

        self.link_next(id, Some(new));
        match next {
            Some(next) => self.link_prev(next, Some(new)),
            None => self.tail = Some(new),
        }
        self.len += 1;
        Ok(new)
    }

    pub fn insert_before(&mut self, id: BucketId, bucket: Bucket) -> Result<BucketId> {
        let prev = self.node(id)?.prev;
        let new = self.alloc(Node {
            bucket,
            prev,
            next: Some(id),
        });

        self.link_prev(id, Some(new));
        match prev {
            Some(prev) => self.link_next(prev, Some(new)),
            None => self.head = Some(new),
        }
        self.len += 1;
        Ok(new)
    }

    /// Unlinks a bucket and hands it back. The handle becomes stale.
    pub fn remove(&mut self, id: BucketId) -> Result<Bucket> {
        self.node(id)?;

        let slot = &mut self.slots[id.index as usize];
        let node = slot.node.take().ok_or(BucketError::StaleBucket)?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);

        match node.prev {
            Some(prev) => self.link_next(prev, node.next),
            None => self.head = node.next,
        }
        match node.next {
            Some(next) => self.link_prev(next, node.prev),
            None => self.tail = node.prev,
        }
        self.len -= 1;
        Ok(node.bucket)
    }

    pub fn destroy(&mut self, id: BucketId) -> Result<()> {
        self.remove(id)?.destroy();
        Ok(())
    }

    /// Destroys every bucket.
    pub fn clear(&mut self) {
        while let Some(head) = self.head {
            if self.destroy(head).is_err() {
                break;
            }
        }
    }

    /// Reads the bucket at `id`.
    ///
    /// An unread file bucket is materialized in place; any unread rest of its
    /// range is inserted right after it. On error the chain is unchanged.
    pub fn read(&mut self, id: BucketId, mode: ReadMode) -> Result<(&[u8], ReadStatus)> {
        let status = self.materialize(id, mode)?;
        let data = self.node(id)?.bucket.view().unwrap_or_default();
        Ok((data, status))
    }

    fn materialize(&mut self, id: BucketId, mode: ReadMode) -> Result<ReadStatus> {
        let config = self.config;
        let (status, remainder) = self.node_mut(id)?.bucket.materialize(&config, mode)?;

        if let Some(rest) = remainder {
            let (start, length) = (rest.start(), rest.length());
            self.insert_after(id, rest)?;
            trace!(start, ?length, "inserted file remainder");
        }
        Ok(status)
    }

    /// Splits the bucket at absolute source offset `at` and links the tail
    /// half right after it.
    pub fn split(&mut self, id: BucketId, at: u64) -> Result<BucketId> {
        let tail = self.node_mut(id)?.bucket.split(at)?;
        self.insert_after(id, tail)
    }

    /// Inserts an alias of the bucket right after it.
    pub fn copy(&mut self, id: BucketId) -> Result<BucketId> {
        let alias = self.node(id)?.bucket.copy();
        self.insert_after(id, alias)
    }

    pub fn setaside(&mut self, id: BucketId, scope: &Scope) -> Result<()> {
        self.node_mut(id)?.bucket.setaside(scope)
    }

    /// Re-initialises the bucket at `id` as a file bucket, keeping its
    /// position in the chain.
    pub fn make_file(
        &mut self,
        id: BucketId,
        shared: SharedRef,
        offset: u64,
        length: impl Into<Length>,
    ) -> Result<()> {
        self.node_mut(id)?.bucket.make_file(shared, offset, length)
    }

    /// Makes a bucket boundary fall at stream offset `offset`, counted from the
    /// start of the chain, and returns the first bucket at or after it.
    ///
    /// Buckets of unknown length before the boundary are read to learn their
    /// size. Returns `None` when `offset` is exactly the end of the stream.
    pub fn partition(&mut self, offset: u64) -> Result<Option<BucketId>> {
        let mut consumed = 0u64;
        let mut cursor = self.head;

        while let Some(id) = cursor {
            if consumed == offset {
                return Ok(Some(id));
            }

            if self.node(id)?.bucket.length().is_unknown() {
                self.materialize(id, ReadMode::Blocking)?;
            }

            let bucket = &self.node(id)?.bucket;
            let len = bucket.length().known().unwrap_or(0);
            if offset - consumed < len {
                let at = bucket.start() + (offset - consumed);
                return self.split(id, at).map(Some);
            }

            consumed += len;
            cursor = self.node(id)?.next;
        }

        if consumed == offset {
            Ok(None)
        } else {
            Err(BucketError::InvalidRange {
                start: 0,
                length: consumed,
                at: offset,
            })
        }
    }

    /// Moves `id` and every bucket after it into a new brigade with the same
    /// configuration. Handles of moved buckets become stale.
    pub fn split_off(&mut self, id: BucketId) -> Result<Brigade> {
        self.node(id)?;

        let mut rest = Brigade::from_valid_config(self.config);
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            cursor = self.node(current)?.next;
            rest.push_back(self.remove(current)?);
        }
        Ok(rest)
    }

    /// Reads buckets in chain order and copies up to `max` bytes into one
    /// buffer.
    pub fn flatten(&mut self, max: usize) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        let mut cursor = self.head;

        while let Some(id) = cursor {
            if out.len() >= max {
                break;
            }
            let (data, _) = self.read(id, ReadMode::Blocking)?;
            let take = data.len().min(max - out.len());
            out.extend_from_slice(&data[..take]);
            cursor = self.node(id)?.next;
        }
        Ok(out)
    }

    /// Materializes the first `max` buckets and returns their non-empty views
    /// for a vectored write.
    pub fn to_io_slices(&mut self, max: usize) -> Result<SmallVec<[IoSlice<'_>; IO_SLICE_INLINE]>> {
        let mut ids: SmallVec<[BucketId; IO_SLICE_INLINE]> = SmallVec::new();
        let mut cursor = self.head;

        while let Some(id) = cursor {
            if ids.len() >= max {
                break;
            }
            self.materialize(id, ReadMode::Blocking)?;
            ids.push(id);
            cursor = self.node(id)?.next;
        }

        let mut slices = SmallVec::new();
        for id in ids {
            let data = self.node(id)?.bucket.view().unwrap_or_default();
            if !data.is_empty() {
                slices.push(IoSlice::new(data));
            }
        }
        Ok(slices)
    }

    fn node(&self, id: BucketId) -> Result<&Node> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
            .ok_or(BucketError::StaleBucket)
    }

    fn node_mut(&mut self, id: BucketId) -> Result<&mut Node> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_mut())
            .ok_or(BucketError::StaleBucket)
    }

    fn alloc(&mut self, node: Node) -> BucketId {
        match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.node = Some(node);
                BucketId {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot {
                    generation: 0,
                    node: Some(node),
                });
                BucketId {
                    index,
                    generation: 0,
                }
            }
        }
    }

    // Links are only ever set on live nodes; a stale link target is ignored.
    fn link_next(&mut self, id: BucketId, next: Option<BucketId>) {
        if let Ok(node) = self.node_mut(id) {
            node.next = next;
        }
    }

    fn link_prev(&mut self, id: BucketId, prev: Option<BucketId>) {
        if let Ok(node) = self.node_mut(id) {
            node.prev = prev;
        }
    }
}

impl Default for Brigade {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Brigade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.iter().map(|(_, bucket)| {
                (bucket.kind_name(), bucket.start(), bucket.length())
            }))
            .finish()
    }
}

pub struct Iter<'a> {
    brigade: &'a Brigade,
    cursor: Option<BucketId>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = (BucketId, &'a Bucket);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.cursor?;
        let node = self.brigade.node(id).ok()?;
        self.cursor = node.next;
        Some((id, &node.bucket))
    }
}

impl<'a> IntoIterator for &'a Brigade {
    type Item = (BucketId, &'a Bucket);
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
