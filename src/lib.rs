//! # brigade - Lazily Materialized Bucket Brigades
//!
//! A bucket brigade is an ordered chain of buckets that together form one byte
//! stream. Producers append cheap descriptions of data ("bytes 0..2 GiB of this
//! file"); consumers pull buckets from the head and read them. Nothing is read
//! from disk until a consumer asks for it:
//!
//! - **Zero-copy where it pays**: file ranges inside a configurable size window
//!   are memory-mapped instead of copied
//! - **Bounded memory otherwise**: other ranges are read one chunk at a time,
//!   the unread rest staying a lazy file bucket
//! - **No implicit copying**: splitting, copying and reordering buckets only
//!   shares reference-counted data
//!
//! ## Quick Start
//!
//! ```ignore
//! use brigade::{Brigade, Bucket, FileStore, ReadMode};
//!
//! let store = FileStore::open("./large.bin")?;
//! let mut brigade = Brigade::new();
//! brigade.push_back(Bucket::file(store, 0, 20_000_000)?);
//!
//! while let Some(id) = brigade.first() {
//!     let (data, status) = brigade.read(id, ReadMode::Blocking)?;
//!     sink.write_all(data)?;
//!     brigade.destroy(id)?;
//!     if status.is_eof() {
//!         break;
//!     }
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │     Brigade (arena chain, handles)   │
//! ├─────────────────────────────────────┤
//! │   Bucket (FILE │ HEAP │ MMAP)        │
//! ├──────────────────┬──────────────────┤
//! │ Materialization  │  Memory scopes   │
//! │ policy + reader  │  and budgets     │
//! ├──────────────────┴──────────────────┤
//! │ Backing stores (SharedRef, FileStore)│
//! ├─────────────────────────────────────┤
//! │       File I/O + memmap2 regions     │
//! └─────────────────────────────────────┘
//! ```
//!
//! ## Module Overview
//!
//! - [`brigade`]: the chain of buckets and its structural operations
//! - [`bucket`]: bucket kinds, the read algorithm and the mapping policy
//! - [`storage`]: backing-store trait, file store, shared handles, mappings
//! - [`memory`]: scopes, heap blocks and memory budgets
//! - [`config`]: tunable thresholds and their defaults
//! - [`error`]: `BucketError` and read status types

pub mod brigade;
pub mod bucket;
pub mod config;
pub mod error;
pub mod memory;
pub mod storage;

pub use brigade::{Brigade, BucketId};
pub use bucket::{Bucket, BucketKind, BucketRead, Length};
pub use config::BucketConfig;
pub use error::{BucketError, ReadMode, ReadStatus};
pub use memory::{MemoryBudget, Scope};
pub use storage::{BackingStore, FileStore, MappedView, SharedRef};
