//! # Heap Memory for Buffered Buckets
//!
//! Buffered materialization copies file bytes into heap blocks. This module
//! owns those blocks and the accounting that bounds them.
//!
//! ## Architecture
//!
//! ```text
//! +------------------+        charges         +----------------+
//! |      Scope       | ---------------------> |  MemoryBudget  |
//! | (name, budget?)  |                        |  (hard limit)  |
//! +------------------+                        +----------------+
//!          │ allocates                                ^
//!          v                                          │ releases on drop
//! +------------------+   Rc clone per alias   +----------------+
//! |    HeapBlock     | ---------------------> |  BlockInner    |
//! | (view: off, len) |                        | bytes + Charge |
//! +------------------+                        +----------------+
//! ```
//!
//! ## Enforcement Model
//!
//! Budgets use **hard limits**: a materialization that would exceed the limit
//! is refused with [`MemoryError`], which surfaces as
//! `BucketError::OutOfMemory` and leaves the bucket untouched. A scope without
//! a budget is unbounded apart from the allocator itself.
//!
//! ## Sharing
//!
//! `copy()` and `split()` of a heap bucket clone the `Rc` of the block, never
//! the bytes. The charge is released exactly once, when the last alias drops.

mod block;
mod budget;
mod scope;

pub use block::HeapBlock;
pub use budget::{BudgetStats, MemoryBudget, MemoryError};
pub use scope::Scope;
