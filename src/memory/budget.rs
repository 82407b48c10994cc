//! # Memory Budget Implementation
//!
//! Tracks bytes held by heap blocks against a hard limit.
//!
//! ## Design Principles
//!
//! 1. **Hard Limits**: Allocations that would exceed the budget fail immediately
//! 2. **Settle After Read**: A buffered read charges its whole chunk up front and
//!    releases the part a short read did not fill
//! 3. **Thread Safety**: The counter is atomic, so one budget may be shared by
//!    brigades consumed on different threads
//!
//! ## Memory Accounting
//!
//! Tracked memory includes the bytes of every heap block allocated through a
//! budgeted [`Scope`](super::Scope). Untracked: mapped views (the kernel page
//! cache backs them), bucket and brigade node headers, caller-supplied
//! `Vec<u8>` turned into heap buckets.

use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Clone)]
pub struct BudgetStats {
    pub total_limit: usize,
    pub total_used: usize,
    pub peak_used: usize,
}

impl BudgetStats {
    pub fn available(&self) -> usize {
        self.total_limit.saturating_sub(self.total_used)
    }
}

impl std::fmt::Display for BudgetStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "heap:{}/{},peak:{}",
            self.total_used, self.total_limit, self.peak_used
        )
    }
}

#[derive(Debug)]
pub struct MemoryError {
    pub requested: usize,
    pub available: usize,
}

impl std::fmt::Display for MemoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "memory budget exceeded: requested {} bytes but only {} available",
            self.requested, self.available
        )
    }
}

impl std::error::Error for MemoryError {}

#[derive(Debug)]
pub struct MemoryBudget {
    total_limit: AtomicUsize,
    used: AtomicUsize,
    peak: AtomicUsize,
}

impl MemoryBudget {
    pub fn with_limit(limit: usize) -> Self {
        Self {
            total_limit: AtomicUsize::new(limit),
            used: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    pub fn unlimited() -> Self {
        Self::with_limit(usize::MAX)
    }

    pub fn total_limit(&self) -> usize {
        self.total_limit.load(Ordering::Acquire)
    }

    pub fn set_limit(&self, limit: usize) {
        self.total_limit.store(limit, Ordering::Release);
    }

    pub fn total_used(&self) -> usize {
        self.used.load(Ordering::Acquire)
    }

    pub fn available(&self) -> usize {
        self.total_limit().saturating_sub(self.total_used())
    }

    pub fn can_allocate(&self, bytes: usize) -> bool {
        self.available() >= bytes
    }

    pub fn allocate(&self, bytes: usize) -> Result<(), MemoryError> {
        if bytes == 0 {
            return Ok(());
        }

        loop {
            let current = self.used.load(Ordering::Acquire);
            let limit = self.total_limit();

            let new_used = match current.checked_add(bytes) {
                Some(n) if n <= limit => n,
                _ => {
                    return Err(MemoryError {
                        requested: bytes,
                        available: limit.saturating_sub(current),
                    })
                }
            };

            match self.used.compare_exchange_weak(
                current,
                new_used,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    self.peak.fetch_max(new_used, Ordering::AcqRel);
                    return Ok(());
                }
                Err(_) => continue,
            }
        }
    }

    pub fn release(&self, bytes: usize) {
        if bytes == 0 {
            return;
        }

        loop {
            let current = self.used.load(Ordering::Acquire);
            let new_value = current.saturating_sub(bytes);

            match self.used.compare_exchange_weak(
                current,
                new_value,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return,
                Err(_) => continue,
            }
        }
    }

    pub fn stats(&self) -> BudgetStats {
        BudgetStats {
            total_limit: self.total_limit(),
            total_used: self.total_used(),
            peak_used: self.peak.load(Ordering::Acquire),
        }
    }

    pub fn reset(&self) {
        self.used.store(0, Ordering::Release);
        self.peak.store(0, Ordering::Release);
    }
}

impl Default for MemoryBudget {
    fn default() -> Self {
        Self::unlimited()
    }
}
