//! Allocation scopes.
//!
//! A [`Scope`] is the owner heap blocks are charged to: every backing store
//! names the scope its buffered reads allocate from, and `setaside` moves a
//! heap bucket into another scope. Scopes are cheap handles; clones compare
//! equal with [`Scope::same_as`].

use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use super::budget::{MemoryBudget, MemoryError};

#[derive(Clone)]
pub struct Scope {
    inner: Rc<ScopeInner>,
}

struct ScopeInner {
    name: String,
    budget: Option<Arc<MemoryBudget>>,
}

impl Scope {
    /// Creates an unbudgeted scope.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            inner: Rc::new(ScopeInner {
                name: name.into(),
                budget: None,
            }),
        }
    }

    /// Creates a scope whose heap blocks are charged to `budget`.
    pub fn with_budget(name: impl Into<String>, budget: Arc<MemoryBudget>) -> Self {
        Self {
            inner: Rc::new(ScopeInner {
                name: name.into(),
                budget: Some(budget),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn budget(&self) -> Option<&Arc<MemoryBudget>> {
        self.inner.budget.as_ref()
    }

    pub fn same_as(&self, other: &Scope) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn charge(&self, bytes: usize) -> Result<Charge, MemoryError> {
        if let Some(budget) = &self.inner.budget {
            budget.allocate(bytes)?;
        }

        Ok(Charge {
            budget: self.inner.budget.clone(),
            bytes,
        })
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self::new("default")
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("name", &self.inner.name)
            .field("budgeted", &self.inner.budget.is_some())
            .finish()
    }
}

/// Bytes held against a scope's budget; released on drop.
#[derive(Debug)]
pub(crate) struct Charge {
    budget: Option<Arc<MemoryBudget>>,
    bytes: usize,
}

impl Charge {
    #[cfg(test)]
    pub(crate) fn bytes(&self) -> usize {
        self.bytes
    }

    /// Gives back everything above `bytes`, e.g. after a short read.
    pub(crate) fn shrink_to(&mut self, bytes: usize) {
        if bytes >= self.bytes {
            return;
        }

        if let Some(budget) = &self.budget {
            budget.release(self.bytes - bytes);
        }
        self.bytes = bytes;
    }
}

impl Drop for Charge {
    fn drop(&mut self) {
        if let Some(budget) = &self.budget {
            budget.release(self.bytes);
        }
    }
}
