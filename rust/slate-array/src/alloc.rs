//! Allocation strategies for buffer backing blocks.
//!
//! A [`RawArray`](crate::RawArray) never talks to the process allocator directly; it
//! owns an [`ArrayAllocator`] strategy object and routes every allocate, grow, shrink
//! and free of its backing block through it. This keeps allocation behavior
//! overridable per buffer (for tests, budgets or arenas) without process-wide state.

use std::alloc::Layout;
use std::cell::Cell;
use std::ptr::NonNull;
use std::rc::Rc;

use crate::config::ALIGNMENT;

/// The allocate/reallocate/free triple used for backing blocks.
///
/// All blocks are requested with [`ALIGNMENT`] alignment and a non-zero size.
///
/// # Safety
///
/// Implementors must return blocks that are valid for reads and writes of the
/// requested size, aligned to [`ALIGNMENT`], and exclusively owned by the caller
/// until passed back to `reallocate` or `free` of the same strategy instance (or
/// a clone of it). A failed `reallocate` must leave the original block untouched.
pub unsafe trait ArrayAllocator {
    /// Allocates a block of `size` bytes, or returns `None` on failure.
    fn allocate(&self, size: usize) -> Option<NonNull<u8>>;

    /// Resizes `ptr` (currently `old_size` bytes) to `new_size` bytes, preserving
    /// the common prefix. Returns `None` on failure, in which case `ptr` is still
    /// valid and unchanged.
    ///
    /// # Safety
    ///
    /// `ptr` must have been produced by this strategy with size `old_size`.
    unsafe fn reallocate(
        &self,
        ptr: NonNull<u8>,
        old_size: usize,
        new_size: usize,
    ) -> Option<NonNull<u8>>;

    /// Returns a block to the strategy.
    ///
    /// # Safety
    ///
    /// `ptr` must have been produced by this strategy with size `size`, and must
    /// not be used afterwards.
    unsafe fn free(&self, ptr: NonNull<u8>, size: usize);
}

/// The process allocator (`std::alloc`), word aligned.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SystemAllocator;

impl SystemAllocator {
    #[inline]
    fn layout(size: usize) -> Option<Layout> {
        if size == 0 {
            return None;
        }
        Layout::from_size_align(size, ALIGNMENT).ok()
    }
}

unsafe impl ArrayAllocator for SystemAllocator {
    fn allocate(&self, size: usize) -> Option<NonNull<u8>> {
        let layout = Self::layout(size)?;
        NonNull::new(unsafe { std::alloc::alloc(layout) })
    }

    unsafe fn reallocate(
        &self,
        ptr: NonNull<u8>,
        old_size: usize,
        new_size: usize,
    ) -> Option<NonNull<u8>> {
        let old_layout = Self::layout(old_size)?;
        // `realloc` requires the new size to form a valid layout as well.
        Self::layout(new_size)?;
        NonNull::new(unsafe { std::alloc::realloc(ptr.as_ptr(), old_layout, new_size) })
    }

    unsafe fn free(&self, ptr: NonNull<u8>, size: usize) {
        if let Some(layout) = Self::layout(size) {
            unsafe { std::alloc::dealloc(ptr.as_ptr(), layout) };
        }
    }
}

/// A strategy that caps the number of bytes held through it.
///
/// Allocation and growth withdraw from a shared byte budget; shrinking and freeing
/// deposit back. A request that the remaining budget cannot cover fails without
/// touching the inner allocator. Clones share the same budget, so every buffer
/// derived from a budgeted one (e.g. by `pull`) draws from the same pool.
#[derive(Debug, Clone)]
pub struct BudgetAllocator<A = SystemAllocator> {
    inner: A,
    budget: Rc<Cell<usize>>,
}

impl BudgetAllocator<SystemAllocator> {
    /// Creates a budgeted strategy over the process allocator.
    pub fn new(budget: usize) -> BudgetAllocator<SystemAllocator> {
        Self::with_inner(SystemAllocator, budget)
    }
}

impl<A> BudgetAllocator<A> {
    pub fn with_inner(inner: A, budget: usize) -> BudgetAllocator<A> {
        BudgetAllocator {
            inner,
            budget: Rc::new(Cell::new(budget)),
        }
    }

    /// Returns the number of bytes that can still be allocated.
    pub fn remaining(&self) -> usize {
        self.budget.get()
    }

    /// Adds `amount` bytes to the shared budget.
    pub fn deposit(&self, amount: usize) {
        self.budget.set(self.budget.get().saturating_add(amount));
    }

    /// Removes `amount` bytes from the budget if available.
    ///
    /// Returns `false`, leaving the budget unchanged, when fewer than `amount` bytes
    /// remain.
    pub fn withdraw(&self, amount: usize) -> bool {
        let current = self.budget.get();
        if current >= amount {
            self.budget.set(current - amount);
            true
        } else {
            false
        }
    }
}

unsafe impl<A: ArrayAllocator> ArrayAllocator for BudgetAllocator<A> {
    fn allocate(&self, size: usize) -> Option<NonNull<u8>> {
        if !self.withdraw(size) {
            return None;
        }
        let ptr = self.inner.allocate(size);
        if ptr.is_none() {
            self.deposit(size);
        }
        ptr
    }

    unsafe fn reallocate(
        &self,
        ptr: NonNull<u8>,
        old_size: usize,
        new_size: usize,
    ) -> Option<NonNull<u8>> {
        let growth = new_size.saturating_sub(old_size);
        if !self.withdraw(growth) {
            return None;
        }
        match unsafe { self.inner.reallocate(ptr, old_size, new_size) } {
            Some(new_ptr) => {
                self.deposit(old_size.saturating_sub(new_size));
                Some(new_ptr)
            }
            None => {
                self.deposit(growth);
                None
            }
        }
    }

    unsafe fn free(&self, ptr: NonNull<u8>, size: usize) {
        unsafe { self.inner.free(ptr, size) };
        self.deposit(size);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_allocate_and_free() {
        let ptr = SystemAllocator.allocate(64).unwrap();
        assert_eq!(ptr.as_ptr().addr() % ALIGNMENT, 0);
        unsafe {
            ptr.as_ptr().write_bytes(0xab, 64);
            let ptr = SystemAllocator.reallocate(ptr, 64, 256).unwrap();
            assert_eq!(*ptr.as_ptr().add(63), 0xab);
            SystemAllocator.free(ptr, 256);
        }
    }

    #[test]
    fn test_system_rejects_zero_and_huge() {
        assert!(SystemAllocator.allocate(0).is_none());
        assert!(SystemAllocator.allocate(usize::MAX).is_none());
    }

    #[test]
    fn test_budget_withdraw_and_deposit() {
        let alloc = BudgetAllocator::new(100);
        assert!(alloc.withdraw(60));
        assert!(!alloc.withdraw(50));
        assert_eq!(alloc.remaining(), 40);
        alloc.deposit(10);
        assert_eq!(alloc.remaining(), 50);
    }

    #[test]
    fn test_budget_allocations() {
        let alloc = BudgetAllocator::new(128);
        let ptr = alloc.allocate(64).unwrap();
        assert_eq!(alloc.remaining(), 64);
        assert!(alloc.allocate(96).is_none());
        assert_eq!(alloc.remaining(), 64);

        unsafe {
            assert!(alloc.reallocate(ptr, 64, 256).is_none());
            assert_eq!(alloc.remaining(), 64);
            let ptr = alloc.reallocate(ptr, 64, 128).unwrap();
            assert_eq!(alloc.remaining(), 0);
            let ptr = alloc.reallocate(ptr, 128, 32).unwrap();
            assert_eq!(alloc.remaining(), 96);
            alloc.free(ptr, 32);
        }
        assert_eq!(alloc.remaining(), 128);
    }

    #[test]
    fn test_budget_clones_share_pool() {
        let a = BudgetAllocator::new(64);
        let b = a.clone();
        let ptr = a.allocate(48).unwrap();
        assert_eq!(b.remaining(), 16);
        unsafe { b.free(ptr, 48) };
        assert_eq!(a.remaining(), 64);
    }
}
