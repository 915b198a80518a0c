//! Positional mutation of a [`RawArray`].
//!
//! Every operation that adds elements first reserves room through
//! [`RawArray::ensure_capacity`], and only then moves bytes and bumps the length, so a
//! failed call never leaves a partial effect behind. Positions are element indices.

use slate_common::{Result, checked, verify_arg};

use crate::{alloc::ArrayAllocator, array::RawArray};

impl<A: ArrayAllocator> RawArray<A> {
    /// Appends one element (exactly `element_size` bytes).
    pub fn push(&mut self, element: &[u8]) -> Result<()> {
        verify_arg!(element, element.len() == self.element_size());
        self.ensure_capacity(1)?;
        let len = self.len();
        unsafe {
            std::ptr::copy_nonoverlapping(element.as_ptr(), self.slot_ptr(len), element.len());
        }
        self.set_len(len + 1);
        Ok(())
    }

    /// Removes the last element.
    ///
    /// Its bytes are copied to `out` first (when given), then the destructor runs on
    /// the slot. Fails on an empty buffer.
    pub fn pop(&mut self, out: Option<&mut [u8]>) -> Result<()> {
        verify_arg!(self, !self.is_empty());
        let last = self.len() - 1;
        if let Some(out) = out {
            verify_arg!(out, out.len() == self.element_size());
            out.copy_from_slice(unsafe { self.unsafe_at(last) });
        }
        self.destroy(last..last + 1);
        self.set_len(last);
        Ok(())
    }

    /// Inserts one element before the first one.
    pub fn push_front(&mut self, element: &[u8]) -> Result<()> {
        self.insert(0, element)
    }

    /// Removes the first element, copying it to `out` first (when given).
    pub fn pop_front(&mut self, out: Option<&mut [u8]>) -> Result<()> {
        verify_arg!(self, !self.is_empty());
        if let Some(out) = out {
            verify_arg!(out, out.len() == self.element_size());
            out.copy_from_slice(unsafe { self.unsafe_at(0) });
        }
        self.evict(0)
    }

    /// Inserts one element at `pos` (`pos <= len`), shifting the tail right.
    pub fn insert(&mut self, pos: usize, element: &[u8]) -> Result<()> {
        verify_arg!(element, element.len() == self.element_size());
        verify_arg!(pos, pos <= self.len());
        self.ensure_capacity(1)?;
        let len = self.len();
        unsafe {
            if pos != len {
                std::ptr::copy(
                    self.slot_ptr(pos),
                    self.slot_ptr(pos + 1),
                    (len - pos) * self.element_size(),
                );
            }
            std::ptr::copy_nonoverlapping(element.as_ptr(), self.slot_ptr(pos), element.len());
        }
        self.set_len(len + 1);
        Ok(())
    }

    /// Inserts the elements packed in `src` at `pos` (`pos <= len`), shifting the
    /// tail right by as many slots.
    ///
    /// `src.len()` must be a multiple of the element size; an empty `src` is a
    /// successful no-op.
    pub fn inject(&mut self, pos: usize, src: &[u8]) -> Result<()> {
        verify_arg!(pos, pos <= self.len());
        let count = self.element_count(src)?;
        self.ensure_capacity(count)?;
        if count == 0 {
            return Ok(());
        }
        let len = self.len();
        unsafe {
            if pos != len {
                std::ptr::copy(
                    self.slot_ptr(pos),
                    self.slot_ptr(pos + count),
                    (len - pos) * self.element_size(),
                );
            }
            std::ptr::copy_nonoverlapping(src.as_ptr(), self.slot_ptr(pos), src.len());
        }
        self.set_len(len + count);
        Ok(())
    }

    /// Appends the elements packed in `src`.
    pub fn append(&mut self, src: &[u8]) -> Result<()> {
        let count = self.element_count(src)?;
        self.ensure_capacity(count)?;
        let len = self.len();
        unsafe {
            std::ptr::copy_nonoverlapping(src.as_ptr(), self.slot_ptr(len), src.len());
        }
        self.set_len(len + count);
        Ok(())
    }

    /// Removes the element at `pos` (`pos < len`), running the destructor on it and
    /// shifting the tail left.
    pub fn evict(&mut self, pos: usize) -> Result<()> {
        verify_arg!(pos, pos < self.len());
        self.destroy(pos..pos + 1);
        let len = self.len();
        unsafe {
            std::ptr::copy(
                self.slot_ptr(pos + 1),
                self.slot_ptr(pos),
                (len - pos - 1) * self.element_size(),
            );
        }
        self.set_len(len - 1);
        Ok(())
    }

    /// Removes the elements in `start..end` (`start < end <= len`), running the
    /// destructor on each of them in order, then closes the gap.
    pub fn wipe(&mut self, start: usize, end: usize) -> Result<()> {
        verify_arg!(start, start < end);
        verify_arg!(end, end <= self.len());
        self.destroy(start..end);
        let len = self.len();
        unsafe {
            std::ptr::copy(
                self.slot_ptr(end),
                self.slot_ptr(start),
                (len - end) * self.element_size(),
            );
        }
        self.set_len(len - (end - start));
        Ok(())
    }

    /// Removes every element, last to first, keeping the capacity.
    pub fn clear(&mut self) {
        self.destroy((0..self.len()).rev());
        self.set_len(0);
    }

    /// Exchanges the contents of slots `a` and `b`.
    pub fn swap(&mut self, a: usize, b: usize) -> Result<()> {
        verify_arg!(a, a < self.len());
        verify_arg!(b, b < self.len());
        if a == b {
            return Ok(());
        }
        let (low, high) = (a.min(b), a.max(b));
        let element_size = self.element_size();
        let (left, right) = self.data_mut().split_at_mut(high * element_size);
        left[low * element_size..(low + 1) * element_size]
            .swap_with_slice(&mut right[..element_size]);
        Ok(())
    }

    /// Marks `n` more elements of the spare capacity as live without copying.
    ///
    /// Fails if `n` exceeds [`uninitialized_size`](Self::uninitialized_size).
    ///
    /// # Safety
    ///
    /// The first `n * element_size` bytes of
    /// [`uninitialized_data`](Self::uninitialized_data) must have been initialized.
    pub unsafe fn append_from_capacity(&mut self, n: usize) -> Result<()> {
        verify_arg!(n, n <= self.uninitialized_size());
        let len = self.len();
        self.set_len(len + n);
        Ok(())
    }

    /// Copies `src` over the live bytes starting at byte offset `offset`.
    ///
    /// The target range must lie within the live elements; no destructor runs on the
    /// overwritten bytes.
    pub fn write_bytes_at(&mut self, offset: usize, src: &[u8]) -> Result<()> {
        let end = checked!(offset.checked_add(src.len()));
        verify_arg!(offset, end <= self.size_in_bytes());
        self.data_mut()[offset..end].copy_from_slice(src);
        Ok(())
    }

    /// Number of whole elements packed in `src`.
    fn element_count(&self, src: &[u8]) -> Result<usize> {
        verify_arg!(src, src.len() % self.element_size() == 0);
        Ok(src.len() / self.element_size())
    }
}
