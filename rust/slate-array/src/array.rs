//! The type-erased buffer and its backing-store manager.

use std::mem::MaybeUninit;
use std::ptr::NonNull;

use slate_common::{Result, checked, error::Error, verify_arg};

use crate::{
    align::{align_up, is_aligned},
    alloc::{ArrayAllocator, SystemAllocator},
    config::{ALIGNMENT, ArrayConfig, DEFAULT_HINT},
    trace::{AllocStats, AllocTrace, TraceReport},
};

/// Cleanup routine run on an element's bytes right before the element is
/// logically discarded (popped, evicted, wiped, cleared or dropped with the buffer).
pub type Destructor = Box<dyn FnMut(&mut [u8])>;

/// A growable contiguous buffer of fixed-size, untyped elements.
///
/// The element width is chosen at runtime and every move is a raw byte copy. The
/// buffer owns a single backing block obtained from its [`ArrayAllocator`] strategy;
/// `capacity` is the size of that block in bytes and `len` the number of live
/// elements, with `len * element_size <= capacity` at all times.
///
/// # Growth
///
/// [`ensure_capacity`](Self::ensure_capacity) is the only way the block grows. It
/// doubles the capacity (with a floor of [`DEFAULT_HINT`] bytes), or grows straight
/// to the required size when doubling is not enough, and rounds the result up to a
/// multiple of [`ALIGNMENT`]. A failed growth leaves the buffer exactly as it was.
///
/// # Settled buffers
///
/// A settled buffer refuses to grow: every operation that would need more capacity
/// fails with a `Settled` error instead. [`settle`](Self::settle) and
/// [`unsettle`](Self::unsettle) are the only transitions.
pub struct RawArray<A: ArrayAllocator = SystemAllocator> {
    data: Option<NonNull<u8>>,
    len: usize,
    capacity: usize,
    element_size: usize,
    destructor: Option<Destructor>,
    settled: bool,
    trace: AllocTrace,
    alloc: A,
}

impl RawArray<SystemAllocator> {
    /// Creates an empty buffer able to hold at least `hint` elements of
    /// `element_size` bytes (`hint == 0` selects [`DEFAULT_HINT`]).
    ///
    /// Fails if `element_size` is zero, if `element_size * hint` overflows, or if
    /// the allocation fails.
    pub fn create(
        element_size: usize,
        hint: usize,
        destructor: Option<Destructor>,
    ) -> Result<RawArray<SystemAllocator>> {
        Self::create_in(element_size, hint, destructor, SystemAllocator)
    }

    /// Creates a buffer holding a copy of `bytes`, which must be a whole number of
    /// `element_size`-byte elements.
    pub fn from_bytes(element_size: usize, bytes: &[u8]) -> Result<RawArray<SystemAllocator>> {
        Self::from_bytes_in(element_size, bytes, SystemAllocator)
    }

    /// Same as [`from_bytes`](Self::from_bytes), returning a settled buffer.
    pub fn from_bytes_settled(
        element_size: usize,
        bytes: &[u8],
    ) -> Result<RawArray<SystemAllocator>> {
        let mut array = Self::from_bytes(element_size, bytes)?;
        array.settle();
        Ok(array)
    }
}

impl<A: ArrayAllocator> RawArray<A> {
    /// Creates an empty buffer backed by the given allocation strategy.
    pub fn create_in(
        element_size: usize,
        hint: usize,
        destructor: Option<Destructor>,
        alloc: A,
    ) -> Result<RawArray<A>> {
        Self::with_config(ArrayConfig::new(element_size, hint), destructor, alloc)
    }

    /// Creates an empty buffer from validated creation parameters.
    pub fn with_config(
        config: ArrayConfig,
        destructor: Option<Destructor>,
        alloc: A,
    ) -> Result<RawArray<A>> {
        let capacity = config.validate()?;
        let mut array = RawArray::empty_in(config.element_size, destructor, alloc);
        array.allocate_block(capacity)?;
        log::trace!(
            "created buffer of {}-byte elements with {} bytes",
            config.element_size,
            capacity
        );
        Ok(array)
    }

    /// Creates a buffer holding a copy of `bytes` with the given strategy.
    ///
    /// The capacity is `bytes.len()` rounded up to [`ALIGNMENT`]; an empty `bytes`
    /// produces a buffer without a backing block.
    pub fn from_bytes_in(element_size: usize, bytes: &[u8], alloc: A) -> Result<RawArray<A>> {
        verify_arg!(element_size, element_size != 0);
        verify_arg!(bytes, bytes.len() % element_size == 0);
        let mut array = RawArray::empty_in(element_size, None, alloc);
        if !bytes.is_empty() {
            array.allocate_block(checked!(align_up(bytes.len(), ALIGNMENT)))?;
            unsafe {
                std::ptr::copy_nonoverlapping(bytes.as_ptr(), array.base(), bytes.len());
            }
            array.set_len(bytes.len() / element_size);
        }
        Ok(array)
    }

    /// Creates a settled buffer with a block of exactly `count` elements and no
    /// live elements. Used for exact-fit derived buffers.
    pub(crate) fn exact_in(element_size: usize, count: usize, alloc: A) -> Result<RawArray<A>> {
        let size = checked!(count.checked_mul(element_size));
        let mut array = RawArray::empty_in(element_size, None, alloc);
        if size != 0 {
            array.allocate_block(size)?;
        }
        array.settled = true;
        Ok(array)
    }

    fn empty_in(element_size: usize, destructor: Option<Destructor>, alloc: A) -> RawArray<A> {
        debug_assert_ne!(element_size, 0);
        RawArray {
            data: None,
            len: 0,
            capacity: 0,
            element_size,
            destructor,
            settled: false,
            trace: AllocTrace::default(),
            alloc,
        }
    }

    fn allocate_block(&mut self, size: usize) -> Result<()> {
        debug_assert!(self.data.is_none());
        let Some(ptr) = self.alloc.allocate(size) else {
            log::debug!("allocation of {size} bytes failed");
            return Err(Error::allocation_failed(size));
        };
        self.data = Some(ptr);
        self.capacity = size;
        self.trace.record_alloc(Some(ptr), size);
        Ok(())
    }
}

impl<A: ArrayAllocator> RawArray<A> {
    /// Byte width of one element.
    #[inline]
    pub fn element_size(&self) -> usize {
        self.element_size
    }

    /// Number of live elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Size of the backing block in bytes.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of bytes holding live elements (`len * element_size`).
    #[inline]
    pub fn size_in_bytes(&self) -> usize {
        self.len * self.element_size
    }

    /// Number of elements that fit in the spare capacity without reallocating.
    #[inline]
    pub fn uninitialized_size(&self) -> usize {
        (self.capacity - self.size_in_bytes()) / self.element_size
    }

    #[inline]
    pub fn is_settled(&self) -> bool {
        self.settled
    }

    /// Forbids any further growth of the backing block.
    ///
    /// Does not shrink or otherwise touch the current capacity.
    pub fn settle(&mut self) {
        self.settled = true;
    }

    /// Allows growth again.
    pub fn unsettle(&mut self) {
        self.settled = false;
    }

    pub fn has_destructor(&self) -> bool {
        self.destructor.is_some()
    }

    /// The allocation strategy backing this buffer.
    pub fn allocator(&self) -> &A {
        &self.alloc
    }

    /// The live elements as one contiguous byte slice.
    #[inline]
    pub fn data(&self) -> &[u8] {
        unsafe { std::slice::from_raw_parts(self.base(), self.size_in_bytes()) }
    }

    #[inline]
    pub fn data_mut(&mut self) -> &mut [u8] {
        unsafe { std::slice::from_raw_parts_mut(self.base(), self.size_in_bytes()) }
    }

    /// The spare capacity past the last live element.
    ///
    /// Bytes written here become live only through
    /// [`append_from_capacity`](Self::append_from_capacity).
    pub fn uninitialized_data(&mut self) -> &mut [MaybeUninit<u8>] {
        let used = self.size_in_bytes();
        unsafe {
            std::slice::from_raw_parts_mut(
                self.base().add(used).cast::<MaybeUninit<u8>>(),
                self.capacity - used,
            )
        }
    }

    /// Bounds-checked read access to the element at `pos`.
    #[inline]
    pub fn at(&self, pos: usize) -> Option<&[u8]> {
        if pos >= self.len {
            return None;
        }
        Some(unsafe { self.unsafe_at(pos) })
    }

    /// Bounds-checked write access to the element at `pos`.
    #[inline]
    pub fn access(&mut self, pos: usize) -> Option<&mut [u8]> {
        if pos >= self.len {
            return None;
        }
        Some(unsafe { self.unsafe_access(pos) })
    }

    /// Unchecked read access to the element at `pos`.
    ///
    /// # Safety
    ///
    /// `pos` must be less than `self.len()`.
    #[inline]
    pub unsafe fn unsafe_at(&self, pos: usize) -> &[u8] {
        debug_assert!(pos < self.len);
        unsafe { std::slice::from_raw_parts(self.slot_ptr(pos), self.element_size) }
    }

    /// Unchecked write access to the element at `pos`.
    ///
    /// # Safety
    ///
    /// `pos` must be less than `self.len()`.
    #[inline]
    pub unsafe fn unsafe_access(&mut self, pos: usize) -> &mut [u8] {
        debug_assert!(pos < self.len);
        unsafe { std::slice::from_raw_parts_mut(self.slot_ptr(pos), self.element_size) }
    }

    /// The first element, or `None` when empty.
    pub fn head(&self) -> Option<&[u8]> {
        self.at(0)
    }

    /// The last element, or `None` when empty.
    pub fn tail(&self) -> Option<&[u8]> {
        self.len.checked_sub(1).and_then(|last| self.at(last))
    }

    /// Current allocation counters (all zero without the `alloc-trace` feature).
    pub fn stats(&self) -> AllocStats {
        self.trace.stats()
    }

    pub fn alloc_trace(&self) -> &AllocTrace {
        &self.trace
    }

    /// A printable dump of the allocation history and counters.
    pub fn trace_report(&self) -> TraceReport<'_> {
        TraceReport {
            trace: &self.trace,
            len: self.len,
            element_size: self.element_size,
        }
    }

    /// Writes [`trace_report`](Self::trace_report) to the log at debug level.
    pub fn log_trace(&self) {
        log::debug!("{}", self.trace_report());
    }
}

impl<A: ArrayAllocator> RawArray<A> {
    /// Makes room for `additional` more elements.
    ///
    /// Succeeds without reallocating when `(len + additional) * element_size`
    /// already fits. Otherwise fails on a settled buffer, and reallocates to the
    /// doubled capacity (at least [`DEFAULT_HINT`] bytes) or, when that is still too
    /// small, to the required size; either way rounded up to [`ALIGNMENT`].
    ///
    /// On any failure (overflow, settled, allocator refusal) the buffer is left
    /// completely unchanged. Capacity never shrinks here.
    pub fn ensure_capacity(&mut self, additional: usize) -> Result<()> {
        let count = checked!(self.len.checked_add(additional));
        let required = checked!(count.checked_mul(self.element_size));
        if required <= self.capacity {
            return Ok(());
        }

        if self.settled {
            log::debug!(
                "settled buffer refused to grow from {} to {} bytes",
                self.capacity,
                required
            );
            return Err(Error::settled(required, self.capacity));
        }

        let doubled = self
            .capacity
            .checked_mul(2)
            .unwrap_or(usize::MAX)
            .max(DEFAULT_HINT);
        let new_capacity = align_up(doubled.max(required), ALIGNMENT)
            .or_else(|| align_up(required, ALIGNMENT));
        let new_capacity = checked!(new_capacity);
        debug_assert!(is_aligned(new_capacity, ALIGNMENT));
        self.resize_block(new_capacity)
    }

    /// Gives back unused capacity when less than half of the block holds live
    /// elements.
    ///
    /// The block shrinks to the in-use byte count rounded up to [`ALIGNMENT`]; a
    /// buffer with no live elements releases its block entirely. Settled buffers are
    /// left alone. Returns whether the block was shrunk; fails (buffer unchanged)
    /// only if the reallocation fails.
    pub fn shrink_if_sparse(&mut self) -> Result<bool> {
        if self.settled || self.capacity == 0 {
            return Ok(false);
        }

        let used = self.size_in_bytes();
        if used >= self.capacity / 2 {
            return Ok(false);
        }

        let target = checked!(align_up(used, ALIGNMENT));
        if target >= self.capacity {
            return Ok(false);
        }
        self.resize_block(target)?;
        Ok(true)
    }

    /// Moves the backing block to `new_size` bytes; on failure nothing changes.
    fn resize_block(&mut self, new_size: usize) -> Result<()> {
        let old_size = self.capacity;

        if new_size == 0 {
            if let Some(ptr) = self.data.take() {
                unsafe { self.alloc.free(ptr, old_size) };
                self.trace.record_release();
            }
            self.capacity = 0;
            log::trace!("released {old_size}-byte block");
            return Ok(());
        }

        let ptr = match self.data {
            Some(ptr) => unsafe { self.alloc.reallocate(ptr, old_size, new_size) },
            None => self.alloc.allocate(new_size),
        };
        let Some(ptr) = ptr else {
            log::debug!("reallocation from {old_size} to {new_size} bytes failed");
            return Err(Error::allocation_failed(new_size));
        };

        if self.data.is_some() {
            self.trace.record_realloc(ptr, new_size);
        } else {
            self.trace.record_alloc(Some(ptr), new_size);
        }
        self.data = Some(ptr);
        self.capacity = new_size;
        log::trace!("resized block from {old_size} to {new_size} bytes");
        Ok(())
    }
}

impl<A: ArrayAllocator> RawArray<A> {
    /// Start of the backing block (dangling when there is none).
    #[inline]
    pub(crate) fn base(&self) -> *mut u8 {
        self.data.map_or(NonNull::dangling(), |ptr| ptr).as_ptr()
    }

    /// Address of slot `index`, which must be within the block (or one past it).
    #[inline]
    pub(crate) fn slot_ptr(&self, index: usize) -> *mut u8 {
        debug_assert!(index * self.element_size <= self.capacity);
        unsafe { self.base().add(index * self.element_size) }
    }

    /// Sets the live element count, keeping the in-use counter in step.
    #[inline]
    pub(crate) fn set_len(&mut self, len: usize) {
        debug_assert!(len * self.element_size <= self.capacity);
        self.len = len;
        self.trace.set_in_use(len * self.element_size);
    }

    /// Runs the destructor, if any, on each listed slot in order.
    pub(crate) fn destroy(&mut self, slots: impl Iterator<Item = usize>) {
        let base = self.base();
        let element_size = self.element_size;
        if let Some(destructor) = self.destructor.as_mut() {
            for index in slots {
                let bytes = unsafe {
                    std::slice::from_raw_parts_mut(base.add(index * element_size), element_size)
                };
                destructor(bytes);
            }
        }
    }
}

impl<A: ArrayAllocator> Drop for RawArray<A> {
    fn drop(&mut self) {
        self.destroy((0..self.len).rev());
        self.len = 0;
        if let Some(ptr) = self.data.take() {
            unsafe { self.alloc.free(ptr, self.capacity) };
        }
    }
}

impl<A: ArrayAllocator> std::fmt::Debug for RawArray<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawArray")
            .field("len", &self.len)
            .field("cap", &self.capacity)
            .field("element_size", &self.element_size)
            .field("settled", &self.settled)
            .field("has_destructor", &self.destructor.is_some())
            .finish_non_exhaustive()
    }
}
