//! A typed view of [`RawArray`] for plain-old-data element types.

use std::marker::PhantomData;

use bytemuck::Pod;
use slate_common::{Result, verify_arg};

use crate::{
    alloc::{ArrayAllocator, SystemAllocator},
    array::{Destructor, RawArray},
};

/// A growable buffer of `T` values stored as raw bytes.
///
/// Every operation delegates to the wrapped [`RawArray`] with
/// `element_size = size_of::<T>()`. Values are read back with unaligned loads, so
/// the element type may have a stricter alignment than the backing block.
pub struct TypedArray<T, A: ArrayAllocator = SystemAllocator> {
    raw: RawArray<A>,
    _p: PhantomData<T>,
}

impl<T: Pod> TypedArray<T, SystemAllocator> {
    pub fn new() -> Result<TypedArray<T, SystemAllocator>> {
        Self::with_capacity(0)
    }

    /// Creates an empty buffer with room for `hint` values (`0` selects the default
    /// hint).
    pub fn with_capacity(hint: usize) -> Result<TypedArray<T, SystemAllocator>> {
        Self::new_in(hint, SystemAllocator)
    }

    /// Creates an empty buffer that hands every discarded value to `destructor`.
    pub fn with_destructor<F>(
        hint: usize,
        mut destructor: F,
    ) -> Result<TypedArray<T, SystemAllocator>>
    where
        F: FnMut(T) + 'static,
    {
        let destructor: Destructor =
            Box::new(move |bytes: &mut [u8]| destructor(bytemuck::pod_read_unaligned(bytes)));
        Self::build(hint, Some(destructor), SystemAllocator)
    }
}

impl<T: Pod, A: ArrayAllocator> TypedArray<T, A> {
    pub fn new_in(hint: usize, alloc: A) -> Result<TypedArray<T, A>> {
        Self::build(hint, None, alloc)
    }

    fn build(hint: usize, destructor: Option<Destructor>, alloc: A) -> Result<TypedArray<T, A>> {
        verify_arg!(element_size, std::mem::size_of::<T>() != 0);
        Ok(TypedArray {
            raw: RawArray::create_in(std::mem::size_of::<T>(), hint, destructor, alloc)?,
            _p: PhantomData,
        })
    }

    fn from_raw(raw: RawArray<A>) -> TypedArray<T, A> {
        debug_assert_eq!(raw.element_size(), std::mem::size_of::<T>());
        TypedArray {
            raw,
            _p: PhantomData,
        }
    }

    pub fn as_raw(&self) -> &RawArray<A> {
        &self.raw
    }

    pub fn into_raw(self) -> RawArray<A> {
        self.raw
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.raw.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Capacity of the backing block, in bytes.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.raw.capacity()
    }

    pub fn is_settled(&self) -> bool {
        self.raw.is_settled()
    }

    pub fn settle(&mut self) {
        self.raw.settle();
    }

    pub fn unsettle(&mut self) {
        self.raw.unsettle();
    }

    pub fn ensure_capacity(&mut self, additional: usize) -> Result<()> {
        self.raw.ensure_capacity(additional)
    }

    pub fn shrink_if_sparse(&mut self) -> Result<bool> {
        self.raw.shrink_if_sparse()
    }

    pub fn push(&mut self, value: T) -> Result<()> {
        self.raw.push(bytemuck::bytes_of(&value))
    }

    pub fn pop(&mut self) -> Result<T> {
        let mut value = T::zeroed();
        self.raw.pop(Some(bytemuck::bytes_of_mut(&mut value)))?;
        Ok(value)
    }

    pub fn push_front(&mut self, value: T) -> Result<()> {
        self.raw.push_front(bytemuck::bytes_of(&value))
    }

    pub fn pop_front(&mut self) -> Result<T> {
        let mut value = T::zeroed();
        self.raw.pop_front(Some(bytemuck::bytes_of_mut(&mut value)))?;
        Ok(value)
    }

    pub fn insert(&mut self, pos: usize, value: T) -> Result<()> {
        self.raw.insert(pos, bytemuck::bytes_of(&value))
    }

    pub fn inject(&mut self, pos: usize, values: &[T]) -> Result<()> {
        self.raw.inject(pos, bytemuck::cast_slice(values))
    }

    pub fn append(&mut self, values: &[T]) -> Result<()> {
        self.raw.append(bytemuck::cast_slice(values))
    }

    pub fn evict(&mut self, pos: usize) -> Result<()> {
        self.raw.evict(pos)
    }

    pub fn wipe(&mut self, start: usize, end: usize) -> Result<()> {
        self.raw.wipe(start, end)
    }

    pub fn clear(&mut self) {
        self.raw.clear();
    }

    pub fn swap(&mut self, a: usize, b: usize) -> Result<()> {
        self.raw.swap(a, b)
    }

    /// Overwrites the value at `pos`.
    pub fn set(&mut self, pos: usize, value: T) -> Result<()> {
        verify_arg!(pos, pos < self.len());
        self.raw
            .write_bytes_at(pos * std::mem::size_of::<T>(), bytemuck::bytes_of(&value))
    }

    #[inline]
    pub fn get(&self, pos: usize) -> Option<T> {
        self.raw.at(pos).map(bytemuck::pod_read_unaligned)
    }

    pub fn first(&self) -> Option<T> {
        self.raw.head().map(bytemuck::pod_read_unaligned)
    }

    pub fn last(&self) -> Option<T> {
        self.raw.tail().map(bytemuck::pod_read_unaligned)
    }

    pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
        self.raw
            .data()
            .chunks_exact(std::mem::size_of::<T>())
            .map(bytemuck::pod_read_unaligned)
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.iter().collect()
    }

    /// Copies the values in `start..end`.
    pub fn extract(&self, start: usize, end: usize) -> Result<Vec<T>> {
        Ok(self
            .raw
            .extract(start, end)?
            .chunks_exact(std::mem::size_of::<T>())
            .map(bytemuck::pod_read_unaligned)
            .collect())
    }

    /// See [`RawArray::pull`].
    pub fn pull(&self, start: isize, end: isize) -> Result<TypedArray<T, A>>
    where
        A: Clone,
    {
        self.raw.pull(start, end).map(TypedArray::from_raw)
    }

    pub fn filter<F>(&self, mut predicate: F) -> Result<TypedArray<T, A>>
    where
        A: Clone,
        F: FnMut(&T) -> bool,
    {
        self.raw
            .filter(|bytes| predicate(&bytemuck::pod_read_unaligned(bytes)))
            .map(TypedArray::from_raw)
    }
}

impl<T: Pod + std::fmt::Debug, A: ArrayAllocator> std::fmt::Debug for TypedArray<T, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}
