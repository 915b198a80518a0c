//! Copying ranges out of a [`RawArray`].

use slate_common::{Result, checked, verify_arg};

use crate::{alloc::ArrayAllocator, array::RawArray};

impl<A: ArrayAllocator> RawArray<A> {
    /// Copies the bytes of the elements in `start..end` (`start < end <= len`).
    pub fn extract(&self, start: usize, end: usize) -> Result<Vec<u8>> {
        verify_arg!(start, start < end);
        verify_arg!(end, end <= self.len());
        let element_size = self.element_size();
        Ok(self.data()[start * element_size..end * element_size].to_vec())
    }

    /// Copies the inclusive element range between `start` and `end` into a new
    /// buffer.
    ///
    /// Negative positions count from the end (`-1` is the last element). When
    /// `start` comes after `end` the elements are copied in reverse order. Both
    /// positions must satisfy `|pos| < len`.
    ///
    /// The result is exact-fit and settled, shares this buffer's allocation
    /// strategy, and has no destructor.
    pub fn pull(&self, start: isize, end: isize) -> Result<RawArray<A>>
    where
        A: Clone,
    {
        let len = self.len();
        verify_arg!(start, start.unsigned_abs() < len);
        verify_arg!(end, end.unsigned_abs() < len);
        let start = normalize(start, len);
        let end = normalize(end, len);

        let count = checked!(start.abs_diff(end).checked_add(1));
        let mut result = RawArray::exact_in(self.element_size(), count, self.allocator().clone())?;
        let element_size = self.element_size();
        if start <= end {
            let bytes = &self.data()[start * element_size..(end + 1) * element_size];
            unsafe {
                std::ptr::copy_nonoverlapping(bytes.as_ptr(), result.base(), bytes.len());
            }
        } else {
            for (slot, index) in (end..=start).rev().enumerate() {
                unsafe {
                    std::ptr::copy_nonoverlapping(
                        self.slot_ptr(index),
                        result.slot_ptr(slot),
                        element_size,
                    );
                }
            }
        }
        result.set_len(count);
        Ok(result)
    }

    /// Copies the elements accepted by `predicate` into a new growable buffer that
    /// shares this buffer's allocation strategy. The result has no destructor.
    pub fn filter<F>(&self, mut predicate: F) -> Result<RawArray<A>>
    where
        A: Clone,
        F: FnMut(&[u8]) -> bool,
    {
        let mut result =
            RawArray::create_in(self.element_size(), 0, None, self.allocator().clone())?;
        for element in self.data().chunks_exact(self.element_size()) {
            if predicate(element) {
                result.push(element)?;
            }
        }
        Ok(result)
    }
}

/// Maps a possibly negative position onto `0..len`; `|pos| < len` is checked by the
/// caller.
#[inline]
fn normalize(pos: isize, len: usize) -> usize {
    if pos < 0 {
        len - pos.unsigned_abs()
    } else {
        pos.unsigned_abs()
    }
}

#[cfg(test)]
mod tests {
    use crate::{RawArray, alloc::BudgetAllocator};

    fn ints(values: &[i32]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_ne_bytes()).collect()
    }

    fn contents<A: crate::ArrayAllocator>(array: &RawArray<A>) -> Vec<i32> {
        array
            .data()
            .chunks_exact(4)
            .map(|c| i32::from_ne_bytes(c.try_into().unwrap()))
            .collect()
    }

    fn sample() -> RawArray {
        RawArray::from_bytes(4, &ints(&[111, 222, 333])).unwrap()
    }

    #[test]
    fn test_extract() {
        let array = sample();
        assert_eq!(array.extract(0, 2).unwrap(), ints(&[111, 222]));
        assert_eq!(array.extract(2, 3).unwrap(), ints(&[333]));
        assert!(array.extract(1, 1).is_err());
        assert!(array.extract(2, 1).is_err());
        assert!(array.extract(0, 4).is_err());
    }

    #[test]
    fn test_pull_forward() {
        let array = sample();
        let pulled = array.pull(0, 2).unwrap();
        assert_eq!(contents(&pulled), vec![111, 222, 333]);
        assert!(pulled.is_settled());
        assert_eq!(pulled.capacity(), 12);
        assert!(!pulled.has_destructor());

        let single = array.pull(1, 1).unwrap();
        assert_eq!(contents(&single), vec![222]);
    }

    #[test]
    fn test_pull_negative_and_reverse() {
        let array = sample();
        assert_eq!(contents(&array.pull(0, -1).unwrap()), vec![111, 222, 333]);
        assert_eq!(contents(&array.pull(-1, 0).unwrap()), vec![333, 222, 111]);
        assert_eq!(contents(&array.pull(-2, -1).unwrap()), vec![222, 333]);
        assert_eq!(contents(&array.pull(2, 1).unwrap()), vec![333, 222]);
    }

    #[test]
    fn test_pull_out_of_range() {
        let array = sample();
        assert!(array.pull(0, 3).unwrap_err().is_invalid_arg());
        assert!(array.pull(-3, 0).unwrap_err().is_invalid_arg());
        assert!(array.pull(isize::MIN, 0).unwrap_err().is_invalid_arg());

        let empty = RawArray::create(4, 0, None).unwrap();
        assert!(empty.pull(0, 0).is_err());
    }

    #[test]
    fn test_pull_result_is_settled() {
        let array = sample();
        let mut pulled = array.pull(0, 1).unwrap();
        assert!(pulled.push(&ints(&[7])).unwrap_err().is_settled());
        pulled.unsettle();
        pulled.push(&ints(&[7])).unwrap();
        assert_eq!(contents(&pulled), vec![111, 222, 7]);
    }

    #[test]
    fn test_pull_shares_budget() {
        let alloc = BudgetAllocator::new(1024);
        let mut array = RawArray::create_in(4, 8, None, alloc.clone()).unwrap();
        array.append(&ints(&[1, 2, 3, 4])).unwrap();
        let before = alloc.remaining();
        let pulled = array.pull(3, 0).unwrap();
        assert_eq!(alloc.remaining(), before - 16);
        assert_eq!(contents(&pulled), vec![4, 3, 2, 1]);
        drop(pulled);
        assert_eq!(alloc.remaining(), before);
    }

    #[test]
    fn test_filter() {
        let array = RawArray::from_bytes(4, &ints(&[1, 2, 3, 4, 5, 6])).unwrap();
        let even = array
            .filter(|e| i32::from_ne_bytes(e.try_into().unwrap()) % 2 == 0)
            .unwrap();
        assert_eq!(contents(&even), vec![2, 4, 6]);
        assert!(!even.is_settled());

        let none = array.filter(|_| false).unwrap();
        assert!(none.is_empty());
    }
}
