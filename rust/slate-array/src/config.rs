//! Sizing parameters for new buffers.

use slate_common::{Result, checked, verify_arg};

use crate::align::align_up;

/// Element count used when a buffer is created with a zero hint.
///
/// This is also the floor, in bytes, of the first capacity doubling.
pub const DEFAULT_HINT: usize = 128;

/// Number of (pointer, size) events kept in the allocation history ring.
pub const TRACE_DEPTH: usize = 10;

/// Alignment unit of every backing block and of every capacity chosen by the
/// growth policy: the machine word.
pub const ALIGNMENT: usize = std::mem::size_of::<usize>();

/// Creation parameters of a [`RawArray`](crate::RawArray).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArrayConfig {
    /// Byte width of one element. Must be non-zero.
    pub element_size: usize,

    /// Initial element-count hint; `0` selects [`DEFAULT_HINT`].
    pub hint: usize,
}

impl ArrayConfig {
    pub fn new(element_size: usize, hint: usize) -> ArrayConfig {
        ArrayConfig { element_size, hint }
    }

    /// The hint actually used for the first allocation.
    pub fn effective_hint(&self) -> usize {
        if self.hint == 0 {
            DEFAULT_HINT
        } else {
            self.hint
        }
    }

    /// Validates the parameters and computes the initial capacity in bytes.
    ///
    /// Fails on a zero element size and on any overflow of
    /// `element_size * hint` or of its alignment.
    pub fn validate(&self) -> Result<usize> {
        verify_arg!(element_size, self.element_size != 0);
        let bytes = checked!(self.element_size.checked_mul(self.effective_hint()));
        Ok(checked!(align_up(bytes, ALIGNMENT)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_hint() {
        let config = ArrayConfig::new(4, 0);
        assert_eq!(config.effective_hint(), DEFAULT_HINT);
        assert_eq!(config.validate().unwrap(), 4 * DEFAULT_HINT);
    }

    #[test]
    fn test_capacity_is_word_aligned() {
        let config = ArrayConfig::new(3, 3);
        assert_eq!(config.validate().unwrap() % ALIGNMENT, 0);
        assert!(config.validate().unwrap() >= 9);
    }

    #[test]
    fn test_invalid_configs() {
        assert!(ArrayConfig::new(0, 16).validate().unwrap_err().is_invalid_arg());
        assert!(ArrayConfig::new(0, 0).validate().unwrap_err().is_invalid_arg());
        assert!(
            ArrayConfig::new(usize::MAX / 2, 4)
                .validate()
                .unwrap_err()
                .is_overflow()
        );
        assert!(
            ArrayConfig::new(4, usize::MAX / 2)
                .validate()
                .unwrap_err()
                .is_overflow()
        );
    }
}
