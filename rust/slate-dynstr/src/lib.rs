//! A growable NUL-terminated byte string built on [`RawArray`].
//!
//! [`DynStr`] is a buffer of 1-byte elements whose last live byte is always the
//! terminator `0`. Everything else (growth, settling, diagnostics) is the buffer's
//! own behavior. Positions taken by the string operations index the printable
//! bytes only, so no operation can move the terminator in front of payload bytes.

use std::fmt;

use slate_array::RawArray;
use slate_common::{Result, checked, verify_arg};

pub struct DynStr {
    raw: RawArray,
}

impl DynStr {
    /// Creates an empty string with room for at least `n` printable bytes plus the
    /// terminator.
    pub fn create(n: usize) -> Result<DynStr> {
        let hint = checked!(n.checked_add(1));
        let mut raw = RawArray::create(1, hint, None)?;
        raw.push(&[0])?;
        log::trace!("created string with room for {n} bytes");
        Ok(DynStr { raw })
    }

    /// Creates a string holding a copy of `src`.
    ///
    /// Copying stops at the first NUL in `src`, and after `max` bytes when given.
    pub fn assign(src: &[u8], max: Option<usize>) -> Result<DynStr> {
        let payload = payload(src, max);
        let mut string = DynStr::create(payload.len())?;
        string.raw.inject(0, payload)?;
        Ok(string)
    }

    /// Appends `src` at the end of the printable bytes.
    ///
    /// Copying stops at the first NUL in `src`, and after `max` bytes when given.
    pub fn append(&mut self, src: &[u8], max: Option<usize>) -> Result<()> {
        let len = self.len();
        self.raw.inject(len, payload(src, max))
    }

    /// Inserts `src` before printable position `pos` (`pos <= len`), with the same
    /// copy limits as [`append`](Self::append).
    pub fn inject(&mut self, pos: usize, src: &[u8], max: Option<usize>) -> Result<()> {
        verify_arg!(pos, pos <= self.len());
        self.raw.inject(pos, payload(src, max))
    }

    /// Removes the printable bytes in `start..end` (`start < end <= len`).
    pub fn wipe(&mut self, start: usize, end: usize) -> Result<()> {
        verify_arg!(end, end <= self.len());
        self.raw.wipe(start, end)
    }

    /// Removes every printable byte, keeping the terminator and the capacity.
    pub fn clear(&mut self) {
        let len = self.len();
        if len != 0 {
            // `0 < len < raw.len()`, so the range is always valid.
            if let Err(e) = self.raw.wipe(0, len) {
                log::warn!("clearing string failed: {e}");
            }
        }
    }

    /// Settles the string: its storage will no longer move or grow.
    pub fn done(&mut self) {
        self.raw.settle();
    }

    pub fn is_settled(&self) -> bool {
        self.raw.is_settled()
    }

    /// Makes room for `n` more printable bytes.
    pub fn adjust(&mut self, n: usize) -> Result<()> {
        self.raw.ensure_capacity(n)
    }

    /// Size of the reserved storage in bytes, terminator included.
    pub fn capacity(&self) -> usize {
        self.raw.capacity()
    }

    /// Number of printable bytes (the terminator excluded).
    #[inline]
    pub fn len(&self) -> usize {
        self.raw.len() - 1
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.raw.data()[..self.len()]
    }

    pub fn as_bytes_with_nul(&self) -> &[u8] {
        self.raw.data()
    }

    pub fn to_str(&self) -> std::result::Result<&str, std::str::Utf8Error> {
        std::str::from_utf8(self.as_bytes())
    }

    /// Copies the inclusive range of printable bytes between `start` and `end` into
    /// a new settled byte buffer, reversed when `start` comes after `end`.
    ///
    /// Negative positions count back from the last printable byte; both positions
    /// must satisfy `|pos| < len`.
    pub fn pull(&self, start: isize, end: isize) -> Result<RawArray> {
        let len = self.len();
        verify_arg!(start, start.unsigned_abs() < len);
        verify_arg!(end, end.unsigned_abs() < len);
        // The buffer itself would count negative positions from the terminator.
        let start = if start < 0 { start + len as isize } else { start };
        let end = if end < 0 { end + len as isize } else { end };
        self.raw.pull(start, end)
    }

    pub fn as_raw(&self) -> &RawArray {
        &self.raw
    }
}

impl fmt::Display for DynStr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(self.as_bytes()))
    }
}

impl fmt::Debug for DynStr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynStr")
            .field("value", &String::from_utf8_lossy(self.as_bytes()))
            .field("cap", &self.capacity())
            .field("settled", &self.is_settled())
            .finish()
    }
}

/// The prefix of `src` before its first NUL, capped at `max` bytes.
fn payload(src: &[u8], max: Option<usize>) -> &[u8] {
    let len = src.iter().position(|&b| b == 0).unwrap_or(src.len());
    &src[..max.map_or(len, |max| max.min(len))]
}

#[cfg(test)]
mod tests {
    use super::DynStr;

    #[test]
    fn test_create() {
        let s = DynStr::create(10).unwrap();
        assert!(s.is_empty());
        assert_eq!(s.as_bytes_with_nul(), b"\0");
        assert!(s.capacity() >= 11);
        assert_eq!(s.to_string(), "");
        assert!(DynStr::create(usize::MAX).unwrap_err().is_overflow());
    }

    #[test]
    fn test_assign() {
        let s = DynStr::assign(b"hello", None).unwrap();
        assert_eq!(s.len(), 5);
        assert_eq!(s.as_bytes_with_nul(), b"hello\0");
        assert_eq!(s.to_str().unwrap(), "hello");

        let s = DynStr::assign(b"hello", Some(3)).unwrap();
        assert_eq!(s.as_bytes(), b"hel");
        let s = DynStr::assign(b"hello", Some(99)).unwrap();
        assert_eq!(s.as_bytes(), b"hello");
        let s = DynStr::assign(b"he\0llo", None).unwrap();
        assert_eq!(s.as_bytes(), b"he");
        let s = DynStr::assign(b"", None).unwrap();
        assert!(s.is_empty());
    }

    #[test]
    fn test_append_and_inject() {
        let mut s = DynStr::create(0).unwrap();
        s.append(b"world", None).unwrap();
        s.inject(0, b"hello ", None).unwrap();
        s.append(b"!\0ignored", None).unwrap();
        assert_eq!(s.to_str().unwrap(), "hello world!");
        s.inject(5, b",", None).unwrap();
        assert_eq!(s.to_string(), "hello, world!");
        assert_eq!(s.as_bytes_with_nul().last(), Some(&0));

        assert!(s.inject(s.len() + 1, b"x", None).unwrap_err().is_invalid_arg());
        assert_eq!(s.to_string(), "hello, world!");
    }

    #[test]
    fn test_append_and_inject_with_limit() {
        let mut s = DynStr::assign(b"ad", None).unwrap();
        s.append(b"efgh", Some(2)).unwrap();
        assert_eq!(s.as_bytes_with_nul(), b"adef\0");
        s.inject(1, b"bcxyz", Some(2)).unwrap();
        assert_eq!(s.to_str().unwrap(), "abcdef");
        s.append(b"gh\0ij", Some(10)).unwrap();
        assert_eq!(s.to_str().unwrap(), "abcdefgh");
        s.inject(0, b"zz", Some(0)).unwrap();
        s.append(b"", Some(4)).unwrap();
        assert_eq!(s.to_str().unwrap(), "abcdefgh");
        assert!(s.inject(9, b"z", Some(1)).unwrap_err().is_invalid_arg());
        assert_eq!(s.as_bytes_with_nul().last(), Some(&0));
    }

    #[test]
    fn test_wipe_and_clear() {
        let mut s = DynStr::assign(b"abcdef", None).unwrap();
        s.wipe(1, 3).unwrap();
        assert_eq!(s.as_bytes(), b"adef");
        assert!(s.wipe(2, 5).unwrap_err().is_invalid_arg());
        assert!(s.wipe(2, 2).unwrap_err().is_invalid_arg());
        s.wipe(2, 4).unwrap();
        assert_eq!(s.as_bytes_with_nul(), b"ad\0");

        let cap = s.capacity();
        s.clear();
        assert!(s.is_empty());
        assert_eq!(s.as_bytes_with_nul(), b"\0");
        assert_eq!(s.capacity(), cap);
        s.clear();
        assert!(s.is_empty());
    }

    #[test]
    fn test_done_and_adjust() {
        let mut s = DynStr::create(4).unwrap();
        s.adjust(100).unwrap();
        assert!(s.capacity() >= 101);
        let cap = s.capacity();
        s.done();
        assert!(s.is_settled());
        s.append(&vec![b'x'; cap - 1], None).unwrap();
        assert!(s.append(b"y", None).unwrap_err().is_settled());
        assert!(s.adjust(1).unwrap_err().is_settled());
        assert_eq!(s.len(), cap - 1);
    }

    #[test]
    fn test_pull() {
        let s = DynStr::assign(b"abcdef", None).unwrap();
        assert_eq!(s.pull(0, -1).unwrap().data(), b"abcdef");
        assert_eq!(s.pull(-1, 0).unwrap().data(), b"fedcba");
        assert_eq!(s.pull(1, 3).unwrap().data(), b"bcd");
        assert_eq!(s.pull(-2, -2).unwrap().data(), b"e");
        assert!(s.pull(0, 6).unwrap_err().is_invalid_arg());
        assert!(s.pull(-6, 0).unwrap_err().is_invalid_arg());
        assert!(s.pull(0, 5).unwrap().is_settled());
    }

    #[test]
    fn test_random_edits_keep_terminator() {
        fastrand::seed(77001);
        let mut s = DynStr::create(0).unwrap();
        let mut model = Vec::<u8>::new();
        for _ in 0..2000 {
            match fastrand::u8(0..3) {
                0 => {
                    let text = (0..fastrand::usize(0..8))
                        .map(|_| fastrand::alphanumeric() as u8)
                        .collect::<Vec<_>>();
                    s.append(&text, None).unwrap();
                    model.extend_from_slice(&text);
                }
                1 => {
                    let pos = fastrand::usize(0..=model.len());
                    let byte = fastrand::lowercase() as u8;
                    s.inject(pos, &[byte], None).unwrap();
                    model.insert(pos, byte);
                }
                _ if !model.is_empty() => {
                    let start = fastrand::usize(0..model.len());
                    let end = fastrand::usize(start + 1..=model.len());
                    s.wipe(start, end).unwrap();
                    model.drain(start..end);
                }
                _ => {}
            }
            assert_eq!(s.as_bytes(), &model[..]);
            assert_eq!(s.as_bytes_with_nul().last(), Some(&0));
        }
    }
}
