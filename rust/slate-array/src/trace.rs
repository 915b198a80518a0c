//! Per-buffer allocation diagnostics.
//!
//! With the `alloc-trace` feature (on by default) every buffer keeps cumulative
//! allocation counters, the current reachable and in-use byte counts, and a ring of
//! the last [`TRACE_DEPTH`] backing-block events. Without the feature [`AllocTrace`]
//! is zero-sized and every recording call compiles to nothing.
//!
//! Diagnostics are write-only from the buffer's point of view: no buffer operation
//! ever reads them back to make a decision.

use std::fmt;
use std::ptr::NonNull;

#[cfg(feature = "alloc-trace")]
use crate::config::TRACE_DEPTH;

/// One backing-block event: the block address and its size after the event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AllocEvent {
    pub address: usize,
    pub size: usize,
}

/// Cumulative allocation counters of a buffer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AllocStats {
    /// Number of blocks obtained (initial allocation plus every reallocation).
    pub allocs: usize,
    /// Number of blocks given back (every reallocation releases the previous block).
    pub frees: usize,
    /// Total bytes ever obtained.
    pub bytes_allocated: usize,
    /// Bytes currently held (the capacity).
    pub bytes_reachable: usize,
    /// Bytes holding live elements.
    pub bytes_in_use: usize,
}

#[cfg(feature = "alloc-trace")]
#[derive(Debug, Clone, Default)]
pub struct AllocTrace {
    stats: AllocStats,
    ring: [AllocEvent; TRACE_DEPTH],
    next: usize,
    recorded: usize,
}

#[cfg(feature = "alloc-trace")]
impl AllocTrace {
    pub const ENABLED: bool = true;

    /// Records the first block of a buffer.
    #[inline]
    pub(crate) fn record_alloc(&mut self, ptr: Option<NonNull<u8>>, size: usize) {
        self.stats.allocs += 1;
        self.stats.bytes_allocated += size;
        self.stats.bytes_reachable = size;
        self.push_event(ptr, size);
    }

    /// Records a block replaced by a reallocation.
    #[inline]
    pub(crate) fn record_realloc(&mut self, ptr: NonNull<u8>, size: usize) {
        self.stats.frees += 1;
        self.stats.allocs += 1;
        self.stats.bytes_allocated += size;
        self.stats.bytes_reachable = size;
        self.push_event(Some(ptr), size);
    }

    /// Records the release of the block without replacement.
    #[inline]
    pub(crate) fn record_release(&mut self) {
        self.stats.frees += 1;
        self.stats.bytes_reachable = 0;
        self.push_event(None, 0);
    }

    #[inline]
    pub(crate) fn set_in_use(&mut self, bytes: usize) {
        self.stats.bytes_in_use = bytes;
    }

    pub fn stats(&self) -> AllocStats {
        self.stats
    }

    /// Returns the recorded events, oldest first.
    pub fn events(&self) -> Vec<AllocEvent> {
        let count = self.recorded.min(TRACE_DEPTH);
        let first = (self.next + TRACE_DEPTH - count) % TRACE_DEPTH;
        (0..count)
            .map(|i| self.ring[(first + i) % TRACE_DEPTH])
            .collect()
    }

    fn push_event(&mut self, ptr: Option<NonNull<u8>>, size: usize) {
        self.ring[self.next] = AllocEvent {
            address: ptr.map_or(0, |p| p.as_ptr().addr()),
            size,
        };
        self.next = (self.next + 1) % TRACE_DEPTH;
        self.recorded += 1;
    }
}

#[cfg(not(feature = "alloc-trace"))]
#[derive(Debug, Clone, Default)]
pub struct AllocTrace;

#[cfg(not(feature = "alloc-trace"))]
impl AllocTrace {
    pub const ENABLED: bool = false;

    #[inline(always)]
    pub(crate) fn record_alloc(&mut self, _ptr: Option<NonNull<u8>>, _size: usize) {}

    #[inline(always)]
    pub(crate) fn record_realloc(&mut self, _ptr: NonNull<u8>, _size: usize) {}

    #[inline(always)]
    pub(crate) fn record_release(&mut self) {}

    #[inline(always)]
    pub(crate) fn set_in_use(&mut self, _bytes: usize) {}

    pub fn stats(&self) -> AllocStats {
        AllocStats::default()
    }

    pub fn events(&self) -> Vec<AllocEvent> {
        Vec::new()
    }
}

/// Human-readable dump of a buffer's diagnostics, see
/// [`RawArray::trace_report`](crate::RawArray::trace_report).
pub struct TraceReport<'a> {
    pub(crate) trace: &'a AllocTrace,
    pub(crate) len: usize,
    pub(crate) element_size: usize,
}

impl fmt::Display for TraceReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !AllocTrace::ENABLED {
            return writeln!(f, "allocation tracing disabled");
        }
        writeln!(f, "ALLOC TRACE:")?;
        let events = self.trace.events();
        for (i, event) in events.iter().enumerate() {
            let marker = if i + 1 == events.len() { " @ " } else { "   " };
            writeln!(f, "{marker}({:#018x}): {:>8}", event.address, event.size)?;
        }
        let stats = self.trace.stats();
        writeln!(f)?;
        writeln!(f, "ARRAY SUMMARY:")?;
        writeln!(
            f,
            " - {} elements of {} bytes:",
            self.len, self.element_size
        )?;
        writeln!(
            f,
            "    - allocations: {} bytes in {} blocks ({} freed)",
            stats.bytes_allocated, stats.allocs, stats.frees
        )?;
        writeln!(
            f,
            "    - in use:      {} bytes out of {} reserved",
            stats.bytes_in_use, stats.bytes_reachable
        )
    }
}

#[cfg(all(test, feature = "alloc-trace"))]
mod tests {
    use super::*;

    #[test]
    fn test_ring_wraps_and_keeps_latest() {
        let mut trace = AllocTrace::default();
        let ptr = NonNull::<u8>::dangling();
        trace.record_alloc(Some(ptr), 8);
        for i in 1..=TRACE_DEPTH + 2 {
            trace.record_realloc(ptr, 8 * (i + 1));
        }
        let events = trace.events();
        assert_eq!(events.len(), TRACE_DEPTH);
        assert_eq!(events.last().unwrap().size, 8 * (TRACE_DEPTH + 3));
        assert_eq!(events.first().unwrap().size, 8 * 4);

        let stats = trace.stats();
        assert_eq!(stats.allocs, TRACE_DEPTH + 3);
        assert_eq!(stats.frees, TRACE_DEPTH + 2);
        assert_eq!(stats.bytes_reachable, 8 * (TRACE_DEPTH + 3));
    }

    #[test]
    fn test_release_resets_reachable() {
        let mut trace = AllocTrace::default();
        trace.record_alloc(Some(NonNull::dangling()), 64);
        trace.set_in_use(16);
        trace.record_release();
        let stats = trace.stats();
        assert_eq!(stats.bytes_reachable, 0);
        assert_eq!(stats.bytes_in_use, 16);
        assert_eq!(stats.frees, 1);
        assert_eq!(trace.events().last().unwrap().address, 0);
    }

    #[test]
    fn test_report_format() {
        let mut trace = AllocTrace::default();
        trace.record_alloc(Some(NonNull::dangling()), 512);
        trace.set_in_use(12);
        let report = TraceReport {
            trace: &trace,
            len: 3,
            element_size: 4,
        }
        .to_string();
        assert!(report.starts_with("ALLOC TRACE:"));
        assert!(report.contains(" - 3 elements of 4 bytes:"));
        assert!(report.contains("allocations: 512 bytes in 1 blocks (0 freed)"));
        assert!(report.contains("in use:      12 bytes out of 512 reserved"));
    }
}
