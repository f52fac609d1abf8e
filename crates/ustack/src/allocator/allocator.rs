//! Main stack allocator implementation
//!
//! # Safety
//!
//! The allocator hands out raw pointers into pages it obtained from its
//! [`HeapExtension`]:
//! - Every returned buffer lies inside `[base, base + pages_held * page_size)`
//! - A buffer stays valid until the deallocation that pops its record (or a
//!   `release`/`reset` that pops it), after which its page may be returned
//!   to the heap
//! - Fill patterns are only written inside the carved region of the record
//!   being pushed or popped
//!
//! ## Invariants
//!
//! - Records on the stack are contiguous and ordered by offset
//! - The frontier equals the end of the top record, or base when empty
//! - A failed call leaves the arena and the record stack exactly as before
//!
//! ## Thread Safety
//!
//! None. Every mutating operation takes `&mut self`; callers that share an
//! allocator across threads must serialise access themselves.

use core::ptr::{self, NonNull};
use std::io;

#[cfg(feature = "logging")]
use tracing::{trace, warn};

use super::{StackMarker, StackStats};
use crate::arena::Arena;
use crate::config::StackConfig;
use crate::error::{AllocError, AllocResult, ConfigError, DeallocError, DeallocResult, HeapError};
use crate::heap::HeapExtension;
use crate::record::{AllocationRecord, RecordStack};
use crate::utils::align_up;

/// Stack allocator that supports LIFO allocation and deallocation
///
/// The arena starts empty and is anchored lazily at the heap break on the
/// first allocation. It grows one page at a time as allocations overrun the
/// held pages and gives pages back as deallocations retreat below them.
///
/// # Memory Layout
/// ```text
/// [base]----[alloc1]----[alloc2]----[alloc3]----[frontier]----[limit]
///            <------ allocated ------>           <-- available -->
/// ```
///
/// Deallocations happen in reverse order: alloc3, then alloc2, then alloc1.
///
/// # Example
/// ```
/// use ustack::{ReservedHeap, StackAllocator};
///
/// let heap = ReservedHeap::new(4)?;
/// let mut stack = StackAllocator::new(heap)?;
///
/// let first = stack.allocate(10)?;
/// let second = stack.allocate(500)?;
/// assert_eq!(second.cast::<u8>().as_ptr() as usize, first.cast::<u8>().as_ptr() as usize + 12);
///
/// assert_eq!(stack.deallocate()?, 500);
/// assert_eq!(stack.deallocate()?, 10);
/// assert!(stack.deallocate().is_err());
/// # Ok::<(), ustack::StackError>(())
/// ```
#[derive(Debug)]
pub struct StackAllocator<H: HeapExtension> {
    heap: H,
    config: StackConfig,
    /// `None` until the first successful allocation anchors the arena
    arena: Option<Arena>,
    records: RecordStack,
    stats: StackStats,
}

impl<H: HeapExtension> StackAllocator<H> {
    /// Creates a new stack allocator with default configuration
    pub fn new(heap: H) -> Result<Self, ConfigError> {
        Self::with_config(heap, StackConfig::default())
    }

    /// Creates a new stack allocator with custom configuration
    pub fn with_config(heap: H, config: StackConfig) -> Result<Self, ConfigError> {
        config.validate(heap.page_size())?;
        Ok(Self {
            heap,
            config,
            arena: None,
            records: RecordStack::new(),
            stats: StackStats::default(),
        })
    }

    /// Creates a production-optimized stack allocator
    pub fn production(heap: H) -> Result<Self, ConfigError> {
        Self::with_config(heap, StackConfig::production())
    }

    /// Creates a debug-optimized stack allocator
    pub fn debug(heap: H) -> Result<Self, ConfigError> {
        Self::with_config(heap, StackConfig::debug())
    }

    /// Allocates `length` bytes on top of the stack
    ///
    /// The length is rounded up to the configured word size; the returned
    /// slice covers the requested `length` and starts at a word-aligned
    /// address, even when the heap break itself is not aligned.
    pub fn allocate(&mut self, length: usize) -> AllocResult<NonNull<[u8]>> {
        let max = self.config.max_alloc;
        let aligned = match align_up(length, self.config.word_size) {
            Some(aligned) if aligned <= max => aligned,
            aligned => {
                self.note_failure();
                return Err(AllocError::too_large(length, aligned.unwrap_or(usize::MAX), max));
            }
        };

        // Work on a copy; nothing is committed until every fallible step is done.
        let mut arena = match self.arena {
            Some(arena) => arena,
            None => {
                let word_size = self.config.word_size;
                let page_size = self.heap.page_size();
                let anchored = self.heap.current_break().and_then(|origin| {
                    Arena::at_break(origin, word_size, page_size).ok_or_else(|| {
                        io::Error::new(io::ErrorKind::AddrNotAvailable, "heap break cannot be word-aligned")
                            .into()
                    })
                });
                match anchored {
                    Ok(arena) => arena,
                    Err(source) => {
                        self.note_failure();
                        return Err(AllocError::out_of_memory(0, source));
                    }
                }
            }
        };

        // One page, unless an unaligned break left the first page short.
        let mut grown = 0;
        while arena.needs_page(aligned) {
            if let Err(source) = arena.grow(&mut self.heap) {
                self.roll_back(&mut arena, grown);
                self.note_failure();
                return Err(AllocError::out_of_memory(arena.pages_held(), source));
            }
            grown += 1;
        }

        let Some(ptr) = NonNull::new(arena.frontier() as *mut u8) else {
            self.roll_back(&mut arena, grown);
            self.note_failure();
            return Err(AllocError::out_of_memory(
                arena.pages_held(),
                HeapError::Os(io::Error::new(io::ErrorKind::AddrNotAvailable, "heap break is null")),
            ));
        };

        let offset = arena.bump(aligned);
        self.arena = Some(arena);
        self.records.push(AllocationRecord {
            offset,
            length,
            aligned,
        });

        if let Some(pattern) = self.config.alloc_pattern {
            // SAFETY: Writing pattern to newly carved memory.
            // - [ptr, ptr + aligned) lies inside the held pages (needs_page/grow above)
            // - length <= aligned
            // - the region belongs to the record just pushed
            unsafe { ptr::write_bytes(ptr.as_ptr(), pattern, length) };
        }

        if self.config.track_stats {
            self.stats.allocations += 1;
            self.stats.pages_grown += grown;
            self.stats.peak_used = self.stats.peak_used.max(arena.used());
        }

        #[cfg(feature = "logging")]
        trace!(length, aligned, offset, depth = self.records.depth(), "scratch allocate");

        Ok(NonNull::slice_from_raw_parts(ptr, length))
    }

    /// Pops the most recent allocation and returns its requested length
    ///
    /// Releases one page back to the heap when the frontier retreats below
    /// the page the arena last extended into. A heap that refuses the release
    /// keeps the page held; the deallocation still succeeds.
    pub fn deallocate(&mut self) -> DeallocResult<usize> {
        let record = self.records.pop().ok_or(DeallocError::EmptyStack)?;

        let mut released = false;
        if let Some(arena) = self.arena.as_mut() {
            if let Some(pattern) = self.config.dealloc_pattern {
                // SAFETY: Scrubbing memory of the record being popped.
                // - the region [offset, offset + aligned) is still inside held pages
                // - no page has been released yet for this call
                unsafe {
                    ptr::write_bytes((arena.base() + record.offset) as *mut u8, pattern, record.aligned);
                }
            }

            arena.retreat_to(record.offset);

            if arena.should_release() {
                match arena.shrink(&mut self.heap) {
                    Ok(()) => released = true,
                    Err(_error) => {
                        #[cfg(feature = "logging")]
                        warn!(error = %_error, pages_held = arena.pages_held(), "heap refused page release");
                    }
                }
            }
        }

        if self.config.track_stats {
            self.stats.deallocations += 1;
            self.stats.pages_released += usize::from(released);
        }

        #[cfg(feature = "logging")]
        trace!(length = record.length, offset = record.offset, depth = self.records.depth(), "scratch deallocate");

        Ok(record.length)
    }

    /// Creates a marker at the current stack position
    ///
    /// Releasing the marker later pops every allocation made after it.
    pub fn mark(&self) -> StackMarker {
        StackMarker {
            depth: self.records.depth(),
            offset: self.arena.map_or(0, |arena| arena.used()),
        }
    }

    /// Pops every allocation made after `marker` and returns how many were
    /// popped
    ///
    /// Fails with [`DeallocError::StaleMarker`] when the stack has already
    /// been unwound below the marker, or unwound and rebuilt so the marker no
    /// longer names a live position. Nothing is popped in that case.
    pub fn release(&mut self, marker: StackMarker) -> DeallocResult<usize> {
        let depth = self.records.depth();
        let stale = DeallocError::StaleMarker {
            marker_depth: marker.depth,
            depth,
        };
        if marker.depth > depth {
            return Err(stale);
        }
        let position = self
            .records
            .get(marker.depth)
            .map_or_else(|| self.mark().offset, |record| record.offset);
        if position != marker.offset {
            return Err(stale);
        }

        let popped = depth - marker.depth;
        for _ in 0..popped {
            self.deallocate()?;
        }
        Ok(popped)
    }

    /// Pops every live allocation and returns how many were popped
    ///
    /// Afterwards the frontier is back at base. Every page but the first is
    /// handed back unless the heap refuses a release, in which case the
    /// refusal is logged and the remaining pages stay held.
    pub fn reset(&mut self) -> usize {
        let mut popped = 0;
        while self.deallocate().is_ok() {
            popped += 1;
        }

        // Retry releases refused along the way.
        let mut released = 0;
        if let Some(arena) = self.arena.as_mut() {
            while arena.should_release() {
                if let Err(_error) = arena.shrink(&mut self.heap) {
                    #[cfg(feature = "logging")]
                    warn!(error = %_error, pages_held = arena.pages_held(), "heap refused page release on reset");
                    break;
                }
                released += 1;
            }
        }
        if self.config.track_stats {
            self.stats.pages_released += released;
        }

        popped
    }

    /// Opens a scope whose allocations are popped when it is dropped
    pub fn frame(&mut self) -> super::StackFrame<'_, H> {
        super::StackFrame::new(self)
    }

    /// Number of live allocations
    pub fn depth(&self) -> usize {
        self.records.depth()
    }

    /// Whether no allocation is live
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The most recent allocation record
    pub fn peek(&self) -> Option<&AllocationRecord> {
        self.records.top()
    }

    /// Live allocation records, most recent first
    pub fn records(&self) -> impl Iterator<Item = &AllocationRecord> + '_ {
        self.records.iter()
    }

    /// Whether the arena has been anchored at the heap break yet
    pub fn is_initialized(&self) -> bool {
        self.arena.is_some()
    }

    /// Snapshot of the arena bookkeeping, `None` before the first allocation
    pub fn arena(&self) -> Option<Arena> {
        self.arena
    }

    /// Address of the first arena byte
    pub fn base(&self) -> Option<usize> {
        self.arena.map(|arena| arena.base())
    }

    /// Address of the next free byte
    pub fn frontier(&self) -> Option<usize> {
        self.arena.map(|arena| arena.frontier())
    }

    /// Returns the amount of memory currently allocated
    pub fn used(&self) -> usize {
        self.arena.map_or(0, |arena| arena.used())
    }

    /// Returns the amount of memory held from the heap
    pub fn held(&self) -> usize {
        self.arena.map_or(0, |arena| arena.held())
    }

    /// Returns the amount of held memory not yet allocated
    pub fn available(&self) -> usize {
        self.arena.map_or(0, |arena| arena.available())
    }

    /// Number of whole pages held from the heap
    pub fn pages_held(&self) -> usize {
        self.arena.map_or(0, |arena| arena.pages_held())
    }

    /// Active configuration
    pub fn config(&self) -> &StackConfig {
        &self.config
    }

    /// The heap the arena draws pages from
    pub fn heap(&self) -> &H {
        &self.heap
    }

    /// Mutable access to the heap
    ///
    /// Moving the break through this handle while pages are held breaks the
    /// arena's accounting.
    pub fn heap_mut(&mut self) -> &mut H {
        &mut self.heap
    }

    /// Counters collected so far
    pub fn stats(&self) -> StackStats {
        StackStats {
            depth: self.records.depth(),
            used: self.used(),
            pages_held: self.pages_held(),
            ..self.stats
        }
    }

    /// Zeroes the counters
    pub fn reset_stats(&mut self) {
        self.stats = StackStats::default();
    }

    /// Hands back the pages a failed allocation grew on a staged arena
    fn roll_back(&mut self, arena: &mut Arena, grown: usize) {
        for _ in 0..grown {
            if let Err(_error) = arena.shrink(&mut self.heap) {
                #[cfg(feature = "logging")]
                warn!(error = %_error, pages_held = arena.pages_held(), "heap refused rollback of a grown page");
                break;
            }
        }
    }

    fn note_failure(&mut self) {
        if self.config.track_stats {
            self.stats.failed_allocations += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heap::ReservedHeap;

    fn stack(pages: usize) -> StackAllocator<ReservedHeap> {
        StackAllocator::with_config(ReservedHeap::new(pages).unwrap(), StackConfig::debug()).unwrap()
    }

    fn addr(buffer: NonNull<[u8]>) -> usize {
        buffer.cast::<u8>().as_ptr() as usize
    }

    #[test]
    fn test_lazy_init_anchors_at_break() {
        let mut stack = stack(2);
        assert!(!stack.is_initialized());
        assert_eq!(stack.heap().grow_requests(), 0);

        let buffer = stack.allocate(1).unwrap();
        assert_eq!(Some(addr(buffer)), stack.base());
        assert_eq!(stack.base(), Some(stack.heap().start()));
        assert_eq!(stack.pages_held(), 1);
    }

    #[test]
    fn test_too_large_does_not_initialize() {
        let mut stack = stack(2);
        let err = stack.allocate(513).unwrap_err();
        assert!(matches!(
            err,
            AllocError::TooLarge {
                requested: 513,
                aligned: 516,
                max: 512
            }
        ));
        assert!(!stack.is_initialized());
        assert_eq!(stack.stats().failed_allocations, 1);
    }

    #[test]
    fn test_overflowing_length_is_too_large() {
        let mut stack = stack(1);
        assert!(matches!(
            stack.allocate(usize::MAX),
            Err(AllocError::TooLarge { aligned: usize::MAX, .. })
        ));
    }

    #[test]
    fn test_alloc_pattern_fills_requested_bytes() {
        let mut stack = stack(1);
        let buffer = stack.allocate(6).unwrap();
        // SAFETY: buffer is live and 6 bytes long.
        let bytes = unsafe { buffer.as_ref() };
        assert_eq!(bytes.len(), 6);
        assert!(bytes.iter().all(|&b| b == 0xCC));
    }

    #[test]
    fn test_dealloc_pattern_scrubs_popped_bytes() {
        let mut stack = stack(1);
        stack.allocate(4).unwrap();
        let buffer = stack.allocate(8).unwrap();
        let start = addr(buffer);
        stack.deallocate().unwrap();

        // SAFETY: the first page is still held, so the scrubbed bytes are readable.
        let bytes = unsafe { core::slice::from_raw_parts(start as *const u8, 8) };
        assert!(bytes.iter().all(|&b| b == 0xDD));
    }

    #[test]
    fn test_peek_and_records() {
        let mut stack = stack(1);
        stack.allocate(3).unwrap();
        stack.allocate(9).unwrap();

        let top = stack.peek().copied().unwrap();
        assert_eq!(top.length, 9);
        assert_eq!(top.offset, 4);
        assert_eq!(top.aligned, 12);

        let lengths: Vec<_> = stack.records().map(|r| r.length).collect();
        assert_eq!(lengths, vec![9, 3]);
    }

    #[test]
    fn test_stats_track_pages() {
        let mut stack = stack(3);
        for _ in 0..9 {
            stack.allocate(512).unwrap();
        }
        let stats = stack.stats();
        assert_eq!(stats.allocations, 9);
        assert_eq!(stats.pages_grown, 2);
        assert_eq!(stats.pages_held, 2);
        assert_eq!(stats.peak_used, 9 * 512);

        stack.reset();
        let stats = stack.stats();
        assert_eq!(stats.deallocations, 9);
        assert_eq!(stats.pages_released, 1);
        assert_eq!(stats.depth, 0);
        assert_eq!(stats.used, 0);
    }

    #[test]
    fn test_untracked_stats_stay_zero() {
        let heap = ReservedHeap::new(1).unwrap();
        let mut stack = StackAllocator::with_config(heap, StackConfig::performance()).unwrap();
        stack.allocate(8).unwrap();
        stack.deallocate().unwrap();
        assert_eq!(stack.stats().allocations, 0);
        assert_eq!(stack.stats().deallocations, 0);
    }

    #[test]
    fn test_rejects_config_larger_than_page() {
        let heap = ReservedHeap::with_page_size(1, 256).unwrap();
        assert!(matches!(
            StackAllocator::new(heap),
            Err(ConfigError::MaxAllocExceedsPage { .. })
        ));
    }
}
