//! Page and frontier bookkeeping for one arena
//!
//! ## Invariants
//!
//! - `origin <= base < origin + word_size`
//! - `base <= frontier <= origin + pages_held * page_size`
//! - with at least one page held, `frontier >= origin + (pages_held - 1) * page_size`
//!
//! `origin` is the raw heap break and anchors page accounting; `base` is
//! the first word-aligned address at or above it and anchors offsets.
//!
//! The second invariant holds because growth only happens when an
//! allocation overruns the held pages, and an allocation is never larger
//! than a page. It is what lets a single deallocation release at most one
//! page, however deep the arena has grown.
//!
//! ## Memory Layout
//! ```text
//! [origin][base]----[page 0]----[page 1]----[frontier]----[limit]
//!                              ^ last page extended into
//! ```

#[cfg(feature = "logging")]
use tracing::debug;

use crate::error::HeapError;
use crate::heap::HeapExtension;
use crate::utils::align_up;

/// The owned address range of one allocator
///
/// `Arena` is `Copy` so the allocator can stage changes on a local copy and
/// commit them only once every fallible step has succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arena {
    origin: usize,
    base: usize,
    frontier: usize,
    pages_held: usize,
    page_size: usize,
}

impl Arena {
    /// An empty arena anchored at the given heap break
    ///
    /// Returns `None` when rounding the break up to `word_size` overflows.
    pub(crate) fn at_break(origin: usize, word_size: usize, page_size: usize) -> Option<Self> {
        let base = align_up(origin, word_size)?;
        Some(Self {
            origin,
            base,
            frontier: base,
            pages_held: 0,
            page_size,
        })
    }

    /// Heap break the arena was anchored at
    pub fn origin(&self) -> usize {
        self.origin
    }

    /// Address of the first word-aligned byte of the arena
    pub fn base(&self) -> usize {
        self.base
    }

    /// Address of the next free byte
    pub fn frontier(&self) -> usize {
        self.frontier
    }

    /// Number of whole pages obtained from the heap
    pub fn pages_held(&self) -> usize {
        self.pages_held
    }

    /// Size of one page
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// One past the last held byte
    pub fn limit(&self) -> usize {
        self.origin + self.held()
    }

    /// Bytes between base and frontier
    pub fn used(&self) -> usize {
        self.frontier - self.base
    }

    /// Bytes held from the heap
    pub fn held(&self) -> usize {
        self.pages_held * self.page_size
    }

    /// Bytes between frontier and limit
    pub fn available(&self) -> usize {
        self.limit().saturating_sub(self.frontier)
    }

    /// Start of the page the arena last extended into
    pub fn last_page_start(&self) -> Option<usize> {
        self.pages_held
            .checked_sub(1)
            .map(|page| self.origin + page * self.page_size)
    }

    /// Whether carving `aligned` bytes would overrun the held pages
    pub fn needs_page(&self, aligned: usize) -> bool {
        self.frontier
            .checked_add(aligned)
            .is_none_or(|end| end > self.limit())
    }

    /// Whether the frontier has retreated below the last page extended into
    pub fn should_release(&self) -> bool {
        self.last_page_start()
            .is_some_and(|start| self.frontier < start)
    }

    /// Obtains one more page from the heap
    pub(crate) fn grow<H: HeapExtension>(&mut self, heap: &mut H) -> Result<(), HeapError> {
        heap.request_pages(1)?;
        self.pages_held += 1;

        #[cfg(feature = "logging")]
        debug!(
            pages_held = self.pages_held,
            limit = self.limit(),
            "scratch arena grew by one page"
        );

        Ok(())
    }

    /// Hands the last page back to the heap
    pub(crate) fn shrink<H: HeapExtension>(&mut self, heap: &mut H) -> Result<(), HeapError> {
        debug_assert!(self.pages_held > 0);
        heap.request_pages(-1)?;
        self.pages_held -= 1;

        #[cfg(feature = "logging")]
        debug!(
            pages_held = self.pages_held,
            frontier = self.frontier,
            "scratch arena released one page"
        );

        Ok(())
    }

    /// Advances the frontier by `aligned` bytes and returns the offset of
    /// the carved region
    pub(crate) fn bump(&mut self, aligned: usize) -> usize {
        let offset = self.used();
        self.frontier += aligned;
        debug_assert!(self.frontier <= self.limit());
        offset
    }

    /// Moves the frontier back to `offset` bytes from base
    pub(crate) fn retreat_to(&mut self, offset: usize) {
        debug_assert!(offset <= self.used());
        self.frontier = self.base + offset;
    }
}
