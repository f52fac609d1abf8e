//! Page-granular heap extension
//!
//! The allocator never touches the process heap directly. It asks a
//! [`HeapExtension`] to move a break up or down by whole pages and keeps its
//! own account of how many pages it holds.
//!
//! ## Implementations
//! - [`ReservedHeap`] - a private, bounded region with its own break cursor
//! - [`ProgramBreak`] - the real process break via `sbrk(2)` (Linux)

mod reserved;
pub use reserved::ReservedHeap;

#[cfg(target_os = "linux")]
mod program_break;
#[cfg(target_os = "linux")]
pub use program_break::ProgramBreak;

use crate::error::HeapError;

/// Page size used when the platform cannot report one
pub const DEFAULT_PAGE_SIZE: usize = 4096;

/// A break that moves in whole pages
///
/// Implementations must be monotonic and page-granular: after a successful
/// `request_pages(n)` the break sits exactly `n * page_size()` bytes away
/// from where it was. The break itself need not be word-aligned; the
/// allocator rounds its base up and keeps counting pages from the raw break.
pub trait HeapExtension {
    /// Size in bytes of one page
    fn page_size(&self) -> usize;

    /// Moves the break by `pages` pages and returns the break address after
    /// the move.
    ///
    /// `+1` grows, `-1` shrinks, `0` only queries. A refused request returns
    /// an error and leaves the break where it was.
    fn request_pages(&mut self, pages: isize) -> Result<usize, HeapError>;

    /// Current break address
    fn current_break(&mut self) -> Result<usize, HeapError> {
        self.request_pages(0)
    }
}

impl<H: HeapExtension + ?Sized> HeapExtension for &mut H {
    fn page_size(&self) -> usize {
        (**self).page_size()
    }

    fn request_pages(&mut self, pages: isize) -> Result<usize, HeapError> {
        (**self).request_pages(pages)
    }
}

impl<H: HeapExtension + ?Sized> HeapExtension for Box<H> {
    fn page_size(&self) -> usize {
        (**self).page_size()
    }

    fn request_pages(&mut self, pages: isize) -> Result<usize, HeapError> {
        (**self).request_pages(pages)
    }
}
