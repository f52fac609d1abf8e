//! The process program break
//!
//! # Safety
//!
//! `sbrk(2)` moves a single process-wide pointer. Memory between the old and
//! the new break belongs to whoever moved it, so this source is only sound
//! while nothing else in the process (including the global allocator) moves
//! the break between our requests. That contract is why construction is
//! `unsafe`.

use std::io;
use std::marker::PhantomData;

use super::HeapExtension;
use crate::error::HeapError;
use crate::utils::system_page_size;

/// Heap extension through `sbrk(2)`
#[derive(Debug)]
pub struct ProgramBreak {
    page_size: usize,
    /// The break is process state; keep the handle on one thread.
    _not_send: PhantomData<*mut u8>,
}

impl ProgramBreak {
    /// Uses the system page size
    ///
    /// # Safety
    /// No other code may move the program break while the returned value,
    /// or an allocator built on it, is in use.
    pub unsafe fn new() -> Self {
        // SAFETY: forwarded caller contract.
        unsafe { Self::with_page_size(system_page_size()) }
    }

    /// Uses a caller-chosen page granularity
    ///
    /// # Safety
    /// Same contract as [`ProgramBreak::new`].
    pub unsafe fn with_page_size(page_size: usize) -> Self {
        Self {
            page_size,
            _not_send: PhantomData,
        }
    }
}

impl HeapExtension for ProgramBreak {
    fn page_size(&self) -> usize {
        self.page_size
    }

    fn request_pages(&mut self, pages: isize) -> Result<usize, HeapError> {
        let increment = isize::try_from(self.page_size)
            .ok()
            .and_then(|size| pages.checked_mul(size))
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "break increment overflows"))?;

        // SAFETY: FFI call to libc sbrk.
        // - the caller of `new` guarantees exclusive control of the break
        // - sbrk returns the previous break or (void*)-1 on failure
        let previous = unsafe { libc::sbrk(increment) };

        if previous as isize == -1 {
            Err(io::Error::last_os_error().into())
        } else {
            Ok((previous as usize).wrapping_add_signed(increment))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_reports_current_break() {
        // SAFETY: a zero-page request never moves the break.
        let mut brk = unsafe { ProgramBreak::new() };
        let first = brk.current_break().unwrap();
        assert_ne!(first, 0);
        assert!(brk.page_size().is_power_of_two());
    }
}
