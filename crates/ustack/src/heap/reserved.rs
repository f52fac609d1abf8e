//! Bounded heap backed by a region reserved up front
//!
//! # Safety
//!
//! The region is obtained once at construction and released once on drop:
//! - **Unix**: anonymous private `mmap`, released with `munmap`
//! - **Fallback**: `std::alloc` with page alignment
//!
//! The break cursor only ever moves inside `[start, start + capacity)`, so
//! every address handed out through [`HeapExtension::request_pages`] is
//! backed by readable, writable memory owned by this value.

use std::io;
use std::ptr::NonNull;

use super::{DEFAULT_PAGE_SIZE, HeapExtension};
use crate::error::HeapError;

/// A private heap of at most `capacity_pages` pages
///
/// Grow and shrink requests are counted so callers can verify how the
/// allocator drives its heap.
#[derive(Debug)]
pub struct ReservedHeap {
    /// Start of the reserved region, `None` for an empty reservation
    region: Option<NonNull<u8>>,
    page_size: usize,
    capacity_pages: usize,
    /// Pages between the start and the break
    pages_in_use: usize,
    grow_requests: usize,
    shrink_requests: usize,
}

impl ReservedHeap {
    /// Reserves `capacity_pages` pages of [`DEFAULT_PAGE_SIZE`] bytes
    pub fn new(capacity_pages: usize) -> Result<Self, HeapError> {
        Self::with_page_size(capacity_pages, DEFAULT_PAGE_SIZE)
    }

    /// Reserves `capacity_pages` pages of `page_size` bytes
    pub fn with_page_size(capacity_pages: usize, page_size: usize) -> Result<Self, HeapError> {
        if page_size == 0 || !page_size.is_power_of_two() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("page size must be a power of two, got {page_size}"),
            )
            .into());
        }
        let size = capacity_pages.checked_mul(page_size).ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "reservation size overflows")
        })?;

        let region = if size == 0 {
            None
        } else {
            Some(reserve(size, page_size)?)
        };

        Ok(Self {
            region,
            page_size,
            capacity_pages,
            pages_in_use: 0,
            grow_requests: 0,
            shrink_requests: 0,
        })
    }

    /// Address of the first reserved byte
    pub fn start(&self) -> usize {
        self.region
            .map_or(NonNull::<u8>::dangling().as_ptr() as usize, |p| {
                p.as_ptr() as usize
            })
    }

    /// Address one past the last reserved byte
    pub fn end(&self) -> usize {
        self.start() + self.capacity_pages * self.page_size
    }

    /// Pages currently between the start and the break
    pub fn pages_in_use(&self) -> usize {
        self.pages_in_use
    }

    /// Pages that can still be handed out
    pub fn remaining_pages(&self) -> usize {
        self.capacity_pages - self.pages_in_use
    }

    /// Total pages reserved
    pub fn capacity_pages(&self) -> usize {
        self.capacity_pages
    }

    /// Number of positive `request_pages` calls seen, successful or not
    pub fn grow_requests(&self) -> usize {
        self.grow_requests
    }

    /// Number of negative `request_pages` calls seen, successful or not
    pub fn shrink_requests(&self) -> usize {
        self.shrink_requests
    }

    fn break_addr(&self) -> usize {
        self.start() + self.pages_in_use * self.page_size
    }
}

impl HeapExtension for ReservedHeap {
    fn page_size(&self) -> usize {
        self.page_size
    }

    fn request_pages(&mut self, pages: isize) -> Result<usize, HeapError> {
        let count = pages.unsigned_abs();
        if pages > 0 {
            self.grow_requests += 1;
            if count > self.remaining_pages() {
                return Err(HeapError::Exhausted {
                    requested: count,
                    remaining: self.remaining_pages(),
                });
            }
            self.pages_in_use += count;
        } else if pages < 0 {
            self.shrink_requests += 1;
            if count > self.pages_in_use {
                return Err(HeapError::Underflow {
                    requested: count,
                    held: self.pages_in_use,
                });
            }
            self.pages_in_use -= count;
        }
        Ok(self.break_addr())
    }
}

impl Drop for ReservedHeap {
    fn drop(&mut self) {
        if let Some(region) = self.region.take() {
            release(region, self.capacity_pages * self.page_size, self.page_size);
        }
    }
}

#[cfg(unix)]
fn reserve(size: usize, _page_size: usize) -> io::Result<NonNull<u8>> {
    use libc::{MAP_ANONYMOUS, MAP_FAILED, MAP_PRIVATE, PROT_READ, PROT_WRITE, mmap};

    // SAFETY: FFI call to libc mmap. We pass:
    // - addr: null (let the OS choose)
    // - size: non-zero, overflow-checked by the caller
    // - anonymous private read/write mapping, fd=-1, offset=0
    // OS validates all parameters and returns MAP_FAILED on error.
    let ptr = unsafe {
        mmap(
            std::ptr::null_mut(),
            size,
            PROT_READ | PROT_WRITE,
            MAP_PRIVATE | MAP_ANONYMOUS,
            -1,
            0,
        )
    };

    if ptr == MAP_FAILED {
        Err(io::Error::last_os_error())
    } else {
        NonNull::new(ptr.cast::<u8>())
            .ok_or_else(|| io::Error::new(io::ErrorKind::OutOfMemory, "mmap returned null"))
    }
}

#[cfg(unix)]
fn release(region: NonNull<u8>, size: usize, _page_size: usize) {
    // SAFETY: FFI call to libc munmap.
    // - region/size are exactly what `reserve` mapped
    // - called once, from Drop, after which the region is never touched
    let rc = unsafe { libc::munmap(region.as_ptr().cast::<libc::c_void>(), size) };
    debug_assert_eq!(rc, 0, "munmap of reserved heap failed");
}

#[cfg(not(unix))]
fn reserve(size: usize, page_size: usize) -> io::Result<NonNull<u8>> {
    let layout = std::alloc::Layout::from_size_align(size, page_size)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

    // SAFETY: layout has non-zero size (checked by the caller).
    let ptr = unsafe { std::alloc::alloc_zeroed(layout) };
    NonNull::new(ptr).ok_or_else(|| io::Error::new(io::ErrorKind::OutOfMemory, "reservation failed"))
}

#[cfg(not(unix))]
fn release(region: NonNull<u8>, size: usize, page_size: usize) {
    // SAFETY: region was allocated by `reserve` with this exact layout.
    unsafe {
        let layout = std::alloc::Layout::from_size_align_unchecked(size, page_size);
        std::alloc::dealloc(region.as_ptr(), layout);
    }
}
