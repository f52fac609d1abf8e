//! Alignment and platform helpers

/// Aligns a value up to the nearest multiple of alignment
///
/// Returns `None` if rounding overflows `usize`.
///
/// # Examples
/// ```
/// use ustack::utils::align_up;
///
/// assert_eq!(align_up(10, 4), Some(12));
/// assert_eq!(align_up(12, 4), Some(12));
/// assert_eq!(align_up(0, 4), Some(0));
/// assert_eq!(align_up(usize::MAX, 4), None);
/// ```
#[inline(always)]
pub const fn align_up(value: usize, alignment: usize) -> Option<usize> {
    debug_assert!(alignment.is_power_of_two());
    match value.checked_add(alignment - 1) {
        Some(v) => Some(v & !(alignment - 1)),
        None => None,
    }
}

/// Checks if a value is aligned to the given alignment
///
/// # Examples
/// ```
/// use ustack::utils::is_aligned;
///
/// assert!(is_aligned(16, 4));
/// assert!(!is_aligned(18, 4));
/// ```
#[inline(always)]
pub const fn is_aligned(value: usize, alignment: usize) -> bool {
    debug_assert!(alignment.is_power_of_two());
    value & (alignment - 1) == 0
}

/// Get system page size
pub fn system_page_size() -> usize {
    #[cfg(unix)]
    {
        // SAFETY: FFI call to libc::sysconf.
        // - _SC_PAGESIZE is a valid sysconf parameter
        // - sysconf returns page size or -1 on error
        let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
        if size > 0 {
            return size as usize;
        }
    }

    crate::heap::DEFAULT_PAGE_SIZE
}
