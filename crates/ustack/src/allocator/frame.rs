//! RAII-based stack frame for automatic restoration

use core::ops::{Deref, DerefMut};

#[cfg(feature = "logging")]
use tracing::warn;

use super::{StackAllocator, StackMarker};
use crate::heap::HeapExtension;

/// RAII helper for stack-based scoped allocation
///
/// Allocations made through the frame are popped when it goes out of scope.
///
/// ```
/// use ustack::{ReservedHeap, StackAllocator};
///
/// let mut stack = StackAllocator::new(ReservedHeap::new(2)?)?;
/// stack.allocate(16)?;
/// {
///     let mut frame = stack.frame();
///     frame.allocate(64)?;
///     frame.allocate(128)?;
///     assert_eq!(frame.depth(), 3);
/// }
/// assert_eq!(stack.depth(), 1);
/// # Ok::<(), ustack::StackError>(())
/// ```
pub struct StackFrame<'a, H: HeapExtension> {
    allocator: &'a mut StackAllocator<H>,
    marker: StackMarker,
}

impl<'a, H: HeapExtension> StackFrame<'a, H> {
    /// Creates a new stack frame that will restore to the current position
    /// when dropped
    pub fn new(allocator: &'a mut StackAllocator<H>) -> Self {
        let marker = allocator.mark();
        Self { allocator, marker }
    }

    /// Position the frame restores to
    pub fn marker(&self) -> StackMarker {
        self.marker
    }

    /// Manually restore and consume this frame
    pub fn restore(self) {
        drop(self);
    }
}

impl<H: HeapExtension> Deref for StackFrame<'_, H> {
    type Target = StackAllocator<H>;

    fn deref(&self) -> &Self::Target {
        self.allocator
    }
}

impl<H: HeapExtension> DerefMut for StackFrame<'_, H> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.allocator
    }
}

impl<H: HeapExtension> Drop for StackFrame<'_, H> {
    fn drop(&mut self) {
        // Fails only if the frame's owner popped below the marker by hand.
        if let Err(_error) = self.allocator.release(self.marker) {
            #[cfg(feature = "logging")]
            warn!(error = %_error, "stack frame could not restore its marker");
        }
    }
}

impl<H: HeapExtension> core::fmt::Debug for StackFrame<'_, H> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("StackFrame")
            .field("marker", &self.marker)
            .field("depth", &self.allocator.depth())
            .finish()
    }
}
