//! Stack position markers for scoped deallocation

/// Marker representing a position in the stack
///
/// A marker records how many allocations were live and where the frontier
/// stood when it was taken. Passing it to
/// [`StackAllocator::release`](super::StackAllocator::release) pops
/// everything allocated since.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StackMarker {
    /// Number of live allocations when the marker was taken
    pub(crate) depth: usize,
    /// Bytes between base and frontier when the marker was taken
    pub(crate) offset: usize,
}

impl StackMarker {
    /// Record depth at the marked position
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Frontier offset at the marked position
    pub fn offset(&self) -> usize {
        self.offset
    }
}
