//! Error types for ustack
//!
//! Uses thiserror for clean, idiomatic Rust error definitions. Every failure
//! is a returned value; the allocator never retries on its own and never
//! leaves partially mutated state behind.

use std::io;

use thiserror::Error;

#[cfg(feature = "logging")]
use tracing::{debug, warn};

// ============================================================================
// Heap extension errors
// ============================================================================

/// Failure reported by a [`HeapExtension`](crate::heap::HeapExtension)
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum HeapError {
    /// The heap cannot grow any further
    #[error("heap exhausted: {requested} page(s) requested, {remaining} remaining")]
    Exhausted { requested: usize, remaining: usize },

    /// A shrink request would move the break below its starting point
    #[error("heap underflow: cannot release {requested} page(s), {held} held")]
    Underflow { requested: usize, held: usize },

    /// The operating system refused the break adjustment
    #[error("break adjustment failed: {0}")]
    Os(#[from] io::Error),
}

impl HeapError {
    /// Get error code for categorization
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Exhausted { .. } => "USTACK:HEAP:EXHAUSTED",
            Self::Underflow { .. } => "USTACK:HEAP:UNDERFLOW",
            Self::Os(_) => "USTACK:HEAP:OS",
        }
    }
}

// ============================================================================
// Allocation errors
// ============================================================================

/// Errors returned by [`StackAllocator::allocate`](crate::StackAllocator::allocate)
#[must_use = "errors should be handled"]
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum AllocError {
    /// The aligned request exceeds the per-allocation ceiling
    #[error("allocation too large: {requested} bytes ({aligned} aligned), max {max}")]
    TooLarge {
        requested: usize,
        aligned: usize,
        max: usize,
    },

    /// The heap refused to hand out another page
    #[error("out of memory after {pages_held} page(s)")]
    OutOfMemory {
        pages_held: usize,
        #[source]
        source: HeapError,
    },
}

impl AllocError {
    /// Create allocation too large error
    #[must_use]
    pub fn too_large(requested: usize, aligned: usize, max: usize) -> Self {
        #[cfg(feature = "logging")]
        debug!(requested, aligned, max, "rejecting oversized scratch allocation");

        Self::TooLarge {
            requested,
            aligned,
            max,
        }
    }

    /// Create out of memory error
    #[must_use]
    pub fn out_of_memory(pages_held: usize, source: HeapError) -> Self {
        #[cfg(feature = "logging")]
        warn!(pages_held, error = %source, "arena could not grow");

        Self::OutOfMemory { pages_held, source }
    }

    /// Check if error is retryable
    ///
    /// Only heap exhaustion can clear up on its own (after the caller frees
    /// something); an oversized request never will.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::OutOfMemory { .. })
    }

    /// Get error code for categorization
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::TooLarge { .. } => "USTACK:ALLOC:TOO_LARGE",
            Self::OutOfMemory { .. } => "USTACK:ALLOC:OOM",
        }
    }
}

// ============================================================================
// Deallocation errors
// ============================================================================

/// Errors returned by [`StackAllocator::deallocate`](crate::StackAllocator::deallocate)
/// and marker release
#[must_use = "errors should be handled"]
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeallocError {
    /// Nothing is allocated
    #[error("deallocate called with no live allocation")]
    EmptyStack,

    /// The marker points above the current stack depth
    #[error("stale marker: recorded at depth {marker_depth}, stack is at depth {depth}")]
    StaleMarker { marker_depth: usize, depth: usize },
}

impl DeallocError {
    /// Get error code for categorization
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::EmptyStack => "USTACK:DEALLOC:EMPTY",
            Self::StaleMarker { .. } => "USTACK:DEALLOC:STALE_MARKER",
        }
    }
}

// ============================================================================
// Configuration errors
// ============================================================================

/// Invalid [`StackConfig`](crate::StackConfig)
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("word size must be a non-zero power of two, got {0}")]
    InvalidWordSize(usize),

    #[error("page size must be a power of two and a multiple of the word size {word_size}, got {page_size}")]
    InvalidPageSize { page_size: usize, word_size: usize },

    #[error("max allocation {max_alloc} must be word-aligned (word size {word_size})")]
    UnalignedMaxAlloc { max_alloc: usize, word_size: usize },

    #[error("max allocation {max_alloc} exceeds page size {page_size}")]
    MaxAllocExceedsPage { max_alloc: usize, page_size: usize },
}

// ============================================================================
// Umbrella error
// ============================================================================

/// Any error produced by this crate
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum StackError {
    #[error(transparent)]
    Alloc(#[from] AllocError),

    #[error(transparent)]
    Dealloc(#[from] DeallocError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Heap(#[from] HeapError),
}

impl StackError {
    /// Get error code for categorization
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Alloc(e) => e.code(),
            Self::Dealloc(e) => e.code(),
            Self::Config(_) => "USTACK:CONFIG:INVALID",
            Self::Heap(e) => e.code(),
        }
    }
}

// ============================================================================
// Result Types
// ============================================================================

/// Result type for allocation
pub type AllocResult<T> = core::result::Result<T, AllocError>;

/// Result type for deallocation and marker release
pub type DeallocResult<T> = core::result::Result<T, DeallocError>;

/// Generic result type alias
pub type Result<T> = core::result::Result<T, StackError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_too_large_message() {
        let error = AllocError::too_large(513, 516, 512);
        let text = error.to_string();
        assert!(text.contains("513"));
        assert!(text.contains("512"));
        assert_eq!(error.code(), "USTACK:ALLOC:TOO_LARGE");
        assert!(!error.is_retryable());
    }

    #[test]
    fn test_out_of_memory_keeps_source() {
        let error = AllocError::out_of_memory(
            3,
            HeapError::Exhausted {
                requested: 1,
                remaining: 0,
            },
        );
        assert!(error.is_retryable());
        let source = std::error::Error::source(&error).expect("heap error is the source");
        assert!(source.to_string().contains("exhausted"));
    }

    #[test]
    fn test_umbrella_conversions() {
        let error: StackError = DeallocError::EmptyStack.into();
        assert_eq!(error.code(), "USTACK:DEALLOC:EMPTY");

        let error: StackError = ConfigError::InvalidWordSize(3).into();
        assert_eq!(error.code(), "USTACK:CONFIG:INVALID");
        assert!(error.to_string().contains('3'));
    }

    #[test]
    fn test_heap_error_from_io() {
        let error: HeapError = io::Error::from(io::ErrorKind::OutOfMemory).into();
        assert_eq!(error.code(), "USTACK:HEAP:OS");
    }
}
