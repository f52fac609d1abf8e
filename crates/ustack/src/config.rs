//! Stack allocator configuration

use crate::error::ConfigError;

/// Default machine word used for rounding request sizes
pub const DEFAULT_WORD_SIZE: usize = 4;

/// Default per-allocation ceiling
pub const DEFAULT_MAX_ALLOC: usize = 512;

/// Configuration for [`StackAllocator`](crate::StackAllocator)
///
/// The page size is not part of the configuration: it belongs to the
/// [`HeapExtension`](crate::heap::HeapExtension) the allocator draws pages
/// from, and [`validate`](Self::validate) checks the two against each other.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackConfig {
    /// Request sizes are rounded up to a multiple of this
    pub word_size: usize,

    /// Largest aligned request accepted
    pub max_alloc: usize,

    /// Enable statistics tracking
    pub track_stats: bool,

    /// Fill patterns for debugging
    pub alloc_pattern: Option<u8>,
    pub dealloc_pattern: Option<u8>,
}

impl Default for StackConfig {
    fn default() -> Self {
        Self {
            word_size: DEFAULT_WORD_SIZE,
            max_alloc: DEFAULT_MAX_ALLOC,
            track_stats: true,
            alloc_pattern: if cfg!(debug_assertions) { Some(0xCC) } else { None },
            dealloc_pattern: if cfg!(debug_assertions) { Some(0xDD) } else { None },
        }
    }
}

impl StackConfig {
    /// Production configuration - no fill patterns, stats kept
    pub fn production() -> Self {
        Self {
            track_stats: true,
            alloc_pattern: None,
            dealloc_pattern: None,
            ..Self::default()
        }
    }

    /// Debug configuration - fill patterns always on
    pub fn debug() -> Self {
        Self {
            track_stats: true,
            alloc_pattern: Some(0xCC),
            dealloc_pattern: Some(0xDD),
            ..Self::default()
        }
    }

    /// Performance configuration - minimal overhead
    pub fn performance() -> Self {
        Self {
            track_stats: false,
            alloc_pattern: None,
            dealloc_pattern: None,
            ..Self::default()
        }
    }

    /// Sets the rounding granularity
    pub fn with_word_size(mut self, word_size: usize) -> Self {
        self.word_size = word_size;
        self
    }

    /// Sets the per-allocation ceiling
    pub fn with_max_alloc(mut self, max_alloc: usize) -> Self {
        self.max_alloc = max_alloc;
        self
    }

    /// Enables or disables statistics tracking
    pub fn with_stats(mut self, track_stats: bool) -> Self {
        self.track_stats = track_stats;
        self
    }

    /// Sets the byte written over fresh and popped buffers
    pub fn with_patterns(mut self, alloc: Option<u8>, dealloc: Option<u8>) -> Self {
        self.alloc_pattern = alloc;
        self.dealloc_pattern = dealloc;
        self
    }

    /// Checks the configuration against the page size of the heap it will
    /// be used with.
    ///
    /// `max_alloc` must fit in one page so that a single allocation never
    /// needs more than one page of growth.
    pub fn validate(&self, page_size: usize) -> Result<(), ConfigError> {
        if self.word_size == 0 || !self.word_size.is_power_of_two() {
            return Err(ConfigError::InvalidWordSize(self.word_size));
        }
        if !page_size.is_power_of_two() || page_size < self.word_size {
            return Err(ConfigError::InvalidPageSize {
                page_size,
                word_size: self.word_size,
            });
        }
        if self.max_alloc % self.word_size != 0 {
            return Err(ConfigError::UnalignedMaxAlloc {
                max_alloc: self.max_alloc,
                word_size: self.word_size,
            });
        }
        if self.max_alloc > page_size {
            return Err(ConfigError::MaxAllocExceedsPage {
                max_alloc: self.max_alloc,
                page_size,
            });
        }
        Ok(())
    }
}
