//! LIFO scratch allocator over a page-granular heap
//!
//! ## Modules
//! - `allocator` - Main `StackAllocator` implementation with LIFO semantics
//! - `frame` - RAII helper for automatic stack restoration
//! - `marker` - Position markers for scoped deallocation
//! - `stats` - Counters collected by the allocator

#[allow(clippy::module_inception)]
pub mod allocator;
pub mod frame;
pub mod marker;
pub mod stats;

pub use allocator::StackAllocator;
pub use frame::StackFrame;
pub use marker::StackMarker;
pub use stats::StackStats;
