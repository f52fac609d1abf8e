//! Page-backed LIFO scratch allocator
//!
//! This crate provides a stack-discipline region allocator for short-lived,
//! strictly nested buffers:
//!
//! - Requests are rounded up to a machine word and capped per allocation
//! - The arena is anchored lazily at the heap break and grows one page at a
//!   time as allocations overrun it
//! - Deallocation always pops the most recent buffer and hands a page back
//!   once the frontier retreats below it
//! - Allocation metadata lives on a side stack, never inside the buffers
//!
//! # Features
//!
//! - `logging` (default): `tracing` events for page traffic and per-call
//!   activity
//!
//! # Example
//!
//! ```
//! use ustack::prelude::*;
//!
//! fn main() -> ustack::Result<()> {
//!     let mut stack = StackAllocator::new(ReservedHeap::new(8)?)?;
//!
//!     let header = stack.allocate(10)?;
//!     let body = stack.allocate(500)?;
//!     assert_eq!(stack.used(), 512);
//!
//!     // SAFETY: both buffers are live and sized as requested.
//!     unsafe {
//!         header.cast::<u8>().as_ptr().write_bytes(0, header.len());
//!         body.cast::<u8>().as_ptr().write_bytes(1, body.len());
//!     }
//!
//!     assert_eq!(stack.deallocate()?, 500);
//!     assert_eq!(stack.deallocate()?, 10);
//!     Ok(())
//! }
//! ```
//!
//! # Heap sources
//!
//! The allocator is generic over [`HeapExtension`]. [`ReservedHeap`] is a
//! private bounded region and is what tests and most callers use;
//! [`ProgramBreak`](heap::ProgramBreak) drives the real process break on
//! Linux and is only sound when nothing else moves it.

#![allow(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]

// Core modules
pub mod error;
pub mod utils;

pub mod allocator;
pub mod arena;
pub mod config;
pub mod heap;
pub mod record;

pub use allocator::{StackAllocator, StackFrame, StackMarker, StackStats};
pub use arena::Arena;
pub use config::StackConfig;
pub use error::{AllocError, ConfigError, DeallocError, HeapError, Result, StackError};
pub use heap::{HeapExtension, ReservedHeap};
pub use record::AllocationRecord;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Common imports
pub mod prelude {
    pub use crate::allocator::{StackAllocator, StackFrame, StackMarker, StackStats};
    pub use crate::config::StackConfig;
    pub use crate::error::{AllocError, DeallocError, StackError};
    pub use crate::heap::{HeapExtension, ReservedHeap};
}
