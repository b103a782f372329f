//! # Hoard Storage
//!
//! The persistence seam consumed by the Hoard cache managers.
//!
//! ## Features
//!
//! - [`StorageAccessor`], the synchronous create/update/delete/load contract
//!   every backend implements
//! - [`MemoryAccessor`], a multi-type in-memory backend with per-operation
//!   call counters, injectable failures and artificial latency
//!
//! ## Example
//!
//! ```ignore
//! use hoard_storage::{MemoryAccessor, StorageAccessor};
//!
//! let accessor = MemoryAccessor::new("memory");
//! let person = accessor.create(Person::new(1, "birdy", 30))?;
//! assert!(accessor.load(&1)?.is_some());
//! ```

pub mod accessor;
pub mod memory;

// Re-exports
pub use accessor::StorageAccessor;
pub use memory::MemoryAccessor;

// Re-export hoard_core for consumers
pub use hoard_core;
