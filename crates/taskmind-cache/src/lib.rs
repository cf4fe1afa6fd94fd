pub mod cache;
pub mod keys;
pub mod memory_store;

pub use cache::*;
pub use keys::*;
pub use memory_store::*;

// Re-export common types for convenience
pub use taskmind_core::{Result, TaskMindError};
