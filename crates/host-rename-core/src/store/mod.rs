// # Host Store Implementations
//
// This module provides implementations of the HostStore trait and the
// advisory lock that guards the file-backed store across invocations.

pub mod file;
pub mod lock;
pub mod memory;

pub use file::FileHostStore;
pub use lock::StoreLock;
pub use memory::MemoryHostStore;
