//! Backend implementations that ship with the core

pub mod memory;

pub use memory::{MemoryLockStore, MemoryObjectStore};
