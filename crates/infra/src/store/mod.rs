//! Access-control persistence adapters.

pub mod in_memory;

pub use in_memory::InMemoryAccessStore;
