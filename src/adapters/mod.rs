//! Adapters - concrete implementations of the ports.

pub mod memstore;

pub use memstore::MemStore;
