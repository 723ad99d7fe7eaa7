//! Persistence provider implementations.

pub mod faulty;
pub mod memory;

pub use faulty::FaultyStore;
pub use memory::MemoryStore;
