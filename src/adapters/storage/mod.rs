//! Storage Adapters
//!
//! Implementations of the OperationStateStore port.
//!
//! ## Available Adapters
//!
//! - **InMemoryOperationStateStore** - Process-local snapshots (single instance)

mod in_memory_operation_store;

pub use in_memory_operation_store::InMemoryOperationStateStore;
