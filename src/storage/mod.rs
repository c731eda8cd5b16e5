//! Storage boundary for contact records.
//!
//! The contact store is an external collaborator: the engine consumes the
//! traits defined here and never assumes a particular backend. The
//! in-memory implementation serves embedded use, tests, and as the
//! reference for the transaction discipline a durable backend must honor.

mod memory;
mod traits;

pub use memory::InMemoryContactStore;
pub use traits::{ContactStore, ContactTx, StorageError};
