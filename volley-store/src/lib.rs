//! On-device SQLite store for the Volley data core.
//!
//! Owns durability for everything not yet confirmed remote: player
//! profiles, both match kinds with their sync flags, and the
//! pending-delete queue. Storage faults propagate to callers — an
//! inability to save locally is fatal to that save, because the local
//! store is the durability guarantee.

pub mod error;
pub mod schema;
mod store;

pub use error::{StorageError, StorageResult};
pub use store::LocalStore;
