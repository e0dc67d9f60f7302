//! Remote document store client for the Volley data core.
//!
//! Provides:
//! - The typed-value wire format (tagged union with recursive arrays/maps)
//! - Two-way converters between domain structs and documents
//! - The [`RemoteStore`] trait the reconciliation engine consumes
//! - An HTTP adapter over the document REST API

pub mod codec;
pub mod config;
pub mod error;
pub mod http;
pub mod store;
pub mod value;

pub use config::RemoteConfig;
pub use error::{RemoteError, RemoteResult};
pub use http::HttpRemoteStore;
pub use store::{CreateOutcome, DeleteOutcome, Direction, Filter, OrderBy, RemoteStore};
pub use value::{Document, Value};
