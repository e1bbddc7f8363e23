//! Remote data store boundary.
//!
//! A [`RemoteStore`] receives every request together with the caller's
//! credential and is the only place row-level policies are evaluated.

pub mod in_memory;
pub mod rest;
pub mod r#trait;

pub use in_memory::{ColumnDefault, InMemoryPolicyStore};
pub use rest::RestStore;
pub use r#trait::{RemoteStore, Row, RowSet, StoreOperation, StoreRequest};
