//! `msgboard-gateway`: the policy-enforced data path.
//!
//! [`DataGateway`] attaches the caller's credential to every operation and
//! hands it to a [`RemoteStore`]. Whether a row may be read or written is
//! decided by the store's row-level policies, never here.

pub mod error;
pub mod filter;
pub mod gateway;
pub mod policy;
pub mod store;

pub use error::GatewayError;
pub use filter::{Filter, OrderBy};
pub use gateway::DataGateway;
pub use policy::{Policy, PolicyAction, Predicate};
pub use store::{
    ColumnDefault, InMemoryPolicyStore, RemoteStore, RestStore, Row, RowSet, StoreOperation,
    StoreRequest,
};
