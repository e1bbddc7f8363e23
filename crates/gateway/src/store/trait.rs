use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use msgboard_auth::Credential;

use crate::{Filter, GatewayError, PolicyAction};

/// One record as the remote store sees it: column name to JSON value.
pub type Row = Map<String, Value>;

/// Rows returned by the store (possibly empty).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowSet(Vec<Row>);

impl RowSet {
    pub fn new(rows: Vec<Row>) -> Self {
        Self(rows)
    }

    pub fn rows(&self) -> &[Row] {
        &self.0
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Deserialize every row into `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<Vec<T>, serde_json::Error> {
        self.0
            .iter()
            .map(|row| serde_json::from_value(Value::Object(row.clone())))
            .collect()
    }
}

impl From<Vec<Row>> for RowSet {
    fn from(rows: Vec<Row>) -> Self {
        Self(rows)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StoreOperation {
    Select(Filter),
    /// All-or-nothing: if any row fails a policy check, none is written.
    Insert(Vec<Row>),
}

impl StoreOperation {
    pub fn action(&self) -> PolicyAction {
        match self {
            StoreOperation::Select(_) => PolicyAction::Select,
            StoreOperation::Insert(_) => PolicyAction::Insert,
        }
    }
}

/// A single data operation and the credential it is performed under.
#[derive(Debug, Clone)]
pub struct StoreRequest {
    pub table: String,
    pub operation: StoreOperation,
    pub credential: Credential,
}

/// Policy-enforcing remote store.
///
/// Implementations must:
/// - derive the caller's identity only from `credential` (anonymous when absent,
///   `AccessDenied` when invalid or expired)
/// - on select, silently drop rows no select policy allows
/// - on insert, reject the whole batch if any row fails every insert policy
/// - evaluate each request against one consistent snapshot
#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn execute(&self, request: StoreRequest) -> Result<RowSet, GatewayError>;
}

#[async_trait]
impl<S> RemoteStore for Arc<S>
where
    S: RemoteStore + ?Sized,
{
    async fn execute(&self, request: StoreRequest) -> Result<RowSet, GatewayError> {
        (**self).execute(request).await
    }
}
