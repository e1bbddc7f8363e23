use std::sync::Arc;

use msgboard_auth::CredentialStore;

use crate::{Filter, GatewayError, RemoteStore, Row, RowSet, StoreOperation, StoreRequest};

/// Policy-Enforced Data Gateway.
///
/// Every call reads the current credential exactly once and forwards it with
/// the operation. No local access decisions, no retries, no caching.
#[derive(Debug, Clone)]
pub struct DataGateway<S> {
    store: S,
    credentials: Arc<CredentialStore>,
}

impl<S: RemoteStore> DataGateway<S> {
    pub fn new(store: S, credentials: Arc<CredentialStore>) -> Self {
        Self { store, credentials }
    }

    pub fn credentials(&self) -> &Arc<CredentialStore> {
        &self.credentials
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Insert one record. Returns the stored row(s) with server defaults
    /// filled in.
    pub async fn insert(&self, table: &str, record: Row) -> Result<RowSet, GatewayError> {
        self.execute(table, StoreOperation::Insert(vec![record])).await
    }

    /// Rows of `table` visible to the current identity and matching `filter`.
    /// Rows hidden by policy are simply absent.
    pub async fn select(&self, table: &str, filter: Filter) -> Result<RowSet, GatewayError> {
        self.execute(table, StoreOperation::Select(filter)).await
    }

    async fn execute(&self, table: &str, operation: StoreOperation) -> Result<RowSet, GatewayError> {
        let credential = self.credentials.credential();
        let action = operation.action();
        tracing::debug!(
            table,
            %action,
            authenticated = credential.is_authenticated(),
            "gateway request"
        );

        let result = self
            .store
            .execute(StoreRequest {
                table: table.to_string(),
                operation,
                credential,
            })
            .await;

        match &result {
            Ok(rows) => tracing::debug!(table, %action, rows = rows.len(), "gateway response"),
            Err(err @ GatewayError::AccessDenied { .. }) => {
                tracing::info!(table, %action, error = %err, "gateway request denied")
            }
            Err(err) => tracing::warn!(table, %action, error = %err, "gateway request failed"),
        }
        result
    }
}
