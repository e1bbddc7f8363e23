//! PostgREST-compatible remote store (`{base_url}/rest/v1/{table}`).

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;

use super::r#trait::{RemoteStore, Row, RowSet, StoreOperation, StoreRequest};
use crate::{Filter, GatewayError, PolicyAction};

#[derive(Clone)]
pub struct RestStore {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl RestStore {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, urlencoding::encode(table))
    }
}

/// Render a filter as PostgREST query parameters.
fn query_params(filter: &Filter) -> Vec<(String, String)> {
    let mut params = vec![("select".to_string(), "*".to_string())];
    for (column, value) in &filter.eq {
        let rendered = match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        params.push((column.clone(), format!("eq.{rendered}")));
    }
    if !filter.order.is_empty() {
        let order = filter
            .order
            .iter()
            .map(|o| format!("{}.{}", o.column, if o.descending { "desc" } else { "asc" }))
            .collect::<Vec<_>>()
            .join(",");
        params.push(("order".to_string(), order));
    }
    if let Some(limit) = filter.limit {
        params.push(("limit".to_string(), limit.to_string()));
    }
    params
}

#[async_trait]
impl RemoteStore for RestStore {
    async fn execute(&self, request: StoreRequest) -> Result<RowSet, GatewayError> {
        let action = request.operation.action();
        let url = self.table_url(&request.table);
        // Anonymous requests carry the public key as bearer, which the
        // backend maps to the unauthenticated role.
        let bearer = request.credential.bearer().unwrap_or(self.api_key.as_str());

        let builder = match &request.operation {
            StoreOperation::Select(filter) => self.client.get(&url).query(&query_params(filter)),
            StoreOperation::Insert(rows) => self
                .client
                .post(&url)
                .header("Prefer", "return=representation")
                .json(rows),
        };

        let resp = builder
            .header("apikey", &self.api_key)
            .bearer_auth(bearer)
            .send()
            .await
            .map_err(|e| GatewayError::transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(status_error(&request.table, action, status, &body));
        }

        let body = resp
            .bytes()
            .await
            .map_err(|e| GatewayError::transport(e.to_string()))?;
        decode_rows(status, &body)
    }
}

/// A success status means the store already applied the operation, so a body
/// that does not decode is `Rejected`, never `Transport`.
fn decode_rows(status: StatusCode, body: &[u8]) -> Result<RowSet, GatewayError> {
    serde_json::from_slice::<Vec<Row>>(body)
        .map(RowSet::from)
        .map_err(|e| GatewayError::Rejected {
            status: status.as_u16(),
            message: format!("unreadable response: {e}"),
        })
}

fn status_error(table: &str, action: PolicyAction, status: StatusCode, body: &str) -> GatewayError {
    let message = error_message(body).unwrap_or_else(|| format!("status {status}"));
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => GatewayError::access_denied(table, action, message),
        s if s.is_server_error() => GatewayError::transport(format!("remote store returned {status}: {message}")),
        s => GatewayError::Rejected {
            status: s.as_u16(),
            message,
        },
    }
}

fn error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    ["message", "msg", "error_description", "error"]
        .iter()
        .find_map(|k| value.get(*k).and_then(|v| v.as_str()))
        .map(str::to_string)
}

impl core::fmt::Debug for RestStore {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RestStore")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .finish()
    }
}
