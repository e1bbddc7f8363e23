use serde_json::Value;

use msgboard_core::{Message, MessageBody};
use msgboard_gateway::{DataGateway, Filter, RemoteStore, Row};

use crate::BoardError;

pub const MESSAGES_TABLE: &str = "messages";

/// Post and list messages as the currently signed-in identity.
#[derive(Debug, Clone)]
pub struct MessageBoard<S> {
    gateway: DataGateway<S>,
}

impl<S: RemoteStore> MessageBoard<S> {
    pub fn new(gateway: DataGateway<S>) -> Self {
        Self { gateway }
    }

    pub fn gateway(&self) -> &DataGateway<S> {
        &self.gateway
    }

    /// Post `body` under the active session.
    ///
    /// `author_id`, `id` and `created_at` are left to the store, which stamps
    /// them from the verified token; the returned message is the stored row.
    pub async fn post(&self, body: &str) -> Result<Message, BoardError> {
        if !self.gateway.credentials().is_authenticated() {
            return Err(BoardError::NotSignedIn);
        }
        let body = MessageBody::parse(body)?;

        let mut record = Row::new();
        record.insert("body".to_string(), Value::String(body.into_inner()));

        let stored = self.gateway.insert(MESSAGES_TABLE, record).await?;
        let message = stored
            .decode::<Message>()?
            .into_iter()
            .next()
            .ok_or_else(|| BoardError::Decode("insert returned no row".to_string()))?;

        tracing::info!(message_id = %message.id, "message posted");
        Ok(message)
    }

    /// Messages the active credential may read, oldest first.
    pub async fn list(&self) -> Result<Vec<Message>, BoardError> {
        let filter = Filter::new().order_asc("created_at").order_asc("id");
        let rows = self.gateway.select(MESSAGES_TABLE, filter).await?;
        let mut messages = rows.decode::<Message>()?;
        messages.sort_by(Message::display_order);
        Ok(messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use msgboard_auth::CredentialStore;
    use msgboard_gateway::{GatewayError, RowSet, StoreRequest};
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct CountingStore {
        calls: Mutex<usize>,
    }

    #[async_trait]
    impl RemoteStore for CountingStore {
        async fn execute(&self, _request: StoreRequest) -> Result<RowSet, GatewayError> {
            *self.calls.lock().unwrap() += 1;
            Ok(RowSet::default())
        }
    }

    #[tokio::test]
    async fn post_without_session_never_reaches_the_store() {
        let store = Arc::new(CountingStore::default());
        let board = MessageBoard::new(DataGateway::new(store.clone(), Arc::new(CredentialStore::new())));

        let err = board.post("hello").await.unwrap_err();
        assert!(matches!(err, BoardError::NotSignedIn));
        assert_eq!(*store.calls.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn list_with_no_rows_is_empty() {
        let store = Arc::new(CountingStore::default());
        let board = MessageBoard::new(DataGateway::new(store.clone(), Arc::new(CredentialStore::new())));

        assert!(board.list().await.unwrap().is_empty());
        assert_eq!(*store.calls.lock().unwrap(), 1);
    }
}
