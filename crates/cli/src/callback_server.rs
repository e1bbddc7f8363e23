//! Loopback listener for the OAuth redirect.
//!
//! Serves `GET /callback` on `127.0.0.1`, answers the browser with a short
//! page and hands the first callback's parameters to the sign-in flow.

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use axum::{
    Router,
    extract::{Query, State, rejection::QueryRejection},
    response::Html,
    routing::get,
};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use msgboard_auth::CallbackParams;

type Slot = Arc<Mutex<Option<oneshot::Sender<CallbackParams>>>>;

pub struct CallbackServer {
    addr: SocketAddr,
    receiver: oneshot::Receiver<CallbackParams>,
    handle: JoinHandle<()>,
}

impl CallbackServer {
    /// Bind `127.0.0.1:port` (`0` picks a free port).
    pub async fn bind(port: u16) -> std::io::Result<Self> {
        let (sender, receiver) = oneshot::channel();
        let slot: Slot = Arc::new(Mutex::new(Some(sender)));
        let app = Router::new().route("/callback", get(callback)).with_state(slot);

        let listener = tokio::net::TcpListener::bind((Ipv4Addr::LOCALHOST, port)).await?;
        let addr = listener.local_addr()?;
        let handle = tokio::spawn(async move {
            if let Err(err) = axum::serve(listener, app).await {
                tracing::warn!(error = %err, "callback listener stopped");
            }
        });
        tracing::debug!(%addr, "callback listener bound");

        Ok(Self {
            addr,
            receiver,
            handle,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Wait for the first callback. `None` when `timeout` elapses first.
    /// The listener shuts down either way.
    pub async fn wait(mut self, timeout: Duration) -> Option<CallbackParams> {
        tokio::time::timeout(timeout, &mut self.receiver).await.ok()?.ok()
    }
}

impl Drop for CallbackServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn callback(
    State(slot): State<Slot>,
    query: Result<Query<CallbackParams>, QueryRejection>,
) -> Html<&'static str> {
    let params = match query {
        Ok(Query(params)) => params,
        Err(rejection) => CallbackParams::malformed(rejection.body_text()),
    };
    let ok = params.error.is_none() && params.code().is_some();

    let sender = slot.lock().unwrap_or_else(PoisonError::into_inner).take();
    match sender {
        Some(sender) => {
            let _ = sender.send(params);
        }
        None => tracing::debug!("ignoring repeated callback"),
    }

    Html(if ok {
        "<html><body><h3>Auth complete</h3><p>You can close this tab and return to the terminal.</p></body></html>"
    } else {
        "<html><body><h3>Auth failed</h3><p>Return to the terminal for details.</p></body></html>"
    })
}
