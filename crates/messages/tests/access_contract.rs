//! End-to-end access behaviour: auth flow, credential store, gateway and an
//! in-memory policy-enforcing store wired together the way the CLI wires the
//! real services.

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde_json::json;

use msgboard_auth::{
    AccessClaims, AuthError, AuthFlowController, CallbackParams, CredentialStore, FlowState, HmacTokenKey,
    Identity, InMemoryAuthService, ProviderConfig, Session, UserMetadata,
};
use msgboard_core::SubjectId;
use msgboard_gateway::{DataGateway, Filter, GatewayError, InMemoryPolicyStore, PolicyAction, RestStore, Row};
use msgboard_messages::{
    BoardError, MESSAGES_TABLE, MessageBoard, MessageVisibility, ensure_profile, profile_directory, schema,
};

const SECRET: &str = "contract-secret";

struct Backend {
    store: Arc<InMemoryPolicyStore>,
    auth: Arc<InMemoryAuthService>,
}

struct Client {
    flow: AuthFlowController<Arc<InMemoryAuthService>>,
    board: MessageBoard<Arc<InMemoryPolicyStore>>,
}

impl Backend {
    fn new(visibility: MessageVisibility) -> Self {
        let store = Arc::new(InMemoryPolicyStore::new(Arc::new(HmacTokenKey::new(SECRET))));
        schema::install(&store, visibility);
        Self {
            store,
            auth: Arc::new(InMemoryAuthService::new(HmacTokenKey::new(SECRET))),
        }
    }

    fn client(&self) -> Client {
        let credentials = Arc::new(CredentialStore::new());
        let provider = ProviderConfig::oauth2(
            "https://idp.example.com/authorize",
            "board-client",
            "http://127.0.0.1:8765/callback",
        );
        Client {
            flow: AuthFlowController::new(provider, self.auth.clone(), credentials.clone()),
            board: MessageBoard::new(DataGateway::new(self.store.clone(), credentials)),
        }
    }
}

impl Client {
    async fn sign_in(&mut self, backend: &Backend, identity: Identity) -> Arc<Session> {
        let request = self.flow.begin();
        let code = backend.auth.issue_code(identity, &request.code_challenge);
        self.flow
            .complete(CallbackParams::with_code(code, Some(request.state)))
            .await
            .unwrap()
    }

    fn gateway(&self) -> &DataGateway<Arc<InMemoryPolicyStore>> {
        self.board.gateway()
    }
}

fn body_row(body: &str) -> Row {
    json!({ "body": body }).as_object().cloned().unwrap()
}

fn bodies(messages: &[msgboard_core::Message]) -> Vec<&str> {
    messages.iter().map(|m| m.body.as_str()).collect()
}

#[tokio::test]
async fn empty_credential_store_cannot_write_or_read() {
    let backend = Backend::new(MessageVisibility::AllAuthenticated);
    let mut author = backend.client();
    author.sign_in(&backend, Identity::new("u1")).await;
    author.board.post("hello").await.unwrap();

    let anon = backend.client();
    let err = anon.gateway().insert(MESSAGES_TABLE, body_row("sneaky")).await.unwrap_err();
    assert!(matches!(
        err,
        GatewayError::AccessDenied {
            action: PolicyAction::Insert,
            ..
        }
    ));
    assert!(matches!(anon.board.post("sneaky").await, Err(BoardError::NotSignedIn)));

    // No message is public, so the anonymous view is empty rather than an error.
    assert!(anon.board.list().await.unwrap().is_empty());
    assert_eq!(backend.store.service_rows(MESSAGES_TABLE).len(), 1);
}

#[tokio::test]
async fn signed_in_post_is_listed_with_server_stamped_fields() {
    let backend = Backend::new(MessageVisibility::AllAuthenticated);
    let mut client = backend.client();
    client.sign_in(&backend, Identity::new("u1")).await;

    let posted = client.board.post("  hello  ").await.unwrap();
    assert_eq!(posted.body, "hello");
    assert_eq!(posted.author_id, SubjectId::new("u1"));

    let listed = client.board.list().await.unwrap();
    assert_eq!(listed, vec![posted]);
}

#[tokio::test]
async fn reauthentication_switches_identity_for_the_next_call() {
    let backend = Backend::new(MessageVisibility::AllAuthenticated);
    let mut client = backend.client();

    client.sign_in(&backend, Identity::new("u1")).await;
    let first = client.board.post("as u1").await.unwrap();
    client.sign_in(&backend, Identity::new("u2")).await;
    let second = client.board.post("as u2").await.unwrap();

    assert_eq!(first.author_id.as_str(), "u1");
    assert_eq!(second.author_id.as_str(), "u2");
}

#[tokio::test]
async fn sign_out_reproduces_the_anonymous_denial() {
    let backend = Backend::new(MessageVisibility::AllAuthenticated);
    let anon_err = backend
        .client()
        .gateway()
        .insert(MESSAGES_TABLE, body_row("x"))
        .await
        .unwrap_err();

    let mut client = backend.client();
    client.sign_in(&backend, Identity::new("u1")).await;
    client.board.post("before").await.unwrap();
    assert!(client.flow.sign_out().await);

    let err = client.gateway().insert(MESSAGES_TABLE, body_row("x")).await.unwrap_err();
    assert_eq!(err, anon_err);
    assert!(client.board.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn callback_without_code_fails_and_grants_nothing() {
    let backend = Backend::new(MessageVisibility::AllAuthenticated);
    let mut client = backend.client();

    let request = client.flow.begin();
    let err = client
        .flow
        .complete(CallbackParams::from_query(&format!("state={}", request.state)).unwrap())
        .await
        .unwrap_err();

    assert_eq!(err, AuthError::MissingCode);
    assert_eq!(client.flow.state(), &FlowState::Failed(AuthError::MissingCode));
    assert!(matches!(client.board.post("hi").await, Err(BoardError::NotSignedIn)));
}

#[tokio::test]
async fn replayed_callback_fails_and_keeps_session() {
    let backend = Backend::new(MessageVisibility::AllAuthenticated);
    let mut client = backend.client();

    let request = client.flow.begin();
    let code = backend.auth.issue_code(Identity::new("u1"), &request.code_challenge);
    let callback = CallbackParams::with_code(code, Some(request.state));
    client.flow.complete(callback.clone()).await.unwrap();

    assert_eq!(client.flow.complete(callback).await.unwrap_err(), AuthError::NoPendingRequest);
    assert_eq!(client.board.post("still here").await.unwrap().author_id.as_str(), "u1");
}

#[tokio::test]
async fn all_authenticated_visibility_shows_other_authors() {
    let backend = Backend::new(MessageVisibility::AllAuthenticated);
    let mut u1 = backend.client();
    let mut u2 = backend.client();
    u1.sign_in(&backend, Identity::new("u1")).await;
    u2.sign_in(&backend, Identity::new("u2")).await;

    u1.board.post("hello").await.unwrap();

    let first = u2.board.list().await.unwrap();
    let again = u2.board.list().await.unwrap();
    assert_eq!(bodies(&first), vec!["hello"]);
    assert_eq!(first, again);
}

#[tokio::test]
async fn own_only_visibility_hides_other_authors() {
    let backend = Backend::new(MessageVisibility::OwnOnly);
    let mut u1 = backend.client();
    let mut u2 = backend.client();
    u1.sign_in(&backend, Identity::new("u1")).await;
    u2.sign_in(&backend, Identity::new("u2")).await;

    u1.board.post("hello").await.unwrap();
    u2.board.post("mine").await.unwrap();

    for _ in 0..2 {
        assert_eq!(bodies(&u2.board.list().await.unwrap()), vec!["mine"]);
        assert_eq!(bodies(&u1.board.list().await.unwrap()), vec!["hello"]);
    }
}

#[tokio::test]
async fn visibility_change_takes_effect_without_client_changes() {
    let backend = Backend::new(MessageVisibility::OwnOnly);
    let mut u1 = backend.client();
    let mut u2 = backend.client();
    u1.sign_in(&backend, Identity::new("u1")).await;
    u2.sign_in(&backend, Identity::new("u2")).await;
    u1.board.post("hello").await.unwrap();

    assert!(u2.board.list().await.unwrap().is_empty());
    schema::apply_visibility(&backend.store, MessageVisibility::AllAuthenticated);
    assert_eq!(bodies(&u2.board.list().await.unwrap()), vec!["hello"]);
}

#[tokio::test]
async fn forged_author_is_rejected() {
    let backend = Backend::new(MessageVisibility::AllAuthenticated);
    let mut client = backend.client();
    client.sign_in(&backend, Identity::new("u1")).await;

    let mut record = body_row("impersonation");
    record.insert("author_id".into(), json!("u2"));
    let err = client.gateway().insert(MESSAGES_TABLE, record).await.unwrap_err();

    assert!(err.is_access_denied());
    assert!(backend.store.service_rows(MESSAGES_TABLE).is_empty());
}

#[tokio::test]
async fn expired_session_is_denied() {
    let backend = Backend::new(MessageVisibility::AllAuthenticated);
    let client = backend.client();

    let now = Utc::now();
    let claims = AccessClaims::new(SubjectId::new("u1"), None, now - Duration::hours(2), now - Duration::hours(1));
    client.gateway().credentials().set(Session {
        subject_id: SubjectId::new("u1"),
        email: None,
        bearer_token: HmacTokenKey::new(SECRET).sign(&claims).unwrap(),
        refresh_token: "stale".into(),
        token_type: "bearer".into(),
        expires_at: now - Duration::hours(1),
        user_metadata: UserMetadata::default(),
    });

    let err = client.board.post("late").await.unwrap_err();
    assert!(err.is_access_denied());
    let err = client.board.list().await.unwrap_err();
    assert!(err.is_access_denied());
}

#[tokio::test]
async fn unreachable_store_is_transport_not_denial() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let board = MessageBoard::new(DataGateway::new(
        RestStore::new(base_url, "anon-key"),
        Arc::new(CredentialStore::new()),
    ));
    let err = board.list().await.unwrap_err();

    assert!(matches!(err, BoardError::Gateway(ref e) if e.is_transport()));
    assert!(!err.is_access_denied());
}

#[tokio::test]
async fn invalid_body_never_reaches_the_store() {
    let backend = Backend::new(MessageVisibility::AllAuthenticated);
    let mut client = backend.client();
    client.sign_in(&backend, Identity::new("u1")).await;

    assert!(matches!(client.board.post("   ").await, Err(BoardError::Validation(_))));
    assert!(matches!(client.board.post(&"x".repeat(2001)).await, Err(BoardError::Validation(_))));
    assert!(backend.store.service_rows(MESSAGES_TABLE).is_empty());
}

#[tokio::test]
async fn profiles_get_unique_usernames() {
    let backend = Backend::new(MessageVisibility::AllAuthenticated);
    let octo = |id: &str| {
        let mut identity = Identity::new(id);
        identity.metadata.preferred_username = Some("OctoCat".into());
        identity.metadata.full_name = Some(format!("Octo {id}"));
        identity
    };

    let mut first = backend.client();
    let s1 = first.sign_in(&backend, octo("u1")).await;
    let p1 = ensure_profile(first.gateway(), &s1).await.unwrap();
    assert_eq!(p1.username.as_deref(), Some("octocat"));

    // Idempotent for the same subject.
    assert_eq!(ensure_profile(first.gateway(), &s1).await.unwrap(), p1);

    let mut second = backend.client();
    let s2 = second.sign_in(&backend, octo("u2")).await;
    let p2 = ensure_profile(second.gateway(), &s2).await.unwrap();
    assert_eq!(p2.username.as_deref(), Some("octocat2"));
    assert_eq!(p2.full_name.as_deref(), Some("Octo u2"));

    let directory = profile_directory(second.gateway()).await.unwrap();
    assert_eq!(directory.len(), 2);
    assert_eq!(directory[&SubjectId::new("u1")].display_name(), "Octo u1");
}

#[tokio::test]
async fn select_filters_only_narrow_policy_results() {
    let backend = Backend::new(MessageVisibility::OwnOnly);
    let mut u1 = backend.client();
    let mut u2 = backend.client();
    u1.sign_in(&backend, Identity::new("u1")).await;
    u2.sign_in(&backend, Identity::new("u2")).await;
    u1.board.post("secret").await.unwrap();

    let rows = u2
        .gateway()
        .select(MESSAGES_TABLE, Filter::new().eq("author_id", "u1"))
        .await
        .unwrap();
    assert!(rows.is_empty());
}
