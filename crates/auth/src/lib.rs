//! `msgboard-auth`: session acquisition and the process's credential context.
//!
//! OAuth itself is delegated: the identity provider authenticates the user and
//! the backend auth service turns the returned code into a session. This crate
//! only drives that handshake and holds the result.

pub mod callback;
pub mod claims;
pub mod credentials;
pub mod error;
pub mod flow;
pub mod http_service;
pub mod in_memory;
pub mod pkce;
pub mod provider;
pub mod service;
pub mod session;

pub use callback::CallbackParams;
pub use claims::{AccessClaims, HmacTokenKey, JwtValidator, TokenValidationError, validate_claims};
pub use credentials::CredentialStore;
pub use error::AuthError;
pub use flow::{AuthFlowController, FlowState};
pub use http_service::HttpAuthService;
pub use in_memory::{Identity, InMemoryAuthService};
pub use pkce::PkcePair;
pub use provider::{AuthorizationRequest, ParamStyle, ProviderConfig};
pub use service::AuthService;
pub use session::{Credential, Session, UserMetadata};
