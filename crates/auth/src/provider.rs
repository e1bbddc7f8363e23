//! Identity-provider authorization URLs.

/// Query-parameter dialect of the authorize endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamStyle {
    /// Plain OAuth 2.0 authorization-code + PKCE. The provider echoes `state`.
    OAuth2,
    /// GoTrue (`/auth/v1/authorize`). Only `code` comes back on the redirect;
    /// the PKCE verifier is what binds the code to this client.
    GoTrue,
}

impl ParamStyle {
    pub fn echoes_state(self) -> bool {
        matches!(self, ParamStyle::OAuth2)
    }
}

/// Where and how to send the browser for sign-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    pub authorize_endpoint: String,
    pub style: ParamStyle,
    /// Upstream provider name (GoTrue `provider=`, e.g. "github").
    pub provider: Option<String>,
    pub client_id: Option<String>,
    pub scopes: Vec<String>,
    /// Application callback the provider redirects back to.
    pub redirect_uri: String,
}

/// Outbound half of the handshake, handed to the browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationRequest {
    pub url: String,
    pub state: String,
    pub code_challenge: String,
}

impl ProviderConfig {
    pub fn oauth2(
        authorize_endpoint: impl Into<String>,
        client_id: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            authorize_endpoint: authorize_endpoint.into(),
            style: ParamStyle::OAuth2,
            provider: None,
            client_id: Some(client_id.into()),
            scopes: Vec::new(),
            redirect_uri: redirect_uri.into(),
        }
    }

    pub fn gotrue(
        base_url: &str,
        provider: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            authorize_endpoint: format!("{}/auth/v1/authorize", base_url.trim_end_matches('/')),
            style: ParamStyle::GoTrue,
            provider: Some(provider.into()),
            client_id: None,
            scopes: Vec::new(),
            redirect_uri: redirect_uri.into(),
        }
    }

    pub fn with_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes = scopes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    /// Build the authorization URL for one sign-in attempt.
    pub fn authorization_url(&self, state: &str, code_challenge: &str) -> String {
        let scope = self.scopes.join(" ");
        let mut params: Vec<(&str, &str)> = Vec::new();

        match self.style {
            ParamStyle::OAuth2 => {
                params.push(("response_type", "code"));
                if let Some(client_id) = &self.client_id {
                    params.push(("client_id", client_id.as_str()));
                }
                params.push(("redirect_uri", self.redirect_uri.as_str()));
                if !scope.is_empty() {
                    params.push(("scope", scope.as_str()));
                }
                params.push(("state", state));
                params.push(("code_challenge", code_challenge));
                params.push(("code_challenge_method", "S256"));
            }
            ParamStyle::GoTrue => {
                if let Some(provider) = &self.provider {
                    params.push(("provider", provider.as_str()));
                }
                params.push(("redirect_to", self.redirect_uri.as_str()));
                if !scope.is_empty() {
                    params.push(("scopes", scope.as_str()));
                }
                if let Some(client_id) = &self.client_id {
                    params.push(("client_id", client_id.as_str()));
                }
                params.push(("code_challenge", code_challenge));
                params.push(("code_challenge_method", "s256"));
            }
        }

        let query = params
            .iter()
            .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");

        let sep = if self.authorize_endpoint.contains('?') { '&' } else { '?' };
        format!("{}{}{}", self.authorize_endpoint, sep, query)
    }
}
