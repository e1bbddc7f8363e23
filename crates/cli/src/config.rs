use std::time::Duration;

use thiserror::Error;

use msgboard_auth::ProviderConfig;

pub const SUPABASE_URL: &str = "SUPABASE_URL";
pub const SUPABASE_ANON_KEY: &str = "SUPABASE_ANON_KEY";
pub const OAUTH_PROVIDER: &str = "OAUTH_PROVIDER";
pub const OAUTH_CLIENT_ID: &str = "OAUTH_CLIENT_ID";
pub const OAUTH_SCOPES: &str = "OAUTH_SCOPES";
pub const OAUTH_REDIRECT_PORT: &str = "OAUTH_REDIRECT_PORT";
pub const OAUTH_CALLBACK_TIMEOUT_SECS: &str = "OAUTH_CALLBACK_TIMEOUT_SECS";
pub const HTTP_TIMEOUT_SECS: &str = "HTTP_TIMEOUT_SECS";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("invalid value for {key}: '{value}' ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: &'static str,
    },
}

/// Process configuration, read once at startup.
#[derive(Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Backend base URL (auth at `/auth/v1`, data at `/rest/v1`).
    pub supabase_url: String,
    /// Public API key; identifies the project, grants nothing by itself.
    pub anon_key: String,
    pub provider: String,
    pub client_id: Option<String>,
    pub scopes: Vec<String>,
    pub redirect_port: u16,
    pub callback_timeout: Duration,
    pub http_timeout: Duration,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let required = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let supabase_url = required(SUPABASE_URL)?;
        if !(supabase_url.starts_with("http://") || supabase_url.starts_with("https://")) {
            return Err(ConfigError::Invalid {
                key: SUPABASE_URL,
                value: supabase_url,
                reason: "expected an http(s) URL",
            });
        }

        let scopes = get(OAUTH_SCOPES)
            .map(|s| {
                s.split(|c: char| c == ',' || c.is_whitespace())
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            supabase_url: supabase_url.trim_end_matches('/').to_string(),
            anon_key: required(SUPABASE_ANON_KEY)?,
            provider: get(OAUTH_PROVIDER).unwrap_or_else(|| "github".to_string()),
            client_id: get(OAUTH_CLIENT_ID),
            scopes,
            redirect_port: parse_or(get(OAUTH_REDIRECT_PORT), OAUTH_REDIRECT_PORT, 8765)?,
            callback_timeout: Duration::from_secs(parse_or(
                get(OAUTH_CALLBACK_TIMEOUT_SECS),
                OAUTH_CALLBACK_TIMEOUT_SECS,
                300,
            )?),
            http_timeout: Duration::from_secs(parse_or(get(HTTP_TIMEOUT_SECS), HTTP_TIMEOUT_SECS, 10)?),
        })
    }

    pub fn redirect_uri(&self) -> String {
        format!("http://127.0.0.1:{}/callback", self.redirect_port)
    }

    pub fn provider_config(&self) -> ProviderConfig {
        let provider = ProviderConfig::gotrue(&self.supabase_url, &self.provider, self.redirect_uri())
            .with_scopes(self.scopes.clone());
        match &self.client_id {
            Some(id) => provider.with_client_id(id),
            None => provider,
        }
    }
}

fn parse_or<T: std::str::FromStr>(raw: Option<String>, key: &'static str, default: T) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => value.parse().map_err(|_| ConfigError::Invalid {
            key,
            value,
            reason: "expected a non-negative integer",
        }),
    }
}

impl core::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AppConfig")
            .field("supabase_url", &self.supabase_url)
            .field("anon_key", &"<redacted>")
            .field("provider", &self.provider)
            .field("client_id", &self.client_id)
            .field("scopes", &self.scopes)
            .field("redirect_port", &self.redirect_port)
            .field("callback_timeout", &self.callback_timeout)
            .field("http_timeout", &self.http_timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    const BASE: &[(&str, &str)] = &[(SUPABASE_URL, "https://proj.supabase.co/"), (SUPABASE_ANON_KEY, "anon")];

    #[test]
    fn defaults_apply() {
        let cfg = AppConfig::from_lookup(lookup(BASE)).unwrap();
        assert_eq!(cfg.supabase_url, "https://proj.supabase.co");
        assert_eq!(cfg.provider, "github");
        assert_eq!(cfg.client_id, None);
        assert!(cfg.scopes.is_empty());
        assert_eq!(cfg.redirect_port, 8765);
        assert_eq!(cfg.callback_timeout, Duration::from_secs(300));
        assert_eq!(cfg.http_timeout, Duration::from_secs(10));
        assert_eq!(cfg.redirect_uri(), "http://127.0.0.1:8765/callback");
    }

    #[test]
    fn missing_required_values_are_reported() {
        assert_eq!(
            AppConfig::from_lookup(lookup(&[(SUPABASE_URL, "https://x")])),
            Err(ConfigError::Missing(SUPABASE_ANON_KEY))
        );
        assert_eq!(
            AppConfig::from_lookup(lookup(&[(SUPABASE_URL, "  "), (SUPABASE_ANON_KEY, "k")])),
            Err(ConfigError::Missing(SUPABASE_URL))
        );
    }

    #[test]
    fn invalid_values_are_rejected() {
        let mut pairs = BASE.to_vec();
        pairs.push((OAUTH_REDIRECT_PORT, "99999"));
        assert!(matches!(
            AppConfig::from_lookup(lookup(&pairs)),
            Err(ConfigError::Invalid { key: OAUTH_REDIRECT_PORT, .. })
        ));

        let err = AppConfig::from_lookup(lookup(&[(SUPABASE_URL, "proj.supabase.co"), (SUPABASE_ANON_KEY, "k")]));
        assert!(matches!(err, Err(ConfigError::Invalid { key: SUPABASE_URL, .. })));
    }

    #[test]
    fn overrides_and_provider_config() {
        let mut pairs = BASE.to_vec();
        pairs.extend([
            (OAUTH_PROVIDER, "gitlab"),
            (OAUTH_CLIENT_ID, "client-1"),
            (OAUTH_SCOPES, "read:user, user:email"),
            (OAUTH_REDIRECT_PORT, "9000"),
        ]);
        let cfg = AppConfig::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(cfg.scopes, vec!["read:user", "user:email"]);

        let provider = cfg.provider_config();
        assert_eq!(provider.authorize_endpoint, "https://proj.supabase.co/auth/v1/authorize");
        assert_eq!(provider.provider.as_deref(), Some("gitlab"));
        assert_eq!(provider.client_id.as_deref(), Some("client-1"));
        assert_eq!(provider.redirect_uri, "http://127.0.0.1:9000/callback");
    }

    #[test]
    fn debug_hides_the_key() {
        let cfg = AppConfig::from_lookup(lookup(&[(SUPABASE_URL, "https://x"), (SUPABASE_ANON_KEY, "sekrit")])).unwrap();
        assert!(!format!("{cfg:?}").contains("sekrit"));
    }
}
