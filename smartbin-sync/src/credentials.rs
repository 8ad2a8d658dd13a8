//! Credential sources.
//!
//! The engine needs a bearer token before it connects. Acquiring one is the
//! host's business; the engine only asks, once, at startup.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Environment variable checked first by [`EnvToken::standard`].
pub const TOKEN_ENV: &str = "SMARTBIN_TOKEN";

/// Fallback environment variable provided to add-ons by the bus supervisor.
pub const SUPERVISOR_TOKEN_ENV: &str = "SUPERVISOR_TOKEN";

/// A bearer token. `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the secret.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

/// Supplies the bearer token synchronously at startup.
pub trait CredentialSource: Send + Sync {
    /// Returns the token, or `None` if none is available.
    fn access_token(&self) -> Option<AccessToken>;
}

/// A token known up front.
#[derive(Debug, Clone)]
pub struct StaticToken(Option<AccessToken>);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        let token = token.into();
        if token.trim().is_empty() {
            Self(None)
        } else {
            Self(Some(AccessToken::new(token)))
        }
    }

    /// A source that never has a token.
    pub fn none() -> Self {
        Self(None)
    }
}

impl CredentialSource for StaticToken {
    fn access_token(&self) -> Option<AccessToken> {
        self.0.clone()
    }
}

/// Reads the token from environment variables, first match wins.
#[derive(Debug, Clone)]
pub struct EnvToken {
    vars: Vec<String>,
}

impl EnvToken {
    pub fn new(vars: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            vars: vars.into_iter().map(Into::into).collect(),
        }
    }

    /// `SMARTBIN_TOKEN`, then `SUPERVISOR_TOKEN`.
    pub fn standard() -> Self {
        Self::new([TOKEN_ENV, SUPERVISOR_TOKEN_ENV])
    }
}

impl CredentialSource for EnvToken {
    fn access_token(&self) -> Option<AccessToken> {
        self.vars
            .iter()
            .filter_map(|var| std::env::var(var).ok())
            .find(|value| !value.trim().is_empty())
            .map(AccessToken::new)
    }
}
