//! Bearer token providers.

use secrecy::{ExposeSecret, SecretString};
use std::sync::{PoisonError, RwLock};

use crate::ports::AuthTokenProvider;

/// Always returns the same token. Useful for service accounts and tests.
#[derive(Debug)]
pub struct StaticTokenProvider {
    token: SecretString,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: SecretString::new(token.into()),
        }
    }
}

impl AuthTokenProvider for StaticTokenProvider {
    fn current_token(&self) -> Option<SecretString> {
        Some(SecretString::new(self.token.expose_secret().clone()))
    }
}

/// Token slot that can be replaced or cleared at runtime (login / logout).
///
/// Connections already open keep running after [`clear`](Self::clear); the
/// next connect attempt for any topic sees no token and falls back.
#[derive(Debug, Default)]
pub struct SharedTokenProvider {
    token: RwLock<Option<SecretString>>,
}

impl SharedTokenProvider {
    /// Creates a provider with no token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a provider holding `token`.
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: RwLock::new(Some(SecretString::new(token.into()))),
        }
    }

    /// Replaces the current token.
    pub fn set(&self, token: impl Into<String>) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) =
            Some(SecretString::new(token.into()));
    }

    /// Removes the current token.
    pub fn clear(&self) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

impl AuthTokenProvider for SharedTokenProvider {
    fn current_token(&self) -> Option<SecretString> {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|token| SecretString::new(token.expose_secret().clone()))
    }
}
