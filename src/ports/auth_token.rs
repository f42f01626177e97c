//! AuthTokenProvider port - Current bearer token supply.

use secrecy::SecretString;

/// Synchronous accessor for the current bearer token.
///
/// Returning `None` means the user is not authenticated; the registry then
/// refuses to open connections rather than failing loudly.
pub trait AuthTokenProvider: Send + Sync {
    /// The token to use right now, if any.
    fn current_token(&self) -> Option<SecretString>;
}
