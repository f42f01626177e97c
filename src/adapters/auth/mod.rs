//! Authentication adapters.
//!
//! Implementations of [`AuthTokenProvider`](crate::ports::AuthTokenProvider):
//! - `StaticTokenProvider` - Fixed token
//! - `SharedTokenProvider` - Replaceable token for login/logout flows

mod token_provider;

pub use token_provider::{SharedTokenProvider, StaticTokenProvider};
