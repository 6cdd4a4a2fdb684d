//! Credential Provider Abstraction

use async_trait::async_trait;

use crate::error::Result;

/// Supplies the bearer token attached to every remote API call.
///
/// Implementations are expected to refresh transparently before expiry, so
/// callers ask for the token right before each request instead of caching it.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn current_token(&self) -> Result<String>;
}
