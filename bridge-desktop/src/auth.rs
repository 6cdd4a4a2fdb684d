//! Token providers for desktop runs

use async_trait::async_trait;
use bridge_traits::{
    auth::TokenProvider,
    error::{BridgeError, Result},
};

/// Token handed in at startup, e.g. from an environment variable.
///
/// Refresh is the operator's job; an expired token surfaces as a 401 from
/// the remote store.
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    /// Read the token from `var`.
    pub fn from_env(var: &str) -> Result<Self> {
        let token = std::env::var(var)
            .map_err(|_| BridgeError::NotAvailable(format!("environment variable {} is not set", var)))?;
        if token.trim().is_empty() {
            return Err(BridgeError::NotAvailable(format!(
                "environment variable {} is empty",
                var
            )));
        }
        Ok(Self::new(token.trim()))
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn current_token(&self) -> Result<String> {
        Ok(self.token.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_token() {
        let provider = StaticTokenProvider::new("abc");
        assert_eq!(provider.current_token().await.unwrap(), "abc");
    }

    #[test]
    fn test_missing_env_var() {
        let result = StaticTokenProvider::from_env("DISK_MIRROR_TEST_TOKEN_THAT_IS_NOT_SET");
        assert!(matches!(result, Err(BridgeError::NotAvailable(_))));
    }
}
