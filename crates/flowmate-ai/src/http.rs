//! Response checks for the chat providers.
//!
//! Kept in the oracle crate because the providers are its only callers. A
//! failed status turns into an error naming the provider, which the oracle
//! logs before falling back to its offline answer.

use anyhow::{anyhow, Result};
use reqwest::StatusCode;

/// Longest slice of an error body kept in the message
const MAX_BODY_CHARS: usize = 200;

#[async_trait::async_trait]
pub trait ResponseExt {
    /// # Errors
    ///
    /// Returns an error carrying the provider, status and the start of the
    /// body unless the status is 2xx
    async fn ensure_success(self, provider: &str) -> Result<Self>
    where
        Self: Sized;
}

#[async_trait::async_trait]
impl ResponseExt for reqwest::Response {
    async fn ensure_success(self, provider: &str) -> Result<Self> {
        let status = self.status();
        if status.is_success() {
            return Ok(self);
        }
        let body = self.text().await.unwrap_or_default();
        Err(status_error(provider, status, &body))
    }
}

fn status_error(provider: &str, status: StatusCode, body: &str) -> anyhow::Error {
    let mut detail: String = body.trim().chars().take(MAX_BODY_CHARS).collect();
    if body.trim().chars().count() > MAX_BODY_CHARS {
        detail.push_str("...");
    }
    let hint = match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            " (check ai.api_key with `flowmate config set`)"
        }
        StatusCode::TOO_MANY_REQUESTS => " (rate limited)",
        _ => "",
    };
    anyhow!("{provider} request failed with {status}{hint}: {detail}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_failures_point_at_the_key() {
        let err = status_error("OpenAI", StatusCode::UNAUTHORIZED, "bad key");
        let text = err.to_string();
        assert!(text.starts_with("OpenAI request failed with 401 Unauthorized"));
        assert!(text.contains("ai.api_key"));
        assert!(text.ends_with("bad key"));
    }

    #[test]
    fn test_long_bodies_are_cut() {
        let body = "x".repeat(1000);
        let text = status_error("Ollama", StatusCode::BAD_GATEWAY, &body).to_string();
        assert!(text.ends_with("..."));
        assert!(text.len() < 300);
    }
}
