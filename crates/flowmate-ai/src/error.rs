use std::time::Duration;
use thiserror::Error;

/// Failures of the attention oracle.
///
/// None of these are fatal to a focus session: callers fall back to keyword
/// matching, an empty plan, or an empty profile.
#[derive(Error, Debug)]
pub enum OracleError {
    /// Oracle is switched off in the configuration
    #[error("attention oracle is disabled")]
    Disabled,

    /// Transport or API error from the provider
    #[error("provider request failed: {0}")]
    Provider(#[from] anyhow::Error),

    /// Call did not complete within its wall-clock budget
    #[error("oracle call timed out after {0:?}")]
    Timeout(Duration),

    /// Provider answered, but not with the JSON shape we asked for
    #[error("malformed oracle response: {0}")]
    MalformedResponse(String),
}
