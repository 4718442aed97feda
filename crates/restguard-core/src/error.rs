//! Client- and policy-level error types.

use thiserror::Error;

/// Errors raised by a [`RestClient`](crate::client::RestClient) while
/// preparing, sending or decoding a request.
#[derive(Debug, Clone, Error)]
pub enum ClientError {
    /// The HTTP exchange failed (connection refused, reset, DNS, etc.).
    #[error("HTTP error: {0}")]
    Http(String),

    /// The request did not complete within the configured duration.
    #[error("Request timed out after {ms}ms")]
    Timeout { ms: u64 },

    /// The request URI could not be built or parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The request is malformed (bad verb, bad header, ...).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The request body could not be serialized.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The response body could not be deserialized into the requested type.
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    /// The caller's cancellation token fired before the response arrived.
    #[error("Request cancelled")]
    Cancelled,

    /// The client configuration is unusable (bad proxy, bad certificate, ...).
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// An unexpected error.
    #[error("{0}")]
    Other(String),
}

impl ClientError {
    /// Returns `true` if this error is transient and the request may succeed
    /// when sent again.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Http(_) | Self::Timeout { .. })
    }
}

/// Errors produced by a policy wrapping an execution.
///
/// The guarded client never translates these: whatever the policy yields is
/// handed back to the caller as-is.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// The wrapped call failed and the policy chose not to (or could not)
    /// recover.
    #[error(transparent)]
    Client(#[from] ClientError),

    /// Every allowed attempt failed with a retryable error.
    #[error("Retries exhausted after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: ClientError },

    /// The policy's time budget elapsed.
    #[error("Policy timed out after {ms}ms")]
    Timeout { ms: u64 },

    /// A user policy refused to run the action (open circuit, bulkhead full, ...).
    #[error("Execution rejected: {0}")]
    Rejected(String),

    /// A policy returned a value that was not produced by the action it was given.
    #[error("Policy returned a value of an unexpected type")]
    UnexpectedOutput,
}

impl PolicyError {
    /// The client error at the root of this failure, if any.
    pub fn client_error(&self) -> Option<&ClientError> {
        match self {
            Self::Client(e) => Some(e),
            Self::RetriesExhausted { last, .. } => Some(last),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(ClientError::Http("reset".into()).is_transient());
        assert!(ClientError::Timeout { ms: 10 }.is_transient());
        assert!(!ClientError::Cancelled.is_transient());
        assert!(!ClientError::Deserialization("bad".into()).is_transient());
    }

    #[test]
    fn policy_error_exposes_root_cause() {
        let err = PolicyError::RetriesExhausted {
            attempts: 3,
            last: ClientError::Http("boom".into()),
        };
        assert!(matches!(err.client_error(), Some(ClientError::Http(_))));
        assert!(PolicyError::Timeout { ms: 5 }.client_error().is_none());
        assert_eq!(
            err.to_string(),
            "Retries exhausted after 3 attempts: HTTP error: boom"
        );
    }
}
