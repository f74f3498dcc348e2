use super::types::PublicFlow;
use thiserror::Error;

/// A classified failure from the identity provider.
///
/// `retryable` is the single predicate consumed by the retry loop; it is set
/// at classification time from the provider's response (throttling and
/// transient faults are retryable, everything else is fatal).
#[derive(Debug, Clone, Error)]
#[error("{code}: {message}")]
pub struct ProviderError {
    /// Provider error code (e.g. "invalid_client", "temporarily_unavailable")
    pub code: String,
    /// Human-readable error description
    pub message: String,
    /// Whether the provider marked this failure as transient
    pub retryable: bool,
}

impl ProviderError {
    pub fn retryable(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            retryable: true,
        }
    }

    pub fn fatal(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            retryable: false,
        }
    }
}

/// Errors that can occur during session resolution and token acquisition.
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    /// Required tenant, application, or credential identifiers are absent,
    /// or a collaborator could not supply its configuration. Acquisition is
    /// never attempted.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The credential store holds no certificate for the thumbprint.
    #[error("credential '{0}' not found in the current-user or local-machine store")]
    CredentialNotFound(String),

    /// A classified provider failure, surfaced without consuming retries
    /// when fatal.
    #[error("identity provider error: {0}")]
    Provider(ProviderError),

    /// The bounded retry budget was spent on retryable failures.
    #[error("token acquisition failed after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: Box<AuthError> },

    /// Every public-client flow failed; the per-flow failures are aggregated.
    #[error("all public client flows failed: {}", format_flow_failures(.failures))]
    FallbackExhausted {
        failures: Vec<(PublicFlow, AuthError)>,
    },

    /// The token endpoint could not be reached.
    #[error("token endpoint request failed: {0}")]
    Http(String),

    /// The token endpoint or resource API returned a response that could not
    /// be interpreted.
    #[error("unexpected response: {0}")]
    Response(String),
}

impl AuthError {
    /// Whether the retry loop may attempt this operation again.
    ///
    /// Transport failures count as transient; provider failures defer to
    /// their classification. Everything else is final.
    pub fn is_retryable(&self) -> bool {
        match self {
            AuthError::Provider(e) => e.retryable,
            AuthError::Http(_) => true,
            _ => false,
        }
    }
}

fn format_flow_failures(failures: &[(PublicFlow, AuthError)]) -> String {
    failures
        .iter()
        .map(|(flow, err)| format!("{flow}: {err}"))
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_classification_drives_retryability() {
        let throttled = AuthError::Provider(ProviderError::retryable("429", "throttled"));
        assert!(throttled.is_retryable());

        let denied = AuthError::Provider(ProviderError::fatal("access_denied", "denied"));
        assert!(!denied.is_retryable());
    }

    #[test]
    fn transport_failures_are_retryable() {
        assert!(AuthError::Http("connection reset".to_string()).is_retryable());
    }

    #[test]
    fn configuration_errors_are_final() {
        assert!(!AuthError::Configuration("missing tenant id".to_string()).is_retryable());
        assert!(!AuthError::CredentialNotFound("AABB".to_string()).is_retryable());
    }

    #[test]
    fn fallback_exhausted_lists_every_flow() {
        let err = AuthError::FallbackExhausted {
            failures: vec![
                (
                    PublicFlow::Silent,
                    AuthError::Provider(ProviderError::fatal("no_cached_account", "no account")),
                ),
                (
                    PublicFlow::Interactive,
                    AuthError::Provider(ProviderError::fatal("access_denied", "denied")),
                ),
            ],
        };
        let rendered = err.to_string();
        assert!(rendered.contains("silent"));
        assert!(rendered.contains("interactive"));
        assert!(rendered.contains("access_denied"));
    }
}
