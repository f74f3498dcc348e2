use super::errors::AuthError;
use super::provider::{AcquireRequest, TokenProvider};
use super::types::{AuthToken, ClientKind, PublicFlow};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

/// Bounded-retry settings applied to every acquisition attempt.
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    /// Total attempts per strategy, including the first
    pub max_attempts: u32,
    /// Delay before the first retry; doubles on each subsequent retry
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Policy with no delay between attempts, for tests and embedders that
    /// pace retries themselves.
    pub fn immediate() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::ZERO,
        }
    }

    fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt.saturating_sub(1))
    }
}

/// Strategy being attempted, for dispatch and logging.
#[derive(Clone, Copy, Debug)]
enum Strategy {
    Confidential,
    Public(PublicFlow),
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Strategy::Confidential => write!(f, "confidential"),
            Strategy::Public(flow) => write!(f, "{flow}"),
        }
    }
}

/// Executes the token acquisition protocol against a [`TokenProvider`].
///
/// Confidential sessions make a single-strategy acquisition under the retry
/// policy. Public sessions walk the silent → interactive → prompt fallback
/// chain, each tier wrapped by the same retry rule, stopping at the first
/// success; the chain never revisits an earlier tier. Failures are always
/// surfaced; an acquisition never resolves to an empty token.
pub struct TokenAcquirer {
    provider: Arc<dyn TokenProvider>,
    retry_policy: RetryPolicy,
}

impl TokenAcquirer {
    pub fn new(provider: Arc<dyn TokenProvider>) -> Self {
        Self {
            provider,
            retry_policy: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    /// Acquires a token for the given client kind.
    pub async fn acquire(
        &self,
        kind: ClientKind,
        request: &AcquireRequest,
    ) -> Result<AuthToken, AuthError> {
        match kind {
            ClientKind::Confidential => {
                self.run_with_retry(Strategy::Confidential, request).await
            }
            ClientKind::Public => self.acquire_public(request).await,
        }
    }

    async fn acquire_public(&self, request: &AcquireRequest) -> Result<AuthToken, AuthError> {
        let mut failures = Vec::new();
        for flow in PublicFlow::CHAIN {
            match self.run_with_retry(Strategy::Public(flow), request).await {
                Ok(token) => {
                    log::info!("acquired token through the {flow} flow");
                    return Ok(token);
                }
                Err(e) => {
                    log::warn!("{flow} flow failed: {e}");
                    failures.push((flow, e));
                }
            }
        }
        Err(AuthError::FallbackExhausted { failures })
    }

    /// Runs one strategy under the bounded retry rule.
    ///
    /// Fatal failures surface immediately without consuming the remaining
    /// budget; retryable failures are reattempted sequentially until the
    /// budget is spent, then reported as [`AuthError::RetriesExhausted`].
    async fn run_with_retry(
        &self,
        strategy: Strategy,
        request: &AcquireRequest,
    ) -> Result<AuthToken, AuthError> {
        let max_attempts = self.retry_policy.max_attempts.max(1);
        let mut last_error: Option<AuthError> = None;

        for attempt in 1..=max_attempts {
            match self.dispatch(strategy, request).await {
                Ok(token) => return Ok(token),
                Err(e) if e.is_retryable() => {
                    log::warn!(
                        "{strategy} acquisition attempt {attempt}/{max_attempts} failed: {e}"
                    );
                    last_error = Some(e);
                    if attempt < max_attempts {
                        let delay = self.retry_policy.delay_for(attempt);
                        if !delay.is_zero() {
                            sleep(delay).await;
                        }
                    }
                }
                Err(e) => return Err(e),
            }
        }

        Err(match last_error {
            Some(last) => AuthError::RetriesExhausted {
                attempts: max_attempts,
                last: Box::new(last),
            },
            // max_attempts >= 1, so at least one attempt ran and failed
            None => AuthError::Response("retry loop ended without an error".to_string()),
        })
    }

    async fn dispatch(
        &self,
        strategy: Strategy,
        request: &AcquireRequest,
    ) -> Result<AuthToken, AuthError> {
        match strategy {
            Strategy::Confidential => self.provider.acquire_confidential(request).await,
            Strategy::Public(PublicFlow::Silent) => self.provider.acquire_silent(request).await,
            Strategy::Public(PublicFlow::Interactive) => {
                self.provider.acquire_interactive(request).await
            }
            Strategy::Public(PublicFlow::Prompt) => self.provider.acquire_prompt(request).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::errors::ProviderError;
    use crate::auth::provider::Credential;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn token() -> AuthToken {
        AuthToken {
            token: "tok".to_string(),
            token_type: "Bearer".to_string(),
            expires_in_secs: Some(3600),
        }
    }

    fn retryable() -> AuthError {
        AuthError::Provider(ProviderError::retryable("429", "throttled"))
    }

    fn fatal(code: &str) -> AuthError {
        AuthError::Provider(ProviderError::fatal(code, "rejected"))
    }

    fn request() -> AcquireRequest {
        AcquireRequest {
            tenant_id: "tenant".to_string(),
            client_id: "client".to_string(),
            credential: Credential::Public,
            scopes: vec!["https://graph.microsoft.com/.default".to_string()],
            authority: "https://login.microsoftonline.com".to_string(),
        }
    }

    /// Provider that replays scripted results per strategy and counts calls.
    #[derive(Default)]
    struct ScriptedProvider {
        confidential: Mutex<Vec<Result<AuthToken, AuthError>>>,
        silent: Mutex<Vec<Result<AuthToken, AuthError>>>,
        interactive: Mutex<Vec<Result<AuthToken, AuthError>>>,
        prompt: Mutex<Vec<Result<AuthToken, AuthError>>>,
        confidential_calls: AtomicU32,
        silent_calls: AtomicU32,
        interactive_calls: AtomicU32,
        prompt_calls: AtomicU32,
    }

    impl ScriptedProvider {
        fn next(
            script: &Mutex<Vec<Result<AuthToken, AuthError>>>,
            calls: &AtomicU32,
        ) -> Result<AuthToken, AuthError> {
            calls.fetch_add(1, Ordering::SeqCst);
            let mut script = script.lock().expect("script lock");
            if script.is_empty() {
                Err(fatal("script_exhausted"))
            } else {
                script.remove(0)
            }
        }
    }

    #[async_trait]
    impl TokenProvider for ScriptedProvider {
        async fn acquire_confidential(
            &self,
            _request: &AcquireRequest,
        ) -> Result<AuthToken, AuthError> {
            Self::next(&self.confidential, &self.confidential_calls)
        }

        async fn acquire_silent(&self, _request: &AcquireRequest) -> Result<AuthToken, AuthError> {
            Self::next(&self.silent, &self.silent_calls)
        }

        async fn acquire_interactive(
            &self,
            _request: &AcquireRequest,
        ) -> Result<AuthToken, AuthError> {
            Self::next(&self.interactive, &self.interactive_calls)
        }

        async fn acquire_prompt(&self, _request: &AcquireRequest) -> Result<AuthToken, AuthError> {
            Self::next(&self.prompt, &self.prompt_calls)
        }
    }

    fn acquirer(provider: Arc<ScriptedProvider>) -> TokenAcquirer {
        TokenAcquirer::new(provider).with_retry_policy(RetryPolicy::immediate())
    }

    #[tokio::test]
    async fn confidential_succeeds_on_third_attempt() {
        let provider = Arc::new(ScriptedProvider::default());
        *provider.confidential.lock().expect("lock") =
            vec![Err(retryable()), Err(retryable()), Ok(token())];

        let result = acquirer(provider.clone())
            .acquire(ClientKind::Confidential, &request())
            .await;
        assert!(result.is_ok());
        assert_eq!(provider.confidential_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn confidential_fatal_error_stops_immediately() {
        let provider = Arc::new(ScriptedProvider::default());
        *provider.confidential.lock().expect("lock") = vec![Err(fatal("invalid_client"))];

        let err = acquirer(provider.clone())
            .acquire(ClientKind::Confidential, &request())
            .await
            .unwrap_err();
        assert_eq!(provider.confidential_calls.load(Ordering::SeqCst), 1);
        assert!(matches!(err, AuthError::Provider(e) if e.code == "invalid_client"));
    }

    #[tokio::test]
    async fn confidential_surfaces_exhausted_retries() {
        let provider = Arc::new(ScriptedProvider::default());
        *provider.confidential.lock().expect("lock") =
            vec![Err(retryable()), Err(retryable()), Err(retryable())];

        let err = acquirer(provider.clone())
            .acquire(ClientKind::Confidential, &request())
            .await
            .unwrap_err();
        assert_eq!(provider.confidential_calls.load(Ordering::SeqCst), 3);
        assert!(matches!(
            err,
            AuthError::RetriesExhausted { attempts: 3, .. }
        ));
    }

    #[tokio::test]
    async fn public_falls_through_to_interactive_without_prompt() {
        let provider = Arc::new(ScriptedProvider::default());
        *provider.silent.lock().expect("lock") = vec![Err(fatal("no_cached_account"))];
        *provider.interactive.lock().expect("lock") = vec![Ok(token())];

        let result = acquirer(provider.clone())
            .acquire(ClientKind::Public, &request())
            .await;
        assert!(result.is_ok());
        assert_eq!(provider.silent_calls.load(Ordering::SeqCst), 1);
        assert_eq!(provider.interactive_calls.load(Ordering::SeqCst), 1);
        assert_eq!(provider.prompt_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn public_retries_each_tier_before_falling_through() {
        let provider = Arc::new(ScriptedProvider::default());
        *provider.silent.lock().expect("lock") =
            vec![Err(retryable()), Err(retryable()), Err(retryable())];
        *provider.interactive.lock().expect("lock") = vec![Err(retryable()), Ok(token())];

        let result = acquirer(provider.clone())
            .acquire(ClientKind::Public, &request())
            .await;
        assert!(result.is_ok());
        assert_eq!(provider.silent_calls.load(Ordering::SeqCst), 3);
        assert_eq!(provider.interactive_calls.load(Ordering::SeqCst), 2);
        assert_eq!(provider.prompt_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn public_exhaustion_aggregates_every_tier() {
        let provider = Arc::new(ScriptedProvider::default());
        *provider.silent.lock().expect("lock") = vec![Err(fatal("no_cached_account"))];
        *provider.interactive.lock().expect("lock") = vec![Err(fatal("access_denied"))];
        *provider.prompt.lock().expect("lock") = vec![Err(fatal("prompt_unavailable"))];

        let err = acquirer(provider.clone())
            .acquire(ClientKind::Public, &request())
            .await
            .unwrap_err();
        match err {
            AuthError::FallbackExhausted { failures } => {
                assert_eq!(failures.len(), 3);
                assert_eq!(failures[0].0, PublicFlow::Silent);
                assert_eq!(failures[1].0, PublicFlow::Interactive);
                assert_eq!(failures[2].0, PublicFlow::Prompt);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
