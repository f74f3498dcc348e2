use super::errors::AuthError;
use super::types::AuthToken;
use crate::credentials::CredentialHandle;
use async_trait::async_trait;
use std::fmt;

/// Credential material backing an acquisition request.
#[derive(Clone)]
pub enum Credential {
    /// Certificate from the credential store; exchanged as a signed
    /// client assertion.
    Certificate(CredentialHandle),
    /// Application client secret.
    Secret(String),
    /// No application credential; the session authenticates a user.
    Public,
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credential::Certificate(handle) => f
                .debug_tuple("Certificate")
                .field(&handle.thumbprint)
                .finish(),
            Credential::Secret(_) => f.debug_tuple("Secret").field(&"[redacted]").finish(),
            Credential::Public => write!(f, "Public"),
        }
    }
}

/// Everything a provider needs to produce a token for one session.
#[derive(Clone, Debug)]
pub struct AcquireRequest {
    /// Tenant/directory id the token is scoped to
    pub tenant_id: String,
    /// Application/client id
    pub client_id: String,
    /// Credential material for confidential acquisition
    pub credential: Credential,
    /// Concrete scope URLs
    pub scopes: Vec<String>,
    /// Authority base URL, e.g. `https://login.microsoftonline.com`
    pub authority: String,
}

/// Interface to the identity provider's token endpoint.
///
/// One method per acquisition strategy. Implementations classify failures
/// into [`AuthError::Provider`] with the `retryable` flag set from the
/// provider's response; the retry loop and the fallback chain consume only
/// that classification and never inspect provider specifics.
///
/// [`AuthError::Provider`]: super::errors::AuthError::Provider
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Confidential-client acquisition backed by the request's credential.
    async fn acquire_confidential(&self, request: &AcquireRequest) -> Result<AuthToken, AuthError>;

    /// Reuse of a previously cached account, without user interaction.
    async fn acquire_silent(&self, request: &AcquireRequest) -> Result<AuthToken, AuthError>;

    /// Interactive sign-in through a browser-based surface.
    async fn acquire_interactive(&self, request: &AcquireRequest)
    -> Result<AuthToken, AuthError>;

    /// Explicit-credential prompt, the most intrusive flow.
    async fn acquire_prompt(&self, request: &AcquireRequest) -> Result<AuthToken, AuthError>;
}

/// Username/password pair collected by a [`CredentialPrompt`].
#[derive(Clone)]
pub struct UserCredentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for UserCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserCredentials")
            .field("username", &self.username)
            .field("password", &"[redacted]")
            .finish()
    }
}

/// Source of explicit user credentials for the prompt flow.
///
/// Injected into the provider by embedders that can put a question in front
/// of a user; without one the prompt flow fails fatally and the fallback
/// chain ends.
pub trait CredentialPrompt: Send + Sync {
    fn prompt(&self) -> Result<UserCredentials, AuthError>;
}
