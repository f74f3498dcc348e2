pub mod acquirer;
pub mod azure_ad;
pub mod cache;
pub mod errors;
pub mod key;
pub mod manager;
pub mod provider;
pub mod session;
pub mod types;

pub use acquirer::{RetryPolicy, TokenAcquirer};
pub use azure_ad::AzureAdProvider;
pub use cache::SessionCache;
pub use errors::{AuthError, ProviderError};
pub use key::SessionKey;
pub use manager::SessionManager;
pub use provider::{AcquireRequest, Credential, CredentialPrompt, TokenProvider, UserCredentials};
pub use session::Session;
pub use types::{AuthToken, CachedToken, ClientKind, PUBLIC_CLIENT_CREDENTIAL, PublicFlow, ScopeSet};
