use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};

/// Credential identifier recorded in the session key for public-client
/// sessions, which have no certificate thumbprint.
pub const PUBLIC_CLIENT_CREDENTIAL: &str = "PublicClientApplication";

/// Kind of client application a session authenticates as.
///
/// Confidential clients are service identities backed by a certificate or
/// client secret; public clients are user-delegated identities that sign in
/// through interactive or silent user flows.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ClientKind {
    Confidential,
    Public,
}

impl fmt::Display for ClientKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientKind::Confidential => write!(f, "confidential"),
            ClientKind::Public => write!(f, "public"),
        }
    }
}

/// Ordered public-client acquisition strategies.
///
/// The fallback chain walks these in declaration order, stopping at the
/// first success. The chain never loops back to an earlier flow.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PublicFlow {
    /// Reuse a previously cached account without user interaction.
    Silent,
    /// Device-code sign-in through a browser.
    Interactive,
    /// Explicit username/password prompt, last resort.
    Prompt,
}

impl PublicFlow {
    /// All flows in fallback order.
    pub const CHAIN: [PublicFlow; 3] = [
        PublicFlow::Silent,
        PublicFlow::Interactive,
        PublicFlow::Prompt,
    ];
}

impl fmt::Display for PublicFlow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PublicFlow::Silent => write!(f, "silent"),
            PublicFlow::Interactive => write!(f, "interactive"),
            PublicFlow::Prompt => write!(f, "prompt"),
        }
    }
}

/// Well-known scope sets a session can be bound to.
///
/// Each set expands to the `.default` resource scope of the corresponding
/// service, parameterized by tenant name and authority domain so sovereign
/// clouds resolve to their own endpoints.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ScopeSet {
    #[default]
    Graph,
    SharePoint,
    Exchange,
    Management,
}

impl ScopeSet {
    /// Stable name used as the scope component of a session key.
    pub fn name(&self) -> &'static str {
        match self {
            ScopeSet::Graph => "Graph",
            ScopeSet::SharePoint => "SharePoint",
            ScopeSet::Exchange => "Exchange",
            ScopeSet::Management => "Management",
        }
    }

    /// Expands the set to concrete scope URLs.
    ///
    /// `tenant` is the bare tenant name (e.g. "contoso") and
    /// `authority_domain` is ".com" or ".us".
    pub fn scope_urls(&self, tenant: &str, authority_domain: &str) -> Vec<String> {
        match self {
            ScopeSet::Graph => {
                vec![format!("https://graph.microsoft{authority_domain}/.default")]
            }
            ScopeSet::SharePoint => {
                vec![format!(
                    "https://{tenant}.sharepoint{authority_domain}/.default"
                )]
            }
            ScopeSet::Exchange => {
                vec![format!("https://outlook.office365{authority_domain}/.default")]
            }
            ScopeSet::Management => {
                vec![format!(
                    "https://management.azure{authority_domain}/.default"
                )]
            }
        }
    }
}

impl fmt::Display for ScopeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Access token returned by the identity provider.
#[derive(Clone, Debug)]
pub struct AuthToken {
    /// The access token string
    pub token: String,
    /// The type of token (e.g. "Bearer")
    pub token_type: String,
    /// Seconds until expiry, from the moment of issuance
    pub expires_in_secs: Option<u64>,
}

/// A cached access token with expiration tracking.
#[derive(Clone, Debug)]
pub struct CachedToken {
    /// The access token string
    pub token: String,
    /// When the token expires
    pub expires_at: Instant,
    /// The type of token (e.g. "Bearer")
    pub token_type: String,
}

/// Tokens within this window of expiry are treated as due for replacement.
const REFRESH_BUFFER: Duration = Duration::from_secs(300);

/// Expiry assumed when the provider omits `expires_in`.
const DEFAULT_TOKEN_LIFETIME_SECS: u64 = 3600;

impl CachedToken {
    pub fn new(token: String, expires_in: Duration, token_type: String) -> Self {
        Self {
            token,
            expires_at: Instant::now() + expires_in,
            token_type,
        }
    }

    /// Whether the token has passed its expiration time.
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }

    /// Whether the token should be replaced soon.
    ///
    /// Applies a five-minute buffer so tokens are renewed before they
    /// actually lapse mid-request.
    pub fn needs_refresh(&self) -> bool {
        Instant::now() + REFRESH_BUFFER >= self.expires_at
    }
}

impl From<AuthToken> for CachedToken {
    fn from(token: AuthToken) -> Self {
        let lifetime = token.expires_in_secs.unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS);
        CachedToken::new(
            token.token,
            Duration::from_secs(lifetime),
            token.token_type,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_token_is_not_expired() {
        let token = CachedToken::new(
            "tok".to_string(),
            Duration::from_secs(3600),
            "Bearer".to_string(),
        );
        assert!(!token.is_expired());
        assert!(!token.needs_refresh());
    }

    #[test]
    fn token_within_buffer_needs_refresh() {
        let token = CachedToken::new(
            "tok".to_string(),
            Duration::from_secs(60),
            "Bearer".to_string(),
        );
        assert!(!token.is_expired());
        assert!(token.needs_refresh());
    }

    #[test]
    fn zero_lifetime_token_is_expired() {
        let token = CachedToken::new("tok".to_string(), Duration::ZERO, "Bearer".to_string());
        assert!(token.is_expired());
    }

    #[test]
    fn scope_urls_respect_authority_domain() {
        let commercial = ScopeSet::Graph.scope_urls("contoso", ".com");
        assert_eq!(commercial, vec!["https://graph.microsoft.com/.default"]);

        let sovereign = ScopeSet::Graph.scope_urls("contoso", ".us");
        assert_eq!(sovereign, vec!["https://graph.microsoft.us/.default"]);

        let sharepoint = ScopeSet::SharePoint.scope_urls("contoso", ".us");
        assert_eq!(sharepoint, vec!["https://contoso.sharepoint.us/.default"]);
    }

    #[test]
    fn fallback_chain_order_is_fixed() {
        assert_eq!(
            PublicFlow::CHAIN,
            [
                PublicFlow::Silent,
                PublicFlow::Interactive,
                PublicFlow::Prompt
            ]
        );
    }
}
