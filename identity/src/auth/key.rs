use std::fmt;

/// Delimiter joining the key components.
const KEY_DELIMITER: &str = "==";

/// Deterministic composite identifier for a cached session.
///
/// Derived from the tenant id, application id, credential id (certificate
/// thumbprint, or [`PUBLIC_CLIENT_CREDENTIAL`] for public sessions) and the
/// scope-set name. Derivation is pure and case-insensitive; key equality is
/// the sole criterion for cache hits. Keys are never used for authorization
/// decisions.
///
/// [`PUBLIC_CLIENT_CREDENTIAL`]: super::types::PUBLIC_CLIENT_CREDENTIAL
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SessionKey(String);

impl SessionKey {
    /// Derives a key from its four components.
    ///
    /// Components are trimmed and lower-cased before joining; callers pass
    /// an empty string for anything absent.
    pub fn derive(tenant_id: &str, client_id: &str, credential_id: &str, scope_set: &str) -> Self {
        let parts: Vec<String> = [tenant_id, client_id, credential_id, scope_set]
            .iter()
            .map(|part| part.trim().to_lowercase())
            .collect();
        SessionKey(parts.join(KEY_DELIMITER))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
