use super::errors::AuthError;
use super::key::SessionKey;
use super::types::{AuthToken, CachedToken, ClientKind, ScopeSet};
use crate::graph::{ApiSurface, GraphClient};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

// Transport pool tuning for long-lived processes: bound the idle pool per
// destination and retire idle connections well before typical load-balancer
// lifetimes so stale sockets are not reused indefinitely.
const MAX_IDLE_CONNECTIONS_PER_HOST: usize = 100;
const POOLED_CONNECTION_IDLE_TIMEOUT: Duration = Duration::from_secs(55 * 60);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(100);

const USER_AGENT: &str = concat!("m365-identity/", env!("CARGO_PKG_VERSION"));

/// An authenticated context: one tenant/application/credential/scope
/// combination, its current token, a pooled transport, and lazily built
/// downstream API clients.
///
/// The token is never mutated in place; re-acquisition replaces it
/// atomically through [`Session::replace_token`], which also discards the
/// API clients so they rebind to the new token. The transport is built once
/// per session and reused for every operation issued against it. No network
/// I/O happens until a caller drives a request through an API client.
#[derive(Debug)]
pub struct Session {
    key: SessionKey,
    tenant_id: String,
    client_id: String,
    credential_id: String,
    tenant_string: String,
    client_kind: ClientKind,
    scope_set: ScopeSet,
    authority_domain: String,
    token: RwLock<CachedToken>,
    transport: reqwest::Client,
    graph_clients: RwLock<HashMap<ApiSurface, Arc<GraphClient>>>,
}

impl Session {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        key: SessionKey,
        tenant_id: String,
        client_id: String,
        credential_id: String,
        tenant_string: String,
        client_kind: ClientKind,
        scope_set: ScopeSet,
        authority_domain: String,
        token: AuthToken,
    ) -> Result<Self, AuthError> {
        Ok(Self {
            key,
            tenant_id,
            client_id,
            credential_id,
            tenant_string,
            client_kind,
            scope_set,
            authority_domain,
            token: RwLock::new(CachedToken::from(token)),
            transport: build_transport()?,
            graph_clients: RwLock::new(HashMap::new()),
        })
    }

    pub fn key(&self) -> &SessionKey {
        &self.key
    }

    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Certificate thumbprint for confidential sessions, or the
    /// public-client sentinel.
    pub fn credential_id(&self) -> &str {
        &self.credential_id
    }

    pub fn tenant_string(&self) -> &str {
        &self.tenant_string
    }

    pub fn client_kind(&self) -> ClientKind {
        self.client_kind
    }

    pub fn scope_set(&self) -> ScopeSet {
        self.scope_set
    }

    pub fn authority_domain(&self) -> &str {
        &self.authority_domain
    }

    /// The session's pooled HTTP transport.
    pub fn transport(&self) -> &reqwest::Client {
        &self.transport
    }

    /// Snapshot of the current token.
    pub async fn token(&self) -> CachedToken {
        self.token.read().await.clone()
    }

    /// Whether the current token is past its expiry.
    pub async fn token_is_expired(&self) -> bool {
        self.token.read().await.is_expired()
    }

    /// Whether the current token is due for replacement.
    pub async fn token_needs_refresh(&self) -> bool {
        self.token.read().await.needs_refresh()
    }

    /// Replaces the token atomically and discards API clients bound to the
    /// old token.
    pub(crate) async fn replace_token(&self, token: AuthToken) {
        {
            let mut current = self.token.write().await;
            *current = CachedToken::from(token);
        }
        self.graph_clients.write().await.clear();
        log::debug!("replaced token for session {}", self.key);
    }

    /// Returns a Graph client for `surface`, constructing it on first use.
    ///
    /// Clients share the session's transport and are bound to the token
    /// current at construction time; replacing the token rebuilds them.
    pub async fn graph_client(&self, surface: ApiSurface) -> Arc<GraphClient> {
        if let Some(client) = self.graph_clients.read().await.get(&surface) {
            return client.clone();
        }
        let token = self.token().await;
        let mut clients = self.graph_clients.write().await;
        clients
            .entry(surface)
            .or_insert_with(|| {
                Arc::new(GraphClient::new(
                    self.transport.clone(),
                    &token.token,
                    &self.authority_domain,
                    surface,
                ))
            })
            .clone()
    }
}

fn build_transport() -> Result<reqwest::Client, AuthError> {
    reqwest::Client::builder()
        .pool_max_idle_per_host(MAX_IDLE_CONNECTIONS_PER_HOST)
        .pool_idle_timeout(POOLED_CONNECTION_IDLE_TIMEOUT)
        .timeout(REQUEST_TIMEOUT)
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| AuthError::Configuration(format!("failed to build HTTP transport: {e}")))
}
