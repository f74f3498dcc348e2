use super::acquirer::{RetryPolicy, TokenAcquirer};
use super::cache::SessionCache;
use super::errors::AuthError;
use super::key::SessionKey;
use super::provider::{AcquireRequest, Credential, TokenProvider};
use super::session::Session;
use super::types::{ClientKind, PUBLIC_CLIENT_CREDENTIAL, ScopeSet};
use crate::config::{AzureEnvironment, TenantConfig};
use crate::credentials::CredentialStore;
use std::path::PathBuf;
use std::sync::Arc;

/// Caller-facing entry point for resolving authenticated sessions.
///
/// Owns the session cache and the acquisition machinery. `resolve` consults
/// the cache by derived key; on a miss the appropriate acquisition strategy
/// runs and the new session is inserted and made active. Acquisition
/// failures propagate unchanged; a caller never receives a usable-looking
/// session without a token.
///
/// The manager is an explicitly owned instance; embedders share it by
/// reference (or `Arc`) rather than through process-wide state.
pub struct SessionManager {
    cache: SessionCache,
    provider: Arc<dyn TokenProvider>,
    acquirer: TokenAcquirer,
    credential_store: Arc<dyn CredentialStore>,
    environment: Option<AzureEnvironment>,
    config_dir: PathBuf,
    default_tenant: Option<String>,
}

impl SessionManager {
    pub fn new(provider: Arc<dyn TokenProvider>, credential_store: Arc<dyn CredentialStore>) -> Self {
        Self {
            cache: SessionCache::new(),
            acquirer: TokenAcquirer::new(provider.clone()),
            provider,
            credential_store,
            environment: None,
            config_dir: PathBuf::from("."),
            default_tenant: None,
        }
    }

    /// Overrides the Azure environment for explicitly parameterized
    /// resolutions. Defaulted resolutions take the environment from tenant
    /// configuration unless this override is set.
    pub fn with_environment(mut self, environment: AzureEnvironment) -> Self {
        self.environment = Some(environment);
        self
    }

    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.acquirer = TokenAcquirer::new(self.provider.clone()).with_retry_policy(retry_policy);
        self
    }

    /// Directory searched for `UniversalConfig.{tenant}.json` files.
    pub fn with_config_dir(mut self, config_dir: PathBuf) -> Self {
        self.config_dir = config_dir;
        self
    }

    /// Fixes the default tenant instead of reading `TENANT_STRING`.
    pub fn with_default_tenant(mut self, tenant_string: impl Into<String>) -> Self {
        self.default_tenant = Some(tenant_string.into());
        self
    }

    pub fn cache(&self) -> &SessionCache {
        &self.cache
    }

    /// Resolves a session for `scope_set` using the active session's tenant
    /// parameters, or tenant configuration defaults when nothing is active
    /// yet.
    pub async fn resolve(
        &self,
        scope_set: ScopeSet,
        reset_cache: bool,
    ) -> Result<Arc<Session>, AuthError> {
        if reset_cache {
            self.cache.reset().await;
        }

        if let Some(active) = self.cache.active() {
            // Reuse the active session's tenant parameters, including its
            // authority domain, so later scope sets stay in the same cloud.
            return match active.client_kind() {
                ClientKind::Confidential => {
                    self.resolve_confidential(
                        active.tenant_id(),
                        active.client_id(),
                        active.credential_id(),
                        active.tenant_string(),
                        scope_set,
                        active.authority_domain(),
                    )
                    .await
                }
                ClientKind::Public => {
                    self.resolve_public_in_domain(
                        active.tenant_id(),
                        active.client_id(),
                        active.tenant_string(),
                        scope_set,
                        active.authority_domain(),
                    )
                    .await
                }
            };
        }

        let config = self.load_default_config()?;
        let domain = self
            .environment
            .unwrap_or(config.environment)
            .authority_domain();
        self.resolve_confidential(
            &config.tenant_id,
            &config.client_id,
            &config.cert_thumbprint,
            &config.tenant_string,
            scope_set,
            domain,
        )
        .await
    }

    /// Explicit-parameter variant of [`resolve`](Self::resolve), bypassing
    /// configuration defaults. Caching and acquisition semantics are
    /// identical.
    pub async fn resolve_with(
        &self,
        tenant_id: &str,
        client_id: &str,
        credential_id: &str,
        tenant_string: &str,
        scope_set: ScopeSet,
        reset_cache: bool,
    ) -> Result<Arc<Session>, AuthError> {
        if reset_cache {
            self.cache.reset().await;
        }
        let domain = self.environment.unwrap_or_default().authority_domain();
        self.resolve_confidential(
            tenant_id,
            client_id,
            credential_id,
            tenant_string,
            scope_set,
            domain,
        )
        .await
    }

    /// Resolves a public-client (user-delegated) session.
    pub async fn resolve_public(
        &self,
        tenant_id: &str,
        client_id: &str,
        tenant_string: &str,
        scope_set: ScopeSet,
    ) -> Result<Arc<Session>, AuthError> {
        let domain = self.environment.unwrap_or_default().authority_domain();
        self.resolve_public_in_domain(tenant_id, client_id, tenant_string, scope_set, domain)
            .await
    }

    async fn resolve_public_in_domain(
        &self,
        tenant_id: &str,
        client_id: &str,
        tenant_string: &str,
        scope_set: ScopeSet,
        domain: &str,
    ) -> Result<Arc<Session>, AuthError> {
        require("tenant id", tenant_id)?;
        require("application id", client_id)?;

        let key = SessionKey::derive(
            tenant_id,
            client_id,
            PUBLIC_CLIENT_CREDENTIAL,
            scope_set.name(),
        );
        let request = self.public_request(tenant_id, client_id, tenant_string, scope_set, domain);

        let factory_key = key.clone();
        let session = self
            .cache
            .get_or_create(&key, || async move {
                let token = self.acquirer.acquire(ClientKind::Public, &request).await?;
                Session::new(
                    factory_key,
                    tenant_id.to_string(),
                    client_id.to_string(),
                    PUBLIC_CLIENT_CREDENTIAL.to_string(),
                    tenant_string.to_string(),
                    ClientKind::Public,
                    scope_set,
                    domain.to_string(),
                    token,
                )
            })
            .await?;

        self.refresh_if_needed(&session).await?;
        self.cache.set_active(&session);
        Ok(session)
    }

    async fn resolve_confidential(
        &self,
        tenant_id: &str,
        client_id: &str,
        credential_id: &str,
        tenant_string: &str,
        scope_set: ScopeSet,
        domain: &str,
    ) -> Result<Arc<Session>, AuthError> {
        require("tenant id", tenant_id)?;
        require("application id", client_id)?;
        require("credential (certificate thumbprint)", credential_id)?;

        let key = SessionKey::derive(tenant_id, client_id, credential_id, scope_set.name());
        let factory_key = key.clone();
        let session = self
            .cache
            .get_or_create(&key, || async move {
                let request = self.confidential_request(
                    tenant_id,
                    client_id,
                    credential_id,
                    tenant_string,
                    scope_set,
                    domain,
                )?;
                let token = self
                    .acquirer
                    .acquire(ClientKind::Confidential, &request)
                    .await?;
                Session::new(
                    factory_key,
                    tenant_id.to_string(),
                    client_id.to_string(),
                    credential_id.to_string(),
                    tenant_string.to_string(),
                    ClientKind::Confidential,
                    scope_set,
                    domain.to_string(),
                    token,
                )
            })
            .await?;

        self.refresh_if_needed(&session).await?;
        self.cache.set_active(&session);
        Ok(session)
    }

    /// Re-acquires and atomically replaces a session's token when it is due.
    ///
    /// Concurrent resolvers may race here; replacement is atomic and
    /// last-writer-wins, so every caller still observes a valid token.
    async fn refresh_if_needed(&self, session: &Arc<Session>) -> Result<(), AuthError> {
        if !session.token_needs_refresh().await {
            return Ok(());
        }
        log::info!("token for session {} is due for replacement", session.key());

        let request = match session.client_kind() {
            ClientKind::Confidential => self.confidential_request(
                session.tenant_id(),
                session.client_id(),
                session.credential_id(),
                session.tenant_string(),
                session.scope_set(),
                session.authority_domain(),
            )?,
            ClientKind::Public => self.public_request(
                session.tenant_id(),
                session.client_id(),
                session.tenant_string(),
                session.scope_set(),
                session.authority_domain(),
            ),
        };
        let token = self.acquirer.acquire(session.client_kind(), &request).await?;
        session.replace_token(token).await;
        Ok(())
    }

    fn confidential_request(
        &self,
        tenant_id: &str,
        client_id: &str,
        credential_id: &str,
        tenant_string: &str,
        scope_set: ScopeSet,
        domain: &str,
    ) -> Result<AcquireRequest, AuthError> {
        let handle = self
            .credential_store
            .find_credential(credential_id)
            .ok_or_else(|| AuthError::CredentialNotFound(credential_id.to_string()))?;
        Ok(AcquireRequest {
            tenant_id: tenant_id.to_string(),
            client_id: client_id.to_string(),
            credential: Credential::Certificate(handle),
            scopes: scope_set.scope_urls(tenant_string, domain),
            authority: authority_for(domain),
        })
    }

    fn public_request(
        &self,
        tenant_id: &str,
        client_id: &str,
        tenant_string: &str,
        scope_set: ScopeSet,
        domain: &str,
    ) -> AcquireRequest {
        AcquireRequest {
            tenant_id: tenant_id.to_string(),
            client_id: client_id.to_string(),
            credential: Credential::Public,
            scopes: scope_set.scope_urls(tenant_string, domain),
            authority: authority_for(domain),
        }
    }

    fn load_default_config(&self) -> Result<TenantConfig, AuthError> {
        let config = match &self.default_tenant {
            Some(tenant) => TenantConfig::load(tenant, &self.config_dir),
            None => TenantConfig::from_env(&self.config_dir),
        };
        config.map_err(|e| AuthError::Configuration(e.to_string()))
    }
}

fn authority_for(domain: &str) -> String {
    format!("https://login.microsoftonline{domain}")
}

fn require(what: &str, value: &str) -> Result<(), AuthError> {
    if value.trim().is_empty() {
        Err(AuthError::Configuration(format!("{what} is required")))
    } else {
        Ok(())
    }
}
