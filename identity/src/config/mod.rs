//! Tenant configuration.
//!
//! A consumed collaborator: supplies the default tenant id, application id,
//! certificate thumbprint, and tenant name used when the session manager's
//! entry points are called without explicit parameters. Configuration is
//! loaded from environment variables and per-tenant JSON files
//! (`UniversalConfig.{tenant}.json`, a flat string map).

use crate::utils::{EnvUtils, EnvVarError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable naming the default tenant, e.g. "contoso" for
/// contoso.sharepoint.com.
pub const TENANT_STRING_VAR: &str = "TENANT_STRING";

/// Environment variable selecting the Azure environment.
pub const AZURE_ENVIRONMENT_VAR: &str = "AZURE_ENVIRONMENT";

/// Errors raised while loading tenant configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration file {0} does not exist")]
    MissingFile(PathBuf),

    #[error("configuration file {path} could not be read: {reason}")]
    Unreadable { path: PathBuf, reason: String },

    #[error("configuration file {path} could not be parsed: {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error("required configuration key '{0}' is missing or empty")]
    MissingKey(&'static str),

    #[error(transparent)]
    Env(#[from] EnvVarError),
}

/// The Azure cloud environment a tenant lives in.
///
/// Selects the authority domain used to compose login and resource
/// endpoints: `.us` for the US Government GCC High cloud, `.com` otherwise.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AzureEnvironment {
    #[default]
    Commercial,
    UsGovGccHigh,
}

impl AzureEnvironment {
    /// Top-level domain suffix for this environment.
    pub fn authority_domain(self) -> &'static str {
        match self {
            AzureEnvironment::UsGovGccHigh => ".us",
            AzureEnvironment::Commercial => ".com",
        }
    }

    /// Parses an environment name as found in config files or environment
    /// variables. Unknown names yield `None`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "commercial" => Some(AzureEnvironment::Commercial),
            "usgovgcchigh" | "us_gov_gcc_high" | "gcchigh" => Some(AzureEnvironment::UsGovGccHigh),
            _ => None,
        }
    }
}

// Keys of the per-tenant JSON settings map.
const KEY_TENANT_DIRECTORY_ID: &str = "TenantDirectoryId";
const KEY_APPLICATION_CLIENT_ID: &str = "ApplicationClientId";
const KEY_CERT_STORE_LOCATION: &str = "CertStoreLocation";
const KEY_CERT_THUMBPRINT: &str = "CertThumbprint";
const KEY_AZURE_ENVIRONMENT: &str = "AzureEnvironment";
const KEY_DEBUG_ENABLED: &str = "DebugEnabled";
const KEY_MULTI_THREADED: &str = "MultiThreaded";

/// Configuration for one tenant.
#[derive(Clone, Debug)]
pub struct TenantConfig {
    /// Bare tenant name, e.g. "contoso"
    pub tenant_string: String,
    /// Tenant/directory id
    pub tenant_id: String,
    /// Application/client id
    pub client_id: String,
    /// Preferred certificate store scope ("CurrentUser" or "LocalMachine")
    pub cert_store_location: String,
    /// Thumbprint of the application certificate; empty for tenants that
    /// only use public-client sessions
    pub cert_thumbprint: String,
    /// Cloud environment the tenant lives in
    pub environment: AzureEnvironment,
    /// Debug switch carried for embedders
    pub debug_enabled: bool,
    /// Multithreading switch carried for embedders
    pub multi_threaded: bool,
    settings: HashMap<String, String>,
}

impl TenantConfig {
    /// Loads configuration for the tenant named by the `TENANT_STRING`
    /// environment variable, searching `dir` for the tenant's JSON file.
    pub fn from_env(dir: &Path) -> Result<Self, ConfigError> {
        let tenant_string = EnvUtils::get_validated_var(TENANT_STRING_VAR)?;
        Self::load(&tenant_string, dir)
    }

    /// Loads `UniversalConfig.{tenant_string}.json` from `dir`.
    pub fn load(tenant_string: &str, dir: &Path) -> Result<Self, ConfigError> {
        let tenant_string = tenant_string.trim();
        let path = dir.join(format!("UniversalConfig.{tenant_string}.json"));
        if !path.exists() {
            return Err(ConfigError::MissingFile(path));
        }
        let contents = std::fs::read_to_string(&path).map_err(|e| ConfigError::Unreadable {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        let settings: HashMap<String, String> =
            serde_json::from_str(&contents).map_err(|e| ConfigError::Parse {
                path: path.clone(),
                reason: e.to_string(),
            })?;
        log::debug!("loaded tenant configuration for '{tenant_string}' from {}", path.display());
        Self::from_settings(tenant_string, settings)
    }

    fn from_settings(
        tenant_string: &str,
        settings: HashMap<String, String>,
    ) -> Result<Self, ConfigError> {
        let required = |key: &'static str| -> Result<String, ConfigError> {
            settings
                .get(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or(ConfigError::MissingKey(key))
        };
        let optional =
            |key: &str| -> Option<String> { settings.get(key).map(|v| v.trim().to_string()) };
        let flag = |key: &str, default: bool| -> bool {
            optional(key)
                .and_then(|v| v.parse::<bool>().ok())
                .unwrap_or(default)
        };

        let environment = optional(KEY_AZURE_ENVIRONMENT)
            .or_else(|| EnvUtils::optional_var(AZURE_ENVIRONMENT_VAR))
            .and_then(|name| AzureEnvironment::from_name(&name))
            .unwrap_or_default();

        Ok(Self {
            tenant_string: tenant_string.to_string(),
            tenant_id: required(KEY_TENANT_DIRECTORY_ID)?,
            client_id: required(KEY_APPLICATION_CLIENT_ID)?,
            cert_store_location: optional(KEY_CERT_STORE_LOCATION)
                .unwrap_or_else(|| "CurrentUser".to_string()),
            cert_thumbprint: optional(KEY_CERT_THUMBPRINT).unwrap_or_default(),
            environment,
            debug_enabled: flag(KEY_DEBUG_ENABLED, true),
            multi_threaded: flag(KEY_MULTI_THREADED, true),
            settings,
        })
    }

    /// Raw value of an arbitrary settings key.
    pub fn setting(&self, key: &str) -> Option<&str> {
        self.settings.get(key).map(String::as_str)
    }

    /// Top-level domain suffix for the tenant's environment.
    pub fn authority_domain(&self) -> &'static str {
        self.environment.authority_domain()
    }

    /// Authority base URL for token requests.
    pub fn authority(&self) -> String {
        format!("https://login.microsoftonline{}", self.authority_domain())
    }

    /// The tenant's SharePoint host, e.g. "contoso.sharepoint.com".
    pub fn tenant_url(&self) -> String {
        format!("{}.sharepoint{}", self.tenant_string, self.authority_domain())
    }

    /// Graph users endpoint for this tenant's environment.
    pub fn graph_user_endpoint(&self) -> String {
        format!("https://graph.microsoft{}/v1.0/users", self.authority_domain())
    }
}
