//! Validated environment variable access.
//!
//! Configuration bootstrapping reads a handful of environment variables.
//! These helpers ensure a variable is not just present but also valid UTF-8
//! and non-empty after trimming.

use thiserror::Error;

/// Errors that can occur when reading environment variables.
#[derive(Debug, Error)]
pub enum EnvVarError {
    /// Environment variable is not set
    #[error("environment variable '{name}' is not set")]
    NotFound { name: String },

    /// Environment variable contains invalid UTF-8
    #[error("environment variable '{name}' contains invalid UTF-8")]
    InvalidUtf8 { name: String },

    /// Environment variable is set but empty or whitespace-only
    #[error("environment variable '{name}' is empty")]
    Empty { name: String },
}

/// Helpers for reading environment variables with validation.
pub struct EnvUtils;

impl EnvUtils {
    /// Reads an environment variable, requiring a non-empty value.
    ///
    /// The value is trimmed before being returned.
    pub fn get_validated_var(name: &str) -> Result<String, EnvVarError> {
        match std::env::var(name) {
            Ok(value) => {
                let trimmed = value.trim();
                if trimmed.is_empty() {
                    Err(EnvVarError::Empty {
                        name: name.to_string(),
                    })
                } else {
                    Ok(trimmed.to_string())
                }
            }
            Err(std::env::VarError::NotPresent) => Err(EnvVarError::NotFound {
                name: name.to_string(),
            }),
            Err(std::env::VarError::NotUnicode(_)) => Err(EnvVarError::InvalidUtf8 {
                name: name.to_string(),
            }),
        }
    }

    /// Reads an environment variable, returning `None` if it is missing,
    /// empty, or invalid.
    pub fn optional_var(name: &str) -> Option<String> {
        Self::get_validated_var(name).ok()
    }
}
