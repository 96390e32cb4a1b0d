//! Secure credential handling for the text-understanding service.
//!
//! The extraction API key is required at startup; a missing key is a fatal
//! configuration error raised before any pipeline step runs, never a
//! per-request failure. Wrapping the key in [`ApiCredential`] ensures:
//!
//! - **No accidental logging**: the value cannot appear in Debug/Display output
//! - **Memory safety**: the value is zeroed on drop
//! - **Explicit exposure**: the raw key is only reachable via `.expose()`
//!
//! ## Usage
//!
//! ```ignore
//! use mirage_runtime::secrets::ApiCredential;
//!
//! // Load from environment
//! let cred = ApiCredential::from_env("GROQ_API_KEY", "Groq API key")?;
//!
//! // Use in HTTP header (explicit exposure)
//! request.bearer_auth(cred.expose());
//! ```

use secrecy::{ExposeSecret, SecretString};
use serde_json::Value as JsonValue;
use std::fmt;

use crate::config::ConfigError;

/// Where a credential was loaded from.
///
/// Useful for debugging configuration issues without exposing the actual
/// credential value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    /// Loaded from configuration file/JSON
    Config,
    /// Loaded from environment variable
    Environment,
    /// Provided programmatically
    Programmatic,
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialSource::Config => write!(f, "config"),
            CredentialSource::Environment => write!(f, "environment"),
            CredentialSource::Programmatic => write!(f, "programmatic"),
        }
    }
}

/// A securely-stored API credential.
///
/// Debug shows `[REDACTED]`, the value is zeroed on drop via the `secrecy`
/// crate, and the raw value must be explicitly requested with `.expose()`.
pub struct ApiCredential {
    value: SecretString,
    source: CredentialSource,
    name: &'static str,
}

impl ApiCredential {
    /// Create a new credential from a string value.
    ///
    /// The value is immediately wrapped in SecretString and cannot be
    /// accidentally logged after this point.
    pub fn new(value: impl Into<String>, source: CredentialSource, name: &'static str) -> Self {
        Self {
            value: SecretString::from(value.into()),
            source,
            name,
        }
    }

    /// Load a credential from an environment variable.
    ///
    /// # Arguments
    /// * `env_var` - Name of the environment variable
    /// * `name` - Human-readable name for error messages (e.g., "Groq API key")
    pub fn from_env(env_var: &str, name: &'static str) -> Result<Self, ConfigError> {
        std::env::var(env_var)
            .map(|v| Self::new(v, CredentialSource::Environment, name))
            .map_err(|_| ConfigError::MissingCredential {
                name,
                env_var: env_var.to_string(),
            })
    }

    /// Load a credential from JSON config, falling back to an environment
    /// variable.
    ///
    /// 1. Check if `config_key` exists in the JSON config
    /// 2. If not, fall back to `env_var`
    /// 3. Error if neither is set
    pub fn from_config_or_env(
        config: &JsonValue,
        config_key: &str,
        env_var: &str,
        name: &'static str,
    ) -> Result<Self, ConfigError> {
        if let Some(value) = config[config_key].as_str() {
            return Ok(Self::new(value, CredentialSource::Config, name));
        }

        if let Ok(value) = std::env::var(env_var) {
            return Ok(Self::new(value, CredentialSource::Environment, name));
        }

        Err(ConfigError::MissingCredential {
            name,
            env_var: env_var.to_string(),
        })
    }

    /// Check if a credential is available without loading it.
    pub fn is_available(config: &JsonValue, config_key: &str, env_var: &str) -> bool {
        config[config_key].as_str().is_some() || std::env::var(env_var).is_ok()
    }

    /// Expose the credential value for use in API calls.
    ///
    /// Only call this at the point where the credential is actually needed
    /// (e.g., setting an HTTP header). Never store the exposed value.
    pub fn expose(&self) -> &str {
        self.value.expose_secret()
    }

    /// Check if the credential is empty.
    pub fn is_empty(&self) -> bool {
        self.value.expose_secret().is_empty()
    }

    /// Get the source of this credential.
    pub fn source(&self) -> CredentialSource {
        self.source
    }

    /// Get the human-readable name of this credential.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Debug for ApiCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiCredential")
            .field("value", &"[REDACTED]")
            .field("source", &self.source)
            .field("name", &self.name)
            .finish()
    }
}

impl fmt::Display for ApiCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} from {} [REDACTED]", self.name, self.source)
    }
}
