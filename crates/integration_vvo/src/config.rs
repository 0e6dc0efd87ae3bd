//! VVO client configuration

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::VvoError;

/// Environment variable prefix, e.g. `VVO_BASE_URL`
const ENV_PREFIX: &str = "VVO";

/// Configuration for the VVO open-data client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VvoConfig {
    /// Base URL of the VVO web API
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// User agent sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_base_url() -> String {
    "https://webapi.vvo-online.de".to_string()
}

const fn default_timeout_secs() -> u64 {
    10
}

fn default_user_agent() -> String {
    format!("integration_vvo/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for VvoConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

impl VvoConfig {
    /// Create a configuration suitable for testing
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            timeout_secs: 5,
            ..Default::default()
        }
    }

    /// Load configuration from an optional `vvo.toml` in the working
    /// directory, overridden by `VVO_*` environment variables
    ///
    /// # Errors
    ///
    /// Returns [`VvoError::ConfigurationError`] if a source cannot be read or
    /// the result fails validation.
    pub fn load() -> Result<Self, VvoError> {
        Self::build(config::File::with_name("vvo").required(false))
    }

    /// Load configuration from the given file, overridden by `VVO_*`
    /// environment variables
    ///
    /// # Errors
    ///
    /// Returns [`VvoError::ConfigurationError`] if the file is missing or
    /// malformed, or the result fails validation.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, VvoError> {
        Self::build(config::File::from(path.as_ref()))
    }

    fn build<S>(file: S) -> Result<Self, VvoError>
    where
        S: config::Source + Send + Sync + 'static,
    {
        let config: Self = config::Config::builder()
            .add_source(file)
            .add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()
            .and_then(config::Config::try_deserialize)
            .map_err(|e| VvoError::ConfigurationError(e.to_string()))?;

        config.validate().map_err(VvoError::ConfigurationError)?;
        Ok(config)
    }

    /// Join an endpoint path onto the base URL
    #[must_use]
    pub fn endpoint_url(&self, endpoint: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            endpoint.trim_start_matches('/')
        )
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.base_url.is_empty() {
            return Err("base_url must not be empty".to_string());
        }

        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err("base_url must be an http(s) URL".to_string());
        }

        if self.timeout_secs == 0 {
            return Err("timeout_secs must be greater than 0".to_string());
        }

        Ok(())
    }
}
