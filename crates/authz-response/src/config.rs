//! Response construction configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::jose::algorithm::SignatureAlgorithm;

/// Configuration for authorization responses and assertions.
///
/// # Example (TOML)
///
/// ```toml
/// [response]
/// issuer = "https://as.example.com"
/// response_lifetime = "10m"
/// default_signature_algorithm = "RS256"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ResponseConfig {
    /// Authorization server issuer, emitted as the `iss` claim.
    pub issuer: Option<String>,

    /// Lifetime of a JWT response, used for `exp` when no absolute
    /// expiry is supplied.
    #[serde(with = "humantime_serde")]
    pub response_lifetime: Duration,

    /// Algorithm used to sign JWT response modes when the client registered
    /// no signing preference.
    pub default_signature_algorithm: SignatureAlgorithm,
}

impl Default for ResponseConfig {
    fn default() -> Self {
        Self {
            issuer: None,
            response_lifetime: Duration::from_secs(600),
            default_signature_algorithm: SignatureAlgorithm::RS256,
        }
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// An invalid configuration value was provided.
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    /// A required configuration value is missing.
    #[error("Missing required configuration: {0}")]
    Missing(String),
}

impl ResponseConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if:
    /// - The issuer is present but blank
    /// - The response lifetime is zero
    /// - The default signature algorithm needs a shared secret
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.issuer.as_deref().is_some_and(|i| i.trim().is_empty()) {
            return Err(ConfigError::InvalidValue(
                "issuer cannot be blank".to_string(),
            ));
        }

        if self.response_lifetime.is_zero() {
            return Err(ConfigError::InvalidValue(
                "response_lifetime must be greater than zero".to_string(),
            ));
        }

        // A server-wide default has no client secret to sign with.
        if self.default_signature_algorithm.is_symmetric() {
            return Err(ConfigError::InvalidValue(format!(
                "default signature algorithm {} requires a shared secret",
                self.default_signature_algorithm
            )));
        }

        Ok(())
    }

    /// Returns the issuer, failing if none is configured.
    ///
    /// # Errors
    /// Returns `ConfigError::Missing` when no issuer is set.
    pub fn require_issuer(&self) -> Result<&str, ConfigError> {
        self.issuer
            .as_deref()
            .ok_or_else(|| ConfigError::Missing("issuer".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validates() {
        let config = ResponseConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.response_lifetime, Duration::from_secs(600));
        assert_eq!(config.default_signature_algorithm, SignatureAlgorithm::RS256);
    }

    #[test]
    fn test_blank_issuer_fails_validation() {
        let config = ResponseConfig {
            issuer: Some("  ".to_string()),
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(_)));
        assert!(err.to_string().contains("issuer"));
    }

    #[test]
    fn test_zero_lifetime_fails_validation() {
        let config = ResponseConfig {
            response_lifetime: Duration::ZERO,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_symmetric_default_algorithm_fails_validation() {
        let config = ResponseConfig {
            default_signature_algorithm: SignatureAlgorithm::HS256,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("HS256"));
    }

    #[test]
    fn test_require_issuer() {
        let err = ResponseConfig::default().require_issuer().unwrap_err();
        assert_eq!(err.to_string(), "Missing required configuration: issuer");

        let config = ResponseConfig {
            issuer: Some("https://as.example.com".to_string()),
            ..Default::default()
        };
        assert_eq!(config.require_issuer().unwrap(), "https://as.example.com");
    }

    #[test]
    fn test_deserialize_humantime() {
        let config: ResponseConfig = serde_json::from_str(
            r#"{"issuer":"https://as.example.com","response_lifetime":"5m","default_signature_algorithm":"ES384"}"#,
        )
        .unwrap();
        assert_eq!(config.response_lifetime, Duration::from_secs(300));
        assert_eq!(config.default_signature_algorithm, SignatureAlgorithm::ES384);
        assert!(config.validate().is_ok());

        let empty: ResponseConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(empty, ResponseConfig::default());
    }
}
