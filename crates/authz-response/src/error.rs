//! Error types for response and assertion construction.
//!
//! Hard failures abort a build and surface as [`ResponseError`]. A recipient
//! key that cannot be resolved for asymmetric encryption is *not* an error:
//! it is reported as [`PipelineOutcome::EncryptionKeyUnavailable`] so the
//! endpoint can answer with an empty response value instead of failing the
//! request.
//!
//! [`PipelineOutcome::EncryptionKeyUnavailable`]: crate::pipeline::PipelineOutcome::EncryptionKeyUnavailable

use std::fmt;

use crate::config::ConfigError;
use crate::crypto::CryptoError;

/// The cryptographic operation that needed a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CryptoOperation {
    /// Producing a JWS signature.
    Signing,
    /// Resolving a recipient public key from a key set.
    KeyResolution,
}

impl CryptoOperation {
    /// Returns the operation name used in error messages.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Signing => "signing",
            Self::KeyResolution => "key resolution",
        }
    }
}

impl fmt::Display for CryptoOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Errors that can occur while building an authorization response or assertion.
#[derive(Debug, thiserror::Error)]
pub enum ResponseError {
    /// A signing or encryption branch was selected but no crypto provider is
    /// configured.
    #[error("Crypto provider required for {operation}")]
    CryptoProviderRequired {
        /// The operation that could not run.
        operation: CryptoOperation,
    },

    /// The configured algorithm combination cannot produce a JOSE header, or
    /// the key material does not fit the algorithm family.
    #[error("Unsupported algorithm: {message}")]
    UnsupportedAlgorithm {
        /// Description of the unsupported combination.
        message: String,
    },

    /// The response configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The crypto provider reported a failure.
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// Content or key encryption failed.
    #[error("Encryption failed: {message}")]
    EncryptionFailed {
        /// Description of the encryption failure.
        message: String,
    },

    /// A header or payload could not be serialized to JSON.
    #[error("Serialization failed: {message}")]
    Serialization {
        /// Description of the failure.
        message: String,
    },

    /// A protocol parameter has an unrecognized value.
    #[error("Invalid parameter {name}: {message}")]
    InvalidParameter {
        /// Parameter name.
        name: String,
        /// Description of the problem.
        message: String,
    },

    /// The base redirect URI cannot carry a response.
    #[error("Invalid redirect URI: {message}")]
    InvalidRedirectUri {
        /// Description of why the redirect URI is invalid.
        message: String,
    },
}

impl ResponseError {
    /// Creates a new `CryptoProviderRequired` error.
    #[must_use]
    pub fn crypto_provider_required(operation: CryptoOperation) -> Self {
        Self::CryptoProviderRequired { operation }
    }

    /// Creates a new `UnsupportedAlgorithm` error.
    #[must_use]
    pub fn unsupported_algorithm(message: impl Into<String>) -> Self {
        Self::UnsupportedAlgorithm {
            message: message.into(),
        }
    }

    /// Creates a new `EncryptionFailed` error.
    #[must_use]
    pub fn encryption_failed(message: impl Into<String>) -> Self {
        Self::EncryptionFailed {
            message: message.into(),
        }
    }

    /// Creates a new `Serialization` error.
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidParameter` error.
    #[must_use]
    pub fn invalid_parameter(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Creates a new `InvalidRedirectUri` error.
    #[must_use]
    pub fn invalid_redirect_uri(message: impl Into<String>) -> Self {
        Self::InvalidRedirectUri {
            message: message.into(),
        }
    }

    /// Returns `true` if the error comes from missing or mismatched
    /// configuration rather than a runtime crypto failure.
    #[must_use]
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::CryptoProviderRequired { .. }
                | Self::UnsupportedAlgorithm { .. }
                | Self::Config(_)
                | Self::InvalidRedirectUri { .. }
        )
    }

    /// Returns `true` if a cryptographic operation failed while running.
    #[must_use]
    pub fn is_crypto_failure(&self) -> bool {
        matches!(self, Self::Crypto(_) | Self::EncryptionFailed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ResponseError::crypto_provider_required(CryptoOperation::Signing);
        assert_eq!(err.to_string(), "Crypto provider required for signing");

        let err = ResponseError::crypto_provider_required(CryptoOperation::KeyResolution);
        assert_eq!(err.to_string(), "Crypto provider required for key resolution");

        let err = ResponseError::unsupported_algorithm("A128KW needs a shared key");
        assert_eq!(
            err.to_string(),
            "Unsupported algorithm: A128KW needs a shared key"
        );
    }

    #[test]
    fn test_error_predicates() {
        assert!(
            ResponseError::crypto_provider_required(CryptoOperation::Signing)
                .is_configuration_error()
        );
        assert!(ResponseError::unsupported_algorithm("x").is_configuration_error());
        assert!(ResponseError::invalid_redirect_uri("x").is_configuration_error());
        assert!(!ResponseError::encryption_failed("x").is_configuration_error());

        assert!(ResponseError::encryption_failed("x").is_crypto_failure());
        assert!(ResponseError::from(CryptoError::key_not_found("k1")).is_crypto_failure());
        assert!(!ResponseError::unsupported_algorithm("x").is_crypto_failure());
    }

    #[test]
    fn test_crypto_error_is_transparent() {
        let err = ResponseError::from(CryptoError::key_not_found("k1"));
        assert_eq!(err.to_string(), "Key not found: k1");
    }
}
