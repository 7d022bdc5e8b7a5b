//! Cryptographic capability boundary.
//!
//! The response pipeline never touches private key material directly. It asks
//! a [`CryptoCapability`] to sign a JWS signing input and to resolve recipient
//! public keys for JWE key transport. Implementations may be an in-memory
//! keystore ([`SoftwareCryptoProvider`]), an HSM or a remote signer; they may
//! block on I/O and are shared between concurrent builds as
//! `Arc<dyn CryptoCapability>`.

pub mod software;

use rsa::RsaPublicKey;

use crate::jose::algorithm::SignatureAlgorithm;
use crate::jose::jwks::Jwks;

pub use software::{SigningKeyPair, SoftwareCryptoProvider};

/// Errors reported by a crypto provider.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    /// No key with the requested key ID is available.
    #[error("Key not found: {kid}")]
    KeyNotFound {
        /// The requested key ID.
        kid: String,
    },

    /// The provider holds no key usable with the requested algorithm.
    #[error("No signing key available for {algorithm}")]
    NoKeyForAlgorithm {
        /// The requested algorithm.
        algorithm: SignatureAlgorithm,
    },

    /// A symmetric algorithm was requested without a shared secret.
    #[error("Shared secret required for {algorithm}")]
    MissingSharedSecret {
        /// The requested algorithm.
        algorithm: SignatureAlgorithm,
    },

    /// Key material is malformed or does not match the algorithm.
    #[error("Invalid key: {message}")]
    InvalidKey {
        /// Description of the problem.
        message: String,
    },

    /// The signing operation itself failed.
    #[error("Signing failed: {message}")]
    SigningFailed {
        /// Description of the failure.
        message: String,
    },

    /// Key pair generation failed.
    #[error("Key generation failed: {message}")]
    KeyGenerationFailed {
        /// Description of the failure.
        message: String,
    },
}

impl CryptoError {
    /// Creates a new `KeyNotFound` error.
    #[must_use]
    pub fn key_not_found(kid: impl Into<String>) -> Self {
        Self::KeyNotFound { kid: kid.into() }
    }

    /// Creates a new `NoKeyForAlgorithm` error.
    #[must_use]
    pub fn no_key_for_algorithm(algorithm: SignatureAlgorithm) -> Self {
        Self::NoKeyForAlgorithm { algorithm }
    }

    /// Creates a new `MissingSharedSecret` error.
    #[must_use]
    pub fn missing_shared_secret(algorithm: SignatureAlgorithm) -> Self {
        Self::MissingSharedSecret { algorithm }
    }

    /// Creates a new `InvalidKey` error.
    #[must_use]
    pub fn invalid_key(message: impl Into<String>) -> Self {
        Self::InvalidKey {
            message: message.into(),
        }
    }

    /// Creates a new `SigningFailed` error.
    #[must_use]
    pub fn signing_failed(message: impl Into<String>) -> Self {
        Self::SigningFailed {
            message: message.into(),
        }
    }

    /// Creates a new `KeyGenerationFailed` error.
    #[must_use]
    pub fn key_generation_failed(message: impl Into<String>) -> Self {
        Self::KeyGenerationFailed {
            message: message.into(),
        }
    }

    /// Returns `true` if the error is about missing or unusable key material.
    #[must_use]
    pub fn is_key_error(&self) -> bool {
        matches!(
            self,
            Self::KeyNotFound { .. }
                | Self::NoKeyForAlgorithm { .. }
                | Self::MissingSharedSecret { .. }
                | Self::InvalidKey { .. }
        )
    }
}

impl From<jsonwebtoken::errors::Error> for CryptoError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::InvalidKeyFormat | ErrorKind::InvalidRsaKey(_) | ErrorKind::InvalidEcdsaKey => {
                Self::invalid_key(err.to_string())
            }
            _ => Self::signing_failed(err.to_string()),
        }
    }
}

/// A public key usable as a JWE key transport recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublicKey {
    /// An RSA public key (RSA1_5, RSA-OAEP, RSA-OAEP-256).
    Rsa(RsaPublicKey),
}

impl PublicKey {
    /// Returns the JWK key type of this key.
    #[must_use]
    pub fn key_type(&self) -> &'static str {
        match self {
            Self::Rsa(_) => "RSA",
        }
    }
}

/// Signing and key resolution capability consumed by the pipeline.
pub trait CryptoCapability: Send + Sync {
    /// Signs a JWS signing input and returns the base64url-encoded signature.
    ///
    /// `key_id` selects a private key for asymmetric algorithms; when absent
    /// the provider uses its default key for `algorithm`. `shared_secret` is
    /// required for the HMAC family.
    fn sign(
        &self,
        signing_input: &[u8],
        key_id: Option<&str>,
        shared_secret: Option<&str>,
        algorithm: SignatureAlgorithm,
    ) -> Result<String, CryptoError>;

    /// Resolves a recipient public key by key ID.
    ///
    /// Returns `Ok(None)` when no matching key exists. Callers treat that as
    /// a soft failure.
    fn resolve_public_key(
        &self,
        key_id: &str,
        jwks: Option<&Jwks>,
    ) -> Result<Option<PublicKey>, CryptoError>;
}
