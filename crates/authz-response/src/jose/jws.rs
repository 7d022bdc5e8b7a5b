//! JWS compact serialization.

use std::fmt;

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};

use super::algorithm::SignatureAlgorithm;
use super::header::JoseHeader;
use crate::ResponseResult;
use crate::crypto::CryptoCapability;
use crate::error::{CryptoOperation, ResponseError};

/// Key reference for a signing operation.
///
/// Asymmetric algorithms use `key_id` (or the provider's default key when it
/// is absent). HMAC algorithms use `shared_secret`.
#[derive(Clone, PartialEq, Eq)]
pub struct SigningKey {
    /// Signature algorithm.
    pub algorithm: SignatureAlgorithm,
    /// Key ID of the private key, also emitted as the header `kid`.
    pub key_id: Option<String>,
    /// Shared secret for HMAC algorithms.
    pub shared_secret: Option<String>,
}

impl SigningKey {
    /// A provider-held asymmetric key.
    #[must_use]
    pub fn asymmetric(algorithm: SignatureAlgorithm, key_id: Option<impl Into<String>>) -> Self {
        Self {
            algorithm,
            key_id: key_id.map(Into::into),
            shared_secret: None,
        }
    }

    /// An HMAC key from a shared secret.
    #[must_use]
    pub fn shared(algorithm: SignatureAlgorithm, shared_secret: impl Into<String>) -> Self {
        Self {
            algorithm,
            key_id: None,
            shared_secret: Some(shared_secret.into()),
        }
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("algorithm", &self.algorithm)
            .field("key_id", &self.key_id)
            .field("shared_secret", &self.shared_secret.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// A compact JWS: `header.payload.signature`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Jws {
    header: JoseHeader,
    payload: String,
    compact: String,
}

impl Jws {
    /// Returns the protected header.
    #[must_use]
    pub fn header(&self) -> &JoseHeader {
        &self.header
    }

    /// Returns the JSON payload that was signed.
    #[must_use]
    pub fn payload(&self) -> &str {
        &self.payload
    }

    /// Returns the base64url signature segment.
    #[must_use]
    pub fn signature(&self) -> &str {
        self.compact.rsplit('.').next().unwrap_or_default()
    }

    /// Returns the compact serialization.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.compact
    }

    /// Consumes the JWS, returning the compact serialization.
    #[must_use]
    pub fn into_string(self) -> String {
        self.compact
    }
}

impl fmt::Display for Jws {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.compact)
    }
}

/// Produces compact JWS values through a crypto provider.
#[derive(Clone, Copy)]
pub struct SigningStage<'a> {
    crypto: Option<&'a dyn CryptoCapability>,
}

impl<'a> SigningStage<'a> {
    /// Creates a signing stage.
    #[must_use]
    pub fn new(crypto: Option<&'a dyn CryptoCapability>) -> Self {
        Self { crypto }
    }

    /// Signs `payload` under `header`.
    ///
    /// The signing input is the base64url header and payload joined by a
    /// period, exactly as they appear in the result.
    ///
    /// # Errors
    /// Returns `CryptoProviderRequired` without a provider, or the provider's
    /// error if signing fails.
    pub fn sign(
        &self,
        header: &JoseHeader,
        payload: &str,
        key: &SigningKey,
    ) -> ResponseResult<Jws> {
        let crypto = self
            .crypto
            .ok_or_else(|| ResponseError::crypto_provider_required(CryptoOperation::Signing))?;

        let signing_input = format!("{}.{}", header.encode()?, URL_SAFE_NO_PAD.encode(payload));
        let signature = crypto
            .sign(
                signing_input.as_bytes(),
                key.key_id.as_deref(),
                key.shared_secret.as_deref(),
                key.algorithm,
            )
            .inspect_err(|e| {
                tracing::error!(error = %e, algorithm = %key.algorithm, "JWS signing failed");
            })?;

        Ok(Jws {
            header: header.clone(),
            payload: payload.to_string(),
            compact: format!("{signing_input}.{signature}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{CryptoError, PublicKey};
    use crate::jose::jwks::Jwks;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingCrypto {
        inputs: Mutex<Vec<Vec<u8>>>,
    }

    impl CryptoCapability for RecordingCrypto {
        fn sign(
            &self,
            signing_input: &[u8],
            _key_id: Option<&str>,
            _shared_secret: Option<&str>,
            _algorithm: SignatureAlgorithm,
        ) -> Result<String, CryptoError> {
            self.inputs.lock().unwrap().push(signing_input.to_vec());
            Ok("12345".to_string())
        }

        fn resolve_public_key(
            &self,
            _key_id: &str,
            _jwks: Option<&Jwks>,
        ) -> Result<Option<PublicKey>, CryptoError> {
            Ok(None)
        }
    }

    fn rs256_header() -> JoseHeader {
        JoseHeader::builder()
            .signature(SignatureAlgorithm::RS256)
            .key_id(Some("k1"))
            .build()
            .unwrap()
    }

    #[test]
    fn test_compact_form_and_signing_input() {
        let crypto = RecordingCrypto::default();
        let stage = SigningStage::new(Some(&crypto));
        let key = SigningKey::asymmetric(SignatureAlgorithm::RS256, Some("k1"));

        let jws = stage.sign(&rs256_header(), r#"{"code":"abc"}"#, &key).unwrap();

        let parts: Vec<&str> = jws.as_str().split('.').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[2], "12345");
        assert_eq!(jws.signature(), "12345");
        assert_eq!(
            URL_SAFE_NO_PAD.decode(parts[1]).unwrap(),
            br#"{"code":"abc"}"#.to_vec()
        );

        let inputs = crypto.inputs.lock().unwrap();
        assert_eq!(inputs[0], format!("{}.{}", parts[0], parts[1]).into_bytes());
    }

    #[test]
    fn test_missing_provider() {
        let stage = SigningStage::new(None);
        let key = SigningKey::asymmetric(SignatureAlgorithm::RS256, None::<String>);

        let err = stage.sign(&rs256_header(), "{}", &key).unwrap_err();
        assert!(matches!(
            err,
            ResponseError::CryptoProviderRequired {
                operation: CryptoOperation::Signing
            }
        ));
    }

    #[test]
    fn test_signing_key_debug_redacts_secret() {
        let key = SigningKey::shared(SignatureAlgorithm::HS256, "super-secret");
        let debug = format!("{key:?}");
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("[REDACTED]"));
    }
}
