//! In-memory software keystore.
//!
//! Holds signing key pairs and signs through `jsonwebtoken`'s crypto backend.
//! RSA keys serve every RS* and PS* algorithm; EC keys serve the one ECDSA
//! algorithm matching their curve. HMAC algorithms sign with the caller's
//! shared secret and need no stored key.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use elliptic_curve::sec1::ToEncodedPoint;
use jsonwebtoken::EncodingKey;
use rand::rngs::OsRng;
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::{DecodePrivateKey, EncodePrivateKey, LineEnding};
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use time::OffsetDateTime;

use super::{CryptoCapability, CryptoError, PublicKey};
use crate::jose::algorithm::{AlgorithmFamily, SignatureAlgorithm};
use crate::jose::jwks::{Jwk, Jwks};

const RSA_KEY_BITS: usize = 2048;

// ============================================================================
// Signing Key Pair
// ============================================================================

/// A private signing key with its exportable public half.
pub struct SigningKeyPair {
    /// Key ID.
    pub kid: String,

    /// Algorithm this key was created for. RSA keys also sign with the other
    /// RSA algorithms.
    pub algorithm: SignatureAlgorithm,

    encoding_key: EncodingKey,

    public_key: PublicKeyData,

    /// When the key was created.
    pub created_at: OffsetDateTime,
}

enum PublicKeyData {
    Rsa(RsaPublicKey),
    Ec { crv: &'static str, x: Vec<u8>, y: Vec<u8> },
}

impl std::fmt::Debug for SigningKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningKeyPair")
            .field("kid", &self.kid)
            .field("algorithm", &self.algorithm)
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}

impl SigningKeyPair {
    /// Generates a new RSA key pair.
    ///
    /// # Errors
    /// Returns an error if `algorithm` is not RSA-based or generation fails.
    pub fn generate_rsa(algorithm: SignatureAlgorithm) -> Result<Self, CryptoError> {
        if algorithm.family() != AlgorithmFamily::Rsa {
            return Err(CryptoError::invalid_key(format!(
                "Algorithm {algorithm} is not RSA-based"
            )));
        }

        let private_key = RsaPrivateKey::new(&mut OsRng, RSA_KEY_BITS)
            .map_err(|e| CryptoError::key_generation_failed(e.to_string()))?;
        let private_pem = private_key
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|e| CryptoError::key_generation_failed(e.to_string()))?;
        let encoding_key = EncodingKey::from_rsa_pem(private_pem.as_bytes())
            .map_err(|e| CryptoError::key_generation_failed(e.to_string()))?;

        Ok(Self::new(
            uuid::Uuid::new_v4().to_string(),
            algorithm,
            encoding_key,
            PublicKeyData::Rsa(private_key.to_public_key()),
        ))
    }

    /// Generates a new EC key pair (P-256 for ES256, P-384 for ES384).
    ///
    /// # Errors
    /// Returns an error if `algorithm` is not ECDSA or generation fails.
    pub fn generate_ec(algorithm: SignatureAlgorithm) -> Result<Self, CryptoError> {
        let (private_pem, public_key) = match algorithm {
            SignatureAlgorithm::ES256 => {
                let secret_key = p256::SecretKey::random(&mut OsRng);
                let point = secret_key.public_key().to_encoded_point(false);
                let pem = secret_key
                    .to_pkcs8_pem(LineEnding::LF)
                    .map_err(|e| CryptoError::key_generation_failed(e.to_string()))?;
                let public_key = ec_public_data(
                    "P-256",
                    point.x().map(|v| v.as_slice()),
                    point.y().map(|v| v.as_slice()),
                )?;
                (pem, public_key)
            }
            SignatureAlgorithm::ES384 => {
                let secret_key = p384::SecretKey::random(&mut OsRng);
                let point = secret_key.public_key().to_encoded_point(false);
                let pem = secret_key
                    .to_pkcs8_pem(LineEnding::LF)
                    .map_err(|e| CryptoError::key_generation_failed(e.to_string()))?;
                let public_key = ec_public_data(
                    "P-384",
                    point.x().map(|v| v.as_slice()),
                    point.y().map(|v| v.as_slice()),
                )?;
                (pem, public_key)
            }
            other => {
                return Err(CryptoError::invalid_key(format!(
                    "Algorithm {other} is not ECDSA"
                )));
            }
        };

        let encoding_key = EncodingKey::from_ec_pem(private_pem.as_bytes())
            .map_err(|e| CryptoError::key_generation_failed(e.to_string()))?;

        Ok(Self::new(
            uuid::Uuid::new_v4().to_string(),
            algorithm,
            encoding_key,
            public_key,
        ))
    }

    /// Loads a key pair from a PEM-encoded private key.
    ///
    /// RSA keys may be PKCS#1 or PKCS#8; EC keys may be SEC1 or PKCS#8. The
    /// public half is derived from the private key.
    ///
    /// # Errors
    /// Returns an error if the PEM data is invalid or does not match the
    /// algorithm family.
    pub fn from_pem(
        kid: impl Into<String>,
        algorithm: SignatureAlgorithm,
        private_pem: &str,
    ) -> Result<Self, CryptoError> {
        let (encoding_key, public_key) = match algorithm {
            alg if alg.family() == AlgorithmFamily::Rsa => {
                let private_key = RsaPrivateKey::from_pkcs8_pem(private_pem)
                    .or_else(|_| RsaPrivateKey::from_pkcs1_pem(private_pem))
                    .map_err(|e| CryptoError::invalid_key(e.to_string()))?;
                let encoding_key = EncodingKey::from_rsa_pem(private_pem.as_bytes())?;
                (encoding_key, PublicKeyData::Rsa(private_key.to_public_key()))
            }
            SignatureAlgorithm::ES256 => {
                let secret_key = p256::SecretKey::from_pkcs8_pem(private_pem)
                    .or_else(|_| p256::SecretKey::from_sec1_pem(private_pem))
                    .map_err(|e| CryptoError::invalid_key(e.to_string()))?;
                let point = secret_key.public_key().to_encoded_point(false);
                let pem = secret_key
                    .to_pkcs8_pem(LineEnding::LF)
                    .map_err(|e| CryptoError::invalid_key(e.to_string()))?;
                let public_key = ec_public_data(
                    "P-256",
                    point.x().map(|v| v.as_slice()),
                    point.y().map(|v| v.as_slice()),
                )?;
                (EncodingKey::from_ec_pem(pem.as_bytes())?, public_key)
            }
            SignatureAlgorithm::ES384 => {
                let secret_key = p384::SecretKey::from_pkcs8_pem(private_pem)
                    .or_else(|_| p384::SecretKey::from_sec1_pem(private_pem))
                    .map_err(|e| CryptoError::invalid_key(e.to_string()))?;
                let point = secret_key.public_key().to_encoded_point(false);
                let pem = secret_key
                    .to_pkcs8_pem(LineEnding::LF)
                    .map_err(|e| CryptoError::invalid_key(e.to_string()))?;
                let public_key = ec_public_data(
                    "P-384",
                    point.x().map(|v| v.as_slice()),
                    point.y().map(|v| v.as_slice()),
                )?;
                (EncodingKey::from_ec_pem(pem.as_bytes())?, public_key)
            }
            other => {
                return Err(CryptoError::invalid_key(format!(
                    "Algorithm {other} does not use a private key"
                )));
            }
        };

        Ok(Self::new(kid.into(), algorithm, encoding_key, public_key))
    }

    fn new(
        kid: String,
        algorithm: SignatureAlgorithm,
        encoding_key: EncodingKey,
        public_key: PublicKeyData,
    ) -> Self {
        Self {
            kid,
            algorithm,
            encoding_key,
            public_key,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    /// Returns `true` if this key can produce signatures for `algorithm`.
    #[must_use]
    pub fn supports(&self, algorithm: SignatureAlgorithm) -> bool {
        match (&self.public_key, algorithm.family()) {
            (PublicKeyData::Rsa(_), AlgorithmFamily::Rsa) => true,
            (PublicKeyData::Ec { .. }, AlgorithmFamily::Ec) => self.algorithm == algorithm,
            _ => false,
        }
    }

    /// Returns the RSA public key, if this is an RSA key pair.
    #[must_use]
    pub fn rsa_public_key(&self) -> Option<&RsaPublicKey> {
        match &self.public_key {
            PublicKeyData::Rsa(key) => Some(key),
            PublicKeyData::Ec { .. } => None,
        }
    }

    /// Exports the public key as a JWK.
    #[must_use]
    pub fn to_jwk(&self) -> Jwk {
        match &self.public_key {
            PublicKeyData::Rsa(key) => Jwk {
                kty: "RSA".to_string(),
                kid: Some(self.kid.clone()),
                use_: Some("sig".to_string()),
                alg: Some(self.algorithm.as_str().to_string()),
                n: Some(URL_SAFE_NO_PAD.encode(key.n().to_bytes_be())),
                e: Some(URL_SAFE_NO_PAD.encode(key.e().to_bytes_be())),
                crv: None,
                x: None,
                y: None,
            },
            PublicKeyData::Ec { crv, x, y } => Jwk {
                kty: "EC".to_string(),
                kid: Some(self.kid.clone()),
                use_: Some("sig".to_string()),
                alg: Some(self.algorithm.as_str().to_string()),
                n: None,
                e: None,
                crv: Some((*crv).to_string()),
                x: Some(URL_SAFE_NO_PAD.encode(x)),
                y: Some(URL_SAFE_NO_PAD.encode(y)),
            },
        }
    }

    fn sign(&self, message: &[u8], algorithm: SignatureAlgorithm) -> Result<String, CryptoError> {
        Ok(jsonwebtoken::crypto::sign(
            message,
            &self.encoding_key,
            algorithm.to_jwt_algorithm(),
        )?)
    }
}

fn ec_public_data(
    crv: &'static str,
    x: Option<&[u8]>,
    y: Option<&[u8]>,
) -> Result<PublicKeyData, CryptoError> {
    let x = x.ok_or_else(|| CryptoError::invalid_key("Missing x coordinate"))?;
    let y = y.ok_or_else(|| CryptoError::invalid_key("Missing y coordinate"))?;
    Ok(PublicKeyData::Ec {
        crv,
        x: x.to_vec(),
        y: y.to_vec(),
    })
}

// ============================================================================
// Provider
// ============================================================================

/// A [`CryptoCapability`] backed by key pairs held in memory.
#[derive(Debug, Default)]
pub struct SoftwareCryptoProvider {
    keys: Vec<SigningKeyPair>,
}

impl SoftwareCryptoProvider {
    /// Creates a provider with no keys.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a key pair, returning the provider.
    #[must_use]
    pub fn with_key(mut self, key: SigningKeyPair) -> Self {
        self.add_key(key);
        self
    }

    /// Adds a key pair. The first key added for an algorithm is its default.
    pub fn add_key(&mut self, key: SigningKeyPair) {
        tracing::debug!(kid = %key.kid, algorithm = %key.algorithm, "Added signing key");
        self.keys.push(key);
    }

    /// Finds a key pair by key ID.
    #[must_use]
    pub fn find_key(&self, kid: &str) -> Option<&SigningKeyPair> {
        self.keys.iter().find(|k| k.kid == kid)
    }

    /// Returns the default key pair for an algorithm.
    #[must_use]
    pub fn default_key(&self, algorithm: SignatureAlgorithm) -> Option<&SigningKeyPair> {
        self.keys
            .iter()
            .find(|k| k.algorithm == algorithm)
            .or_else(|| self.keys.iter().find(|k| k.supports(algorithm)))
    }

    /// Exports the public keys as a JWKS.
    #[must_use]
    pub fn jwks(&self) -> Jwks {
        Jwks {
            keys: self.keys.iter().map(SigningKeyPair::to_jwk).collect(),
        }
    }

    fn select_key(
        &self,
        key_id: Option<&str>,
        algorithm: SignatureAlgorithm,
    ) -> Result<&SigningKeyPair, CryptoError> {
        let key = match key_id {
            Some(kid) => self
                .find_key(kid)
                .ok_or_else(|| CryptoError::key_not_found(kid))?,
            None => self
                .default_key(algorithm)
                .ok_or_else(|| CryptoError::no_key_for_algorithm(algorithm))?,
        };

        if !key.supports(algorithm) {
            return Err(CryptoError::invalid_key(format!(
                "Key '{}' cannot sign with {algorithm}",
                key.kid
            )));
        }
        Ok(key)
    }
}

impl CryptoCapability for SoftwareCryptoProvider {
    fn sign(
        &self,
        signing_input: &[u8],
        key_id: Option<&str>,
        shared_secret: Option<&str>,
        algorithm: SignatureAlgorithm,
    ) -> Result<String, CryptoError> {
        if algorithm.is_symmetric() {
            let secret = shared_secret.ok_or_else(|| CryptoError::missing_shared_secret(algorithm))?;
            let key = EncodingKey::from_secret(secret.as_bytes());
            return Ok(jsonwebtoken::crypto::sign(
                signing_input,
                &key,
                algorithm.to_jwt_algorithm(),
            )?);
        }

        self.select_key(key_id, algorithm)?
            .sign(signing_input, algorithm)
    }

    fn resolve_public_key(
        &self,
        key_id: &str,
        jwks: Option<&Jwks>,
    ) -> Result<Option<PublicKey>, CryptoError> {
        if let Some(jwks) = jwks {
            return match jwks.find(key_id) {
                Some(jwk) if jwk.allows_encryption() => jwk.to_public_key(),
                Some(_) => {
                    tracing::warn!(kid = %key_id, "JWKS key is not usable for encryption");
                    Ok(None)
                }
                None => {
                    tracing::debug!(kid = %key_id, "Key not present in supplied JWKS");
                    Ok(None)
                }
            };
        }

        Ok(self
            .find_key(key_id)
            .and_then(SigningKeyPair::rsa_public_key)
            .map(|key| PublicKey::Rsa(key.clone())))
    }
}

// ============================================================================
// Tests
// ============================================================================
