//! JWE compact serialization.
//!
//! Content is encrypted with AES-GCM under a fresh random content encryption
//! key (CEK). The CEK reaches the recipient either by key transport (RSA
//! encryption to a public key resolved through the crypto provider) or by
//! key wrap (AES-KW under a shared symmetric key). The additional
//! authenticated data is the ASCII of the encoded protected header.

use std::fmt;

use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes128Gcm, Aes256Gcm};
use aes_kw::{KekAes128, KekAes256};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;
use rsa::{Oaep, Pkcs1v15Encrypt, RsaPublicKey};

use super::algorithm::{BlockEncryptionAlgorithm, KeyEncryptionAlgorithm};
use super::header::JoseHeader;
use super::jwks::Jwks;
use crate::ResponseResult;
use crate::crypto::{CryptoCapability, PublicKey};
use crate::error::{CryptoOperation, ResponseError};

const IV_LEN: usize = 12;
const TAG_LEN: usize = 16;
const KW_OVERHEAD: usize = 8;

/// Where the recipient key comes from.
#[derive(Clone, PartialEq, Eq)]
pub enum RecipientKey {
    /// A public key resolved by `key_id`, from `jwks` when given or from the
    /// provider's own key store otherwise. Used with key transport.
    Jwks {
        /// Recipient key ID, also emitted as the header `kid`.
        key_id: String,
        /// Recipient key set.
        jwks: Option<Jwks>,
    },
    /// A shared symmetric key. Used with key wrap.
    Shared(Vec<u8>),
}

impl RecipientKey {
    /// A recipient key resolved by ID.
    #[must_use]
    pub fn jwks(key_id: impl Into<String>, jwks: Option<Jwks>) -> Self {
        Self::Jwks {
            key_id: key_id.into(),
            jwks,
        }
    }

    /// A shared symmetric key.
    #[must_use]
    pub fn shared(key: impl Into<Vec<u8>>) -> Self {
        Self::Shared(key.into())
    }

    /// Returns the key ID to put in the JWE header.
    #[must_use]
    pub fn key_id(&self) -> Option<&str> {
        match self {
            Self::Jwks { key_id, .. } => Some(key_id),
            Self::Shared(_) => None,
        }
    }
}

impl fmt::Debug for RecipientKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Jwks { key_id, jwks } => f
                .debug_struct("Jwks")
                .field("key_id", key_id)
                .field("keys", &jwks.as_ref().map(|j| j.keys.len()))
                .finish(),
            Self::Shared(_) => f.write_str("Shared([REDACTED])"),
        }
    }
}

/// Key material for an encryption operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptionKey {
    /// Key management algorithm.
    pub key_encryption: KeyEncryptionAlgorithm,
    /// Content encryption algorithm.
    pub block_encryption: BlockEncryptionAlgorithm,
    /// Recipient key.
    pub recipient: RecipientKey,
}

impl EncryptionKey {
    /// Creates encryption key material.
    #[must_use]
    pub fn new(
        key_encryption: KeyEncryptionAlgorithm,
        block_encryption: BlockEncryptionAlgorithm,
        recipient: RecipientKey,
    ) -> Self {
        Self {
            key_encryption,
            block_encryption,
            recipient,
        }
    }
}

/// A compact JWE: `header.encryptedKey.iv.ciphertext.tag`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Jwe {
    header: JoseHeader,
    compact: String,
}

impl Jwe {
    /// Returns the protected header.
    #[must_use]
    pub fn header(&self) -> &JoseHeader {
        &self.header
    }

    /// Returns the compact serialization.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.compact
    }

    /// Consumes the JWE, returning the compact serialization.
    #[must_use]
    pub fn into_string(self) -> String {
        self.compact
    }
}

impl fmt::Display for Jwe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.compact)
    }
}

/// Produces compact JWE values.
#[derive(Clone, Copy)]
pub struct EncryptionStage<'a> {
    crypto: Option<&'a dyn CryptoCapability>,
}

impl<'a> EncryptionStage<'a> {
    /// Creates an encryption stage. The provider is only needed for key
    /// transport.
    #[must_use]
    pub fn new(crypto: Option<&'a dyn CryptoCapability>) -> Self {
        Self { crypto }
    }

    /// Encrypts `plaintext` under `header`.
    ///
    /// Returns `Ok(None)` when a key transport recipient key cannot be
    /// resolved. No partial JWE is produced in that case.
    ///
    /// # Errors
    /// Returns `UnsupportedAlgorithm` when the recipient does not fit the key
    /// management family, `CryptoProviderRequired` when key transport has no
    /// provider, and `EncryptionFailed` when a cipher operation fails.
    pub fn encrypt(
        &self,
        header: &JoseHeader,
        plaintext: &str,
        key: &EncryptionKey,
    ) -> ResponseResult<Option<Jwe>> {
        let cek = random_bytes(key.block_encryption.key_len());

        let encrypted_key = match (&key.recipient, key.key_encryption.is_key_transport()) {
            (RecipientKey::Jwks { key_id, jwks }, true) => {
                let Some(public_key) = self.resolve(key_id, jwks.as_ref())? else {
                    tracing::warn!(kid = %key_id, "Recipient key unavailable; no JWE produced");
                    return Ok(None);
                };
                transport_key(&public_key, key.key_encryption, &cek)?
            }
            (RecipientKey::Shared(shared), false) => wrap_key(shared, key.key_encryption, &cek)?,
            (RecipientKey::Jwks { .. }, false) => {
                return Err(ResponseError::unsupported_algorithm(format!(
                    "{} requires a shared symmetric key",
                    key.key_encryption
                )));
            }
            (RecipientKey::Shared(_), true) => {
                return Err(ResponseError::unsupported_algorithm(format!(
                    "{} requires a recipient public key",
                    key.key_encryption
                )));
            }
        };

        let encoded_header = header.encode()?;
        let iv = random_bytes(IV_LEN);
        let sealed = match key.block_encryption {
            BlockEncryptionAlgorithm::A128Gcm => {
                seal::<Aes128Gcm>(&cek, &iv, plaintext.as_bytes(), encoded_header.as_bytes())?
            }
            BlockEncryptionAlgorithm::A256Gcm => {
                seal::<Aes256Gcm>(&cek, &iv, plaintext.as_bytes(), encoded_header.as_bytes())?
            }
        };
        let (ciphertext, tag) = sealed.split_at(sealed.len().saturating_sub(TAG_LEN));

        let compact = [
            encoded_header,
            URL_SAFE_NO_PAD.encode(encrypted_key),
            URL_SAFE_NO_PAD.encode(iv),
            URL_SAFE_NO_PAD.encode(ciphertext),
            URL_SAFE_NO_PAD.encode(tag),
        ]
        .join(".");

        Ok(Some(Jwe {
            header: header.clone(),
            compact,
        }))
    }

    fn resolve(&self, key_id: &str, jwks: Option<&Jwks>) -> ResponseResult<Option<PublicKey>> {
        let crypto = self
            .crypto
            .ok_or_else(|| ResponseError::crypto_provider_required(CryptoOperation::KeyResolution))?;

        crypto.resolve_public_key(key_id, jwks).map_err(|e| {
            tracing::error!(kid = %key_id, error = %e, "Recipient key resolution failed");
            ResponseError::from(e)
        })
    }
}

fn random_bytes(len: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes
}

fn transport_key(
    public_key: &PublicKey,
    algorithm: KeyEncryptionAlgorithm,
    cek: &[u8],
) -> ResponseResult<Vec<u8>> {
    let PublicKey::Rsa(rsa_key) = public_key;
    rsa_encrypt(rsa_key, algorithm, cek)
}

fn rsa_encrypt(
    key: &RsaPublicKey,
    algorithm: KeyEncryptionAlgorithm,
    cek: &[u8],
) -> ResponseResult<Vec<u8>> {
    let mut rng = rand::thread_rng();
    let result = match algorithm {
        KeyEncryptionAlgorithm::Rsa1_5 => key.encrypt(&mut rng, Pkcs1v15Encrypt, cek),
        KeyEncryptionAlgorithm::RsaOaep => {
            key.encrypt(&mut rng, Oaep::new::<sha1::Sha1>(), cek)
        }
        KeyEncryptionAlgorithm::RsaOaep256 => {
            key.encrypt(&mut rng, Oaep::new::<sha2::Sha256>(), cek)
        }
        other => {
            return Err(ResponseError::unsupported_algorithm(format!(
                "{other} is not an RSA key transport algorithm"
            )));
        }
    };
    result.map_err(|e| ResponseError::encryption_failed(format!("Key transport failed: {e}")))
}

fn wrap_key(
    shared: &[u8],
    algorithm: KeyEncryptionAlgorithm,
    cek: &[u8],
) -> ResponseResult<Vec<u8>> {
    let expected = algorithm.wrap_key_len().unwrap_or_default();
    if shared.len() != expected {
        return Err(ResponseError::encryption_failed(format!(
            "{algorithm} requires a {expected}-byte shared key, got {} bytes",
            shared.len()
        )));
    }

    let mut wrapped = vec![0u8; cek.len() + KW_OVERHEAD];
    let result = match algorithm {
        KeyEncryptionAlgorithm::A128Kw => {
            KekAes128::new(aes_gcm::aead::generic_array::GenericArray::from_slice(shared))
                .wrap(cek, &mut wrapped)
        }
        KeyEncryptionAlgorithm::A256Kw => {
            KekAes256::new(aes_gcm::aead::generic_array::GenericArray::from_slice(shared))
                .wrap(cek, &mut wrapped)
        }
        other => {
            return Err(ResponseError::unsupported_algorithm(format!(
                "{other} is not an AES key wrap algorithm"
            )));
        }
    };
    result.map_err(|e| ResponseError::encryption_failed(format!("Key wrap failed: {e}")))?;
    Ok(wrapped)
}

fn seal<C: Aead + KeyInit>(
    cek: &[u8],
    iv: &[u8],
    plaintext: &[u8],
    aad: &[u8],
) -> ResponseResult<Vec<u8>> {
    let cipher = C::new_from_slice(cek)
        .map_err(|e| ResponseError::encryption_failed(format!("Failed to create cipher: {e}")))?;
    cipher
        .encrypt(
            aes_gcm::aead::Nonce::<C>::from_slice(iv),
            Payload {
                msg: plaintext,
                aad,
            },
        )
        .map_err(|e| ResponseError::encryption_failed(format!("Content encryption failed: {e}")))
}
