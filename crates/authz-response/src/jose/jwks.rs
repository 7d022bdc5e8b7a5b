//! JSON Web Key Set model.
//!
//! Key sets are supplied by the caller (a client's registered `jwks`, or the
//! provider's own export) and are lookup-only here.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rsa::traits::PublicKeyParts;
use rsa::{BigUint, RsaPublicKey};
use serde::{Deserialize, Serialize};

use crate::crypto::{CryptoError, PublicKey};

/// JSON Web Key Set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwks {
    /// The keys in this set.
    pub keys: Vec<Jwk>,
}

impl Jwks {
    /// Creates a new empty JWKS.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a key to the set.
    pub fn add_key(&mut self, key: Jwk) {
        self.keys.push(key);
    }

    /// Finds a key by its `kid`.
    #[must_use]
    pub fn find(&self, kid: &str) -> Option<&Jwk> {
        self.keys.iter().find(|k| k.kid.as_deref() == Some(kid))
    }

    /// Parses a JWKS from its JSON document form.
    ///
    /// # Errors
    /// Returns an error if the document is not a valid JWKS.
    pub fn from_json(json: &str) -> Result<Self, CryptoError> {
        serde_json::from_str(json).map_err(|e| CryptoError::invalid_key(format!("Invalid JWKS: {e}")))
    }
}

/// JSON Web Key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwk {
    /// Key type ("RSA", "EC" or "oct").
    pub kty: String,

    /// Key ID.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,

    /// Intended key use ("sig" or "enc").
    #[serde(rename = "use", default, skip_serializing_if = "Option::is_none")]
    pub use_: Option<String>,

    /// Algorithm.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,

    // RSA
    /// RSA modulus (base64url encoded).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n: Option<String>,

    /// RSA exponent (base64url encoded).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub e: Option<String>,

    // EC
    /// EC curve name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crv: Option<String>,

    /// EC x coordinate (base64url encoded).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<String>,

    /// EC y coordinate (base64url encoded).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<String>,
}

impl Jwk {
    /// Builds an RSA encryption JWK from a public key.
    #[must_use]
    pub fn from_rsa_public_key(kid: impl Into<String>, key: &RsaPublicKey) -> Self {
        Self {
            kty: "RSA".to_string(),
            kid: Some(kid.into()),
            use_: Some("enc".to_string()),
            alg: None,
            n: Some(URL_SAFE_NO_PAD.encode(key.n().to_bytes_be())),
            e: Some(URL_SAFE_NO_PAD.encode(key.e().to_bytes_be())),
            crv: None,
            x: None,
            y: None,
        }
    }

    /// Returns `true` if this is an RSA key.
    #[must_use]
    pub fn is_rsa(&self) -> bool {
        self.kty == "RSA"
    }

    /// Returns `true` if the key may be used for encryption.
    ///
    /// A key without a `use` member may be used for anything.
    #[must_use]
    pub fn allows_encryption(&self) -> bool {
        self.use_.as_deref().is_none_or(|u| u == "enc")
    }

    /// Converts the key into a key transport public key.
    ///
    /// Returns `Ok(None)` for key types that cannot receive a key transport
    /// CEK.
    ///
    /// # Errors
    /// Returns an error if an RSA key has missing or malformed parameters.
    pub fn to_public_key(&self) -> Result<Option<PublicKey>, CryptoError> {
        if !self.is_rsa() {
            return Ok(None);
        }

        let n = decode_component(self.n.as_deref(), "n")?;
        let e = decode_component(self.e.as_deref(), "e")?;
        let key = RsaPublicKey::new(BigUint::from_bytes_be(&n), BigUint::from_bytes_be(&e))
            .map_err(|e| CryptoError::invalid_key(e.to_string()))?;

        Ok(Some(PublicKey::Rsa(key)))
    }
}

fn decode_component(value: Option<&str>, name: &str) -> Result<Vec<u8>, CryptoError> {
    let value =
        value.ok_or_else(|| CryptoError::invalid_key(format!("RSA JWK is missing '{name}'")))?;
    URL_SAFE_NO_PAD
        .decode(value)
        .map_err(|e| CryptoError::invalid_key(format!("RSA JWK '{name}' is not base64url: {e}")))
}
