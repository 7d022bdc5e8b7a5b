//! JOSE header construction.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::{Deserialize, Serialize};

use super::algorithm::{BlockEncryptionAlgorithm, KeyEncryptionAlgorithm, SignatureAlgorithm};
use crate::ResponseResult;
use crate::error::ResponseError;

/// Token type and nested content type tag.
pub const JWT_TYPE: &str = "jwt";

/// A JOSE protected header.
///
/// Members serialize in declaration order and absent members are omitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoseHeader {
    /// Token type.
    pub typ: String,

    /// Signature or key management algorithm.
    pub alg: String,

    /// Content encryption algorithm (JWE only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enc: Option<String>,

    /// Content type; `jwt` when the JWE payload is a nested JWS.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cty: Option<String>,

    /// Key ID.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
}

impl JoseHeader {
    /// Returns a builder.
    #[must_use]
    pub fn builder() -> JoseHeaderBuilder {
        JoseHeaderBuilder::default()
    }

    /// Returns `true` if this is a JWE header.
    #[must_use]
    pub fn is_encryption(&self) -> bool {
        self.enc.is_some()
    }

    /// Returns `true` if the payload is a nested JWT.
    #[must_use]
    pub fn is_nested(&self) -> bool {
        self.cty.as_deref() == Some(JWT_TYPE)
    }

    /// Serializes the header to JSON.
    ///
    /// # Errors
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> ResponseResult<String> {
        serde_json::to_string(self).map_err(|e| ResponseError::serialization(e.to_string()))
    }

    /// Returns the base64url (unpadded) encoding of the JSON header.
    ///
    /// # Errors
    /// Returns an error if serialization fails.
    pub fn encode(&self) -> ResponseResult<String> {
        Ok(URL_SAFE_NO_PAD.encode(self.to_json()?))
    }
}

/// Builds a [`JoseHeader`] from the configured algorithms.
///
/// When both encryption algorithms are present the header describes a JWE,
/// nested (`cty=jwt`) if a signature algorithm is also set. Otherwise it
/// describes a JWS.
#[derive(Debug, Clone, Default)]
pub struct JoseHeaderBuilder {
    signature: Option<SignatureAlgorithm>,
    key_encryption: Option<KeyEncryptionAlgorithm>,
    block_encryption: Option<BlockEncryptionAlgorithm>,
    key_id: Option<String>,
}

impl JoseHeaderBuilder {
    /// Sets the signature algorithm.
    #[must_use]
    pub fn signature(mut self, alg: SignatureAlgorithm) -> Self {
        self.signature = Some(alg);
        self
    }

    /// Sets the key management and content encryption algorithms.
    #[must_use]
    pub fn encryption(
        mut self,
        key_encryption: KeyEncryptionAlgorithm,
        block_encryption: BlockEncryptionAlgorithm,
    ) -> Self {
        self.key_encryption = Some(key_encryption);
        self.block_encryption = Some(block_encryption);
        self
    }

    /// Sets the key ID.
    #[must_use]
    pub fn key_id(mut self, kid: Option<impl Into<String>>) -> Self {
        self.key_id = kid.map(Into::into);
        self
    }

    /// Builds the header.
    ///
    /// # Errors
    /// Returns `UnsupportedAlgorithm` if neither a complete encryption pair
    /// nor a signature algorithm is configured.
    pub fn build(self) -> ResponseResult<JoseHeader> {
        let typ = JWT_TYPE.to_string();

        if let (Some(key_alg), Some(block_alg)) = (self.key_encryption, self.block_encryption) {
            return Ok(JoseHeader {
                typ,
                alg: key_alg.as_str().to_string(),
                enc: Some(block_alg.as_str().to_string()),
                cty: self.signature.map(|_| JWT_TYPE.to_string()),
                kid: self.key_id,
            });
        }

        match self.signature {
            Some(alg) => Ok(JoseHeader {
                typ,
                alg: alg.as_str().to_string(),
                enc: None,
                cty: None,
                kid: self.key_id,
            }),
            None => Err(ResponseError::unsupported_algorithm(
                "no signature algorithm or complete encryption algorithm pair configured",
            )),
        }
    }
}
