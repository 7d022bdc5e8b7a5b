//! Artifact pipeline.
//!
//! Decides, once per build, whether a response is sent plain, signed,
//! encrypted or signed-then-encrypted, and runs the matching JOSE stages.

use crate::ResponseResult;
use crate::crypto::CryptoCapability;
use crate::error::ResponseError;
use crate::jose::claims::{ClaimSet, ClaimsAssembler};
use crate::jose::header::JoseHeader;
use crate::jose::jwe::{EncryptionStage, Jwe};
use crate::jose::jws::{Jws, SigningStage};
use crate::params::ParameterCollection;

pub use crate::jose::jwe::{EncryptionKey, RecipientKey};
pub use crate::jose::jws::SigningKey;

/// How a response or assertion is protected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Protection {
    /// No JOSE protection.
    #[default]
    Plain,
    /// A compact JWS.
    Signed(SigningKey),
    /// A compact JWE over the raw claims.
    Encrypted(EncryptionKey),
    /// A compact JWE whose payload is a compact JWS (`cty=jwt`).
    SignedThenEncrypted {
        /// Inner signing key.
        signing: SigningKey,
        /// Outer encryption key.
        encryption: EncryptionKey,
    },
}

impl Protection {
    /// Returns `true` for [`Protection::Plain`].
    #[must_use]
    pub fn is_plain(&self) -> bool {
        matches!(self, Self::Plain)
    }

    /// Returns `true` if the output is a JWE.
    #[must_use]
    pub fn is_encrypted(&self) -> bool {
        matches!(self, Self::Encrypted(_) | Self::SignedThenEncrypted { .. })
    }

    fn branch(&self) -> &'static str {
        match self {
            Self::Plain => "plain",
            Self::Signed(_) => "signed",
            Self::Encrypted(_) => "encrypted",
            Self::SignedThenEncrypted { .. } => "signed_then_encrypted",
        }
    }
}

/// The product of a pipeline build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoseArtifact {
    /// Unprotected parameters, passed through unchanged.
    Plain(ParameterCollection),
    /// A compact JWS.
    Jws(Jws),
    /// A compact JWE, possibly wrapping a JWS.
    Jwe(Jwe),
}

impl JoseArtifact {
    /// Returns the compact serialization, or `None` for plain parameters.
    #[must_use]
    pub fn compact(&self) -> Option<&str> {
        match self {
            Self::Plain(_) => None,
            Self::Jws(jws) => Some(jws.as_str()),
            Self::Jwe(jwe) => Some(jwe.as_str()),
        }
    }
}

/// Result of a pipeline build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    /// An artifact was produced.
    Artifact(JoseArtifact),
    /// The recipient public key for key transport could not be resolved.
    /// Endpoints answer with an empty response value.
    EncryptionKeyUnavailable,
}

impl PipelineOutcome {
    /// Returns the response value carried under `response`: the compact
    /// artifact, or an empty string when the recipient key was unavailable
    /// or the artifact is plain.
    #[must_use]
    pub fn response_value(&self) -> &str {
        match self {
            Self::Artifact(artifact) => artifact.compact().unwrap_or_default(),
            Self::EncryptionKeyUnavailable => "",
        }
    }

    /// Returns the artifact, if one was produced.
    #[must_use]
    pub fn artifact(&self) -> Option<&JoseArtifact> {
        match self {
            Self::Artifact(artifact) => Some(artifact),
            Self::EncryptionKeyUnavailable => None,
        }
    }

    /// Returns `true` if the recipient key was unavailable.
    #[must_use]
    pub fn is_key_unavailable(&self) -> bool {
        matches!(self, Self::EncryptionKeyUnavailable)
    }
}

/// Runs header construction, signing and encryption for one build.
#[derive(Clone, Copy)]
pub struct ArtifactPipeline<'a> {
    crypto: Option<&'a dyn CryptoCapability>,
}

impl<'a> ArtifactPipeline<'a> {
    /// Creates a pipeline over an optional crypto provider.
    #[must_use]
    pub fn new(crypto: Option<&'a dyn CryptoCapability>) -> Self {
        Self { crypto }
    }

    /// Builds an artifact from response parameters.
    ///
    /// Plain protection passes the parameters through; every other branch
    /// assembles a claim set and protects it.
    ///
    /// # Errors
    /// Propagates hard failures from the signing and encryption stages.
    pub fn build(
        &self,
        params: &ParameterCollection,
        assembler: &ClaimsAssembler,
        protection: &Protection,
    ) -> ResponseResult<PipelineOutcome> {
        if protection.is_plain() {
            tracing::debug!(branch = "plain", params = params.len(), "Building response artifact");
            return Ok(PipelineOutcome::Artifact(JoseArtifact::Plain(params.clone())));
        }

        self.protect(&assembler.assemble(params), protection)
    }

    /// Protects an already assembled claim set.
    ///
    /// # Errors
    /// Returns `UnsupportedAlgorithm` for plain protection, which has no JOSE
    /// form, and propagates hard failures from the stages.
    pub fn protect(
        &self,
        claims: &ClaimSet,
        protection: &Protection,
    ) -> ResponseResult<PipelineOutcome> {
        tracing::debug!(branch = protection.branch(), claims = claims.len(), "Building JOSE artifact");
        let payload = claims.to_json()?;

        match protection {
            Protection::Plain => Err(ResponseError::unsupported_algorithm(
                "plain protection has no JOSE serialization",
            )),
            Protection::Signed(signing) => {
                let jws = self.sign(&payload, signing)?;
                Ok(PipelineOutcome::Artifact(JoseArtifact::Jws(jws)))
            }
            Protection::Encrypted(encryption) => {
                let header = JoseHeader::builder()
                    .encryption(encryption.key_encryption, encryption.block_encryption)
                    .key_id(encryption.recipient.key_id())
                    .build()?;
                self.encrypt(&header, &payload, encryption)
            }
            Protection::SignedThenEncrypted {
                signing,
                encryption,
            } => {
                let jws = self.sign(&payload, signing)?;
                let header = JoseHeader::builder()
                    .signature(signing.algorithm)
                    .encryption(encryption.key_encryption, encryption.block_encryption)
                    .key_id(encryption.recipient.key_id())
                    .build()?;
                self.encrypt(&header, jws.as_str(), encryption)
            }
        }
    }

    fn sign(&self, payload: &str, key: &SigningKey) -> ResponseResult<Jws> {
        let header = JoseHeader::builder()
            .signature(key.algorithm)
            .key_id(key.key_id.as_deref())
            .build()?;
        SigningStage::new(self.crypto).sign(&header, payload, key)
    }

    fn encrypt(
        &self,
        header: &JoseHeader,
        plaintext: &str,
        key: &EncryptionKey,
    ) -> ResponseResult<PipelineOutcome> {
        Ok(
            match EncryptionStage::new(self.crypto).encrypt(header, plaintext, key)? {
                Some(jwe) => PipelineOutcome::Artifact(JoseArtifact::Jwe(jwe)),
                None => PipelineOutcome::EncryptionKeyUnavailable,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};

    use super::*;
    use crate::crypto::{CryptoError, PublicKey};
    use crate::error::CryptoOperation;
    use crate::jose::algorithm::{
        BlockEncryptionAlgorithm, KeyEncryptionAlgorithm, SignatureAlgorithm,
    };
    use crate::jose::jwe::tests::decrypt_shared;
    use crate::jose::jwks::Jwks;
    use crate::params::names;

    struct FixedSignature;

    impl CryptoCapability for FixedSignature {
        fn sign(
            &self,
            _signing_input: &[u8],
            _key_id: Option<&str>,
            _shared_secret: Option<&str>,
            _algorithm: SignatureAlgorithm,
        ) -> Result<String, CryptoError> {
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

    const SHARED: &[u8] = b"0123456789012345";

    fn params() -> ParameterCollection {
        [(names::CODE, "12345"), (names::STATE, "af0ifjsldkj")]
            .into_iter()
            .collect()
    }

    fn assembler() -> ClaimsAssembler {
        ClaimsAssembler::new(Duration::from_secs(600)).issuer(Some("https://as.example.com"))
    }

    fn signing() -> SigningKey {
        SigningKey::asymmetric(SignatureAlgorithm::RS256, Some("sig-1"))
    }

    fn key_wrap() -> EncryptionKey {
        EncryptionKey::new(
            KeyEncryptionAlgorithm::A128Kw,
            BlockEncryptionAlgorithm::A128Gcm,
            RecipientKey::shared(SHARED),
        )
    }

    fn decode_header(segment: &str) -> JoseHeader {
        serde_json::from_slice(&URL_SAFE_NO_PAD.decode(segment).unwrap()).unwrap()
    }

    #[test]
    fn test_plain_passes_parameters_through() {
        let outcome = ArtifactPipeline::new(None)
            .build(&params(), &assembler(), &Protection::Plain)
            .unwrap();

        assert_eq!(outcome, PipelineOutcome::Artifact(JoseArtifact::Plain(params())));
        assert_eq!(outcome.response_value(), "");
    }

    #[test]
    fn test_signed_branch() {
        let crypto = FixedSignature;
        let outcome = ArtifactPipeline::new(Some(&crypto))
            .build(&params(), &assembler(), &Protection::Signed(signing()))
            .unwrap();

        let value = outcome.response_value();
        let parts: Vec<&str> = value.split('.').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[2], "12345");
        let header = decode_header(parts[0]);
        assert_eq!(header.alg, "RS256");
        assert_eq!(header.kid.as_deref(), Some("sig-1"));
    }

    #[test]
    fn test_signed_branch_requires_provider() {
        let err = ArtifactPipeline::new(None)
            .build(&params(), &assembler(), &Protection::Signed(signing()))
            .unwrap_err();
        assert!(matches!(
            err,
            ResponseError::CryptoProviderRequired {
                operation: CryptoOperation::Signing
            }
        ));
    }

    #[test]
    fn test_encrypted_branch_encrypts_raw_claims() {
        let outcome = ArtifactPipeline::new(None)
            .build(&params(), &assembler(), &Protection::Encrypted(key_wrap()))
            .unwrap();

        let value = outcome.response_value();
        assert_eq!(value.split('.').count(), 5);
        let header = decode_header(value.split('.').next().unwrap());
        assert!(header.cty.is_none());

        let plaintext = decrypt_shared(value, SHARED);
        let claims: serde_json::Value = serde_json::from_str(&plaintext).unwrap();
        assert_eq!(claims["code"], "12345");
        assert_eq!(claims["iss"], "https://as.example.com");
    }

    #[test]
    fn test_signed_then_encrypted_nests_jws() {
        let crypto = FixedSignature;
        let outcome = ArtifactPipeline::new(Some(&crypto))
            .build(
                &params(),
                &assembler(),
                &Protection::SignedThenEncrypted {
                    signing: signing(),
                    encryption: key_wrap(),
                },
            )
            .unwrap();

        let value = outcome.response_value();
        let header = decode_header(value.split('.').next().unwrap());
        assert_eq!(header.cty.as_deref(), Some("jwt"));
        assert_eq!(header.alg, "A128KW");
        assert_eq!(header.enc.as_deref(), Some("A128GCM"));

        let nested = decrypt_shared(value, SHARED);
        let parts: Vec<&str> = nested.split('.').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(decode_header(parts[0]).alg, "RS256");
        assert_eq!(parts[2], "12345");
    }

    #[test]
    fn test_unresolvable_recipient_is_named_outcome() {
        let crypto = FixedSignature;
        let protection = Protection::Encrypted(EncryptionKey::new(
            KeyEncryptionAlgorithm::Rsa1_5,
            BlockEncryptionAlgorithm::A128Gcm,
            RecipientKey::jwks("enc-1", None),
        ));

        let outcome = ArtifactPipeline::new(Some(&crypto))
            .build(&params(), &assembler(), &protection)
            .unwrap();

        assert!(outcome.is_key_unavailable());
        assert_eq!(outcome.response_value(), "");
        assert!(outcome.artifact().is_none());
    }

    #[test]
    fn test_protect_rejects_plain() {
        let err = ArtifactPipeline::new(None)
            .protect(&ClaimSet::new(), &Protection::Plain)
            .unwrap_err();
        assert!(matches!(err, ResponseError::UnsupportedAlgorithm { .. }));
    }
}
