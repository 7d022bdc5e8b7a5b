//! RFC 7591 software statements.

use serde::Serialize;

use crate::ResponseResult;
use crate::crypto::CryptoCapability;
use crate::jose::claims::ClaimSet;
use crate::pipeline::{ArtifactPipeline, PipelineOutcome, Protection};

/// A software statement: client metadata asserted by its publisher.
///
/// Claims keep their insertion order in the encoded payload.
#[derive(Debug, Clone, PartialEq)]
pub struct SoftwareStatement {
    protection: Protection,
    claims: ClaimSet,
}

impl SoftwareStatement {
    /// Creates an empty statement.
    #[must_use]
    pub fn new(protection: Protection) -> Self {
        Self {
            protection,
            claims: ClaimSet::new(),
        }
    }

    /// Adds a claim. A value that cannot be encoded as JSON is dropped with a
    /// warning.
    #[must_use]
    pub fn claim<T: Serialize + ?Sized>(mut self, name: &str, value: &T) -> Self {
        self.claims.insert_serializable(name, value);
        self
    }

    /// Returns the claims.
    #[must_use]
    pub fn claims(&self) -> &ClaimSet {
        &self.claims
    }

    /// Encodes the statement through the artifact pipeline.
    ///
    /// # Errors
    /// Returns an error for plain protection or a hard pipeline failure.
    pub fn encode(&self, crypto: Option<&dyn CryptoCapability>) -> ResponseResult<PipelineOutcome> {
        ArtifactPipeline::new(crypto).protect(&self.claims, &self.protection)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};

    use super::*;
    use crate::crypto::{SigningKeyPair, SoftwareCryptoProvider};
    use crate::jose::algorithm::SignatureAlgorithm;
    use crate::pipeline::SigningKey;

    #[test]
    fn test_claims_keep_insertion_order() {
        let statement = SoftwareStatement::new(Protection::Plain)
            .claim("software_id", "4NRB1-0XZABZI9E6-5SM3R")
            .claim("client_name", "Example Statement-based Client")
            .claim("redirect_uris", &["https://client.example.net/callback"]);

        assert_eq!(
            statement.claims().to_json().unwrap(),
            r#"{"software_id":"4NRB1-0XZABZI9E6-5SM3R","client_name":"Example Statement-based Client","redirect_uris":["https://client.example.net/callback"]}"#
        );
    }

    #[test]
    fn test_unencodable_claim_is_dropped() {
        let mut bad = HashMap::new();
        bad.insert(vec![1u8], "value");

        let statement = SoftwareStatement::new(Protection::Plain)
            .claim("software_id", "abc")
            .claim("bad", &bad);
        assert_eq!(statement.claims().len(), 1);
    }

    #[test]
    fn test_encode_es384() {
        let provider = SoftwareCryptoProvider::new()
            .with_key(SigningKeyPair::generate_ec(SignatureAlgorithm::ES384).unwrap());
        let statement = SoftwareStatement::new(Protection::Signed(SigningKey::asymmetric(
            SignatureAlgorithm::ES384,
            None::<String>,
        )))
        .claim("software_id", "abc");

        let outcome = statement.encode(Some(&provider)).unwrap();
        let compact = outcome.response_value();
        let payload = compact.split('.').nth(1).unwrap();
        assert_eq!(
            URL_SAFE_NO_PAD.decode(payload).unwrap(),
            br#"{"software_id":"abc"}"#.to_vec()
        );
    }
}
