//! JWT-encoded `state` parameter.
//!
//! Instead of an opaque random string, a client may send a signed and/or
//! encrypted JWT as `state`, binding the request forgery protection value
//! (`rfp`) and the target it will land on to the authorization request.

use serde_json::Value;
use time::OffsetDateTime;

use crate::ResponseResult;
use crate::crypto::CryptoCapability;
use crate::jose::algorithm::SignatureAlgorithm;
use crate::jose::claims::{ClaimSet, token_hash};
use crate::params::{encode_component, names};
use crate::pipeline::{ArtifactPipeline, PipelineOutcome, Protection};

/// `state` claim names.
pub mod claim {
    /// Request forgery protection value.
    pub const RFP: &str = "rfp";
    /// Key ID the client used.
    pub const KID: &str = "kid";
    /// Where the user agent lands after the flow.
    pub const TARGET_LINK_URI: &str = super::names::TARGET_LINK_URI;
    /// Authorization server the request was sent to.
    pub const AS: &str = "as";
    /// Unique state identifier.
    pub const JTI: &str = "jti";
    /// Access token hash.
    pub const AT_HASH: &str = "at_hash";
    /// Code hash.
    pub const C_HASH: &str = "c_hash";
    /// Issued at.
    pub const IAT: &str = "iat";
    /// Expiration.
    pub const EXP: &str = "exp";
    /// Opaque caller claims.
    pub const ADDITIONAL_CLAIMS: &str = "additional_claims";
}

/// A `state` value encoded as a JWT.
#[derive(Debug, Clone, PartialEq)]
pub struct JwtState {
    protection: Protection,
    rfp: Option<String>,
    kid: Option<String>,
    target_link_uri: Option<String>,
    authorization_server: Option<String>,
    jti: Option<String>,
    at_hash: Option<String>,
    c_hash: Option<String>,
    iat: Option<i64>,
    exp: Option<i64>,
    additional_claims: Option<Value>,
}

impl JwtState {
    /// Creates a state with a random `jti` and `iat` of now.
    #[must_use]
    pub fn new(protection: Protection) -> Self {
        Self {
            protection,
            rfp: None,
            kid: None,
            target_link_uri: None,
            authorization_server: None,
            jti: Some(uuid::Uuid::new_v4().to_string()),
            at_hash: None,
            c_hash: None,
            iat: Some(OffsetDateTime::now_utc().unix_timestamp()),
            exp: None,
            additional_claims: None,
        }
    }

    /// Sets the request forgery protection value.
    #[must_use]
    pub fn rfp(mut self, rfp: impl Into<String>) -> Self {
        self.rfp = Some(rfp.into());
        self
    }

    /// Sets the `kid` claim.
    #[must_use]
    pub fn kid(mut self, kid: impl Into<String>) -> Self {
        self.kid = Some(kid.into());
        self
    }

    /// Sets the target link URI. It is percent-encoded in the claim.
    #[must_use]
    pub fn target_link_uri(mut self, uri: impl Into<String>) -> Self {
        self.target_link_uri = Some(uri.into());
        self
    }

    /// Sets the authorization server (`as` claim).
    #[must_use]
    pub fn authorization_server(mut self, issuer: impl Into<String>) -> Self {
        self.authorization_server = Some(issuer.into());
        self
    }

    /// Overrides the random `jti`; `None` omits it.
    #[must_use]
    pub fn jti(mut self, jti: Option<impl Into<String>>) -> Self {
        self.jti = jti.map(Into::into);
        self
    }

    /// Sets `at_hash` from an access token.
    #[must_use]
    pub fn access_token(mut self, token: &str) -> Self {
        self.at_hash = Some(token_hash(token, self.hash_algorithm()));
        self
    }

    /// Sets `c_hash` from an authorization code.
    #[must_use]
    pub fn code(mut self, code: &str) -> Self {
        self.c_hash = Some(token_hash(code, self.hash_algorithm()));
        self
    }

    /// Overrides the issued-at time; `None` omits it.
    #[must_use]
    pub fn iat(mut self, iat: Option<i64>) -> Self {
        self.iat = iat;
        self
    }

    /// Sets the expiration time.
    #[must_use]
    pub fn exp(mut self, exp: i64) -> Self {
        self.exp = Some(exp);
        self
    }

    /// Sets the opaque additional claims object.
    #[must_use]
    pub fn additional_claims(mut self, claims: Value) -> Self {
        self.additional_claims = Some(claims);
        self
    }

    /// Returns the claim set in its fixed order.
    #[must_use]
    pub fn claims(&self) -> ClaimSet {
        let mut claims = ClaimSet::new();
        let strings = [
            (claim::RFP, self.rfp.clone()),
            (claim::KID, self.kid.clone()),
            (
                claim::TARGET_LINK_URI,
                self.target_link_uri.as_deref().map(encode_component),
            ),
            (claim::AS, self.authorization_server.clone()),
            (claim::JTI, self.jti.clone()),
            (claim::AT_HASH, self.at_hash.clone()),
            (claim::C_HASH, self.c_hash.clone()),
        ];
        for (name, value) in strings {
            if let Some(value) = value.filter(|v| !v.trim().is_empty()) {
                claims.insert(name, value);
            }
        }
        if let Some(iat) = self.iat {
            claims.insert(claim::IAT, iat);
        }
        if let Some(exp) = self.exp {
            claims.insert(claim::EXP, exp);
        }
        if let Some(additional) = &self.additional_claims {
            claims.insert(claim::ADDITIONAL_CLAIMS, additional.clone());
        }
        claims
    }

    /// Encodes the state through the artifact pipeline.
    ///
    /// # Errors
    /// Returns an error for plain protection or a hard pipeline failure.
    pub fn encode(&self, crypto: Option<&dyn CryptoCapability>) -> ResponseResult<PipelineOutcome> {
        ArtifactPipeline::new(crypto).protect(&self.claims(), &self.protection)
    }

    fn hash_algorithm(&self) -> SignatureAlgorithm {
        match &self.protection {
            Protection::Signed(key) | Protection::SignedThenEncrypted { signing: key, .. } => {
                key.algorithm
            }
            Protection::Plain | Protection::Encrypted(_) => SignatureAlgorithm::RS256,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{SigningKeyPair, SoftwareCryptoProvider};
    use crate::pipeline::SigningKey;
    use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
    use serde_json::json;

    fn hs256() -> Protection {
        Protection::Signed(SigningKey::shared(SignatureAlgorithm::HS256, "client-secret"))
    }

    fn payload(compact: &str) -> Value {
        let segment = compact.split('.').nth(1).unwrap();
        serde_json::from_slice(&URL_SAFE_NO_PAD.decode(segment).unwrap()).unwrap()
    }

    #[test]
    fn test_claim_order() {
        let state = JwtState::new(hs256())
            .rfp("rfp-value")
            .kid("k1")
            .target_link_uri("https://rp.example.com/landing?x=1")
            .authorization_server("https://as.example.com")
            .jti(Some("jti-1"))
            .iat(Some(1_700_000_000))
            .exp(1_700_000_600)
            .additional_claims(json!({"first_name": "Javier"}));

        let claims = state.claims();
        assert_eq!(
            claims.names().collect::<Vec<_>>(),
            vec!["rfp", "kid", "target_link_uri", "as", "jti", "iat", "exp", "additional_claims"]
        );
        assert_eq!(
            claims.get(claim::TARGET_LINK_URI),
            Some(&json!("https%3A%2F%2Frp.example.com%2Flanding%3Fx%3D1"))
        );
    }

    #[test]
    fn test_default_jti_is_random() {
        let a = JwtState::new(hs256()).claims();
        let b = JwtState::new(hs256()).claims();
        assert!(a.get(claim::JTI).is_some());
        assert_ne!(a.get(claim::JTI), b.get(claim::JTI));
        assert!(JwtState::new(hs256()).jti(None::<String>).claims().get(claim::JTI).is_none());
    }

    #[test]
    fn test_hashes_follow_signature_algorithm() {
        let state = JwtState::new(hs256()).access_token("token").code("code");
        assert_eq!(
            state.claims().get(claim::AT_HASH),
            Some(&json!(token_hash("token", SignatureAlgorithm::HS256)))
        );
        assert_eq!(
            state.claims().get(claim::C_HASH),
            Some(&json!(token_hash("code", SignatureAlgorithm::HS256)))
        );
    }

    #[test]
    fn test_encode_hs256() {
        let provider = SoftwareCryptoProvider::new();
        let outcome = JwtState::new(hs256())
            .rfp("rfp-value")
            .additional_claims(json!({"tenant": "acme"}))
            .encode(Some(&provider))
            .unwrap();

        let compact = outcome.response_value();
        assert_eq!(compact.split('.').count(), 3);
        let claims = payload(compact);
        assert_eq!(claims["rfp"], "rfp-value");
        assert_eq!(claims["additional_claims"]["tenant"], "acme");
    }

    #[test]
    fn test_encode_rs256_with_provider_key() {
        let key = SigningKeyPair::generate_rsa(SignatureAlgorithm::RS256).unwrap();
        let kid = key.kid.clone();
        let provider = SoftwareCryptoProvider::new().with_key(key);

        let outcome = JwtState::new(Protection::Signed(SigningKey::asymmetric(
            SignatureAlgorithm::RS256,
            Some(kid.as_str()),
        )))
        .rfp("rfp-value")
        .encode(Some(&provider))
        .unwrap();

        assert_eq!(payload(outcome.response_value())["rfp"], "rfp-value");
    }

    #[test]
    fn test_plain_state_is_rejected() {
        assert!(JwtState::new(Protection::Plain).encode(None).is_err());
    }
}
