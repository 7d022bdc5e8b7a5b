//! Claim sets for JWT payloads.
//!
//! The claim order is fixed so that identical input always produces an
//! identical payload:
//!
//! 1. `iss`, when an issuer is configured
//! 2. `exp`
//! 3. the remaining response parameters in ascending name order, blank ones
//!    omitted
//! 4. the additional claims object, under its own key

use std::time::Duration;

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;
use sha2::{Digest, Sha256, Sha384, Sha512};
use time::OffsetDateTime;

use super::algorithm::SignatureAlgorithm;
use crate::ResponseResult;
use crate::error::ResponseError;
use crate::params::{ParameterCollection, encode_component, names};

/// An ordered JSON claim set.
///
/// Serializes as a JSON object whose members appear in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClaimSet {
    claims: Vec<(String, Value)>,
}

impl ClaimSet {
    /// Creates an empty claim set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a claim. An existing claim with the same name keeps its
    /// position and takes the new value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        match self.claims.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.claims.push((name, value)),
        }
    }

    /// Inserts any serializable value as a claim.
    ///
    /// A value that cannot be represented as JSON is logged and skipped; the
    /// rest of the claim set is unaffected.
    pub fn insert_serializable<T: Serialize + ?Sized>(&mut self, name: &str, value: &T) {
        match serde_json::to_value(value) {
            Ok(value) => self.insert(name, value),
            Err(e) => {
                tracing::warn!(claim = %name, error = %e, "Omitting claim that cannot be encoded");
            }
        }
    }

    /// Returns a claim value.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.claims.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Returns the claim names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.claims.iter().map(|(n, _)| n.as_str())
    }

    /// Returns the number of claims.
    #[must_use]
    pub fn len(&self) -> usize {
        self.claims.len()
    }

    /// Returns `true` if there are no claims.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.claims.is_empty()
    }

    /// Serializes the claim set to its canonical JSON payload.
    ///
    /// # Errors
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> ResponseResult<String> {
        serde_json::to_string(self).map_err(|e| ResponseError::serialization(e.to_string()))
    }
}

impl Serialize for ClaimSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.claims.len()))?;
        for (name, value) in &self.claims {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Turns response parameters into a [`ClaimSet`].
#[derive(Debug, Clone)]
pub struct ClaimsAssembler {
    issuer: Option<String>,
    lifetime: Duration,
    now: Option<OffsetDateTime>,
    expires_at: Option<i64>,
    additional_claims: Option<(String, Value)>,
}

impl ClaimsAssembler {
    /// Creates an assembler that computes `exp` as now plus `lifetime`.
    #[must_use]
    pub fn new(lifetime: Duration) -> Self {
        Self {
            issuer: None,
            lifetime,
            now: None,
            expires_at: None,
            additional_claims: None,
        }
    }

    /// Sets the issuer emitted as `iss`.
    #[must_use]
    pub fn issuer(mut self, issuer: Option<impl Into<String>>) -> Self {
        self.issuer = issuer.map(Into::into);
        self
    }

    /// Fixes the clock used for `exp`.
    #[must_use]
    pub fn at(mut self, now: OffsetDateTime) -> Self {
        self.now = Some(now);
        self
    }

    /// Sets an absolute `exp` (unix seconds) instead of now plus the lifetime.
    #[must_use]
    pub fn expires_at(mut self, exp: Option<i64>) -> Self {
        self.expires_at = exp;
        self
    }

    /// Sets an opaque claims object emitted last under `key`.
    #[must_use]
    pub fn additional_claims(mut self, key: impl Into<String>, claims: Value) -> Self {
        self.additional_claims = Some((key.into(), claims));
        self
    }

    /// Returns the `exp` value for a build.
    ///
    /// An absolute expiry wins; otherwise `exp` is now plus the lifetime.
    /// `expires_in` is a relative token lifetime and never feeds `exp`.
    #[must_use]
    pub fn expiration(&self) -> i64 {
        if let Some(exp) = self.expires_at {
            return exp;
        }

        let now = self.now.unwrap_or_else(OffsetDateTime::now_utc);
        let lifetime = i64::try_from(self.lifetime.as_secs()).unwrap_or(i64::MAX);
        now.unix_timestamp().saturating_add(lifetime)
    }

    /// Assembles the claim set.
    #[must_use]
    pub fn assemble(&self, params: &ParameterCollection) -> ClaimSet {
        let mut claims = ClaimSet::new();

        if let Some(issuer) = &self.issuer {
            claims.insert(names::ISS, issuer.as_str());
        }
        claims.insert(names::EXP, self.expiration());

        for (name, value) in params.iter() {
            if name == names::EXP || (name == names::ISS && self.issuer.is_some()) {
                continue;
            }
            let Some(value) = value.filter(|v| !v.trim().is_empty()) else {
                continue;
            };
            if name == names::TARGET_LINK_URI {
                claims.insert(name, encode_component(value));
            } else {
                claims.insert(name, value);
            }
        }

        if let Some((key, value)) = &self.additional_claims {
            claims.insert(key.as_str(), value.clone());
        }

        claims
    }
}

/// Computes an `at_hash` / `c_hash` value for a token.
///
/// The token's ASCII bytes are hashed with the SHA-2 variant matching the
/// signature algorithm; the left-most half of the digest is base64url
/// encoded without padding.
#[must_use]
pub fn token_hash(token: &str, algorithm: SignatureAlgorithm) -> String {
    let digest = match algorithm.digest_bits() {
        256 => Sha256::digest(token.as_bytes()).to_vec(),
        384 => Sha384::digest(token.as_bytes()).to_vec(),
        _ => Sha512::digest(token.as_bytes()).to_vec(),
    };
    URL_SAFE_NO_PAD.encode(&digest[..digest.len() / 2])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fixed_now() -> OffsetDateTime {
        OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap()
    }

    #[test]
    fn test_claim_order() {
        let mut params = ParameterCollection::new();
        params.set(names::STATE, "af0ifjsldkj");
        params.set(names::CODE, "SplxlOBeZQQYbYS6WxSbIA");

        let claims = ClaimsAssembler::new(Duration::from_secs(600))
            .issuer(Some("https://as.example.com"))
            .at(fixed_now())
            .additional_claims("additional_claims", json!({"tenant": "acme"}))
            .assemble(&params);

        assert_eq!(
            claims.names().collect::<Vec<_>>(),
            vec!["iss", "exp", "code", "state", "additional_claims"]
        );
        assert_eq!(
            claims.to_json().unwrap(),
            r#"{"iss":"https://as.example.com","exp":1700000600,"code":"SplxlOBeZQQYbYS6WxSbIA","state":"af0ifjsldkj","additional_claims":{"tenant":"acme"}}"#
        );
    }

    #[test]
    fn test_blank_parameters_are_omitted() {
        let mut params = ParameterCollection::new();
        params.set(names::CODE, "abc");
        params.set(names::SCOPE, "   ");
        params.set_absent(names::STATE);

        let claims = ClaimsAssembler::new(Duration::from_secs(60))
            .at(fixed_now())
            .assemble(&params);

        assert!(claims.get(names::SCOPE).is_none());
        assert!(claims.get(names::STATE).is_none());
        assert!(claims.get(names::ISS).is_none());
        assert_eq!(claims.len(), 2);
    }

    #[test]
    fn test_expires_in_does_not_set_exp() {
        let mut params = ParameterCollection::new();
        params.set(names::EXPIRES_IN, "3600");

        let claims = ClaimsAssembler::new(Duration::from_secs(60))
            .at(fixed_now())
            .assemble(&params);

        assert_eq!(claims.get(names::EXP), Some(&json!(1_700_000_060)));
        assert_eq!(claims.get(names::EXPIRES_IN), Some(&json!("3600")));
    }

    #[test]
    fn test_absolute_expiry_overrides_lifetime() {
        let claims = ClaimsAssembler::new(Duration::from_secs(60))
            .at(fixed_now())
            .expires_at(Some(1_800_000_000))
            .assemble(&ParameterCollection::new());

        assert_eq!(claims.get(names::EXP), Some(&json!(1_800_000_000)));
    }

    #[test]
    fn test_default_expiry_is_in_the_future() {
        let mut params = ParameterCollection::new();
        params.set(names::EXPIRES_IN, "3600");

        let claims = ClaimsAssembler::new(Duration::from_secs(600)).assemble(&params);
        let exp = claims.get(names::EXP).and_then(Value::as_i64).unwrap();
        assert!(exp > OffsetDateTime::now_utc().unix_timestamp());
    }

    #[test]
    fn test_issuer_overrides_iss_parameter() {
        let mut params = ParameterCollection::new();
        params.set(names::ISS, "https://spoofed.example.com");

        let claims = ClaimsAssembler::new(Duration::from_secs(60))
            .issuer(Some("https://as.example.com"))
            .at(fixed_now())
            .assemble(&params);

        assert_eq!(claims.get(names::ISS), Some(&json!("https://as.example.com")));
        assert_eq!(claims.len(), 2);
    }

    #[test]
    fn test_target_link_uri_is_percent_encoded() {
        let mut params = ParameterCollection::new();
        params.set(names::TARGET_LINK_URI, "https://rp.example.com/cb?x=1");

        let claims = ClaimsAssembler::new(Duration::from_secs(60))
            .at(fixed_now())
            .assemble(&params);

        assert_eq!(
            claims.get(names::TARGET_LINK_URI),
            Some(&json!("https%3A%2F%2Frp.example.com%2Fcb%3Fx%3D1"))
        );
    }

    #[test]
    fn test_insert_keeps_position() {
        let mut claims = ClaimSet::new();
        claims.insert("a", 1);
        claims.insert("b", 2);
        claims.insert("a", 3);
        assert_eq!(claims.to_json().unwrap(), r#"{"a":3,"b":2}"#);
    }

    #[test]
    fn test_unencodable_claim_is_skipped() {
        use std::collections::HashMap;

        // JSON object keys must be strings.
        let mut bad = HashMap::new();
        bad.insert((1, 2), "value");

        let mut claims = ClaimSet::new();
        claims.insert("before", "x");
        claims.insert_serializable("bad", &bad);
        claims.insert_serializable("after", &vec!["y"]);

        assert_eq!(claims.to_json().unwrap(), r#"{"before":"x","after":["y"]}"#);
    }

    #[test]
    fn test_token_hash() {
        // OpenID Connect Core, appendix A.3 example values.
        assert_eq!(
            token_hash("jHkWEdUXMU1BwAsC4vtUsZwnNvTIxEl0z9K3vx5KF0Y", SignatureAlgorithm::RS256),
            "77QmUPtjPfzWtF2AnpK9RQ"
        );
        assert_eq!(token_hash("abc", SignatureAlgorithm::ES384).len(), 32);
        assert_eq!(token_hash("abc", SignatureAlgorithm::HS512).len(), 43);
    }
}
