//! Authorization response parameters.
//!
//! A [`ParameterCollection`] holds the named protocol parameters of one
//! response or assertion build. Names are unique and a later `set`
//! overwrites an earlier one. Iteration is always in ascending name order,
//! which is the order every plain serialization (query, fragment, form body)
//! must use.

use std::collections::BTreeMap;

use url::form_urlencoded;

/// Standard authorization response parameter names.
pub mod names {
    /// Authorization code.
    pub const CODE: &str = "code";
    /// Access token issued from the authorization endpoint.
    pub const ACCESS_TOKEN: &str = "access_token";
    /// Access token type.
    pub const TOKEN_TYPE: &str = "token_type";
    /// Lifetime of the access token, or an absolute expiry supplied by the caller.
    pub const EXPIRES_IN: &str = "expires_in";
    /// OpenID Connect ID token.
    pub const ID_TOKEN: &str = "id_token";
    /// Opaque client state echoed back.
    pub const STATE: &str = "state";
    /// Granted scope.
    pub const SCOPE: &str = "scope";
    /// OpenID Connect session management state.
    pub const SESSION_STATE: &str = "session_state";
    /// Session identifier.
    pub const SID: &str = "sid";
    /// Authentication context class reference values.
    pub const ACR_VALUES: &str = "acr_values";
    /// Request nonce.
    pub const NONCE: &str = "nonce";
    /// Client identifier.
    pub const CLIENT_ID: &str = "client_id";
    /// Redirect URI.
    pub const REDIRECT_URI: &str = "redirect_uri";
    /// Requested response type.
    pub const RESPONSE_TYPE: &str = "response_type";
    /// Requested response mode.
    pub const RESPONSE_MODE: &str = "response_mode";
    /// JWT secured authorization response (JARM).
    pub const RESPONSE: &str = "response";
    /// OAuth 2.0 error code.
    pub const ERROR: &str = "error";
    /// Human-readable error description.
    pub const ERROR_DESCRIPTION: &str = "error_description";
    /// URI of a page describing the error.
    pub const ERROR_URI: &str = "error_uri";
    /// Target link URI carried in an encoded `state` value.
    pub const TARGET_LINK_URI: &str = "target_link_uri";
    /// Issuer (RFC 9207 and JOSE claim).
    pub const ISS: &str = "iss";
    /// Expiration JOSE claim.
    pub const EXP: &str = "exp";
}

/// An ordered set of named, string-valued protocol parameters.
///
/// A parameter may be present with an absent value; plain serializations
/// emit such a parameter as `name=` and the claims assembler omits it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterCollection {
    entries: BTreeMap<String, Option<String>>,
}

impl ParameterCollection {
    /// Creates an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a parameter, overwriting any previous value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(name.into(), Some(value.into()));
    }

    /// Sets a parameter that is present but carries no value.
    pub fn set_absent(&mut self, name: impl Into<String>) {
        self.entries.insert(name.into(), None);
    }

    /// Sets a parameter from an optional value.
    pub fn set_opt(&mut self, name: impl Into<String>, value: Option<impl Into<String>>) {
        self.entries.insert(name.into(), value.map(Into::into));
    }

    /// Returns the value of a parameter.
    ///
    /// Returns `None` both when the parameter is missing and when it is
    /// present without a value; use [`contains`](Self::contains) to tell the
    /// two apart.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).and_then(|v| v.as_deref())
    }

    /// Returns `true` if the parameter is present, with or without a value.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Removes a parameter, returning its previous entry.
    pub fn remove(&mut self, name: &str) -> Option<Option<String>> {
        self.entries.remove(name)
    }

    /// Returns the number of parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if there are no parameters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over all parameters in ascending name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_deref()))
    }

    /// Serializes the parameters as `name=value` pairs joined by `&`.
    ///
    /// Pairs are sorted by name and both sides are form-urlencoded. Absent
    /// values serialize as `name=`.
    #[must_use]
    pub fn to_form_urlencoded(&self) -> String {
        self.iter()
            .map(|(name, value)| {
                format!("{}={}", encode_component(name), encode_component(value.unwrap_or("")))
            })
            .collect::<Vec<_>>()
            .join("&")
    }

    /// Parses a form-urlencoded query string.
    ///
    /// Empty values become absent values. `None` or an empty string yields an
    /// empty collection.
    #[must_use]
    pub fn parse_query_string(query: Option<&str>) -> Self {
        let mut params = Self::new();
        let Some(query) = query.map(|q| q.trim_start_matches(['?', '#'])) else {
            return params;
        };

        for (name, value) in form_urlencoded::parse(query.as_bytes()) {
            if name.is_empty() {
                continue;
            }
            if value.is_empty() {
                params.set_absent(name.into_owned());
            } else {
                params.set(name.into_owned(), value.into_owned());
            }
        }
        params
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ParameterCollection {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut params = Self::new();
        for (name, value) in iter {
            params.set(name, value);
        }
        params
    }
}

/// Percent-encodes a single query component (`application/x-www-form-urlencoded`).
#[must_use]
pub fn encode_component(value: &str) -> String {
    form_urlencoded::byte_serialize(value.as_bytes()).collect()
}
