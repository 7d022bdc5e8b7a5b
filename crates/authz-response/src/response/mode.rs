//! Response modes and response types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ResponseResult;
use crate::error::ResponseError;
use crate::params::names;

/// OAuth 2.0 response modes, including the JARM `.jwt` variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResponseMode {
    /// Parameters in the redirect URI query.
    #[serde(rename = "query")]
    Query,
    /// Parameters in the redirect URI fragment.
    #[serde(rename = "fragment")]
    Fragment,
    /// Parameters posted by an auto-submitting HTML form.
    #[serde(rename = "form_post")]
    FormPost,
    /// A JWT `response` parameter in the query.
    #[serde(rename = "query.jwt")]
    QueryJwt,
    /// A JWT `response` parameter in the fragment.
    #[serde(rename = "fragment.jwt")]
    FragmentJwt,
    /// A JWT `response` parameter posted by an auto-submitting HTML form.
    #[serde(rename = "form_post.jwt")]
    FormPostJwt,
    /// A JWT `response` parameter placed according to the response type.
    #[serde(rename = "jwt")]
    Jwt,
}

/// Where the response is placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Delivery {
    /// After `?` in the redirect URI.
    Query,
    /// After `#` in the redirect URI.
    Fragment,
    /// In an HTML form posted to the redirect URI.
    FormPost,
}

impl ResponseMode {
    /// Returns the mode name as used in `response_mode`.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Query => "query",
            Self::Fragment => "fragment",
            Self::FormPost => "form_post",
            Self::QueryJwt => "query.jwt",
            Self::FragmentJwt => "fragment.jwt",
            Self::FormPostJwt => "form_post.jwt",
            Self::Jwt => "jwt",
        }
    }

    /// Returns `true` if the response is carried as a JWT `response`
    /// parameter.
    #[must_use]
    pub fn is_jwt(&self) -> bool {
        matches!(
            self,
            Self::QueryJwt | Self::FragmentJwt | Self::FormPostJwt | Self::Jwt
        )
    }

    /// Resolves the effective mode.
    ///
    /// With no mode, the default is `fragment` when any response type issues
    /// tokens from the authorization endpoint, `query` otherwise. Plain `jwt`
    /// follows the same rule to pick `fragment.jwt` or `query.jwt`.
    #[must_use]
    pub fn resolve(mode: Option<Self>, response_types: &[ResponseType]) -> Self {
        let fragment = response_types.iter().any(ResponseType::implies_fragment);
        match mode {
            None if fragment => Self::Fragment,
            None => Self::Query,
            Some(Self::Jwt) if fragment => Self::FragmentJwt,
            Some(Self::Jwt) => Self::QueryJwt,
            Some(mode) => mode,
        }
    }

    /// Returns where a resolved mode places the response.
    ///
    /// Unresolved `jwt` places it in the query.
    #[must_use]
    pub fn delivery(&self) -> Delivery {
        match self {
            Self::Query | Self::QueryJwt | Self::Jwt => Delivery::Query,
            Self::Fragment | Self::FragmentJwt => Delivery::Fragment,
            Self::FormPost | Self::FormPostJwt => Delivery::FormPost,
        }
    }
}

impl fmt::Display for ResponseMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ResponseMode {
    type Err = ResponseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "query" => Ok(Self::Query),
            "fragment" => Ok(Self::Fragment),
            "form_post" => Ok(Self::FormPost),
            "query.jwt" => Ok(Self::QueryJwt),
            "fragment.jwt" => Ok(Self::FragmentJwt),
            "form_post.jwt" => Ok(Self::FormPostJwt),
            "jwt" => Ok(Self::Jwt),
            other => Err(ResponseError::invalid_parameter(
                names::RESPONSE_MODE,
                format!("unknown response mode '{other}'"),
            )),
        }
    }
}

/// Authorization endpoint response types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseType {
    /// Authorization code.
    Code,
    /// Access token (implicit).
    Token,
    /// OpenID Connect ID token.
    IdToken,
}

impl ResponseType {
    /// Returns the response type name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Code => "code",
            Self::Token => "token",
            Self::IdToken => "id_token",
        }
    }

    /// Returns `true` if this type issues a token from the authorization
    /// endpoint, which must not travel in a query string.
    #[must_use]
    pub fn implies_fragment(&self) -> bool {
        matches!(self, Self::Token | Self::IdToken)
    }

    /// Parses a space-separated `response_type` value.
    ///
    /// # Errors
    /// Returns an error on an unknown response type.
    pub fn parse_list(value: &str) -> ResponseResult<Vec<Self>> {
        value.split_whitespace().map(str::parse).collect()
    }
}

impl fmt::Display for ResponseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ResponseType {
    type Err = ResponseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "code" => Ok(Self::Code),
            "token" => Ok(Self::Token),
            "id_token" => Ok(Self::IdToken),
            other => Err(ResponseError::invalid_parameter(
                names::RESPONSE_TYPE,
                format!("unknown response type '{other}'"),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_names_round_trip() {
        for name in [
            "query",
            "fragment",
            "form_post",
            "query.jwt",
            "fragment.jwt",
            "form_post.jwt",
            "jwt",
        ] {
            let mode: ResponseMode = name.parse().unwrap();
            assert_eq!(mode.to_string(), name);
            assert_eq!(serde_json::to_string(&mode).unwrap(), format!("\"{name}\""));
        }
        assert!("post".parse::<ResponseMode>().is_err());
    }

    #[test]
    fn test_resolve_unset_mode() {
        assert_eq!(
            ResponseMode::resolve(None, &[ResponseType::Code]),
            ResponseMode::Query
        );
        assert_eq!(
            ResponseMode::resolve(None, &[ResponseType::Token]),
            ResponseMode::Fragment
        );
        assert_eq!(
            ResponseMode::resolve(None, &[ResponseType::Code, ResponseType::IdToken]),
            ResponseMode::Fragment
        );
        assert_eq!(ResponseMode::resolve(None, &[]), ResponseMode::Query);
    }

    #[test]
    fn test_resolve_jwt_mode() {
        assert_eq!(
            ResponseMode::resolve(Some(ResponseMode::Jwt), &[ResponseType::Code]),
            ResponseMode::QueryJwt
        );
        assert_eq!(
            ResponseMode::resolve(Some(ResponseMode::Jwt), &[ResponseType::Token]),
            ResponseMode::FragmentJwt
        );
        assert_eq!(
            ResponseMode::resolve(Some(ResponseMode::FormPost), &[ResponseType::Token]),
            ResponseMode::FormPost
        );
    }

    #[test]
    fn test_delivery() {
        assert_eq!(ResponseMode::Jwt.delivery(), Delivery::Query);
        assert_eq!(ResponseMode::FragmentJwt.delivery(), Delivery::Fragment);
        assert_eq!(ResponseMode::FormPostJwt.delivery(), Delivery::FormPost);
        assert!(ResponseMode::FormPostJwt.is_jwt());
        assert!(!ResponseMode::FormPost.is_jwt());
    }

    #[test]
    fn test_parse_response_type_list() {
        assert_eq!(
            ResponseType::parse_list("code  id_token").unwrap(),
            vec![ResponseType::Code, ResponseType::IdToken]
        );
        assert!(ResponseType::parse_list("").unwrap().is_empty());
        assert!(ResponseType::parse_list("code device").is_err());
    }
}
