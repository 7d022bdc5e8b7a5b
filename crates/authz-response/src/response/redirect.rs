//! Authorization endpoint redirect responses.
//!
//! A [`RedirectResponse`] ties the pieces together for one response: it
//! resolves the response mode, picks the protection (JWT modes are always
//! signed or encrypted, other modes are always plain), runs the artifact
//! pipeline and dispatches the result.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use super::dispatcher::{DispatchedResponse, ResponseModeDispatcher};
use super::mode::{ResponseMode, ResponseType};
use crate::ResponseResult;
use crate::config::ResponseConfig;
use crate::crypto::CryptoCapability;
use crate::jose::claims::ClaimsAssembler;
use crate::params::{ParameterCollection, names};
use crate::pipeline::{ArtifactPipeline, PipelineOutcome, Protection, SigningKey};

/// Builder and renderer for an authorization response.
#[derive(Clone)]
pub struct RedirectResponse {
    base_uri: String,
    response_mode: Option<ResponseMode>,
    response_types: Vec<ResponseType>,
    params: ParameterCollection,
    protection: Protection,
    expires_at: Option<i64>,
    crypto: Option<Arc<dyn CryptoCapability>>,
    config: ResponseConfig,
}

impl fmt::Debug for RedirectResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedirectResponse")
            .field("base_uri", &self.base_uri)
            .field("response_mode", &self.response_mode)
            .field("response_types", &self.response_types)
            .field("params", &self.params)
            .field("protection", &self.protection)
            .field("expires_at", &self.expires_at)
            .field("crypto", &self.crypto.is_some())
            .field("config", &self.config)
            .finish()
    }
}

impl RedirectResponse {
    /// Creates a response to `base_uri` with no parameters.
    #[must_use]
    pub fn new(base_uri: impl Into<String>) -> Self {
        Self {
            base_uri: base_uri.into(),
            response_mode: None,
            response_types: Vec::new(),
            params: ParameterCollection::new(),
            protection: Protection::Plain,
            expires_at: None,
            crypto: None,
            config: ResponseConfig::default(),
        }
    }

    /// Creates an error response (RFC 6749 section 4.1.2.1).
    #[must_use]
    pub fn for_error(base_uri: impl Into<String>, error: &AuthorizationError) -> Self {
        Self::new(base_uri).params(error.to_params())
    }

    /// Sets the requested response mode.
    #[must_use]
    pub fn response_mode(mut self, mode: Option<ResponseMode>) -> Self {
        self.response_mode = mode;
        self
    }

    /// Sets the requested response types, used to pick a default mode.
    #[must_use]
    pub fn response_types(mut self, types: impl Into<Vec<ResponseType>>) -> Self {
        self.response_types = types.into();
        self
    }

    /// Replaces the response parameters.
    #[must_use]
    pub fn params(mut self, params: ParameterCollection) -> Self {
        self.params = params;
        self
    }

    /// Sets one response parameter.
    #[must_use]
    pub fn param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.set(name, value);
        self
    }

    /// Sets the protection for JWT response modes.
    #[must_use]
    pub fn protection(mut self, protection: Protection) -> Self {
        self.protection = protection;
        self
    }

    /// Sets an absolute `exp` (unix seconds) for JWT response modes. Without
    /// one, `exp` is now plus the configured response lifetime.
    #[must_use]
    pub fn expires_at(mut self, exp: Option<i64>) -> Self {
        self.expires_at = exp;
        self
    }

    /// Sets the crypto provider.
    #[must_use]
    pub fn crypto(mut self, crypto: Arc<dyn CryptoCapability>) -> Self {
        self.crypto = Some(crypto);
        self
    }

    /// Sets the configuration.
    #[must_use]
    pub fn config(mut self, config: ResponseConfig) -> Self {
        self.config = config;
        self
    }

    /// Returns the response parameters for modification.
    pub fn params_mut(&mut self) -> &mut ParameterCollection {
        &mut self.params
    }

    /// Returns the response mode after defaulting.
    #[must_use]
    pub fn effective_mode(&self) -> ResponseMode {
        ResponseMode::resolve(self.response_mode, &self.response_types)
    }

    /// Returns the protection that will be applied.
    ///
    /// Non-JWT modes are plain. A JWT mode without configured protection is
    /// signed with the default algorithm and the provider's default key.
    #[must_use]
    pub fn effective_protection(&self) -> Protection {
        if !self.effective_mode().is_jwt() {
            return Protection::Plain;
        }
        match &self.protection {
            Protection::Plain => Protection::Signed(SigningKey::asymmetric(
                self.config.default_signature_algorithm,
                None::<String>,
            )),
            other => other.clone(),
        }
    }

    /// Runs the artifact pipeline.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid or a pipeline stage
    /// fails hard.
    pub fn build_artifact(&self) -> ResponseResult<PipelineOutcome> {
        self.config.validate()?;

        let assembler = ClaimsAssembler::new(self.config.response_lifetime)
            .issuer(self.config.issuer.as_deref())
            .expires_at(self.expires_at);
        ArtifactPipeline::new(self.crypto.as_deref()).build(
            &self.params,
            &assembler,
            &self.effective_protection(),
        )
    }

    /// Returns the value carried under `response` in JWT modes.
    ///
    /// The value is empty when the recipient key was unavailable.
    ///
    /// # Errors
    /// Returns an error if the pipeline fails hard.
    pub fn response_value(&self) -> ResponseResult<String> {
        Ok(self.build_artifact()?.response_value().to_string())
    }

    /// Renders the response in its wire form.
    ///
    /// # Errors
    /// Returns an error if the base URI is invalid or the pipeline fails hard.
    pub fn render(&self) -> ResponseResult<DispatchedResponse> {
        let mode = self.effective_mode();
        let dispatcher = ResponseModeDispatcher::new(&self.base_uri, mode)?;
        let outcome = self.build_artifact()?;

        if outcome.is_key_unavailable() {
            tracing::warn!(mode = %mode, "Rendering empty response: encryption key unavailable");
        } else {
            tracing::debug!(mode = %mode, params = self.params.len(), "Rendering authorization response");
        }
        dispatcher.dispatch(&outcome)
    }
}

// ============================================================================
// Error responses
// ============================================================================

/// OAuth 2.0 authorization endpoint error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorizationErrorCode {
    /// The request is missing a required parameter, includes an invalid
    /// parameter value, includes a parameter more than once, or is
    /// otherwise malformed.
    InvalidRequest,

    /// The client is not authorized to request an authorization code
    /// using this method.
    UnauthorizedClient,

    /// The resource owner or authorization server denied the request.
    AccessDenied,

    /// The authorization server does not support this response type.
    UnsupportedResponseType,

    /// The requested scope is invalid, unknown, or malformed.
    InvalidScope,

    /// The authorization server encountered an unexpected condition.
    ServerError,

    /// The authorization server is temporarily unable to handle the request.
    TemporarilyUnavailable,
}

impl AuthorizationErrorCode {
    /// Returns the string representation of the error code.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidRequest => "invalid_request",
            Self::UnauthorizedClient => "unauthorized_client",
            Self::AccessDenied => "access_denied",
            Self::UnsupportedResponseType => "unsupported_response_type",
            Self::InvalidScope => "invalid_scope",
            Self::ServerError => "server_error",
            Self::TemporarilyUnavailable => "temporarily_unavailable",
        }
    }
}

impl fmt::Display for AuthorizationErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An authorization error delivered to the client's redirect URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationError {
    /// Error code.
    pub error: AuthorizationErrorCode,
    /// Human-readable description.
    pub error_description: Option<String>,
    /// URI of a page describing the error.
    pub error_uri: Option<String>,
    /// Echoed client state.
    pub state: Option<String>,
}

impl AuthorizationError {
    /// Creates an error with no description.
    #[must_use]
    pub fn new(error: AuthorizationErrorCode, state: Option<impl Into<String>>) -> Self {
        Self {
            error,
            error_description: None,
            error_uri: None,
            state: state.map(Into::into),
        }
    }

    /// Adds a description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.error_description = Some(description.into());
        self
    }

    /// Adds an error URI.
    #[must_use]
    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.error_uri = Some(uri.into());
        self
    }

    /// Returns the error as response parameters.
    #[must_use]
    pub fn to_params(&self) -> ParameterCollection {
        let mut params = ParameterCollection::new();
        params.set(names::ERROR, self.error.as_str());
        if let Some(description) = &self.error_description {
            params.set(names::ERROR_DESCRIPTION, description.as_str());
        }
        if let Some(uri) = &self.error_uri {
            params.set(names::ERROR_URI, uri.as_str());
        }
        if let Some(state) = &self.state {
            params.set(names::STATE, state.as_str());
        }
        params
    }
}
