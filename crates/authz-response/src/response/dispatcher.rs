//! Serializes a pipeline outcome into its response mode's wire form.

use url::Url;

use super::form_post::render_form;
use super::mode::{Delivery, ResponseMode};
use crate::ResponseResult;
use crate::error::ResponseError;
use crate::params::{ParameterCollection, names};
use crate::pipeline::{JoseArtifact, PipelineOutcome};

/// The final wire form of an authorization response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchedResponse {
    /// A URI to redirect the user agent to.
    Redirect(String),
    /// An HTML document that posts the response to the client.
    FormPost(String),
}

impl DispatchedResponse {
    /// Returns the redirect URI or HTML document.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Redirect(s) | Self::FormPost(s) => s,
        }
    }

    /// Consumes the response, returning the redirect URI or HTML document.
    #[must_use]
    pub fn into_string(self) -> String {
        match self {
            Self::Redirect(s) | Self::FormPost(s) => s,
        }
    }

    /// Returns `true` for an HTML form post.
    #[must_use]
    pub fn is_form_post(&self) -> bool {
        matches!(self, Self::FormPost(_))
    }
}

/// Places plain parameters or a JOSE artifact on a redirect URI or in a
/// form post.
#[derive(Debug, Clone, Copy)]
pub struct ResponseModeDispatcher<'a> {
    base_uri: &'a str,
    mode: ResponseMode,
    query_separator: &'static str,
}

impl<'a> ResponseModeDispatcher<'a> {
    /// Creates a dispatcher for a resolved response mode.
    ///
    /// # Errors
    /// Returns `InvalidRedirectUri` if `base_uri` is not an absolute URI or
    /// already carries a fragment.
    pub fn new(base_uri: &'a str, mode: ResponseMode) -> ResponseResult<Self> {
        let parsed =
            Url::parse(base_uri).map_err(|e| ResponseError::invalid_redirect_uri(e.to_string()))?;
        if parsed.fragment().is_some() {
            return Err(ResponseError::invalid_redirect_uri(
                "redirect URI must not contain a fragment",
            ));
        }
        let query_separator = match parsed.query() {
            None => "?",
            Some("") => "",
            Some(_) => "&",
        };
        Ok(Self {
            base_uri,
            mode,
            query_separator,
        })
    }

    /// Returns the response mode.
    #[must_use]
    pub fn mode(&self) -> ResponseMode {
        self.mode
    }

    /// Serializes a pipeline outcome.
    ///
    /// JWT modes carry the compact artifact as the single `response`
    /// parameter; the other modes carry plain parameters. An unavailable
    /// recipient key yields an empty response: the base URI unchanged, or a
    /// form with no inputs.
    ///
    /// # Errors
    /// Returns `UnsupportedAlgorithm` when the artifact kind does not match
    /// the mode.
    pub fn dispatch(&self, outcome: &PipelineOutcome) -> ResponseResult<DispatchedResponse> {
        let params = match (outcome, self.mode.is_jwt()) {
            (PipelineOutcome::EncryptionKeyUnavailable, _) => ParameterCollection::new(),
            (PipelineOutcome::Artifact(JoseArtifact::Plain(params)), false) => params.clone(),
            (PipelineOutcome::Artifact(JoseArtifact::Plain(_)), true) => {
                return Err(ResponseError::unsupported_algorithm(format!(
                    "response mode {} requires a signed or encrypted response",
                    self.mode
                )));
            }
            (PipelineOutcome::Artifact(artifact), true) => {
                let mut params = ParameterCollection::new();
                params.set_opt(names::RESPONSE, artifact.compact());
                params
            }
            (PipelineOutcome::Artifact(_), false) => {
                return Err(ResponseError::unsupported_algorithm(format!(
                    "response mode {} carries plain parameters only",
                    self.mode
                )));
            }
        };

        Ok(self.dispatch_params(&params))
    }

    /// Serializes plain parameters in this dispatcher's delivery position.
    #[must_use]
    pub fn dispatch_params(&self, params: &ParameterCollection) -> DispatchedResponse {
        match self.mode.delivery() {
            Delivery::FormPost => DispatchedResponse::FormPost(render_form(
                self.base_uri,
                params.iter().map(|(name, value)| (name, value.unwrap_or(""))),
            )),
            Delivery::Query | Delivery::Fragment if params.is_empty() => {
                DispatchedResponse::Redirect(self.base_uri.to_string())
            }
            Delivery::Query => DispatchedResponse::Redirect(format!(
                "{}{}{}",
                self.base_uri,
                self.query_separator,
                params.to_form_urlencoded()
            )),
            Delivery::Fragment => DispatchedResponse::Redirect(format!(
                "{}#{}",
                self.base_uri,
                params.to_form_urlencoded()
            )),
        }
    }
}
