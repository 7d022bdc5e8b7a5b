//! # authz-response
//!
//! Construction of OAuth 2.0 / OpenID Connect authorization responses and
//! client assertions.
//!
//! This crate provides:
//! - Response parameter collections and their plain serializations
//! - JOSE signing (JWS) and encryption (JWE), including nested sign-then-encrypt
//! - JWT Secured Authorization Response Mode (JARM) and the classic response
//!   modes
//! - JWT-encoded `state` values and software statements
//!
//! ## Overview
//!
//! A build starts from a [`ParameterCollection`] and a [`Protection`]. The
//! [`ArtifactPipeline`] turns them into plain parameters, a compact JWS or a
//! compact JWE, and the [`ResponseModeDispatcher`] places the result on the
//! redirect URI or in an auto-submitting form. Key material stays behind the
//! [`CryptoCapability`] trait.
//!
//! An unresolvable recipient key for key transport encryption is not an
//! error: the build yields [`PipelineOutcome::EncryptionKeyUnavailable`] and
//! the response carries an empty value.
//!
//! ## Modules
//!
//! - [`params`] - Response parameters and parameter names
//! - [`crypto`] - Crypto provider trait and in-memory provider
//! - [`jose`] - Algorithms, keys, headers, claims, JWS and JWE
//! - [`pipeline`] - Protection selection and artifact construction
//! - [`response`] - Response modes, dispatch and redirect responses
//! - [`assertion`] - JWT `state` values and software statements
//! - [`config`] - Response configuration
//! - [`error`] - Error types

pub mod assertion;
pub mod config;
pub mod crypto;
pub mod error;
pub mod jose;
pub mod params;
pub mod pipeline;
pub mod response;

pub use assertion::{JwtState, SoftwareStatement};
pub use config::{ConfigError, ResponseConfig};
pub use crypto::{CryptoCapability, CryptoError, PublicKey, SigningKeyPair, SoftwareCryptoProvider};
pub use error::{CryptoOperation, ResponseError};
pub use jose::{
    BlockEncryptionAlgorithm, ClaimSet, ClaimsAssembler, Jwe, Jwk, Jwks, JoseHeader, Jws,
    KeyEncryptionAlgorithm, SignatureAlgorithm,
};
pub use params::ParameterCollection;
pub use pipeline::{
    ArtifactPipeline, EncryptionKey, JoseArtifact, PipelineOutcome, Protection, RecipientKey,
    SigningKey,
};
pub use response::{
    AuthorizationError, AuthorizationErrorCode, DispatchedResponse, RedirectResponse,
    ResponseMode, ResponseModeDispatcher, ResponseType,
};

/// Type alias for response construction results.
pub type ResponseResult<T> = Result<T, ResponseError>;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use authz_response::prelude::*;
/// ```
pub mod prelude {
    pub use crate::ResponseResult;
    pub use crate::assertion::{JwtState, SoftwareStatement};
    pub use crate::config::{ConfigError, ResponseConfig};
    pub use crate::crypto::{
        CryptoCapability, CryptoError, SigningKeyPair, SoftwareCryptoProvider,
    };
    pub use crate::error::ResponseError;
    pub use crate::jose::{
        BlockEncryptionAlgorithm, Jwks, KeyEncryptionAlgorithm, SignatureAlgorithm,
    };
    pub use crate::params::{ParameterCollection, names};
    pub use crate::pipeline::{
        ArtifactPipeline, EncryptionKey, PipelineOutcome, Protection, RecipientKey, SigningKey,
    };
    pub use crate::response::{RedirectResponse, ResponseMode, ResponseType};
}
