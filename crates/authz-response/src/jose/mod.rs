//! JOSE building blocks.
//!
//! This module provides:
//!
//! - Algorithm identifiers for signing and encryption
//! - JSON Web Key Sets
//! - Protected header construction
//! - Claim set assembly
//! - Compact JWS and JWE serialization

pub mod algorithm;
pub mod claims;
pub mod header;
pub mod jwe;
pub mod jwks;
pub mod jws;

pub use algorithm::{
    AlgorithmFamily, BlockEncryptionAlgorithm, KeyEncryptionAlgorithm, SignatureAlgorithm,
};
pub use claims::{ClaimSet, ClaimsAssembler, token_hash};
pub use header::{JWT_TYPE, JoseHeader, JoseHeaderBuilder};
pub use jwe::{EncryptionKey, EncryptionStage, Jwe, RecipientKey};
pub use jwks::{Jwk, Jwks};
pub use jws::{Jws, SigningKey, SigningStage};
