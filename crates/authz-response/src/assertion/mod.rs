//! Client-side assertions encoded through the artifact pipeline.
//!
//! - [`JwtState`]: a `state` parameter value carrying claims about the
//!   request it protects
//! - [`SoftwareStatement`]: an RFC 7591 software statement

pub mod software_statement;
pub mod state;

pub use software_statement::SoftwareStatement;
pub use state::JwtState;
