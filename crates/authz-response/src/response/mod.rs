//! Authorization response transports.
//!
//! This module provides:
//!
//! - Response modes (`query`, `fragment`, `form_post` and their JARM variants)
//! - The dispatcher that places a response on a redirect URI or in a form
//! - The auto-submitting form post document
//! - Redirect responses and authorization error responses

pub mod dispatcher;
pub mod form_post;
pub mod mode;
pub mod redirect;

pub use dispatcher::{DispatchedResponse, ResponseModeDispatcher};
pub use form_post::{html_escape, render_form};
pub use mode::{Delivery, ResponseMode, ResponseType};
pub use redirect::{AuthorizationError, AuthorizationErrorCode, RedirectResponse};
