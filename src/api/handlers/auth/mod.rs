//! Auth handlers and supporting modules.
//!
//! Sessions are stateless: signin issues an HS256 token in the `access_token`
//! cookie, and every protected handler resolves it with
//! [`principal::require_auth`]. Signing out only clears the cookie.

pub(crate) mod password;
pub(crate) mod principal;
pub(crate) mod session;
pub(crate) mod signin;
pub(crate) mod signup;
mod state;
pub(crate) mod types;

pub use principal::{Principal, require_auth};
pub use session::{Claims, SESSION_COOKIE_NAME, issue_token};
pub use state::{AuthConfig, AuthState, DEFAULT_FRONTEND_BASE_URL, DEFAULT_SESSION_TTL_SECONDS};
