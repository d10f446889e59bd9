//! Authenticated principal extraction.
//!
//! Handlers call [`require_auth`] first thing; there is no global auth layer so
//! public routes stay public without an allow-list.
//!
//! The admin flag is read from the token claims, not the store. A change to a
//! user's admin flag applies to tokens issued after it; older tokens keep the
//! flag they were signed with until they expire.

use axum::http::HeaderMap;
use tracing::debug;
use uuid::Uuid;

use super::{
    session::{extract_session_token, verify_token},
    state::AuthState,
};
use crate::api::error::ApiError;

/// Caller identity carried by a valid session token.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Principal {
    pub user_id: Uuid,
    pub is_admin: bool,
}

impl Principal {
    /// The caller is `user_id` or an admin.
    #[must_use]
    pub fn owns_or_admin(&self, user_id: Uuid) -> bool {
        self.is_admin || self.user_id == user_id
    }
}

/// Resolve the session token into a principal, or 401 "Unauthorized".
///
/// # Errors
/// 401 when the token is missing, malformed, forged or expired.
pub fn require_auth(headers: &HeaderMap, auth_state: &AuthState) -> Result<Principal, ApiError> {
    let Some(token) = extract_session_token(headers) else {
        debug!("Request without session token");
        return Err(ApiError::unauthorized("Unauthorized"));
    };
    let Some(claims) = verify_token(auth_state, &token) else {
        debug!("Rejected session token");
        return Err(ApiError::unauthorized("Unauthorized"));
    };
    let user_id = Uuid::parse_str(&claims.sub).map_err(|_| {
        debug!("Session token subject is not a user id");
        ApiError::unauthorized("Unauthorized")
    })?;
    Ok(Principal {
        user_id,
        is_admin: claims.is_admin,
    })
}
