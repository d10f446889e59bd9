//! Field rules shared by signup, profile updates and comments.
//!
//! Each check returns the first violated rule as a 400 [`ApiError`].

use once_cell::sync::Lazy;
use regex::Regex;

use crate::api::error::ApiError;

pub const USERNAME_MIN_LEN: usize = 7;
pub const USERNAME_MAX_LEN: usize = 20;
pub const PASSWORD_MIN_LEN: usize = 6;
pub const COMMENT_MAX_LEN: usize = 200;

static EMAIL_RE: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").ok());
static USERNAME_RE: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"^[a-zA-Z0-9]+$").ok());

/// # Errors
/// 400 when shorter than [`PASSWORD_MIN_LEN`] characters.
pub fn validate_password(password: &str) -> Result<(), ApiError> {
    if password.chars().count() < PASSWORD_MIN_LEN {
        return Err(ApiError::bad_request(
            "password must be at least 6 characters",
        ));
    }
    Ok(())
}

/// Length, then spaces, then case, then charset.
///
/// # Errors
/// 400 with the message of the first rule the username breaks.
pub fn validate_username(username: &str) -> Result<(), ApiError> {
    let len = username.chars().count();
    if !(USERNAME_MIN_LEN..=USERNAME_MAX_LEN).contains(&len) {
        return Err(ApiError::bad_request(
            "username must be between 7 and 20 characters",
        ));
    }
    if username.contains(' ') {
        return Err(ApiError::bad_request("username can not contain spaces"));
    }
    if username != username.to_lowercase() {
        return Err(ApiError::bad_request("username must be lowercase"));
    }
    let alphanumeric = USERNAME_RE
        .as_ref()
        .is_some_and(|regex| regex.is_match(username));
    if !alphanumeric {
        return Err(ApiError::bad_request(
            "username can only contain letters and numbers",
        ));
    }
    Ok(())
}

/// Expects an already normalized (trimmed, lowercased) address.
///
/// # Errors
/// 400 "Invalid email".
pub fn validate_email(email_normalized: &str) -> Result<(), ApiError> {
    let valid = EMAIL_RE
        .as_ref()
        .is_some_and(|regex| regex.is_match(email_normalized));
    if valid {
        Ok(())
    } else {
        Err(ApiError::bad_request("Invalid email"))
    }
}

/// Trim and check comment content, returning the text to persist.
///
/// # Errors
/// 400 when empty after trimming or longer than [`COMMENT_MAX_LEN`] characters.
pub fn comment_content(content: &str) -> Result<String, ApiError> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(ApiError::bad_request("Comment content is required"));
    }
    if trimmed.chars().count() > COMMENT_MAX_LEN {
        return Err(ApiError::bad_request(
            "Comment must be at most 200 characters",
        ));
    }
    Ok(trimmed.to_string())
}
