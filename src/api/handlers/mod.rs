//! API handlers and shared request helpers.
//!
//! Every handler follows the same shape: authenticate (when the route needs
//! it), validate, make one store call, shape the JSON envelope.

pub mod auth;
pub mod comments;
pub mod health;
pub mod root;
pub mod users;
pub mod validation;

use chrono::{DateTime, Months, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::{
    api::error::ApiError,
    store::{Page, SortDirection},
};

pub const DEFAULT_PAGE_LIMIT: u64 = 9;

/// Body shared by responses that carry nothing but an outcome.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

/// Pagination query accepted by the admin listings.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ListQuery {
    /// Number of records to skip (default 0).
    pub start_index: Option<String>,
    /// `asc` for oldest first; anything else is newest first.
    pub sort: Option<String>,
    /// Maximum number of records (default 9).
    pub limit: Option<String>,
}

impl ListQuery {
    /// Lenient parse: garbage, zero or negative limits fall back to the default,
    /// negative offsets to zero.
    #[must_use]
    pub fn page(&self) -> Page {
        let start_index = self
            .start_index
            .as_deref()
            .and_then(parse_leading_int)
            .and_then(|value| u64::try_from(value).ok())
            .unwrap_or(0);
        let limit = self
            .limit
            .as_deref()
            .and_then(parse_leading_int)
            .and_then(|value| u64::try_from(value).ok())
            .filter(|value| *value > 0)
            .unwrap_or(DEFAULT_PAGE_LIMIT);
        Page {
            start_index,
            limit,
            sort: SortDirection::from_query(self.sort.as_deref()),
        }
    }
}

/// Parse the leading integer of `value`, ignoring trailing garbage (`"12abc"` is 12).
fn parse_leading_int(value: &str) -> Option<i64> {
    let trimmed = value.trim_start();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    let magnitude: i64 = digits[..end].parse().ok()?;
    Some(if negative { -magnitude } else { magnitude })
}

/// Midnight UTC of the same day one calendar month before `now`.
pub(crate) fn month_ago(now: DateTime<Utc>) -> DateTime<Utc> {
    let today = now.date_naive();
    today
        .checked_sub_months(Months::new(1))
        .unwrap_or(today)
        .and_time(NaiveTime::MIN)
        .and_utc()
}

pub(crate) fn parse_id(value: &str, message: &'static str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(value.trim()).map_err(|_| ApiError::bad_request(message))
}

/// Trim and drop empty optional strings so `""` means "not provided".
pub(crate) fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
