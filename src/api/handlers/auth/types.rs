//! Request types for auth endpoints.
//!
//! Fields are optional so a missing field yields the endpoint's own 400 instead
//! of a deserialization rejection.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug, Default)]
pub struct SignupRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Default)]
pub struct SigninRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}
