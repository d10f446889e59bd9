//! Wire types the client exchanges with the API.

use serde::{Deserialize, Serialize};

/// Signed-in user as the API returns it (no password).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    pub id: String,
    pub username: String,
    pub email: String,
    pub profile_picture: String,
    pub is_admin: bool,
}

#[derive(Clone, Debug, Serialize)]
pub struct SigninBody<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// Profile change; `None` fields are left out of the request body.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_picture: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub(crate) struct UserEnvelope {
    pub user: SessionUser,
}

#[derive(Clone, Debug, Deserialize)]
pub(crate) struct MessageEnvelope {
    pub message: String,
}
