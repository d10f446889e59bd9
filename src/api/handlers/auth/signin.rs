use axum::{
    Json,
    extract::{Extension, rejection::JsonRejection},
    http::{HeaderMap, StatusCode, header::SET_COOKIE},
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::{debug, error};

use super::{
    password::verify_password_blocking,
    session::{issue_token, session_cookie},
    state::AuthState,
    types::SigninRequest,
};
use crate::{
    api::{
        error::{ApiError, ErrorBody},
        handlers::{
            normalize_email, normalize_optional,
            users::{UserResponse, UserView},
        },
    },
    store::DynStore,
};

#[utoipa::path(
    post,
    path = "/api/auth/signin",
    request_body = SigninRequest,
    responses(
        (status = 200, description = "Signed in, session cookie set", body = UserResponse),
        (status = 400, description = "Missing field or wrong password", body = ErrorBody),
        (status = 404, description = "No user with that email", body = ErrorBody)
    ),
    tag = "auth"
)]
pub async fn signin(
    store: Extension<DynStore>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Result<Json<SigninRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload?;
    let (Some(email), Some(password)) = (
        normalize_optional(request.email),
        request.password.filter(|password| !password.is_empty()),
    ) else {
        return Err(ApiError::bad_request("All fields are required"));
    };

    let email = normalize_email(&email);
    let Some(user) = store.find_user_by_email(&email).await? else {
        return Err(ApiError::not_found("User not found"));
    };

    if !verify_password_blocking(password, user.password_hash.clone()).await? {
        debug!(user_id = %user.id, "Password mismatch");
        return Err(ApiError::bad_request("Invalid password"));
    }

    let token = issue_token(&auth_state, user.id, user.is_admin).map_err(|err| {
        error!("Failed to sign session token: {err}");
        ApiError::internal()
    })?;
    let cookie = session_cookie(&auth_state, &token).map_err(|err| {
        error!("Failed to build session cookie: {err}");
        ApiError::internal()
    })?;

    let mut headers = HeaderMap::new();
    headers.insert(SET_COOKIE, cookie);
    let body = UserResponse {
        success: true,
        message: "Signin successful".to_string(),
        user: UserView::from(user),
    };
    Ok((StatusCode::OK, headers, Json(body)).into_response())
}
