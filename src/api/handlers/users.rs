//! User profile endpoints.
//!
//! Responses only ever carry [`UserView`], which has no password field. Updates
//! go through [`UserChanges`], so only username, email, password and profile
//! picture are writable no matter what the body contains.

use axum::{
    Json,
    extract::{Extension, Path, Query, rejection::JsonRejection},
    http::{HeaderMap, StatusCode, header::SET_COOKIE},
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};
use utoipa::ToSchema;
use uuid::Uuid;

use super::{
    ListQuery, MessageResponse,
    auth::{AuthState, password::hash_password_blocking, require_auth, session},
    month_ago, normalize_email, normalize_optional, parse_id,
    validation::{validate_email, validate_password, validate_username},
};
use crate::{
    api::error::{ApiError, ErrorBody},
    store::{DynStore, User, UserChanges},
};

/// Sanitized user record.
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub profile_picture: String,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserView {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            profile_picture: user.profile_picture,
            is_admin: user.is_admin,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Any field left out (or sent empty) keeps its current value. Unknown fields,
/// `isAdmin` included, are ignored.
#[derive(ToSchema, Serialize, Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub profile_picture: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct UserResponse {
    pub success: bool,
    pub message: String,
    pub user: UserView,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct UsersPage {
    pub success: bool,
    pub message: String,
    pub users: Vec<UserView>,
    pub total_users: u64,
    pub last_month_users: u64,
}

#[utoipa::path(
    get,
    path = "/api/user",
    responses(
        (status = 200, description = "User API root", body = String)
    ),
    tag = "user"
)]
pub async fn user_home() -> &'static str {
    "user home"
}

#[utoipa::path(
    put,
    path = "/api/user/{userId}",
    params(("userId" = String, Path, description = "User id")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated", body = UserResponse),
        (status = 400, description = "Validation failed", body = ErrorBody),
        (status = 401, description = "Not signed in or not the owner", body = ErrorBody),
        (status = 404, description = "User not found", body = ErrorBody),
        (status = 409, description = "Username or email already in use", body = ErrorBody)
    ),
    tag = "user"
)]
pub async fn update_user(
    Path(user_id): Path<String>,
    headers: HeaderMap,
    store: Extension<DynStore>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let principal = require_auth(&headers, &auth_state)?;
    let owner = Uuid::parse_str(user_id.trim()).ok();
    if owner != Some(principal.user_id) {
        return Err(ApiError::unauthorized(
            "You are not allowed to update this user",
        ));
    }
    let Json(request) = payload?;

    let password = request.password.filter(|password| !password.is_empty());
    // validated untrimmed so padded names hit the no-spaces rule
    let username = request.username.filter(|username| !username.is_empty());
    let email = normalize_optional(request.email).map(|email| normalize_email(&email));
    let profile_picture = normalize_optional(request.profile_picture);

    if let Some(password) = &password {
        validate_password(password)?;
    }
    if let Some(username) = &username {
        validate_username(username)?;
    }
    if let Some(email) = &email {
        validate_email(email)?;
    }

    let password_hash = match password {
        Some(password) => Some(hash_password_blocking(password).await?),
        None => None,
    };
    let changes = UserChanges {
        username,
        email,
        password_hash,
        profile_picture,
    };

    let updated = if changes.is_empty() {
        store.find_user(principal.user_id).await?
    } else {
        store.update_user(principal.user_id, changes).await?
    };
    let Some(user) = updated else {
        return Err(ApiError::not_found("User not found"));
    };
    info!(user_id = %user.id, "User updated");

    let body = UserResponse {
        success: true,
        message: "User updated successfully".to_string(),
        user: UserView::from(user),
    };
    Ok((StatusCode::OK, Json(body)).into_response())
}

#[utoipa::path(
    delete,
    path = "/api/user/{userId}",
    params(("userId" = String, Path, description = "User id")),
    responses(
        (status = 200, description = "User deleted", body = MessageResponse),
        (status = 400, description = "Malformed user id", body = ErrorBody),
        (status = 401, description = "Not signed in, or neither owner nor admin", body = ErrorBody),
        (status = 404, description = "User not found", body = ErrorBody)
    ),
    tag = "user"
)]
pub async fn delete_user(
    Path(user_id): Path<String>,
    headers: HeaderMap,
    store: Extension<DynStore>,
    auth_state: Extension<Arc<AuthState>>,
) -> Result<Response, ApiError> {
    let principal = require_auth(&headers, &auth_state)?;
    let target = Uuid::parse_str(user_id.trim()).ok();
    let allowed = principal.is_admin || target == Some(principal.user_id);
    if !allowed {
        return Err(ApiError::unauthorized(
            "You are not allowed to delete this user",
        ));
    }
    let target = parse_id(&user_id, "Invalid user id")?;

    if !store.delete_user(target).await? {
        return Err(ApiError::not_found("User not found"));
    }
    info!(user_id = %target, deleted_by = %principal.user_id, "User deleted");

    Ok((
        StatusCode::OK,
        Json(MessageResponse::ok("User has been deleted")),
    )
        .into_response())
}

#[utoipa::path(
    post,
    path = "/api/user/signout",
    responses(
        (status = 200, description = "Session cookie cleared", body = MessageResponse)
    ),
    tag = "user"
)]
pub async fn sign_out(auth_state: Extension<Arc<AuthState>>) -> Result<Response, ApiError> {
    let cookie = session::clear_session_cookie(auth_state.config()).map_err(|err| {
        error!("Failed to build session cookie: {err}");
        ApiError::internal()
    })?;
    let mut headers = HeaderMap::new();
    headers.insert(SET_COOKIE, cookie);
    Ok((
        StatusCode::OK,
        headers,
        Json(MessageResponse::ok("User has been signed out")),
    )
        .into_response())
}

#[utoipa::path(
    get,
    path = "/api/user/getUsers",
    params(ListQuery),
    responses(
        (status = 200, description = "Page of users with counts", body = UsersPage),
        (status = 401, description = "Not signed in", body = ErrorBody),
        (status = 403, description = "Caller is not an admin", body = ErrorBody)
    ),
    tag = "user"
)]
pub async fn list_users(
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
    store: Extension<DynStore>,
    auth_state: Extension<Arc<AuthState>>,
) -> Result<Response, ApiError> {
    let principal = require_auth(&headers, &auth_state)?;
    if !principal.is_admin {
        return Err(ApiError::forbidden("You are not allowed to see all users"));
    }

    let users = store.list_users(query.page()).await?;
    let total_users = store.count_users(None).await?;
    let last_month_users = store.count_users(Some(month_ago(Utc::now()))).await?;

    let body = UsersPage {
        success: true,
        message: "Users fetched successfully".to_string(),
        users: users.into_iter().map(UserView::from).collect(),
        total_users,
        last_month_users,
    };
    Ok((StatusCode::OK, Json(body)).into_response())
}

#[utoipa::path(
    get,
    path = "/api/user/{userId}",
    params(("userId" = String, Path, description = "User id")),
    responses(
        (status = 200, description = "Sanitized user record", body = UserView),
        (status = 400, description = "Malformed user id", body = ErrorBody),
        (status = 404, description = "User not found", body = ErrorBody)
    ),
    tag = "user"
)]
pub async fn get_user(
    Path(user_id): Path<String>,
    store: Extension<DynStore>,
) -> Result<Response, ApiError> {
    let user_id = parse_id(&user_id, "Invalid user id")?;
    let Some(user) = store.find_user(user_id).await? else {
        return Err(ApiError::not_found("User not found"));
    };
    Ok((StatusCode::OK, Json(UserView::from(user))).into_response())
}
