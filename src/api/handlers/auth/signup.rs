use axum::{
    Json,
    extract::{Extension, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::info;

use super::{password::hash_password_blocking, types::SignupRequest};
use crate::{
    api::{
        error::{ApiError, ErrorBody},
        handlers::{
            MessageResponse, normalize_email, normalize_optional,
            validation::{validate_email, validate_password, validate_username},
        },
    },
    store::{DynStore, NewUser},
};

pub const DEFAULT_PROFILE_PICTURE: &str =
    "https://cdn.pixabay.com/photo/2015/10/05/22/37/blank-profile-picture-973460_1280.png";

#[utoipa::path(
    post,
    path = "/api/auth/signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "User created", body = MessageResponse),
        (status = 400, description = "Missing or invalid field", body = ErrorBody),
        (status = 409, description = "Username or email already in use", body = ErrorBody)
    ),
    tag = "auth"
)]
pub async fn signup(
    store: Extension<DynStore>,
    payload: Result<Json<SignupRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload?;
    let (Some(username), Some(email), Some(password)) = (
        request.username.filter(|username| !username.is_empty()),
        normalize_optional(request.email),
        request.password.filter(|password| !password.is_empty()),
    ) else {
        return Err(ApiError::bad_request("All fields are required"));
    };

    validate_password(&password)?;
    validate_username(&username)?;
    let email = normalize_email(&email);
    validate_email(&email)?;

    let password_hash = hash_password_blocking(password).await?;
    let user = store
        .create_user(NewUser {
            username,
            email,
            password_hash,
            profile_picture: DEFAULT_PROFILE_PICTURE.to_string(),
        })
        .await?;
    info!(user_id = %user.id, "User signed up");

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::ok("Signup successful")),
    )
        .into_response())
}
