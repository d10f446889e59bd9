//! Comment endpoints.
//!
//! Reading a post's comments is public; everything else needs a session.
//! Editing and deleting are allowed to the author or an admin.

pub mod types;

use axum::{
    Json,
    extract::{Extension, Path, Query, rejection::JsonRejection},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use self::types::{CommentView, CommentsPage, CreateCommentRequest, EditCommentRequest};
use super::{
    ListQuery, MessageResponse,
    auth::{AuthState, require_auth},
    month_ago, parse_id,
    validation::comment_content,
};
use crate::{
    api::error::{ApiError, ErrorBody},
    store::{DynStore, NewComment},
};

#[utoipa::path(
    post,
    path = "/api/comment/create",
    request_body = CreateCommentRequest,
    responses(
        (status = 201, description = "Comment created", body = CommentView),
        (status = 400, description = "Invalid content or post id", body = ErrorBody),
        (status = 401, description = "Not signed in", body = ErrorBody),
        (status = 403, description = "userId is not the caller", body = ErrorBody)
    ),
    tag = "comment"
)]
pub async fn create_comment(
    headers: HeaderMap,
    store: Extension<DynStore>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Result<Json<CreateCommentRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let principal = require_auth(&headers, &auth_state)?;
    let Json(request) = payload?;

    let author = request
        .user_id
        .as_deref()
        .and_then(|id| Uuid::parse_str(id.trim()).ok());
    if author != Some(principal.user_id) {
        return Err(ApiError::forbidden(
            "You are not allowed to create this comment",
        ));
    }
    let content = comment_content(request.content.as_deref().unwrap_or_default())?;
    let post_id = parse_id(request.post_id.as_deref().unwrap_or_default(), "Invalid post id")?;

    let comment = store
        .create_comment(NewComment {
            post_id,
            user_id: principal.user_id,
            content,
        })
        .await?;
    info!(comment_id = %comment.id, %post_id, "Comment created");

    Ok((StatusCode::CREATED, Json(CommentView::from(comment))).into_response())
}

#[utoipa::path(
    get,
    path = "/api/comment/getPostComments/{postId}",
    params(("postId" = String, Path, description = "Post id")),
    responses(
        (status = 200, description = "Comments on the post, newest first", body = [CommentView]),
        (status = 400, description = "Malformed post id", body = ErrorBody)
    ),
    tag = "comment"
)]
pub async fn post_comments(
    Path(post_id): Path<String>,
    store: Extension<DynStore>,
) -> Result<Response, ApiError> {
    let post_id = parse_id(&post_id, "Invalid post id")?;
    let comments: Vec<CommentView> = store
        .post_comments(post_id)
        .await?
        .into_iter()
        .map(CommentView::from)
        .collect();
    Ok((StatusCode::OK, Json(comments)).into_response())
}

#[utoipa::path(
    put,
    path = "/api/comment/likeComments/{commentId}",
    params(("commentId" = String, Path, description = "Comment id")),
    responses(
        (status = 200, description = "Like toggled", body = CommentView),
        (status = 400, description = "Malformed comment id", body = ErrorBody),
        (status = 401, description = "Not signed in", body = ErrorBody),
        (status = 404, description = "Comment not found", body = ErrorBody)
    ),
    tag = "comment"
)]
pub async fn like_comment(
    Path(comment_id): Path<String>,
    headers: HeaderMap,
    store: Extension<DynStore>,
    auth_state: Extension<Arc<AuthState>>,
) -> Result<Response, ApiError> {
    let principal = require_auth(&headers, &auth_state)?;
    let comment_id = parse_id(&comment_id, "Invalid comment id")?;
    let Some(comment) = store
        .toggle_comment_like(comment_id, principal.user_id)
        .await?
    else {
        return Err(ApiError::not_found("Comment not found"));
    };
    Ok((StatusCode::OK, Json(CommentView::from(comment))).into_response())
}

#[utoipa::path(
    put,
    path = "/api/comment/editComment/{commentId}",
    params(("commentId" = String, Path, description = "Comment id")),
    request_body = EditCommentRequest,
    responses(
        (status = 200, description = "Comment edited", body = CommentView),
        (status = 400, description = "Invalid content or comment id", body = ErrorBody),
        (status = 401, description = "Not signed in", body = ErrorBody),
        (status = 403, description = "Neither author nor admin", body = ErrorBody),
        (status = 404, description = "Comment not found", body = ErrorBody)
    ),
    tag = "comment"
)]
pub async fn edit_comment(
    Path(comment_id): Path<String>,
    headers: HeaderMap,
    store: Extension<DynStore>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Result<Json<EditCommentRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let principal = require_auth(&headers, &auth_state)?;
    let comment_id = parse_id(&comment_id, "Invalid comment id")?;
    let Json(request) = payload?;

    let Some(existing) = store.find_comment(comment_id).await? else {
        return Err(ApiError::not_found("Comment not found"));
    };
    if !principal.owns_or_admin(existing.user_id) {
        return Err(ApiError::forbidden(
            "You are not allowed to edit this comment",
        ));
    }
    let content = comment_content(request.content.as_deref().unwrap_or_default())?;

    let Some(comment) = store.update_comment_content(comment_id, content).await? else {
        return Err(ApiError::not_found("Comment not found"));
    };
    Ok((StatusCode::OK, Json(CommentView::from(comment))).into_response())
}

#[utoipa::path(
    delete,
    path = "/api/comment/deleteComment/{commentId}",
    params(("commentId" = String, Path, description = "Comment id")),
    responses(
        (status = 200, description = "Comment deleted", body = MessageResponse),
        (status = 400, description = "Malformed comment id", body = ErrorBody),
        (status = 401, description = "Not signed in", body = ErrorBody),
        (status = 403, description = "Neither author nor admin", body = ErrorBody),
        (status = 404, description = "Comment not found", body = ErrorBody)
    ),
    tag = "comment"
)]
pub async fn delete_comment(
    Path(comment_id): Path<String>,
    headers: HeaderMap,
    store: Extension<DynStore>,
    auth_state: Extension<Arc<AuthState>>,
) -> Result<Response, ApiError> {
    let principal = require_auth(&headers, &auth_state)?;
    let comment_id = parse_id(&comment_id, "Invalid comment id")?;

    let Some(existing) = store.find_comment(comment_id).await? else {
        return Err(ApiError::not_found("Comment not found"));
    };
    if !principal.owns_or_admin(existing.user_id) {
        return Err(ApiError::forbidden(
            "You are not allowed to delete this comment",
        ));
    }
    if !store.delete_comment(comment_id).await? {
        return Err(ApiError::not_found("Comment not found"));
    }
    info!(%comment_id, deleted_by = %principal.user_id, "Comment deleted");

    Ok((
        StatusCode::OK,
        Json(MessageResponse::ok("Comment has been deleted")),
    )
        .into_response())
}

#[utoipa::path(
    get,
    path = "/api/comment/getComments",
    params(ListQuery),
    responses(
        (status = 200, description = "Page of comments with counts", body = CommentsPage),
        (status = 401, description = "Not signed in", body = ErrorBody),
        (status = 403, description = "Caller is not an admin", body = ErrorBody)
    ),
    tag = "comment"
)]
pub async fn list_comments(
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
    store: Extension<DynStore>,
    auth_state: Extension<Arc<AuthState>>,
) -> Result<Response, ApiError> {
    let principal = require_auth(&headers, &auth_state)?;
    if !principal.is_admin {
        return Err(ApiError::forbidden(
            "You are not allowed to get all comments",
        ));
    }

    let comments = store.list_comments(query.page()).await?;
    let total_comments = store.count_comments(None).await?;
    let last_month_comments = store.count_comments(Some(month_ago(Utc::now()))).await?;

    let body = CommentsPage {
        success: true,
        message: "Comments fetched successfully".to_string(),
        comments: comments.into_iter().map(CommentView::from).collect(),
        total_comments,
        last_month_comments,
    };
    Ok((StatusCode::OK, Json(body)).into_response())
}
