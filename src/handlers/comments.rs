// src/handlers/comments.rs

use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};

use crate::{
    error::AppError,
    extract::{IdPath, ValidatedJson},
    models::{
        comment::{CreateCommentRequest, UpdateCommentRequest},
        user::User,
    },
    services::comment::CommentService,
    state::AppState,
};

/// Create a comment, or a reply when `parentId` is given.
pub async fn create_comment(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    ValidatedJson(payload): ValidatedJson<CreateCommentRequest>,
) -> Result<impl IntoResponse, AppError> {
    let comment = CommentService::new(&state.pool, state.clock.as_ref())
        .create(&user, payload)
        .await?;

    Ok((StatusCode::CREATED, Json(comment)))
}

/// List the comment forest (live roots, newest first).
pub async fn list_comments(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let forest = CommentService::new(&state.pool, state.clock.as_ref())
        .list_all()
        .await?;

    Ok(Json(forest))
}

/// Get a single live comment with its author, parent and replies.
pub async fn get_comment(
    State(state): State<AppState>,
    IdPath(id): IdPath,
) -> Result<impl IntoResponse, AppError> {
    let comment = CommentService::new(&state.pool, state.clock.as_ref())
        .get_by_id(id)
        .await?;

    Ok(Json(comment))
}

/// Edit a comment.
/// Requires: Author, within the edit grace period.
pub async fn update_comment(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    IdPath(id): IdPath,
    ValidatedJson(payload): ValidatedJson<UpdateCommentRequest>,
) -> Result<impl IntoResponse, AppError> {
    let comment = CommentService::new(&state.pool, state.clock.as_ref())
        .update(id, &payload.content, user.id)
        .await?;

    Ok(Json(comment))
}

/// Delete a comment (Soft Delete).
/// Requires: Author.
pub async fn delete_comment(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    IdPath(id): IdPath,
) -> Result<impl IntoResponse, AppError> {
    CommentService::new(&state.pool, state.clock.as_ref())
        .soft_delete(id, user.id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Restore a soft-deleted comment.
/// Requires: Author, within the restore grace period.
pub async fn restore_comment(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    IdPath(id): IdPath,
) -> Result<impl IntoResponse, AppError> {
    let comment = CommentService::new(&state.pool, state.clock.as_ref())
        .restore(id, user.id)
        .await?;

    Ok(Json(comment))
}
