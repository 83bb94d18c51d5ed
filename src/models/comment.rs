use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::models::user::UserResponse;

/// How long after posting the author may still edit a comment.
pub const EDIT_GRACE_MINUTES: i64 = 15;

/// How long after a soft delete the author may still restore a comment.
pub const RESTORE_GRACE_MINUTES: i64 = 15;

/// Represents the 'comments' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
    /// Set only by an edit.
    pub updated_at: Option<DateTime<Utc>>,
    /// `None` means the comment is visible.
    pub deleted_at: Option<DateTime<Utc>>,
    pub author_id: Uuid,
    /// `None` for a root comment.
    pub parent_id: Option<Uuid>,
}

impl Comment {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub fn is_authored_by(&self, user_id: Uuid) -> bool {
        self.author_id == user_id
    }

    /// True while `now` is no more than the edit grace period past `created_at`.
    pub fn is_editable_at(&self, now: DateTime<Utc>) -> bool {
        within(self.created_at, now, EDIT_GRACE_MINUTES)
    }

    /// True when the comment is soft-deleted and `now` is no more than the
    /// restore grace period past `deleted_at`.
    pub fn is_restorable_at(&self, now: DateTime<Utc>) -> bool {
        self.deleted_at
            .is_some_and(|deleted_at| within(deleted_at, now, RESTORE_GRACE_MINUTES))
    }
}

fn within(anchor: DateTime<Utc>, now: DateTime<Utc>, minutes: i64) -> bool {
    now.signed_duration_since(anchor) <= TimeDelta::minutes(minutes)
}

/// A comment row joined with its author's public columns.
#[derive(Debug, Clone, FromRow)]
pub struct CommentWithAuthor {
    #[sqlx(flatten)]
    pub comment: Comment,
    pub author_username: String,
    pub author_email: String,
    pub author_created_at: DateTime<Utc>,
    pub author_updated_at: DateTime<Utc>,
}

/// DTO for creating a new comment.
#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct CreateCommentRequest {
    #[validate(length(
        min = 1,
        max = 1000,
        message = "Comment must be between 1 and 1000 characters"
    ))]
    pub content: String,

    /// Optional: the ID of the comment being replied to.
    #[serde(rename = "parentId", default)]
    pub parent_id: Option<Uuid>,
}

/// DTO for editing a comment's content.
#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct UpdateCommentRequest {
    #[validate(length(
        min = 1,
        max = 1000,
        message = "Comment must be between 1 and 1000 characters"
    ))]
    pub content: String,
}

/// A comment as returned over HTTP.
///
/// Relations are only present when loaded: `author` on most responses,
/// `parent` on single-comment reads, `children` down to two levels in the forest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentResponse {
    pub id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
    #[serde(rename = "authorId")]
    pub author_id: Uuid,
    #[serde(rename = "parentId")]
    pub parent_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub author: Option<UserResponse>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub parent: Option<Box<CommentResponse>>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub children: Option<Vec<CommentResponse>>,
}

impl From<Comment> for CommentResponse {
    fn from(c: Comment) -> Self {
        Self {
            id: c.id,
            content: c.content,
            created_at: c.created_at,
            updated_at: c.updated_at,
            deleted_at: c.deleted_at,
            author_id: c.author_id,
            parent_id: c.parent_id,
            author: None,
            parent: None,
            children: None,
        }
    }
}

impl From<CommentWithAuthor> for CommentResponse {
    fn from(row: CommentWithAuthor) -> Self {
        let author = UserResponse {
            id: row.comment.author_id,
            username: row.author_username,
            email: row.author_email,
            created_at: row.author_created_at,
            updated_at: row.author_updated_at,
        };
        Self {
            author: Some(author),
            ..Self::from(row.comment)
        }
    }
}
