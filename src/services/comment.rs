// src/services/comment.rs

use std::collections::HashMap;

use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{
        comment::{
            Comment, CommentResponse, CommentWithAuthor, CreateCommentRequest,
            EDIT_GRACE_MINUTES, RESTORE_GRACE_MINUTES,
        },
        user::User,
    },
    utils::clock::Clock,
};

const COMMENT_COLUMNS: &str =
    "id, content, created_at, updated_at, deleted_at, author_id, parent_id";

const SELECT_WITH_AUTHOR: &str = r#"
    SELECT
        c.id, c.content, c.created_at, c.updated_at, c.deleted_at,
        c.author_id, c.parent_id,
        u.username AS author_username,
        u.email AS author_email,
        u.created_at AS author_created_at,
        u.updated_at AS author_updated_at
    FROM comments c
    JOIN users u ON u.id = c.author_id
"#;

const MAX_CONTENT_CHARS: usize = 1000;

/// Threaded comments with soft delete and time-boxed edit/restore.
///
/// Every guarded operation checks, in order: existence, ownership, state,
/// then the grace window.
pub struct CommentService<'a> {
    pool: &'a SqlitePool,
    clock: &'a dyn Clock,
}

impl<'a> CommentService<'a> {
    pub fn new(pool: &'a SqlitePool, clock: &'a dyn Clock) -> Self {
        Self { pool, clock }
    }

    /// Posts a root comment, or a reply when `parent_id` names a live comment.
    pub async fn create(
        &self,
        author: &User,
        payload: CreateCommentRequest,
    ) -> Result<CommentResponse, AppError> {
        check_content(&payload.content)?;

        let mut tx = self.pool.begin().await?;

        let parent = match payload.parent_id {
            Some(pid) => {
                let sql =
                    format!("SELECT {COMMENT_COLUMNS} FROM comments WHERE id = ? AND deleted_at IS NULL");
                let parent = sqlx::query_as::<_, Comment>(&sql)
                    .bind(pid)
                    .fetch_optional(&mut *tx)
                    .await?
                    .ok_or_else(|| {
                        AppError::NotFound("Parent comment not found or already deleted".to_string())
                    })?;
                Some(parent)
            }
            None => None,
        };

        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO comments (id, content, created_at, author_id, parent_id) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(&payload.content)
        .bind(self.clock.now())
        .bind(author.id)
        .bind(payload.parent_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            tracing::error!("Failed to create comment: {:?}", e);
            AppError::from(e)
        })?;

        tx.commit().await?;

        tracing::info!(
            comment_id = %id,
            author_id = %author.id,
            parent_id = ?payload.parent_id,
            "Comment created"
        );

        let mut created = self.load_with_author(id).await?;
        created.parent = parent.map(|p| Box::new(CommentResponse::from(p)));
        Ok(created)
    }

    /// The visible forest: live roots newest first, each with live children
    /// and live grandchildren oldest first. Loading stops at grandchildren.
    pub async fn list_all(&self) -> Result<Vec<CommentResponse>, AppError> {
        let sql = format!(
            "{SELECT_WITH_AUTHOR} WHERE c.parent_id IS NULL AND c.deleted_at IS NULL \
             ORDER BY c.created_at DESC, c.rowid DESC"
        );
        let roots = sqlx::query_as::<_, CommentWithAuthor>(&sql)
            .fetch_all(self.pool)
            .await?;

        let root_ids: Vec<Uuid> = roots.iter().map(|r| r.comment.id).collect();
        let children = self.live_children_of(&root_ids).await?;

        let child_ids: Vec<Uuid> = children.iter().map(|r| r.comment.id).collect();
        let grandchildren = self.live_children_of(&child_ids).await?;

        let mut grandchildren_by_parent =
            group_by_parent(grandchildren.into_iter().map(CommentResponse::from));

        let mut children_by_parent = group_by_parent(children.into_iter().map(|row| {
            let mut child = CommentResponse::from(row);
            child.children = Some(grandchildren_by_parent.remove(&child.id).unwrap_or_default());
            child
        }));

        Ok(roots
            .into_iter()
            .map(|row| {
                let mut root = CommentResponse::from(row);
                root.children = Some(children_by_parent.remove(&root.id).unwrap_or_default());
                root
            })
            .collect())
    }

    /// One live comment with its author, its parent and its live direct replies.
    pub async fn get_by_id(&self, id: Uuid) -> Result<CommentResponse, AppError> {
        let sql = format!("{SELECT_WITH_AUTHOR} WHERE c.id = ? AND c.deleted_at IS NULL");
        let row = sqlx::query_as::<_, CommentWithAuthor>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Comment not found or deleted".to_string()))?;

        let parent = match row.comment.parent_id {
            Some(pid) => self.find(pid, false).await?,
            None => None,
        };
        let children = self.live_children_of(&[id]).await?;

        let mut comment = CommentResponse::from(row);
        comment.parent = parent.map(|p| Box::new(CommentResponse::from(p)));
        comment.children = Some(children.into_iter().map(CommentResponse::from).collect());
        Ok(comment)
    }

    /// Replaces the content of the requester's own comment while it is still
    /// inside the edit grace period.
    pub async fn update(
        &self,
        id: Uuid,
        content: &str,
        requester_id: Uuid,
    ) -> Result<CommentResponse, AppError> {
        let comment = self
            .find(id, true)
            .await?
            .ok_or_else(|| AppError::NotFound("Comment not found or deleted".to_string()))?;

        if !comment.is_authored_by(requester_id) {
            tracing::warn!(comment_id = %id, requester_id = %requester_id, "Edit rejected: not the author");
            return Err(AppError::Forbidden(
                "You are not authorized to edit this comment".to_string(),
            ));
        }

        let now = self.clock.now();
        if !comment.is_editable_at(now) {
            tracing::warn!(comment_id = %id, "Edit rejected: grace period over");
            return Err(AppError::Forbidden(format!(
                "Comments can only be edited within {EDIT_GRACE_MINUTES} minutes of posting"
            )));
        }

        check_content(content)?;

        sqlx::query("UPDATE comments SET content = ?, updated_at = ? WHERE id = ?")
            .bind(content)
            .bind(now)
            .bind(id)
            .execute(self.pool)
            .await?;

        tracing::info!(comment_id = %id, "Comment edited");
        self.load_with_author(id).await
    }

    /// Marks the requester's own live comment as deleted.
    pub async fn soft_delete(&self, id: Uuid, requester_id: Uuid) -> Result<(), AppError> {
        let comment = self
            .find(id, true)
            .await?
            .ok_or_else(|| AppError::NotFound("Comment not found or already deleted".to_string()))?;

        if !comment.is_authored_by(requester_id) {
            tracing::warn!(comment_id = %id, requester_id = %requester_id, "Delete rejected: not the author");
            return Err(AppError::Forbidden(
                "You are not authorized to delete this comment".to_string(),
            ));
        }

        sqlx::query("UPDATE comments SET deleted_at = ? WHERE id = ?")
            .bind(self.clock.now())
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to delete comment: {:?}", e);
                AppError::from(e)
            })?;

        tracing::info!(comment_id = %id, "Comment soft-deleted");
        Ok(())
    }

    /// Undoes a soft delete by the author within the restore grace period.
    pub async fn restore(&self, id: Uuid, requester_id: Uuid) -> Result<CommentResponse, AppError> {
        let comment = self
            .find(id, false)
            .await?
            .ok_or_else(|| AppError::NotFound("Comment not found".to_string()))?;

        if !comment.is_authored_by(requester_id) {
            tracing::warn!(comment_id = %id, requester_id = %requester_id, "Restore rejected: not the author");
            return Err(AppError::Forbidden(
                "You are not authorized to restore this comment".to_string(),
            ));
        }

        if !comment.is_deleted() {
            return Err(AppError::BadRequest("Comment is not soft-deleted".to_string()));
        }

        if !comment.is_restorable_at(self.clock.now()) {
            tracing::warn!(comment_id = %id, "Restore rejected: grace period over");
            return Err(AppError::Forbidden(format!(
                "Comments can only be restored within {RESTORE_GRACE_MINUTES} minutes of deletion"
            )));
        }

        sqlx::query("UPDATE comments SET deleted_at = NULL WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;

        tracing::info!(comment_id = %id, "Comment restored");
        self.load_with_author(id).await
    }

    /// Plain row lookup; `live_only` hides soft-deleted comments.
    async fn find(&self, id: Uuid, live_only: bool) -> Result<Option<Comment>, AppError> {
        let filter = if live_only { " AND deleted_at IS NULL" } else { "" };
        let sql = format!("SELECT {COMMENT_COLUMNS} FROM comments WHERE id = ?{filter}");
        let comment = sqlx::query_as::<_, Comment>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(comment)
    }

    /// Row just written by this service, with its author attached.
    async fn load_with_author(&self, id: Uuid) -> Result<CommentResponse, AppError> {
        let sql = format!("{SELECT_WITH_AUTHOR} WHERE c.id = ?");
        let row = sqlx::query_as::<_, CommentWithAuthor>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| AppError::InternalServerError(format!("Comment {id} vanished after write")))?;
        Ok(row.into())
    }

    /// Live replies to any of `parent_ids`, oldest first.
    async fn live_children_of(&self, parent_ids: &[Uuid]) -> Result<Vec<CommentWithAuthor>, AppError> {
        if parent_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(SELECT_WITH_AUTHOR);
        builder.push(" WHERE c.deleted_at IS NULL AND c.parent_id IN (");
        let mut separated = builder.separated(", ");
        for id in parent_ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");
        builder.push(" ORDER BY c.created_at ASC, c.rowid ASC");

        let rows = builder
            .build_query_as::<CommentWithAuthor>()
            .fetch_all(self.pool)
            .await?;
        Ok(rows)
    }
}

/// Buckets comments under their parent id, keeping input order within each bucket.
fn group_by_parent(
    comments: impl IntoIterator<Item = CommentResponse>,
) -> HashMap<Uuid, Vec<CommentResponse>> {
    let mut grouped: HashMap<Uuid, Vec<CommentResponse>> = HashMap::new();
    for comment in comments {
        if let Some(parent_id) = comment.parent_id {
            grouped.entry(parent_id).or_default().push(comment);
        }
    }
    grouped
}

/// Content is stored exactly as submitted; only its length is checked.
fn check_content(content: &str) -> Result<(), AppError> {
    if content.is_empty() {
        return Err(AppError::BadRequest(
            "Comment content cannot be empty".to_string(),
        ));
    }
    if content.chars().count() > MAX_CONTENT_CHARS {
        return Err(AppError::BadRequest(format!(
            "Comment cannot exceed {MAX_CONTENT_CHARS} characters"
        )));
    }
    Ok(())
}
