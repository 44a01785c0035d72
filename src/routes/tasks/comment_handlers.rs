use std::collections::BTreeSet;

use actix_web::{web, HttpResponse};
use log::info;
use sqlx::PgPool;

use super::tasks_models::CommentRequest;
use crate::access;
use crate::auth::AuthUser;
use crate::error::AppError;
use crate::models::notification::NotificationType;
use crate::models::task_comment::{CommentWithAuthor, TaskComment};
use crate::notifier::{notify_quietly, NewNotification};
use crate::realtime::RealtimeHub;
use crate::response;
use crate::validation::ValidJson;

async fn load_comment(pool: &PgPool, task_id: i32, comment_id: i32) -> Result<TaskComment, AppError> {
    sqlx::query_as::<_, TaskComment>("SELECT * FROM task_comments WHERE id = $1 AND task_id = $2")
        .bind(comment_id)
        .bind(task_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found("Comment not found"))
}

pub async fn list_comments(
    pool: web::Data<PgPool>,
    auth: AuthUser,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let (task, _) = access::load_task_with_access(pool.get_ref(), path.into_inner(), &auth).await?;

    let comments = sqlx::query_as::<_, CommentWithAuthor>(
        "SELECT c.*, u.username AS author_username
         FROM task_comments c
         JOIN users u ON u.id = c.author_id
         WHERE c.task_id = $1
         ORDER BY c.created_at",
    )
    .bind(task.id)
    .fetch_all(pool.get_ref())
    .await?;

    Ok(response::ok("Comments retrieved", comments))
}

pub async fn add_comment(
    pool: web::Data<PgPool>,
    hub: web::Data<RealtimeHub>,
    auth: AuthUser,
    path: web::Path<i32>,
    request: ValidJson<CommentRequest>,
) -> Result<HttpResponse, AppError> {
    let content = request.into_inner().content;
    let (task, _) = access::load_task_with_access(pool.get_ref(), path.into_inner(), &auth).await?;

    let comment = sqlx::query_as::<_, TaskComment>(
        "INSERT INTO task_comments (content, task_id, author_id) VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(content.trim())
    .bind(task.id)
    .bind(auth.id)
    .fetch_one(pool.get_ref())
    .await?;

    let recipients: BTreeSet<i32> = task
        .assignee_id
        .into_iter()
        .chain(std::iter::once(task.creator_id))
        .filter(|&id| id != auth.id)
        .collect();
    for user_id in recipients {
        notify_quietly(
            pool.get_ref(),
            &hub,
            NewNotification {
                user_id,
                kind: NotificationType::TaskCommented,
                title: "New comment".into(),
                message: format!("New comment on \"{}\"", task.title),
                related_task_id: Some(task.id),
                related_project_id: Some(task.project_id),
            },
        )
        .await;
    }

    info!("User {} commented on task {}", auth.id, task.id);
    Ok(response::created("Comment added", comment))
}

pub async fn update_comment(
    pool: web::Data<PgPool>,
    auth: AuthUser,
    path: web::Path<(i32, i32)>,
    request: ValidJson<CommentRequest>,
) -> Result<HttpResponse, AppError> {
    let (task_id, comment_id) = path.into_inner();
    let content = request.into_inner().content;
    let (task, _) = access::load_task_with_access(pool.get_ref(), task_id, &auth).await?;
    let comment = load_comment(pool.get_ref(), task.id, comment_id).await?;

    if comment.author_id != auth.id {
        return Err(AppError::forbidden("You can only edit your own comments"));
    }

    let updated = sqlx::query_as::<_, TaskComment>(
        "UPDATE task_comments SET content = $1, updated_at = NOW() WHERE id = $2 RETURNING *",
    )
    .bind(content.trim())
    .bind(comment.id)
    .fetch_one(pool.get_ref())
    .await?;

    Ok(response::ok("Comment updated", updated))
}

pub async fn delete_comment(
    pool: web::Data<PgPool>,
    auth: AuthUser,
    path: web::Path<(i32, i32)>,
) -> Result<HttpResponse, AppError> {
    let (task_id, comment_id) = path.into_inner();
    let (task, _) = access::load_task_with_access(pool.get_ref(), task_id, &auth).await?;
    let comment = load_comment(pool.get_ref(), task.id, comment_id).await?;

    if comment.author_id != auth.id && !auth.is_admin() {
        return Err(AppError::forbidden("You can only delete your own comments"));
    }

    sqlx::query("DELETE FROM task_comments WHERE id = $1")
        .bind(comment.id)
        .execute(pool.get_ref())
        .await?;

    info!("Comment {} on task {} deleted by user {}", comment.id, task.id, auth.id);
    Ok(response::message("Comment deleted"))
}
