use actix_web::{web, HttpResponse};
use log::info;
use sqlx::PgPool;

use super::notifications_models::{MarkedRead, NotificationListQuery, UnreadCount};
use crate::auth::AuthUser;
use crate::error::AppError;
use crate::models::notification::Notification;
use crate::response::{self, Paginated};

pub async fn list_notifications(
    pool: web::Data<PgPool>,
    auth: AuthUser,
    query: web::Query<NotificationListQuery>,
) -> Result<HttpResponse, AppError> {
    let page = query.page();

    let total = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND (NOT $2 OR is_read = FALSE)",
    )
    .bind(auth.id)
    .bind(query.unread_only)
    .fetch_one(pool.get_ref())
    .await?;

    let notifications = sqlx::query_as::<_, Notification>(
        "SELECT * FROM notifications
         WHERE user_id = $1 AND (NOT $2 OR is_read = FALSE)
         ORDER BY created_at DESC, id DESC
         LIMIT $3 OFFSET $4",
    )
    .bind(auth.id)
    .bind(query.unread_only)
    .bind(page.limit)
    .bind(page.offset())
    .fetch_all(pool.get_ref())
    .await?;

    Ok(response::ok(
        "Notifications retrieved",
        Paginated::new(notifications, page, total),
    ))
}

pub async fn unread_count(
    pool: web::Data<PgPool>,
    auth: AuthUser,
) -> Result<HttpResponse, AppError> {
    let unread_count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND is_read = FALSE",
    )
    .bind(auth.id)
    .fetch_one(pool.get_ref())
    .await?;

    Ok(response::ok("Unread count retrieved", UnreadCount { unread_count }))
}

// Other users' notifications are reported as missing rather than forbidden.
pub async fn mark_read(
    pool: web::Data<PgPool>,
    auth: AuthUser,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let notification = sqlx::query_as::<_, Notification>(
        "UPDATE notifications SET is_read = TRUE WHERE id = $1 AND user_id = $2 RETURNING *",
    )
    .bind(path.into_inner())
    .bind(auth.id)
    .fetch_optional(pool.get_ref())
    .await?
    .ok_or_else(|| AppError::not_found("Notification not found"))?;

    Ok(response::ok("Notification marked as read", notification))
}

pub async fn mark_all_read(
    pool: web::Data<PgPool>,
    auth: AuthUser,
) -> Result<HttpResponse, AppError> {
    let result = sqlx::query(
        "UPDATE notifications SET is_read = TRUE WHERE user_id = $1 AND is_read = FALSE",
    )
    .bind(auth.id)
    .execute(pool.get_ref())
    .await?;

    info!("Marked {} notifications read for user {}", result.rows_affected(), auth.id);
    Ok(response::ok(
        "All notifications marked as read",
        MarkedRead {
            updated: result.rows_affected(),
        },
    ))
}

pub async fn delete_notification(
    pool: web::Data<PgPool>,
    auth: AuthUser,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let result = sqlx::query("DELETE FROM notifications WHERE id = $1 AND user_id = $2")
        .bind(path.into_inner())
        .bind(auth.id)
        .execute(pool.get_ref())
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Notification not found"));
    }
    Ok(response::message("Notification deleted"))
}
