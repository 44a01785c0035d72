use log::warn;
use sqlx::PgPool;

use crate::error::AppError;
use crate::models::notification::{Notification, NotificationType};
use crate::realtime::{user_room, RealtimeHub};

pub struct NewNotification {
    pub user_id: i32,
    pub kind: NotificationType,
    pub title: String,
    pub message: String,
    pub related_task_id: Option<i32>,
    pub related_project_id: Option<i32>,
}

/// Stores a notification and pushes it to the recipient's `user:<id>` room.
pub async fn notify(
    pool: &PgPool,
    hub: &RealtimeHub,
    new: NewNotification,
) -> Result<Notification, AppError> {
    let notification = sqlx::query_as::<_, Notification>(
        "INSERT INTO notifications (user_id, type, title, message, related_task_id, related_project_id)
         VALUES ($1, $2, $3, $4, $5, $6)
         RETURNING *",
    )
    .bind(new.user_id)
    .bind(new.kind)
    .bind(&new.title)
    .bind(&new.message)
    .bind(new.related_task_id)
    .bind(new.related_project_id)
    .fetch_one(pool)
    .await?;

    hub.emit(&user_room(notification.user_id), "notification", &notification);
    Ok(notification)
}

/// Like [`notify`], but a failure only gets logged; the triggering request still succeeds.
pub async fn notify_quietly(pool: &PgPool, hub: &RealtimeHub, new: NewNotification) {
    let user_id = new.user_id;
    if let Err(e) = notify(pool, hub, new).await {
        warn!("Failed to create notification for user {}: {}", user_id, e);
    }
}
