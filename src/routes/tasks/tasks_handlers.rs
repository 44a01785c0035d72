use actix_web::{web, HttpResponse};
use log::info;
use sqlx::{PgExecutor, PgPool, Postgres, QueryBuilder};

use super::tasks_models::{
    CreateTaskRequest, DeletedTask, MoveTaskRequest, TaskDetail, TaskListQuery, UpdateTaskRequest,
};
use crate::access::{self, push_project_access};
use crate::auth::AuthUser;
use crate::error::AppError;
use crate::models::notification::NotificationType;
use crate::models::task::{Task, TaskListItem, TaskPriority, TaskRef, TaskStatus};
use crate::models::user::UserSummary;
use crate::notifier::{notify_quietly, NewNotification};
use crate::realtime::{RealtimeHub, TaskEvent};
use crate::response::{self, Paginated};
use crate::validation::ValidJson;

fn push_task_filters(qb: &mut QueryBuilder<'_, Postgres>, query: &TaskListQuery, user: &AuthUser) {
    qb.push(" WHERE ");
    push_project_access(qb, "p", user);
    if let Some(project_id) = query.project_id {
        qb.push(" AND t.project_id = ").push_bind(project_id);
    }
    if let Some(status) = query.status {
        qb.push(" AND t.status = ").push_bind(status);
    }
    if let Some(priority) = query.priority {
        qb.push(" AND t.priority = ").push_bind(priority);
    }
    if let Some(assignee_id) = query.assignee_id {
        qb.push(" AND t.assignee_id = ").push_bind(assignee_id);
    }
    if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", search);
        qb.push(" AND (t.title ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR t.description ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

/// Next free slot at the bottom of a Kanban column. Callers hold the project
/// lock so two writers cannot claim the same slot.
async fn next_position<'e, E>(executor: E, project_id: i32, status: TaskStatus) -> Result<i32, AppError>
where
    E: PgExecutor<'e>,
{
    let position = sqlx::query_scalar::<_, i32>(
        "SELECT COALESCE(MAX(position) + 1, 0) FROM tasks WHERE project_id = $1 AND status = $2",
    )
    .bind(project_id)
    .bind(status)
    .fetch_one(executor)
    .await?;
    Ok(position)
}

pub(super) async fn task_refs(pool: &PgPool, sql: &str, task_id: i32) -> Result<Vec<TaskRef>, AppError> {
    let refs = sqlx::query_as::<_, TaskRef>(sql)
        .bind(task_id)
        .fetch_all(pool)
        .await?;
    Ok(refs)
}

pub(super) const DEPENDENCIES_SQL: &str = "SELECT t.id, t.title, t.status
     FROM task_dependencies d JOIN tasks t ON t.id = d.depends_on_id
     WHERE d.task_id = $1 ORDER BY t.id";

pub(super) const DEPENDENTS_SQL: &str = "SELECT t.id, t.title, t.status
     FROM task_dependencies d JOIN tasks t ON t.id = d.task_id
     WHERE d.depends_on_id = $1 ORDER BY t.id";

async fn user_summary(pool: &PgPool, user_id: i32) -> Result<Option<UserSummary>, AppError> {
    let summary = sqlx::query_as::<_, UserSummary>(
        "SELECT id, username, email, first_name, last_name FROM users WHERE id = $1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;
    Ok(summary)
}

fn assignment_notice(task: &Task, assignee_id: i32) -> NewNotification {
    NewNotification {
        user_id: assignee_id,
        kind: NotificationType::TaskAssigned,
        title: "New task assigned".into(),
        message: format!("You have been assigned to \"{}\"", task.title),
        related_task_id: Some(task.id),
        related_project_id: Some(task.project_id),
    }
}

pub async fn list_tasks(
    pool: web::Data<PgPool>,
    auth: AuthUser,
    query: web::Query<TaskListQuery>,
) -> Result<HttpResponse, AppError> {
    let page = query.page();

    let mut count =
        QueryBuilder::new("SELECT COUNT(*) FROM tasks t JOIN projects p ON p.id = t.project_id");
    push_task_filters(&mut count, &query, &auth);
    let total: i64 = count.build_query_scalar().fetch_one(pool.get_ref()).await?;

    let mut select = QueryBuilder::new(
        "SELECT t.*, p.name AS project_name, a.username AS assignee_username
         FROM tasks t
         JOIN projects p ON p.id = t.project_id
         LEFT JOIN users a ON a.id = t.assignee_id",
    );
    push_task_filters(&mut select, &query, &auth);
    select
        .push(query.order_by())
        .push(" LIMIT ")
        .push_bind(page.limit)
        .push(" OFFSET ")
        .push_bind(page.offset());
    let tasks = select
        .build_query_as::<TaskListItem>()
        .fetch_all(pool.get_ref())
        .await?;

    Ok(response::ok("Tasks retrieved", Paginated::new(tasks, page, total)))
}

pub async fn create_task(
    pool: web::Data<PgPool>,
    hub: web::Data<RealtimeHub>,
    auth: AuthUser,
    request: ValidJson<CreateTaskRequest>,
) -> Result<HttpResponse, AppError> {
    let request = request.into_inner();
    let project = access::ensure_project_access(pool.get_ref(), request.project_id, &auth).await?;
    if let Some(assignee_id) = request.assignee_id {
        access::ensure_assignable(pool.get_ref(), &project, assignee_id).await?;
    }

    let status = request.status.unwrap_or(TaskStatus::Todo);
    let mut tx = pool.begin().await?;
    access::lock_project(&mut tx, project.id).await?;
    let position = next_position(&mut *tx, project.id, status).await?;

    let task = sqlx::query_as::<_, Task>(
        "INSERT INTO tasks (title, description, status, priority, project_id, assignee_id, creator_id, due_date, position)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
         RETURNING *",
    )
    .bind(request.title.trim())
    .bind(request.description)
    .bind(status)
    .bind(request.priority.unwrap_or(TaskPriority::Medium))
    .bind(project.id)
    .bind(request.assignee_id)
    .bind(auth.id)
    .bind(request.due_date)
    .bind(position)
    .fetch_one(&mut *tx)
    .await?;
    tx.commit().await?;

    info!("Task {} created in project {} by user {}", task.id, project.id, auth.id);
    hub.emit_task_event(task.project_id, TaskEvent::Created, &task);

    if let Some(assignee_id) = task.assignee_id.filter(|&id| id != auth.id) {
        notify_quietly(pool.get_ref(), &hub, assignment_notice(&task, assignee_id)).await;
    }

    Ok(response::created("Task created", task))
}

pub async fn get_task(
    pool: web::Data<PgPool>,
    auth: AuthUser,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let (task, _) = access::load_task_with_access(pool.get_ref(), path.into_inner(), &auth).await?;

    let assignee = match task.assignee_id {
        Some(assignee_id) => user_summary(pool.get_ref(), assignee_id).await?,
        None => None,
    };
    let creator = user_summary(pool.get_ref(), task.creator_id)
        .await?
        .ok_or_else(|| AppError::internal(format!("creator of task {} is missing", task.id)))?;
    let comment_count =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM task_comments WHERE task_id = $1")
            .bind(task.id)
            .fetch_one(pool.get_ref())
            .await?;
    let dependencies = task_refs(pool.get_ref(), DEPENDENCIES_SQL, task.id).await?;
    let dependents = task_refs(pool.get_ref(), DEPENDENTS_SQL, task.id).await?;

    Ok(response::ok(
        "Task retrieved",
        TaskDetail {
            task,
            assignee,
            creator,
            comment_count,
            dependencies,
            dependents,
        },
    ))
}

async fn save_task<'e, E>(executor: E, task: &Task) -> Result<Task, AppError>
where
    E: PgExecutor<'e>,
{
    let saved = sqlx::query_as::<_, Task>(
        "UPDATE tasks
         SET title = $1, description = $2, status = $3, priority = $4, assignee_id = $5,
             due_date = $6, position = $7, updated_at = NOW()
         WHERE id = $8
         RETURNING *",
    )
    .bind(&task.title)
    .bind(&task.description)
    .bind(task.status)
    .bind(task.priority)
    .bind(task.assignee_id)
    .bind(task.due_date)
    .bind(task.position)
    .bind(task.id)
    .fetch_one(executor)
    .await?;
    Ok(saved)
}

pub async fn update_task(
    pool: web::Data<PgPool>,
    hub: web::Data<RealtimeHub>,
    auth: AuthUser,
    path: web::Path<i32>,
    request: ValidJson<UpdateTaskRequest>,
) -> Result<HttpResponse, AppError> {
    let request = request.into_inner();
    let (task, project) = access::load_task_with_access(pool.get_ref(), path.into_inner(), &auth).await?;

    let previous_assignee = task.assignee_id;
    if let Some(assignee_id) = request.new_assignee() {
        if Some(assignee_id) != previous_assignee {
            access::ensure_assignable(pool.get_ref(), &project, assignee_id).await?;
        }
    }

    let appends_to_column = request.position.is_none()
        && request.status.is_some_and(|status| status != task.status);

    let mut tx = pool.begin().await?;
    access::lock_project(&mut tx, task.project_id).await?;
    let mut task = request.apply(task);
    if appends_to_column {
        task.position = next_position(&mut *tx, task.project_id, task.status).await?;
    }
    let updated = save_task(&mut *tx, &task).await?;
    tx.commit().await?;

    info!("Task {} updated by user {}", updated.id, auth.id);
    hub.emit_task_event(updated.project_id, TaskEvent::Updated, &updated);

    if let Some(assignee_id) = updated
        .assignee_id
        .filter(|&id| Some(id) != previous_assignee && id != auth.id)
    {
        notify_quietly(pool.get_ref(), &hub, assignment_notice(&updated, assignee_id)).await;
    }

    Ok(response::ok("Task updated", updated))
}

pub async fn move_task(
    pool: web::Data<PgPool>,
    hub: web::Data<RealtimeHub>,
    auth: AuthUser,
    path: web::Path<i32>,
    request: ValidJson<MoveTaskRequest>,
) -> Result<HttpResponse, AppError> {
    let request = request.into_inner();
    let (mut task, _) = access::load_task_with_access(pool.get_ref(), path.into_inner(), &auth).await?;

    let column_changed = task.status != request.status;
    let mut tx = pool.begin().await?;
    access::lock_project(&mut tx, task.project_id).await?;
    task.position = match request.position {
        Some(position) => position,
        None if column_changed => next_position(&mut *tx, task.project_id, request.status).await?,
        None => task.position,
    };
    task.status = request.status;

    let updated = save_task(&mut *tx, &task).await?;
    tx.commit().await?;

    info!(
        "Task {} moved to {} at position {} by user {}",
        updated.id, updated.status.label(), updated.position, auth.id
    );
    hub.emit_task_event(updated.project_id, TaskEvent::Updated, &updated);

    if let Some(assignee_id) = updated.assignee_id.filter(|&id| id != auth.id && column_changed) {
        notify_quietly(
            pool.get_ref(),
            &hub,
            NewNotification {
                user_id: assignee_id,
                kind: NotificationType::TaskUpdated,
                title: "Task status changed".into(),
                message: format!("\"{}\" moved to {}", updated.title, updated.status.label()),
                related_task_id: Some(updated.id),
                related_project_id: Some(updated.project_id),
            },
        )
        .await;
    }

    Ok(response::ok("Task status updated", updated))
}

/// Deletes comments and dependency rows first, then the task, in one transaction.
pub async fn delete_task(
    pool: web::Data<PgPool>,
    hub: web::Data<RealtimeHub>,
    auth: AuthUser,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let (task, project) = access::load_task_with_access(pool.get_ref(), path.into_inner(), &auth).await?;
    if !(auth.is_admin() || task.creator_id == auth.id || project.owner_id == auth.id) {
        return Err(AppError::forbidden(
            "Only the task creator or project owner can delete this task",
        ));
    }

    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM task_comments WHERE task_id = $1")
        .bind(task.id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM task_dependencies WHERE task_id = $1 OR depends_on_id = $1")
        .bind(task.id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM tasks WHERE id = $1")
        .bind(task.id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    info!("Task {} deleted by user {}", task.id, auth.id);
    let deleted = DeletedTask {
        id: task.id,
        project_id: task.project_id,
    };
    hub.emit_task_event(task.project_id, TaskEvent::Deleted, &deleted);

    Ok(response::ok("Task deleted", deleted))
}
