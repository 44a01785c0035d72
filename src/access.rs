//! Project and task access rules shared by the handlers.

use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};

use crate::auth::AuthUser;
use crate::error::AppError;
use crate::models::project::Project;
use crate::models::task::Task;

/// Appends `(is_admin OR owner OR member)` for the project aliased as `alias`.
pub fn push_project_access(qb: &mut QueryBuilder<'_, Postgres>, alias: &str, user: &AuthUser) {
    qb.push("(")
        .push_bind(user.is_admin())
        .push(format!(" OR {}.owner_id = ", alias))
        .push_bind(user.id)
        .push(format!(
            " OR EXISTS (SELECT 1 FROM project_members pm WHERE pm.project_id = {}.id AND pm.user_id = ",
            alias
        ))
        .push_bind(user.id)
        .push("))");
}

pub async fn load_project(pool: &PgPool, project_id: i32) -> Result<Project, AppError> {
    sqlx::query_as::<_, Project>("SELECT * FROM projects WHERE id = $1")
        .bind(project_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found("Project not found"))
}

pub async fn is_member(pool: &PgPool, project_id: i32, user_id: i32) -> Result<bool, AppError> {
    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS (SELECT 1 FROM project_members WHERE project_id = $1 AND user_id = $2)",
    )
    .bind(project_id)
    .bind(user_id)
    .fetch_one(pool)
    .await?;
    Ok(exists)
}

/// Owner, member or admin may read the project and work on its tasks.
pub async fn ensure_project_access(
    pool: &PgPool,
    project_id: i32,
    user: &AuthUser,
) -> Result<Project, AppError> {
    let project = load_project(pool, project_id).await?;
    if user.is_admin() || project.owner_id == user.id || is_member(pool, project.id, user.id).await? {
        Ok(project)
    } else {
        Err(AppError::forbidden("You do not have access to this project"))
    }
}

/// Only the owner or an admin may change the project itself or its membership.
pub fn ensure_project_manager(project: &Project, user: &AuthUser) -> Result<(), AppError> {
    if user.is_admin() || project.owner_id == user.id {
        Ok(())
    } else {
        Err(AppError::forbidden(
            "Only the project owner can perform this action",
        ))
    }
}

pub async fn ensure_assignable(
    pool: &PgPool,
    project: &Project,
    assignee_id: i32,
) -> Result<(), AppError> {
    if project.owner_id == assignee_id || is_member(pool, project.id, assignee_id).await? {
        Ok(())
    } else {
        Err(AppError::bad_request(
            "INVALID_ASSIGNEE",
            "Assignee must be the project owner or a project member",
        ))
    }
}

/// Serialises writers that touch one project's dependency graph or column
/// positions until the surrounding transaction ends.
pub async fn lock_project(conn: &mut PgConnection, project_id: i32) -> Result<(), AppError> {
    sqlx::query("SELECT pg_advisory_xact_lock($1)")
        .bind(i64::from(project_id))
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn load_task(pool: &PgPool, task_id: i32) -> Result<Task, AppError> {
    sqlx::query_as::<_, Task>("SELECT * FROM tasks WHERE id = $1")
        .bind(task_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found("Task not found"))
}

pub async fn load_task_with_access(
    pool: &PgPool,
    task_id: i32,
    user: &AuthUser,
) -> Result<(Task, Project), AppError> {
    let task = load_task(pool, task_id).await?;
    let project = ensure_project_access(pool, task.project_id, user).await?;
    Ok((task, project))
}
