use actix_web::{web, HttpResponse};
use log::info;
use sqlx::PgPool;

use super::tasks_handlers::{task_refs, DEPENDENCIES_SQL, DEPENDENTS_SQL};
use super::tasks_models::{AddDependencyRequest, DependencyList};
use crate::access;
use crate::auth::AuthUser;
use crate::error::AppError;
use crate::graph::DependencyGraph;
use crate::models::task_dependency::TaskDependency;
use crate::response;
use crate::validation::ValidJson;

pub async fn list_dependencies(
    pool: web::Data<PgPool>,
    auth: AuthUser,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let (task, _) = access::load_task_with_access(pool.get_ref(), path.into_inner(), &auth).await?;

    let dependencies = task_refs(pool.get_ref(), DEPENDENCIES_SQL, task.id).await?;
    let dependents = task_refs(pool.get_ref(), DEPENDENTS_SQL, task.id).await?;

    Ok(response::ok(
        "Dependencies retrieved",
        DependencyList {
            dependencies,
            dependents,
        },
    ))
}

/// Adds `task -> depends_on`. The project's graph is loaded and checked under a
/// transaction-scoped advisory lock keyed by project id, so two concurrent
/// inserts cannot both pass the cycle check.
pub async fn add_dependency(
    pool: web::Data<PgPool>,
    auth: AuthUser,
    path: web::Path<i32>,
    request: ValidJson<AddDependencyRequest>,
) -> Result<HttpResponse, AppError> {
    let depends_on_id = request.into_inner().depends_on_id;
    let (task, _) = access::load_task_with_access(pool.get_ref(), path.into_inner(), &auth).await?;

    if task.id == depends_on_id {
        return Err(AppError::bad_request(
            "SELF_DEPENDENCY",
            "A task cannot depend on itself",
        ));
    }

    let blocker = access::load_task(pool.get_ref(), depends_on_id).await?;
    if blocker.project_id != task.project_id {
        return Err(AppError::bad_request(
            "CROSS_PROJECT_DEPENDENCY",
            "Dependencies must stay within one project",
        ));
    }

    let mut tx = pool.begin().await?;
    access::lock_project(&mut tx, task.project_id).await?;

    let edges: Vec<(i32, i32)> = sqlx::query_as(
        "SELECT d.task_id, d.depends_on_id
         FROM task_dependencies d
         JOIN tasks t ON t.id = d.task_id
         WHERE t.project_id = $1",
    )
    .bind(task.project_id)
    .fetch_all(&mut *tx)
    .await?;
    let graph = DependencyGraph::from_edges(edges);

    if graph.has_edge(task.id, depends_on_id) {
        return Err(AppError::conflict(
            "DUPLICATE_DEPENDENCY",
            "This dependency already exists",
        ));
    }
    if graph.would_create_cycle(task.id, depends_on_id) {
        info!(
            "Rejected dependency {} -> {}: would create a cycle",
            task.id, depends_on_id
        );
        return Err(AppError::bad_request(
            "CIRCULAR_DEPENDENCY",
            "Adding this dependency would create a circular dependency",
        ));
    }

    let dependency = sqlx::query_as::<_, TaskDependency>(
        "INSERT INTO task_dependencies (task_id, depends_on_id) VALUES ($1, $2) RETURNING *",
    )
    .bind(task.id)
    .bind(depends_on_id)
    .fetch_one(&mut *tx)
    .await?;
    tx.commit().await?;

    info!("Task {} now depends on task {}", task.id, depends_on_id);
    Ok(response::created("Dependency added", dependency))
}

pub async fn remove_dependency(
    pool: web::Data<PgPool>,
    auth: AuthUser,
    path: web::Path<(i32, i32)>,
) -> Result<HttpResponse, AppError> {
    let (task_id, depends_on_id) = path.into_inner();
    let (task, _) = access::load_task_with_access(pool.get_ref(), task_id, &auth).await?;

    let result = sqlx::query("DELETE FROM task_dependencies WHERE task_id = $1 AND depends_on_id = $2")
        .bind(task.id)
        .bind(depends_on_id)
        .execute(pool.get_ref())
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Dependency not found"));
    }

    info!("Task {} no longer depends on task {}", task.id, depends_on_id);
    Ok(response::message("Dependency removed"))
}
