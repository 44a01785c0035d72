use actix_web::{web, HttpResponse};
use log::info;
use sqlx::{PgPool, Postgres, QueryBuilder};

use super::projects_models::{
    AddMemberRequest, CreateProjectRequest, ProjectDetail, ProjectListQuery, UpdateProjectRequest,
};
use crate::access::{self, push_project_access};
use crate::auth::AuthUser;
use crate::error::AppError;
use crate::models::notification::NotificationType;
use crate::models::project::{Project, ProjectListItem, ProjectStatus};
use crate::models::project_member::{MemberDetail, ProjectMember};
use crate::models::user::UserSummary;
use crate::notifier::{notify_quietly, NewNotification};
use crate::realtime::RealtimeHub;
use crate::response::{self, Paginated};
use crate::validation::ValidJson;

fn push_project_filters(qb: &mut QueryBuilder<'_, Postgres>, query: &ProjectListQuery, user: &AuthUser) {
    qb.push(" WHERE ");
    push_project_access(qb, "p", user);
    if let Some(status) = query.status {
        qb.push(" AND p.status = ").push_bind(status);
    }
    if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", search);
        qb.push(" AND (p.name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR p.description ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

async fn load_members(pool: &PgPool, project_id: i32) -> Result<Vec<MemberDetail>, AppError> {
    let members = sqlx::query_as::<_, MemberDetail>(
        "SELECT u.id AS user_id, u.username, u.email, u.first_name, u.last_name, pm.role, pm.joined_at
         FROM project_members pm
         JOIN users u ON u.id = pm.user_id
         WHERE pm.project_id = $1
         ORDER BY pm.joined_at",
    )
    .bind(project_id)
    .fetch_all(pool)
    .await?;
    Ok(members)
}

pub async fn list_projects(
    pool: web::Data<PgPool>,
    auth: AuthUser,
    query: web::Query<ProjectListQuery>,
) -> Result<HttpResponse, AppError> {
    let page = query.page();

    let mut count = QueryBuilder::new("SELECT COUNT(*) FROM projects p");
    push_project_filters(&mut count, &query, &auth);
    let total: i64 = count.build_query_scalar().fetch_one(pool.get_ref()).await?;

    let mut select = QueryBuilder::new(
        "SELECT p.*, u.username AS owner_username,
                (SELECT COUNT(*) FROM tasks t WHERE t.project_id = p.id) AS task_count,
                (SELECT COUNT(*) FROM project_members m WHERE m.project_id = p.id) AS member_count
         FROM projects p
         JOIN users u ON u.id = p.owner_id",
    );
    push_project_filters(&mut select, &query, &auth);
    select
        .push(" ORDER BY p.updated_at DESC LIMIT ")
        .push_bind(page.limit)
        .push(" OFFSET ")
        .push_bind(page.offset());
    let projects = select
        .build_query_as::<ProjectListItem>()
        .fetch_all(pool.get_ref())
        .await?;

    Ok(response::ok(
        "Projects retrieved",
        Paginated::new(projects, page, total),
    ))
}

pub async fn create_project(
    pool: web::Data<PgPool>,
    auth: AuthUser,
    request: ValidJson<CreateProjectRequest>,
) -> Result<HttpResponse, AppError> {
    let request = request.into_inner();
    info!("User {} creating project {}", auth.id, request.name);

    let project = sqlx::query_as::<_, Project>(
        "INSERT INTO projects (name, description, status, owner_id, start_date, end_date)
         VALUES ($1, $2, $3, $4, $5, $6)
         RETURNING *",
    )
    .bind(request.name.trim())
    .bind(request.description)
    .bind(request.status.unwrap_or(ProjectStatus::Active))
    .bind(auth.id)
    .bind(request.start_date)
    .bind(request.end_date)
    .fetch_one(pool.get_ref())
    .await?;

    Ok(response::created("Project created", project))
}

pub async fn get_project(
    pool: web::Data<PgPool>,
    auth: AuthUser,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let project = access::ensure_project_access(pool.get_ref(), path.into_inner(), &auth).await?;

    let owner = sqlx::query_as::<_, UserSummary>(
        "SELECT id, username, email, first_name, last_name FROM users WHERE id = $1",
    )
    .bind(project.owner_id)
    .fetch_one(pool.get_ref())
    .await?;
    let members = load_members(pool.get_ref(), project.id).await?;

    Ok(response::ok(
        "Project retrieved",
        ProjectDetail {
            project,
            owner,
            members,
        },
    ))
}

pub async fn update_project(
    pool: web::Data<PgPool>,
    auth: AuthUser,
    path: web::Path<i32>,
    request: ValidJson<UpdateProjectRequest>,
) -> Result<HttpResponse, AppError> {
    let project = access::load_project(pool.get_ref(), path.into_inner()).await?;
    access::ensure_project_manager(&project, &auth)?;

    let project = request.into_inner().apply(project)?;
    let updated = sqlx::query_as::<_, Project>(
        "UPDATE projects
         SET name = $1, description = $2, status = $3, start_date = $4, end_date = $5, updated_at = NOW()
         WHERE id = $6
         RETURNING *",
    )
    .bind(&project.name)
    .bind(&project.description)
    .bind(project.status)
    .bind(project.start_date)
    .bind(project.end_date)
    .bind(project.id)
    .fetch_one(pool.get_ref())
    .await?;

    info!("Project {} updated by user {}", updated.id, auth.id);
    Ok(response::ok("Project updated", updated))
}

/// Removes the project with its tasks, their comments and dependency rows,
/// and its memberships, in one transaction.
pub async fn delete_project(
    pool: web::Data<PgPool>,
    auth: AuthUser,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let project = access::load_project(pool.get_ref(), path.into_inner()).await?;
    access::ensure_project_manager(&project, &auth)?;

    let mut tx = pool.begin().await?;
    sqlx::query(
        "DELETE FROM task_comments WHERE task_id IN (SELECT id FROM tasks WHERE project_id = $1)",
    )
    .bind(project.id)
    .execute(&mut *tx)
    .await?;
    sqlx::query(
        "DELETE FROM task_dependencies
         WHERE task_id IN (SELECT id FROM tasks WHERE project_id = $1)
            OR depends_on_id IN (SELECT id FROM tasks WHERE project_id = $1)",
    )
    .bind(project.id)
    .execute(&mut *tx)
    .await?;
    sqlx::query("DELETE FROM tasks WHERE project_id = $1")
        .bind(project.id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM project_members WHERE project_id = $1")
        .bind(project.id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM projects WHERE id = $1")
        .bind(project.id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    info!("Project {} deleted by user {}", project.id, auth.id);
    Ok(response::message("Project deleted"))
}

pub async fn list_members(
    pool: web::Data<PgPool>,
    auth: AuthUser,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let project = access::ensure_project_access(pool.get_ref(), path.into_inner(), &auth).await?;
    let members = load_members(pool.get_ref(), project.id).await?;
    Ok(response::ok("Members retrieved", members))
}

pub async fn add_member(
    pool: web::Data<PgPool>,
    hub: web::Data<RealtimeHub>,
    auth: AuthUser,
    path: web::Path<i32>,
    request: ValidJson<AddMemberRequest>,
) -> Result<HttpResponse, AppError> {
    let request = request.into_inner();
    let project = access::load_project(pool.get_ref(), path.into_inner()).await?;
    access::ensure_project_manager(&project, &auth)?;

    if request.user_id == project.owner_id {
        return Err(AppError::bad_request(
            "OWNER_CANNOT_BE_MEMBER",
            "The project owner is already part of the project",
        ));
    }

    let member = sqlx::query_as::<_, ProjectMember>(
        "INSERT INTO project_members (project_id, user_id, role)
         VALUES ($1, $2, $3)
         RETURNING *",
    )
    .bind(project.id)
    .bind(request.user_id)
    .bind(request.role.as_deref().map(str::trim).unwrap_or("member"))
    .fetch_one(pool.get_ref())
    .await
    .map_err(|e| match AppError::from(e) {
        AppError::Conflict { .. } => {
            AppError::conflict("ALREADY_MEMBER", "User is already a member of this project")
        }
        AppError::BadRequest { .. } => AppError::not_found("User not found"),
        other => other,
    })?;

    notify_quietly(
        pool.get_ref(),
        &hub,
        NewNotification {
            user_id: member.user_id,
            kind: NotificationType::ProjectInvite,
            title: "Added to project".into(),
            message: format!("You were added to project \"{}\"", project.name),
            related_task_id: None,
            related_project_id: Some(project.id),
        },
    )
    .await;

    info!("User {} added to project {}", member.user_id, project.id);
    Ok(response::created("Member added", member))
}

/// Removing a member also unassigns their tasks in the project and closes
/// their live subscription to the project room.
pub async fn remove_member(
    pool: web::Data<PgPool>,
    hub: web::Data<RealtimeHub>,
    auth: AuthUser,
    path: web::Path<(i32, i32)>,
) -> Result<HttpResponse, AppError> {
    let (project_id, user_id) = path.into_inner();
    let project = access::load_project(pool.get_ref(), project_id).await?;
    access::ensure_project_manager(&project, &auth)?;

    let mut tx = pool.begin().await?;
    let result = sqlx::query("DELETE FROM project_members WHERE project_id = $1 AND user_id = $2")
        .bind(project.id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Member not found"));
    }
    sqlx::query("UPDATE tasks SET assignee_id = NULL, updated_at = NOW() WHERE project_id = $1 AND assignee_id = $2")
        .bind(project.id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    hub.revoke_project_access(user_id, project.id);

    info!("User {} removed from project {}", user_id, project.id);
    Ok(response::message("Member removed"))
}
