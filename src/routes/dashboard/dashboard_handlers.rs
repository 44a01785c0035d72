use actix_web::{web, HttpResponse};
use sqlx::PgPool;

use super::dashboard_models::{
    completion_rate, DashboardStats, PriorityBreakdown, RecentTasksQuery, StatusBreakdown,
    UpcomingQuery,
};
use crate::auth::AuthUser;
use crate::error::AppError;
use crate::models::task::{TaskListItem, TaskPriority, TaskStatus};
use crate::response;

// $1 = caller id, $2 = caller is admin
const ACCESSIBLE: &str = "($2 OR p.owner_id = $1 OR EXISTS (SELECT 1 FROM project_members pm WHERE pm.project_id = p.id AND pm.user_id = $1))";

const TASKS_FROM: &str = "FROM tasks t JOIN projects p ON p.id = t.project_id";

async fn count(pool: &PgPool, sql: String, auth: &AuthUser) -> Result<i64, AppError> {
    let total = sqlx::query_scalar::<_, i64>(&sql)
        .bind(auth.id)
        .bind(auth.is_admin())
        .fetch_one(pool)
        .await?;
    Ok(total)
}

async fn status_rows(pool: &PgPool, auth: &AuthUser) -> Result<Vec<(TaskStatus, i64)>, AppError> {
    let sql = format!("SELECT t.status, COUNT(*) {} WHERE {} GROUP BY t.status", TASKS_FROM, ACCESSIBLE);
    let rows = sqlx::query_as::<_, (TaskStatus, i64)>(&sql)
        .bind(auth.id)
        .bind(auth.is_admin())
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

async fn priority_rows(pool: &PgPool, auth: &AuthUser) -> Result<Vec<(TaskPriority, i64)>, AppError> {
    let sql = format!("SELECT t.priority, COUNT(*) {} WHERE {} GROUP BY t.priority", TASKS_FROM, ACCESSIBLE);
    let rows = sqlx::query_as::<_, (TaskPriority, i64)>(&sql)
        .bind(auth.id)
        .bind(auth.is_admin())
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

async fn unread_notifications(pool: &PgPool, user_id: i32) -> Result<i64, AppError> {
    let unread = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND is_read = FALSE",
    )
    .bind(user_id)
    .fetch_one(pool)
    .await?;
    Ok(unread)
}

/// All counts are issued concurrently.
pub async fn get_stats(
    pool: web::Data<PgPool>,
    auth: AuthUser,
) -> Result<HttpResponse, AppError> {
    let pool = pool.get_ref();

    let (total_projects, status, priority, overdue_tasks, my_open_tasks, completed_this_week, unread) = tokio::try_join!(
        count(pool, format!("SELECT COUNT(*) FROM projects p WHERE {}", ACCESSIBLE), &auth),
        status_rows(pool, &auth),
        priority_rows(pool, &auth),
        count(
            pool,
            format!(
                "SELECT COUNT(*) {} WHERE {} AND t.due_date < NOW() AND t.status <> 'DONE'",
                TASKS_FROM, ACCESSIBLE
            ),
            &auth,
        ),
        count(
            pool,
            format!(
                "SELECT COUNT(*) {} WHERE {} AND t.assignee_id = $1 AND t.status <> 'DONE'",
                TASKS_FROM, ACCESSIBLE
            ),
            &auth,
        ),
        count(
            pool,
            format!(
                "SELECT COUNT(*) {} WHERE {} AND t.status = 'DONE' AND t.updated_at >= NOW() - INTERVAL '7 days'",
                TASKS_FROM, ACCESSIBLE
            ),
            &auth,
        ),
        unread_notifications(pool, auth.id),
    )?;

    let tasks_by_status = StatusBreakdown::from_rows(&status);
    let total_tasks = tasks_by_status.total();
    let stats = DashboardStats {
        total_projects,
        total_tasks,
        completion_rate: completion_rate(tasks_by_status.done, total_tasks),
        tasks_by_status,
        tasks_by_priority: PriorityBreakdown::from_rows(&priority),
        overdue_tasks,
        my_open_tasks,
        completed_this_week,
        unread_notifications: unread,
    };

    Ok(response::ok("Dashboard statistics retrieved", stats))
}

pub async fn recent_tasks(
    pool: web::Data<PgPool>,
    auth: AuthUser,
    query: web::Query<RecentTasksQuery>,
) -> Result<HttpResponse, AppError> {
    let sql = format!(
        "SELECT t.*, p.name AS project_name, a.username AS assignee_username
         {} LEFT JOIN users a ON a.id = t.assignee_id
         WHERE {}
         ORDER BY t.updated_at DESC
         LIMIT $3",
        TASKS_FROM, ACCESSIBLE
    );
    let tasks = sqlx::query_as::<_, TaskListItem>(&sql)
        .bind(auth.id)
        .bind(auth.is_admin())
        .bind(query.limit())
        .fetch_all(pool.get_ref())
        .await?;

    Ok(response::ok("Recent tasks retrieved", tasks))
}

pub async fn upcoming_deadlines(
    pool: web::Data<PgPool>,
    auth: AuthUser,
    query: web::Query<UpcomingQuery>,
) -> Result<HttpResponse, AppError> {
    let tasks = sqlx::query_as::<_, TaskListItem>(
        "SELECT t.*, p.name AS project_name, a.username AS assignee_username
         FROM tasks t
         JOIN projects p ON p.id = t.project_id
         LEFT JOIN users a ON a.id = t.assignee_id
         WHERE t.assignee_id = $1
           AND t.status <> 'DONE'
           AND t.due_date >= NOW()
           AND t.due_date <= NOW() + make_interval(days => $2)
         ORDER BY t.due_date ASC",
    )
    .bind(auth.id)
    .bind(query.days() as i32)
    .fetch_all(pool.get_ref())
    .await?;

    Ok(response::ok("Upcoming deadlines retrieved", tasks))
}
