use actix_web::{web, HttpResponse};
use log::info;
use sqlx::{PgPool, Postgres, QueryBuilder};

use super::users_models::{UpdateUserRequest, UserListQuery};
use crate::auth::{AdminUser, AuthUser};
use crate::error::AppError;
use crate::models::user::{PublicUser, User};
use crate::response::{self, Paginated};
use crate::validation::ValidJson;

fn push_user_filters(qb: &mut QueryBuilder<'_, Postgres>, query: &UserListQuery) {
    qb.push(" WHERE TRUE");
    if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", search);
        qb.push(" AND (email ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR username ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR first_name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR last_name ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
    if let Some(role) = query.role {
        qb.push(" AND role = ").push_bind(role);
    }
}

pub async fn list_users(
    pool: web::Data<PgPool>,
    _admin: AdminUser,
    query: web::Query<UserListQuery>,
) -> Result<HttpResponse, AppError> {
    let page = query.page();

    let mut count = QueryBuilder::new("SELECT COUNT(*) FROM users");
    push_user_filters(&mut count, &query);
    let total: i64 = count.build_query_scalar().fetch_one(pool.get_ref()).await?;

    let mut select = QueryBuilder::new("SELECT * FROM users");
    push_user_filters(&mut select, &query);
    select
        .push(" ORDER BY created_at DESC LIMIT ")
        .push_bind(page.limit)
        .push(" OFFSET ")
        .push_bind(page.offset());
    let users: Vec<PublicUser> = select
        .build_query_as::<User>()
        .fetch_all(pool.get_ref())
        .await?
        .into_iter()
        .map(PublicUser::from)
        .collect();

    Ok(response::ok(
        "Users retrieved",
        Paginated::new(users, page, total),
    ))
}

pub async fn get_user(
    pool: web::Data<PgPool>,
    auth: AuthUser,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let user_id = path.into_inner();
    if user_id != auth.id && !auth.is_admin() {
        return Err(AppError::forbidden("You can only view your own profile"));
    }

    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool.get_ref())
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    Ok(response::ok("User retrieved", PublicUser::from(user)))
}

pub async fn update_user(
    pool: web::Data<PgPool>,
    auth: AuthUser,
    path: web::Path<i32>,
    request: ValidJson<UpdateUserRequest>,
) -> Result<HttpResponse, AppError> {
    let user_id = path.into_inner();
    let request = request.into_inner();

    if user_id != auth.id && !auth.is_admin() {
        return Err(AppError::forbidden("You can only update your own profile"));
    }
    if request.touches_admin_fields() && !auth.is_admin() {
        return Err(AppError::forbidden("Only administrators can change role or status"));
    }

    let existing = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool.get_ref())
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    let updated = sqlx::query_as::<_, User>(
        "UPDATE users
         SET email = $1, username = $2, first_name = $3, last_name = $4,
             role = $5, is_active = $6, updated_at = NOW()
         WHERE id = $7
         RETURNING *",
    )
    .bind(
        request
            .email
            .map(|email| email.trim().to_lowercase())
            .unwrap_or(existing.email),
    )
    .bind(request.username.unwrap_or(existing.username))
    .bind(request.first_name.or(existing.first_name))
    .bind(request.last_name.or(existing.last_name))
    .bind(request.role.unwrap_or(existing.role))
    .bind(request.is_active.unwrap_or(existing.is_active))
    .bind(user_id)
    .fetch_one(pool.get_ref())
    .await?;

    info!("User {} updated by {}", user_id, auth.id);
    Ok(response::ok("User updated", PublicUser::from(updated)))
}

pub async fn delete_user(
    pool: web::Data<PgPool>,
    admin: AdminUser,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let user_id = path.into_inner();
    if user_id == admin.0.id {
        return Err(AppError::bad_request(
            "CANNOT_DELETE_SELF",
            "You cannot delete your own account",
        ));
    }

    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM refresh_tokens WHERE user_id = $1")
        .bind(user_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM notifications WHERE user_id = $1")
        .bind(user_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM project_members WHERE user_id = $1")
        .bind(user_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("UPDATE tasks SET assignee_id = NULL WHERE assignee_id = $1")
        .bind(user_id)
        .execute(&mut *tx)
        .await?;
    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(user_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| match AppError::from(e) {
            AppError::BadRequest { .. } => AppError::conflict(
                "USER_IN_USE",
                "User still owns projects, tasks or comments",
            ),
            other => other,
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found("User not found"));
    }
    tx.commit().await?;

    info!("User {} deleted by admin {}", user_id, admin.0.id);
    Ok(response::message("User deleted"))
}
