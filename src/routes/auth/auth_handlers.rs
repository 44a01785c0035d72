use actix_web::{web, HttpResponse};
use chrono::Utc;
use log::{info, warn};
use sqlx::{PgExecutor, PgPool};

use super::auth_models::{
    AuthResponse, ChangePasswordRequest, LoginRequest, RefreshRequest, RegisterRequest, TokenPair,
};
use crate::auth::password::{hash_password, verify_password};
use crate::auth::{AuthUser, TokenService};
use crate::config::Config;
use crate::error::AppError;
use crate::models::refresh_token::RefreshToken;
use crate::models::user::{PublicUser, User};
use crate::response;
use crate::validation::ValidJson;

/// Signs an access token and persists a new refresh token for `user`.
async fn issue_tokens<'e, E>(
    executor: E,
    tokens: &TokenService,
    user: &User,
) -> Result<TokenPair, AppError>
where
    E: PgExecutor<'e>,
{
    let access_token = tokens.issue_access(user.id, &user.email, user.role)?;
    let (refresh_token, expires_at) = tokens.new_refresh_token();

    sqlx::query("INSERT INTO refresh_tokens (token, user_id, expires_at) VALUES ($1, $2, $3)")
        .bind(&refresh_token)
        .bind(user.id)
        .bind(expires_at)
        .execute(executor)
        .await?;

    Ok(TokenPair {
        access_token,
        refresh_token,
        expires_in: tokens.access_ttl_seconds(),
    })
}

async fn load_active_user(pool: &PgPool, user_id: i32) -> Result<User, AppError> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    if !user.is_active {
        return Err(AppError::Forbidden {
            code: "ACCOUNT_DISABLED",
            message: "This account has been disabled".into(),
        });
    }
    Ok(user)
}

// register user to DB
pub async fn register(
    pool: web::Data<PgPool>,
    config: web::Data<Config>,
    tokens: web::Data<TokenService>,
    request: ValidJson<RegisterRequest>,
) -> Result<HttpResponse, AppError> {
    let request = request.into_inner();
    info!("Received request to register user: {}", request.username);

    let password_hash = hash_password(&request.password, config.bcrypt_cost).await?;

    let user = sqlx::query_as::<_, User>(
        "INSERT INTO users (email, username, password_hash, first_name, last_name)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING *",
    )
    .bind(request.email.trim().to_lowercase())
    .bind(request.username.trim())
    .bind(&password_hash)
    .bind(request.first_name.as_deref().map(str::trim))
    .bind(request.last_name.as_deref().map(str::trim))
    .fetch_one(pool.get_ref())
    .await
    .map_err(|e| match AppError::from(e) {
        AppError::Conflict { .. } => {
            AppError::conflict("USER_EXISTS", "Email or username is already registered")
        }
        other => other,
    })?;

    let tokens = issue_tokens(pool.get_ref(), &tokens, &user).await?;

    info!("User {} registered successfully", user.username);
    Ok(response::created(
        "User registered successfully",
        AuthResponse {
            user: user.into(),
            tokens,
        },
    ))
}

// login logic
pub async fn login(
    pool: web::Data<PgPool>,
    tokens: web::Data<TokenService>,
    request: ValidJson<LoginRequest>,
) -> Result<HttpResponse, AppError> {
    let request = request.into_inner();
    let email = request.email.trim().to_lowercase();
    info!("Received login request for user: {}", email);

    let invalid = || AppError::unauthorized("INVALID_CREDENTIALS", "Invalid email or password");

    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
        .bind(&email)
        .fetch_optional(pool.get_ref())
        .await?
        .ok_or_else(|| {
            info!("Unknown email: {}", email);
            invalid()
        })?;

    if !verify_password(&request.password, &user.password_hash).await? {
        info!("Invalid password for user: {}", email);
        return Err(invalid());
    }

    if !user.is_active {
        info!("Login attempt on disabled account: {}", email);
        return Err(AppError::Forbidden {
            code: "ACCOUNT_DISABLED",
            message: "This account has been disabled".into(),
        });
    }

    let tokens = issue_tokens(pool.get_ref(), &tokens, &user).await?;

    info!("User {} logged in successfully", user.username);
    Ok(response::ok(
        "Login successful",
        AuthResponse {
            user: user.into(),
            tokens,
        },
    ))
}

/// Exchanges a refresh token for a new pair. The old row is deleted and the
/// new one inserted in the same transaction.
pub async fn refresh(
    pool: web::Data<PgPool>,
    tokens: web::Data<TokenService>,
    request: ValidJson<RefreshRequest>,
) -> Result<HttpResponse, AppError> {
    let request = request.into_inner();
    let mut tx = pool.begin().await?;

    let stored = sqlx::query_as::<_, RefreshToken>(
        "SELECT * FROM refresh_tokens WHERE token = $1 FOR UPDATE",
    )
    .bind(&request.refresh_token)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| {
        AppError::unauthorized("INVALID_REFRESH_TOKEN", "Refresh token is invalid")
    })?;

    sqlx::query("DELETE FROM refresh_tokens WHERE id = $1")
        .bind(stored.id)
        .execute(&mut *tx)
        .await?;

    if stored.is_expired(Utc::now()) {
        tx.commit().await?;
        info!("Expired refresh token presented by user {}", stored.user_id);
        return Err(AppError::unauthorized(
            "REFRESH_TOKEN_EXPIRED",
            "Refresh token has expired, please log in again",
        ));
    }

    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(stored.user_id)
        .fetch_optional(&mut *tx)
        .await?
        .filter(|user| user.is_active)
        .ok_or_else(|| {
            AppError::unauthorized("INVALID_REFRESH_TOKEN", "Refresh token is invalid")
        })?;

    let pair = issue_tokens(&mut *tx, &tokens, &user).await?;
    tx.commit().await?;

    info!("Refreshed tokens for user {}", user.id);
    Ok(response::ok("Token refreshed", pair))
}

pub async fn logout(
    pool: web::Data<PgPool>,
    auth: AuthUser,
    request: ValidJson<RefreshRequest>,
) -> Result<HttpResponse, AppError> {
    let request = request.into_inner();
    let result = sqlx::query("DELETE FROM refresh_tokens WHERE token = $1 AND user_id = $2")
        .bind(&request.refresh_token)
        .bind(auth.id)
        .execute(pool.get_ref())
        .await?;

    if result.rows_affected() == 0 {
        warn!("Logout for user {} with unknown refresh token", auth.id);
    }
    info!("Logout successful for user {}", auth.id);
    Ok(response::message("Logout successful"))
}

pub async fn logout_all(
    pool: web::Data<PgPool>,
    auth: AuthUser,
) -> Result<HttpResponse, AppError> {
    let result = sqlx::query("DELETE FROM refresh_tokens WHERE user_id = $1")
        .bind(auth.id)
        .execute(pool.get_ref())
        .await?;

    info!(
        "Revoked {} refresh tokens for user {}",
        result.rows_affected(),
        auth.id
    );
    Ok(response::message("Logged out from all sessions"))
}

pub async fn me(pool: web::Data<PgPool>, auth: AuthUser) -> Result<HttpResponse, AppError> {
    let user = load_active_user(pool.get_ref(), auth.id).await?;
    Ok(response::ok("Current user", PublicUser::from(user)))
}

pub async fn change_password(
    pool: web::Data<PgPool>,
    config: web::Data<Config>,
    auth: AuthUser,
    request: ValidJson<ChangePasswordRequest>,
) -> Result<HttpResponse, AppError> {
    let request = request.into_inner();
    let user = load_active_user(pool.get_ref(), auth.id).await?;

    if !verify_password(&request.current_password, &user.password_hash).await? {
        return Err(AppError::bad_request(
            "INVALID_PASSWORD",
            "Current password is incorrect",
        ));
    }

    let password_hash = hash_password(&request.new_password, config.bcrypt_cost).await?;

    let mut tx = pool.begin().await?;
    sqlx::query("UPDATE users SET password_hash = $1, updated_at = NOW() WHERE id = $2")
        .bind(&password_hash)
        .bind(user.id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM refresh_tokens WHERE user_id = $1")
        .bind(user.id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    info!("Password changed for user {}", user.id);
    Ok(response::message("Password changed, please log in again"))
}
