use actix_web::web;

use super::auth::auth_handlers;
use super::dashboard::dashboard_handlers;
use super::health::health_handlers;
use super::notifications::notifications_handlers;
use super::projects::projects_handlers;
use super::tasks::{comment_handlers, dependency_handlers, tasks_handlers};
use super::users::users_handlers;
use crate::realtime::ws;

pub fn health_configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/api/health", web::get().to(health_handlers::health));
}

pub fn auth_configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/auth")
            .route("/register", web::post().to(auth_handlers::register))
            .route("/login", web::post().to(auth_handlers::login))
            .route("/refresh", web::post().to(auth_handlers::refresh))
            .route("/logout", web::post().to(auth_handlers::logout))
            .route("/logout-all", web::post().to(auth_handlers::logout_all))
            .route("/me", web::get().to(auth_handlers::me))
            .route("/change-password", web::put().to(auth_handlers::change_password)),
    );
}

pub fn users_configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/users")
            .route("", web::get().to(users_handlers::list_users))
            .route("/{id}", web::get().to(users_handlers::get_user))
            .route("/{id}", web::put().to(users_handlers::update_user))
            .route("/{id}", web::delete().to(users_handlers::delete_user)),
    );
}

pub fn projects_configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/projects")
            .route("", web::get().to(projects_handlers::list_projects))
            .route("", web::post().to(projects_handlers::create_project))
            .route("/{id}", web::get().to(projects_handlers::get_project))
            .route("/{id}", web::put().to(projects_handlers::update_project))
            .route("/{id}", web::delete().to(projects_handlers::delete_project))
            .route("/{id}/members", web::get().to(projects_handlers::list_members))
            .route("/{id}/members", web::post().to(projects_handlers::add_member))
            .route("/{id}/members/{user_id}", web::delete().to(projects_handlers::remove_member)),
    );
}

pub fn tasks_configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/tasks")
            .route("", web::get().to(tasks_handlers::list_tasks))
            .route("", web::post().to(tasks_handlers::create_task))
            .route("/{id}", web::get().to(tasks_handlers::get_task))
            .route("/{id}", web::put().to(tasks_handlers::update_task))
            .route("/{id}", web::delete().to(tasks_handlers::delete_task))
            .route("/{id}/status", web::patch().to(tasks_handlers::move_task))
            .route("/{id}/dependencies", web::get().to(dependency_handlers::list_dependencies))
            .route("/{id}/dependencies", web::post().to(dependency_handlers::add_dependency))
            .route(
                "/{id}/dependencies/{depends_on_id}",
                web::delete().to(dependency_handlers::remove_dependency),
            )
            .route("/{id}/comments", web::get().to(comment_handlers::list_comments))
            .route("/{id}/comments", web::post().to(comment_handlers::add_comment))
            .route("/{id}/comments/{comment_id}", web::put().to(comment_handlers::update_comment))
            .route("/{id}/comments/{comment_id}", web::delete().to(comment_handlers::delete_comment)),
    );
}

pub fn notifications_configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/notifications")
            .route("", web::get().to(notifications_handlers::list_notifications))
            .route("/unread-count", web::get().to(notifications_handlers::unread_count))
            .route("/read-all", web::patch().to(notifications_handlers::mark_all_read))
            .route("/{id}/read", web::patch().to(notifications_handlers::mark_read))
            .route("/{id}", web::delete().to(notifications_handlers::delete_notification)),
    );
}

pub fn dashboard_configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/dashboard")
            .route("/stats", web::get().to(dashboard_handlers::get_stats))
            .route("/recent-tasks", web::get().to(dashboard_handlers::recent_tasks))
            .route("/upcoming-deadlines", web::get().to(dashboard_handlers::upcoming_deadlines)),
    );
}

pub fn realtime_configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/ws", web::get().to(ws::ws_connect));
}
