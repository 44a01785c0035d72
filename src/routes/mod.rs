pub mod auth;
pub mod dashboard;
pub mod health;
pub mod notifications;
pub mod projects;
pub mod routes;
pub mod tasks;
pub mod users;
