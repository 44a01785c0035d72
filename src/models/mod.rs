// src/models/mod.rs

pub mod user;
pub mod project;
pub mod project_member;
pub mod task;
pub mod task_dependency;
pub mod task_comment;
pub mod notification;
pub mod refresh_token;
