pub mod comment_handlers;
pub mod dependency_handlers;
pub mod tasks_handlers;
pub mod tasks_models;
