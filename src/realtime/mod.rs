pub mod hub;
pub mod ws;

pub use hub::{project_room, user_room, RealtimeHub, Revocation, TaskEvent};
