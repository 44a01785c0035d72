use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use log::{debug, warn};
use serde::Serialize;
use tokio::sync::broadcast;

pub const DEFAULT_ROOM_CAPACITY: usize = 64;

pub fn project_room(project_id: i32) -> String {
    format!("project:{}", project_id)
}

pub fn user_room(user_id: i32) -> String {
    format!("user:{}", user_id)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskEvent {
    Created,
    Updated,
    Deleted,
}

impl TaskEvent {
    pub fn name(self) -> &'static str {
        match self {
            TaskEvent::Created => "taskCreated",
            TaskEvent::Updated => "taskUpdated",
            TaskEvent::Deleted => "taskDeleted",
        }
    }
}

#[derive(Serialize)]
struct Frame<'a, T: Serialize> {
    event: &'a str,
    data: &'a T,
}

pub fn encode_frame<T: Serialize>(event: &str, data: &T) -> Option<Arc<str>> {
    match serde_json::to_string(&Frame { event, data }) {
        Ok(text) => Some(Arc::from(text)),
        Err(e) => {
            warn!("Failed to encode {} frame: {}", event, e);
            None
        }
    }
}

/// A user lost access to a project; open sessions of that user leave its room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Revocation {
    pub user_id: i32,
    pub project_id: i32,
}

/// Room-scoped broadcast fan-out. Frames are dropped for rooms with no
/// listeners and for receivers that lag behind the channel capacity.
pub struct RealtimeHub {
    rooms: Mutex<HashMap<String, broadcast::Sender<Arc<str>>>>,
    revocations: broadcast::Sender<Revocation>,
    capacity: usize,
}

impl Default for RealtimeHub {
    fn default() -> Self {
        RealtimeHub::new(DEFAULT_ROOM_CAPACITY)
    }
}

impl RealtimeHub {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        RealtimeHub {
            rooms: Mutex::new(HashMap::new()),
            revocations: broadcast::channel(capacity).0,
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn rooms(&self) -> MutexGuard<'_, HashMap<String, broadcast::Sender<Arc<str>>>> {
        self.rooms.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn subscribe(&self, room: &str) -> broadcast::Receiver<Arc<str>> {
        let mut rooms = self.rooms();
        match rooms.get(room) {
            Some(sender) => sender.subscribe(),
            None => {
                let (sender, receiver) = broadcast::channel(self.capacity);
                rooms.insert(room.to_string(), sender);
                receiver
            }
        }
    }

    /// Sends `{event, data}` to every listener in `room`; returns how many received it.
    pub fn emit<T: Serialize>(&self, room: &str, event: &str, data: &T) -> usize {
        let Some(frame) = encode_frame(event, data) else {
            return 0;
        };

        let mut rooms = self.rooms();
        let delivered = match rooms.get(room) {
            Some(sender) => sender.send(frame).unwrap_or(0),
            None => 0,
        };
        if delivered == 0 {
            rooms.remove(room);
        }
        debug!("Emitted {} to {} ({} listeners)", event, room, delivered);
        delivered
    }

    pub fn emit_task_event<T: Serialize>(&self, project_id: i32, event: TaskEvent, data: &T) -> usize {
        self.emit(&project_room(project_id), event.name(), data)
    }

    pub fn revocations(&self) -> broadcast::Receiver<Revocation> {
        self.revocations.subscribe()
    }

    /// Tells every open session of `user_id` to stop listening to the project room.
    pub fn revoke_project_access(&self, user_id: i32, project_id: i32) -> usize {
        let revocation = Revocation {
            user_id,
            project_id,
        };
        self.revocations.send(revocation).unwrap_or(0)
    }

    /// Drops rooms whose listeners have all gone away.
    pub fn prune(&self) {
        self.rooms().retain(|_, sender| sender.receiver_count() > 0);
    }

    pub fn room_count(&self) -> usize {
        self.rooms().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn decode(frame: Arc<str>) -> Value {
        serde_json::from_str(&frame).unwrap()
    }

    #[tokio::test]
    async fn listeners_in_room_receive_frames() {
        let hub = RealtimeHub::default();
        let mut first = hub.subscribe("project:1");
        let mut second = hub.subscribe("project:1");

        let delivered = hub.emit_task_event(1, TaskEvent::Created, &json!({"id": 10}));
        assert_eq!(delivered, 2);

        let frame = decode(first.recv().await.unwrap());
        assert_eq!(frame["event"], "taskCreated");
        assert_eq!(frame["data"]["id"], 10);
        assert_eq!(decode(second.recv().await.unwrap())["event"], "taskCreated");
    }

    #[tokio::test]
    async fn rooms_are_isolated() {
        let hub = RealtimeHub::default();
        let mut other = hub.subscribe(&project_room(2));

        assert_eq!(hub.emit_task_event(1, TaskEvent::Deleted, &json!({})), 0);
        hub.emit(&project_room(2), "taskUpdated", &json!({"id": 5}));

        assert_eq!(decode(other.recv().await.unwrap())["event"], "taskUpdated");
    }

    #[test]
    fn empty_rooms_are_pruned() {
        let hub = RealtimeHub::default();
        let receiver = hub.subscribe(&user_room(4));
        assert_eq!(hub.room_count(), 1);

        drop(receiver);
        hub.prune();
        assert_eq!(hub.room_count(), 0);
    }

    #[test]
    fn emitting_to_abandoned_room_removes_it() {
        let hub = RealtimeHub::default();
        drop(hub.subscribe("project:3"));

        assert_eq!(hub.emit("project:3", "taskUpdated", &json!({})), 0);
        assert_eq!(hub.room_count(), 0);
    }

    #[tokio::test]
    async fn lagging_listener_skips_dropped_frames() {
        let hub = RealtimeHub::new(2);
        let mut slow = hub.subscribe("project:9");
        for id in 0..4 {
            hub.emit("project:9", "taskUpdated", &json!({ "id": id }));
        }

        assert!(matches!(
            slow.recv().await,
            Err(broadcast::error::RecvError::Lagged(2))
        ));
        assert_eq!(decode(slow.recv().await.unwrap())["data"]["id"], 2);
    }

    #[tokio::test]
    async fn revocations_reach_every_session() {
        let hub = RealtimeHub::default();
        let mut session = hub.revocations();

        assert_eq!(hub.revoke_project_access(7, 3), 1);
        assert_eq!(
            session.recv().await.unwrap(),
            Revocation {
                user_id: 7,
                project_id: 3
            }
        );
    }

    #[test]
    fn revoking_without_sessions_is_a_no_op() {
        let hub = RealtimeHub::default();
        assert_eq!(hub.revoke_project_access(7, 3), 0);
    }

    #[test]
    fn event_names_match_client_contract() {
        assert_eq!(TaskEvent::Created.name(), "taskCreated");
        assert_eq!(TaskEvent::Updated.name(), "taskUpdated");
        assert_eq!(TaskEvent::Deleted.name(), "taskDeleted");
    }
}
