use std::collections::HashMap;
use std::sync::Arc;

use actix_web::{rt, web, HttpRequest, HttpResponse};
use actix_ws::{CloseReason, Message, MessageStream, Session};
use log::{debug, info, warn};
use serde::Deserialize;
use serde_json::json;
use sqlx::PgPool;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use super::hub::{encode_frame, project_room, user_room, RealtimeHub, Revocation};
use crate::access;
use crate::auth::{AuthUser, TokenService};
use crate::error::AppError;

#[derive(Deserialize)]
pub struct WsQuery {
    pub token: Option<String>,
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(tag = "action", rename_all = "camelCase")]
enum ClientFrame {
    #[serde(rename_all = "camelCase")]
    Join { project_id: i32 },
    #[serde(rename_all = "camelCase")]
    Leave { project_id: i32 },
}

pub async fn ws_connect(
    req: HttpRequest,
    body: web::Payload,
    query: web::Query<WsQuery>,
    tokens: web::Data<TokenService>,
    hub: web::Data<RealtimeHub>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let token = query
        .token
        .as_deref()
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| AppError::unauthorized("UNAUTHORIZED", "Authentication required"))?;
    let user = AuthUser::from(tokens.verify_access(token)?);

    let (response, session, stream) = actix_ws::handle(&req, body)
        .map_err(|e| AppError::bad_request("WEBSOCKET_HANDSHAKE_FAILED", e.to_string()))?;

    info!("Realtime connection opened for user {}", user.id);
    rt::spawn(run_session(
        user,
        session,
        stream,
        hub.into_inner(),
        pool.into_inner(),
    ));
    Ok(response)
}

/// Copies frames from one broadcast room into the connection's bounded
/// outbound queue. Frames that do not fit are dropped.
fn forward(
    mut room: broadcast::Receiver<Arc<str>>,
    outbound: mpsc::Sender<Arc<str>>,
) -> JoinHandle<()> {
    rt::spawn(async move {
        loop {
            match room.recv().await {
                Ok(frame) => match outbound.try_send(frame) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) => {
                        debug!("Realtime client queue full, frame dropped");
                    }
                    Err(TrySendError::Closed(_)) => break,
                },
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Realtime listener lagged, {} frames dropped", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

struct Subscriptions {
    hub: Arc<RealtimeHub>,
    outbound: mpsc::Sender<Arc<str>>,
    rooms: HashMap<String, JoinHandle<()>>,
}

impl Subscriptions {
    fn join(&mut self, room: String) {
        if !self.rooms.contains_key(&room) {
            let handle = forward(self.hub.subscribe(&room), self.outbound.clone());
            self.rooms.insert(room, handle);
        }
    }

    fn leave(&mut self, room: &str) -> bool {
        match self.rooms.remove(room) {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    /// Leaves the project room if the revocation targets `user_id`; returns the room left.
    fn revoke(&mut self, user_id: i32, revocation: Revocation) -> Option<String> {
        if revocation.user_id != user_id {
            return None;
        }
        let room = project_room(revocation.project_id);
        self.leave(&room).then_some(room)
    }

    fn close(&mut self) {
        for (_, handle) in self.rooms.drain() {
            handle.abort();
        }
        self.hub.prune();
    }
}

async fn send_frame<T: serde::Serialize>(session: &mut Session, event: &str, data: &T) -> bool {
    match encode_frame(event, data) {
        Some(frame) => session.text(frame.to_string()).await.is_ok(),
        None => true,
    }
}

async fn handle_client_frame(
    text: &str,
    user: &AuthUser,
    subscriptions: &mut Subscriptions,
    session: &mut Session,
    pool: &PgPool,
) -> bool {
    let frame = match serde_json::from_str::<ClientFrame>(text) {
        Ok(frame) => frame,
        Err(_) => {
            return send_frame(session, "error", &json!({ "message": "Unrecognised frame" })).await;
        }
    };

    match frame {
        ClientFrame::Join { project_id } => {
            match access::ensure_project_access(pool, project_id, user).await {
                Ok(_) => {
                    let room = project_room(project_id);
                    subscriptions.join(room.clone());
                    send_frame(session, "joined", &json!({ "room": room })).await
                }
                Err(e) => {
                    send_frame(
                        session,
                        "error",
                        &json!({ "message": e.to_string(), "code": e.code() }),
                    )
                    .await
                }
            }
        }
        ClientFrame::Leave { project_id } => {
            let room = project_room(project_id);
            subscriptions.leave(&room);
            send_frame(session, "left", &json!({ "room": room })).await
        }
    }
}

async fn run_session(
    user: AuthUser,
    mut session: Session,
    mut stream: MessageStream,
    hub: Arc<RealtimeHub>,
    pool: Arc<PgPool>,
) {
    let (outbound, mut inbound) = mpsc::channel::<Arc<str>>(hub.capacity());
    let mut revocations = hub.revocations();
    let mut subscriptions = Subscriptions {
        hub,
        outbound,
        rooms: HashMap::new(),
    };
    subscriptions.join(user_room(user.id));

    let mut close_reason: Option<CloseReason> = None;
    loop {
        tokio::select! {
            Some(frame) = inbound.recv() => {
                if session.text(frame.to_string()).await.is_err() {
                    break;
                }
            }
            revoked = revocations.recv() => match revoked {
                Ok(revocation) => {
                    if let Some(room) = subscriptions.revoke(user.id, revocation) {
                        info!("User {} evicted from {}", user.id, room);
                        if !send_frame(&mut session, "left", &json!({ "room": room })).await {
                            break;
                        }
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("User {} missed {} access revocations", user.id, skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            message = stream.recv() => match message {
                Some(Ok(Message::Text(text))) => {
                    if !handle_client_frame(&text, &user, &mut subscriptions, &mut session, &pool).await {
                        break;
                    }
                }
                Some(Ok(Message::Ping(bytes))) => {
                    if session.pong(&bytes).await.is_err() {
                        break;
                    }
                }
                Some(Ok(Message::Close(reason))) => {
                    close_reason = reason;
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!("Realtime protocol error for user {}: {}", user.id, e);
                    break;
                }
                None => break,
            }
        }
    }

    subscriptions.close();
    let _ = session.close(close_reason).await;
    info!("Realtime connection closed for user {}", user.id);
}
