//! WebSocket connection handlers.

use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::{
        ConnectInfo, Query, State,
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures_util::{sink::SinkExt, stream::StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;

use crate::{
    domain::{
        ConnectionId, DisplayName, DropReason, HubSignal, InboundEvent, OUTBOUND_QUEUE_CAPACITY,
        OutboundFrame, ValidationError,
    },
    infrastructure::{
        dto::conversion::parse_inbound,
        rate_limit::{RateLimitPolicy, SlidingWindow},
    },
    ui::{error::ApiError, state::AppState},
    usecase::{AuthContext, Credentials},
};

use super::{reject, remote_ip};

/// Query parameters for WebSocket connection
#[derive(Debug, Default, Deserialize)]
pub struct ConnectQuery {
    pub name: Option<String>,
}

/// Authenticate, then upgrade. Failures are answered with 401 before any
/// registry admission.
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Query(query): Query<ConnectQuery>,
    credentials: Credentials,
) -> Result<Response, ApiError> {
    let remote = remote_ip(&addr);
    let auth = state
        .auth_gate
        .authorize_connection(&credentials)
        .await
        .map_err(|e| reject(&state, &remote, e))?;

    let display_name = DisplayName::from_query(query.name.as_deref());
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, display_name, remote, auth)))
}

/// Spawns a task that drains the outbound queue into the WebSocket sender.
///
/// Ends after forwarding a close frame, when the queue is closed (the registry
/// dropped this connection), or when the socket fails.
fn pusher_loop(
    mut rx: mpsc::Receiver<OutboundFrame>,
    mut sender: futures_util::stream::SplitSink<WebSocket, Message>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            match frame {
                OutboundFrame::Text(text) => {
                    if sender.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                OutboundFrame::Close { code, reason } => {
                    let close = CloseFrame {
                        code,
                        reason: reason.into(),
                    };
                    let _ = sender.send(Message::Close(Some(close))).await;
                    break;
                }
            }
        }
    })
}

async fn handle_socket(
    socket: WebSocket,
    state: Arc<AppState>,
    display_name: DisplayName,
    remote_address: String,
    auth: AuthContext,
) {
    let (sender, mut receiver) = socket.split();
    let (tx, rx) = mpsc::channel(OUTBOUND_QUEUE_CAPACITY);

    // Registry への登録（同名セッションの置き換えと online 通知を含む）
    let connection = state
        .connect_participant_usecase
        .execute(display_name, remote_address, auth, tx)
        .await;
    let connection_id = connection.id.clone();

    let state_clone = state.clone();
    let id_clone = connection_id.clone();

    // Spawn a task to receive frames from this client
    let mut recv_task = tokio::spawn(async move {
        let mut window = SlidingWindow::new(RateLimitPolicy::CONNECTION);
        while let Some(msg) = receiver.next().await {
            let msg = match msg {
                Ok(msg) => msg,
                Err(e) => {
                    tracing::debug!("WebSocket error on '{}': {}", id_clone, e);
                    break;
                }
            };

            match msg {
                Message::Text(text) => {
                    state_clone.connect_participant_usecase.touch(&id_clone).await;
                    if !window.admit(state_clone.clock.now_millis()) {
                        drop_frame(&state_clone, &id_clone, DropReason::RateLimited);
                        continue;
                    }
                    handle_text(&state_clone, &id_clone, text.as_str()).await;
                }
                Message::Close(_) => {
                    tracing::debug!("Client '{}' requested close", id_clone);
                    break;
                }
                _ => {}
            }
        }
    });

    // Spawn a task to push queued frames to this client
    let mut send_task = pusher_loop(rx, sender);

    // If any one of the tasks completes, abort the other
    tokio::select! {
        _ = &mut recv_task => send_task.abort(),
        _ = &mut send_task => recv_task.abort(),
    };

    // 置き換え・失効で既に削除されていれば何もしない
    state
        .disconnect_participant_usecase
        .execute(&connection_id)
        .await;
}

async fn handle_text(state: &AppState, id: &ConnectionId, text: &str) {
    let event = match parse_inbound(text) {
        Ok(event) => event,
        Err(ValidationError::Malformed(e)) => {
            tracing::debug!("Malformed frame from '{}': {}", id, e);
            drop_frame(state, id, DropReason::Malformed);
            return;
        }
        Err(e) => {
            tracing::debug!("Invalid frame from '{}': {}", id, e);
            drop_frame(state, id, DropReason::Invalid);
            return;
        }
    };

    match event {
        InboundEvent::UpdateName(name) => {
            state.rename_participant_usecase.execute(id, &name).await;
        }
        InboundEvent::Reaction(reaction) => {
            if let Err(e) = state.relay_reaction_usecase.execute(id, &reaction).await {
                tracing::error!("Failed to relay reaction from '{}': {}", id, e);
            }
        }
        InboundEvent::Broadcast(event) => {
            if let Err(e) = state
                .deliver_event_usecase
                .deliver_from_connection(id, event)
                .await
            {
                tracing::error!("Failed to deliver event from '{}': {}", id, e);
            }
        }
    }
}

fn drop_frame(state: &AppState, id: &ConnectionId, reason: DropReason) {
    state.observer.observe(&HubSignal::FrameDropped {
        id: id.to_string(),
        reason,
    });
}
