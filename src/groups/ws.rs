use std::sync::Arc;

use axum::{
    debug_handler,
    extract::{ws::{Message as Frame, WebSocket}, Path, State, WebSocketUpgrade},
    response::{IntoResponse, Response},
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::json;

use crate::{
    db::User,
    realtime::{chat::send_message, GroupChat, RealtimeStore},
    repo::Repo,
    session::CurrentUser,
    AppResult, AppState,
};

use super::load_group;

#[derive(Deserialize)]
struct OutgoingText {
    text: String,
}

#[debug_handler(state = AppState)]
pub(crate) async fn chat_ws(
    Path(group_id): Path<i64>,
    State(repo): State<Repo>,
    State(store): State<Arc<RealtimeStore>>,
    CurrentUser(user): CurrentUser,

    ws: WebSocketUpgrade,
) -> AppResult<Response> {
    load_group(repo.as_ref(), group_id).await?;

    Ok(ws.on_upgrade(move |socket| chat_session(socket, store, group_id, user)).into_response())
}

/// Streams the sorted log to the socket on every change and appends
/// whatever the socket sends. Ends when either side stops.
async fn chat_session(socket: WebSocket, store: Arc<RealtimeStore>, group_id: i64, user: User) {
    let (mut sender, mut receiver) = socket.split();
    let mut chat = GroupChat::open(&store, group_id);

    let mut broadcast_task = tokio::spawn(async move {
        while let Some(messages) = chat.refresh().await {
            let frame = json!({ "type": "messages", "messages": messages });
            if sender.send(Frame::Text(frame.to_string().into())).await.is_err() {
                break;
            }
        }
    });

    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(frame)) = receiver.next().await {
            let text = match frame {
                Frame::Text(text) => text,
                Frame::Close(_) => break,
                _ => continue,
            };
            let Ok(OutgoingText { text }) = serde_json::from_str(text.as_str()) else {
                tracing::debug!("ignoring malformed chat frame in group {group_id}");
                continue;
            };
            if let Err(e) = send_message(&store, group_id, &user, &text).await {
                tracing::warn!("chat send failed in group {group_id}: {e}");
            }
        }
    });

    tokio::select! {
        _ = &mut broadcast_task => recv_task.abort(),
        _ = &mut recv_task => broadcast_task.abort(),
    };
}
