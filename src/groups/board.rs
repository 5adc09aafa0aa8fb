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
    db::{User, WhiteboardLine},
    realtime::{
        store::whiteboard_path,
        whiteboard::{clear_board, lines_from_snapshot, publish_line},
        RealtimeStore,
    },
    repo::Repo,
    session::CurrentUser,
    AppResult, AppState,
};

use super::load_group;

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum BoardCommand {
    Stroke(WhiteboardLine),
    Clear,
}

#[debug_handler(state = AppState)]
pub(crate) async fn board_ws(
    Path(group_id): Path<i64>,
    State(repo): State<Repo>,
    State(store): State<Arc<RealtimeStore>>,
    CurrentUser(user): CurrentUser,

    ws: WebSocketUpgrade,
) -> AppResult<Response> {
    load_group(repo.as_ref(), group_id).await?;

    Ok(ws.on_upgrade(move |socket| board_session(socket, store, group_id, user)).into_response())
}

async fn board_session(socket: WebSocket, store: Arc<RealtimeStore>, group_id: i64, user: User) {
    let (mut sender, mut receiver) = socket.split();
    let mut subscription = store.subscribe(whiteboard_path(group_id));

    let mut broadcast_task = tokio::spawn(async move {
        while let Some(snapshot) = subscription.next().await {
            let frame = json!({ "type": "lines", "lines": lines_from_snapshot(snapshot) });
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

            match serde_json::from_str::<BoardCommand>(text.as_str()) {
                Ok(BoardCommand::Stroke(line)) => match publish_line(&store, group_id, &line).await {
                    Ok(Some(_)) => {}
                    Ok(None) => tracing::debug!("dropping {}-point stroke in group {group_id}", line.points.len()),
                    Err(e) => tracing::warn!("stroke publish failed in group {group_id}: {e}"),
                },
                Ok(BoardCommand::Clear) => {
                    tracing::info!("u/{}#{} clears whiteboard {group_id}", user.username, user.id);
                    clear_board(&store, group_id).await;
                }
                Err(e) => tracing::debug!("ignoring malformed board frame in group {group_id}: {e}"),
            }
        }
    });

    tokio::select! {
        _ = &mut broadcast_task => recv_task.abort(),
        _ = &mut recv_task => broadcast_task.abort(),
    };
}
