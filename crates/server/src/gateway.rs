use std::{path::Path, sync::Arc};

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use futures::{SinkExt, StreamExt};
use shared::{
    error::{ApiError, ErrorCode},
    protocol::{ClientCommand, ServerEvent},
};
use tokio::sync::{broadcast::error::RecvError, mpsc};
use tower_http::services::ServeDir;
use tracing::{debug, info, warn};
use tracker::TrackerInput;

use crate::app_state::AppState;

pub(crate) fn build_router(state: Arc<AppState>, webroot: &Path) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/ws", get(ws_handler))
        .fallback_service(ServeDir::new(webroot))
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| ws_connection(state, socket))
}

async fn ws_connection(state: Arc<AppState>, socket: WebSocket) {
    let (mut sender, mut receiver) = socket.split();
    let mut events_rx = state.events.subscribe();
    let (replies_tx, mut replies_rx) = mpsc::channel::<ServerEvent>(8);
    info!("subscriber connected");

    // A new viewer starts from a fresh center.
    forward(&state, ClientCommand::Center, &replies_tx).await;

    let send_task = tokio::spawn(async move {
        loop {
            let event = tokio::select! {
                event = events_rx.recv() => match event {
                    Ok(event) => event,
                    Err(RecvError::Lagged(skipped)) => {
                        debug!(skipped, "subscriber lagging; events dropped");
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                },
                Some(reply) = replies_rx.recv() => reply,
            };
            let text = match serde_json::to_string(&event) {
                Ok(v) => v,
                Err(_) => continue,
            };
            if sender.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(msg)) = receiver.next().await {
        let Message::Text(text) = msg else {
            continue;
        };
        match ClientCommand::parse(&text) {
            Ok(command) => forward(&state, command, &replies_tx).await,
            Err(err) => {
                debug!(%text, reason = %err.message, "rejected subscriber command");
                let _ = replies_tx.send(ServerEvent::Error(err)).await;
            }
        }
    }

    send_task.abort();
    info!("subscriber disconnected");
}

async fn forward(state: &AppState, command: ClientCommand, replies: &mpsc::Sender<ServerEvent>) {
    if state
        .inputs
        .send(TrackerInput::Command(command))
        .await
        .is_err()
    {
        warn!(?command, "tracker is not running; command dropped");
        let _ = replies
            .send(ServerEvent::Error(ApiError::new(
                ErrorCode::Unavailable,
                "tracker is not running",
            )))
            .await;
    }
}

#[cfg(test)]
#[path = "tests/gateway_tests.rs"]
mod tests;
