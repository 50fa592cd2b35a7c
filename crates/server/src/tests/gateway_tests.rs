use super::*;
use axum::{body, body::Body, http::Request, http::StatusCode};
use shared::domain::CamVector;
use tokio::{net::TcpListener, sync::broadcast};
use tokio_tungstenite::{connect_async, tungstenite::Message as WsMessage};
use tower::ServiceExt;

fn test_state() -> (Arc<AppState>, mpsc::Receiver<TrackerInput>) {
    let (events, _) = broadcast::channel(32);
    let (inputs, inputs_rx) = mpsc::channel(32);
    (Arc::new(AppState { events, inputs }), inputs_rx)
}

#[tokio::test]
async fn healthz_reports_ok() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (state, _inputs) = test_state();
    let app = build_router(state, dir.path());

    let request = Request::get("/healthz")
        .body(Body::empty())
        .expect("request");
    let response = app.oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let body = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    assert_eq!(body.as_ref(), b"ok");
}

#[tokio::test]
async fn static_files_are_served_from_webroot() {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::write(dir.path().join("index.html"), "<h1>tracker</h1>").expect("write");
    let (state, _inputs) = test_state();
    let app = build_router(state, dir.path());

    let response = app
        .clone()
        .oneshot(Request::get("/index.html").body(Body::empty()).expect("request"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    assert_eq!(body.as_ref(), b"<h1>tracker</h1>");

    let missing = app
        .oneshot(Request::get("/nope.js").body(Body::empty()).expect("request"))
        .await
        .expect("response");
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

async fn next_text(
    ws: &mut (impl futures::Stream<Item = Result<WsMessage, tokio_tungstenite::tungstenite::Error>>
              + Unpin),
) -> serde_json::Value {
    loop {
        match ws.next().await.expect("ws open").expect("ws frame") {
            WsMessage::Text(text) => return serde_json::from_str(&text).expect("json"),
            _ => continue,
        }
    }
}

#[tokio::test]
async fn websocket_relays_commands_and_events() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (state, mut inputs) = test_state();
    let events = state.events.clone();
    let app = build_router(state, dir.path());

    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    let (mut ws, _) = connect_async(format!("ws://{addr}/ws"))
        .await
        .expect("connect");

    assert_eq!(
        inputs.recv().await,
        Some(TrackerInput::Command(ClientCommand::Center)),
        "new subscribers re-center"
    );

    ws.send(WsMessage::Text(r#"{"type":"powersaver","payload":true}"#.into()))
        .await
        .expect("send");
    assert_eq!(
        inputs.recv().await,
        Some(TrackerInput::Command(ClientCommand::PowerSaver(true)))
    );

    events
        .send(ServerEvent::Cam(CamVector::new(0.5, 0.0, -0.5)))
        .expect("subscriber attached");
    assert_eq!(
        next_text(&mut ws).await,
        serde_json::json!({ "type": "cam", "payload": [0.5, 0.0, -0.5] })
    );

    ws.send(WsMessage::Text("not json".into()))
        .await
        .expect("send");
    let reply = next_text(&mut ws).await;
    assert_eq!(reply["type"], "error");
    assert_eq!(reply["payload"]["code"], "validation");
}
