use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;

use crate::session;
use crate::session::stream::{GatewayMessage, StartMeta};
use crate::state::AppState;

pub async fn media_ws(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_media(socket, state))
}

async fn handle_media(mut socket: WebSocket, state: Arc<AppState>) {
    let start = match read_start(&mut socket).await {
        Ok(start) => start,
        Err(e) => {
            tracing::warn!(error = %e, "media stream ended before start frame");
            return;
        }
    };

    // Caller identity comes from the answer webhook's registration, with the
    // stream's custom parameters as a fallback.
    let caller = state
        .pending_calls
        .lock()
        .unwrap()
        .remove(&start.call_sid)
        .map(|pending| pending.from)
        .or_else(|| start.custom_parameters.get("caller").cloned());

    session::run(socket, start, caller, state).await;
}

/// The gateway opens with a Connected frame, then Start with the stream and
/// call identifiers. Anything else this early is a protocol error.
async fn read_start(socket: &mut WebSocket) -> anyhow::Result<StartMeta> {
    loop {
        let Some(msg) = socket.recv().await else {
            anyhow::bail!("stream closed before start frame");
        };
        match msg? {
            Message::Text(json) => match serde_json::from_str::<GatewayMessage>(&json)? {
                GatewayMessage::Connected { protocol, version } => {
                    tracing::debug!(%protocol, %version, "gateway stream connected");
                }
                GatewayMessage::Start { start, .. } => return Ok(start),
                other => anyhow::bail!("unexpected frame before start: {other:?}"),
            },
            Message::Ping(_) | Message::Pong(_) => {}
            Message::Close(_) => anyhow::bail!("stream closed before start frame"),
            other => anyhow::bail!("unexpected websocket message before start: {other:?}"),
        }
    }
}
