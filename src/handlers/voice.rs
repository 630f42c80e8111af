use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Form;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha1::Sha1;

use crate::session::stream::answer_twiml;
use crate::state::{AppState, PendingCall};

#[derive(Deserialize)]
#[allow(dead_code)]
pub struct VoiceWebhookForm {
    #[serde(rename = "CallSid")]
    pub call_sid: String,
    #[serde(rename = "From")]
    pub from: String,
    #[serde(rename = "To")]
    pub to: String,
    #[serde(rename = "CallStatus")]
    pub call_status: Option<String>,
}

fn validate_gateway_signature(
    auth_token: &str,
    signature: &str,
    url: &str,
    params: &[(&str, &str)],
) -> bool {
    // Data to sign: URL + params sorted by key, concatenated
    let mut data = url.to_string();
    let mut sorted_params = params.to_vec();
    sorted_params.sort_by(|a, b| a.0.cmp(b.0));
    for (key, value) in &sorted_params {
        data.push_str(key);
        data.push_str(value);
    }

    let mut mac = match Hmac::<Sha1>::new_from_slice(auth_token.as_bytes()) {
        Ok(m) => m,
        Err(_) => return false,
    };
    mac.update(data.as_bytes());
    let result = mac.finalize().into_bytes();
    let expected = base64::engine::general_purpose::STANDARD.encode(result);

    expected == signature
}

/// Answer webhook: the gateway posts here when a call comes in. Registers the
/// caller's identity for the media stream to pick up, then hands back TwiML
/// pointing at the media websocket.
pub async fn answer(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Form(form): Form<VoiceWebhookForm>,
) -> Response {
    tracing::info!(call = %form.call_sid, from = %form.from, "incoming call");

    // Signature validation is skipped when the auth token is empty (dev mode)
    if !state.config.gateway_auth_token.is_empty() {
        let signature = headers
            .get("x-twilio-signature")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");

        if signature.is_empty() {
            tracing::warn!("missing gateway signature header");
            return (StatusCode::FORBIDDEN, "Missing signature").into_response();
        }

        let proto = headers
            .get("x-forwarded-proto")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("https");
        let host = headers
            .get("x-forwarded-host")
            .or_else(|| headers.get("host"))
            .and_then(|v| v.to_str().ok())
            .unwrap_or("localhost");
        let url = format!("{proto}://{host}/voice/answer");

        let params = [
            ("CallSid", form.call_sid.as_str()),
            ("From", form.from.as_str()),
            ("To", form.to.as_str()),
            ("CallStatus", form.call_status.as_deref().unwrap_or("")),
        ];

        if !validate_gateway_signature(&state.config.gateway_auth_token, signature, &url, &params)
        {
            tracing::warn!(call = %form.call_sid, "invalid gateway signature");
            return (StatusCode::FORBIDDEN, "Invalid signature").into_response();
        }
    }

    state.pending_calls.lock().unwrap().insert(
        form.call_sid.clone(),
        PendingCall {
            from: form.from.clone(),
            to: form.to.clone(),
        },
    );

    let ws_url = format!("wss://{}/voice/media", state.config.public_host);
    let twiml = answer_twiml(&ws_url);

    (
        [(header::CONTENT_TYPE, "application/xml")],
        twiml,
    )
        .into_response()
}
