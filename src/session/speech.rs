use anyhow::Context;
use futures_util::{
    sink::SinkExt,
    stream::{SplitSink, SplitStream, StreamExt},
};
use serde_json::json;
use tokio::net::TcpStream;
use tokio_tungstenite::{
    connect_async,
    tungstenite::{self, client::IntoClientRequest, http::HeaderValue},
    MaybeTlsStream, WebSocketStream,
};

/// The one tool the realtime agent can call; everything that touches the
/// practice's records goes through it with a free-text summary.
pub const TOOL_NAME: &str = "clinic_assist";

pub type SpeechStream = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

pub struct SpeechAgentConn {
    sink: SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, tungstenite::Message>,
}

/// Open the websocket to the realtime speech agent. The session configuration
/// is sent later, once the agent announces the session is created.
pub async fn connect(url: &str, api_key: &str) -> anyhow::Result<(SpeechAgentConn, SpeechStream)> {
    let mut request = url
        .into_client_request()
        .context("invalid speech agent url")?;
    request.headers_mut().insert(
        tungstenite::http::header::AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {api_key}"))
            .context("invalid speech agent api key")?,
    );

    let (ws, _) = connect_async(request)
        .await
        .context("failed to connect to speech agent")?;
    let (sink, stream) = ws.split();
    Ok((SpeechAgentConn { sink }, stream))
}

impl SpeechAgentConn {
    async fn send(&mut self, value: serde_json::Value) -> anyhow::Result<()> {
        self.sink
            .send(tungstenite::Message::Text(value.to_string()))
            .await
            .context("failed to send to speech agent")
    }

    /// Sent once after `session.created`: voice, server-side turn detection,
    /// µ-law audio both ways, caller transcription, and the tool declaration.
    pub async fn send_session_config(
        &mut self,
        voice: &str,
        instructions: &str,
    ) -> anyhow::Result<()> {
        self.send(json!({
            "type": "session.update",
            "session": {
                "modalities": ["audio", "text"],
                "voice": voice,
                "instructions": instructions,
                "input_audio_format": "g711_ulaw",
                "output_audio_format": "g711_ulaw",
                "input_audio_transcription": { "model": "whisper-1" },
                "turn_detection": { "type": "server_vad" },
                "tool_choice": "auto",
                "tools": [{
                    "type": "function",
                    "name": TOOL_NAME,
                    "description": "Handle anything that needs the clinic's records: identifying or registering a patient, finding open appointment times, booking, rescheduling, or cancelling. Summarize every relevant fact the caller has given so far in `details`.",
                    "parameters": {
                        "type": "object",
                        "properties": {
                            "details": {
                                "type": "string",
                                "description": "Names, phone numbers, dates, times, and preferences mentioned by the caller."
                            }
                        },
                        "required": ["details"]
                    }
                }]
            }
        }))
        .await
    }

    /// The agent won't speak first on its own; ask for the opening turn.
    pub async fn request_greeting(&mut self) -> anyhow::Result<()> {
        self.send(json!({
            "type": "response.create",
            "response": {
                "instructions": "Greet the caller and ask how you can help."
            }
        }))
        .await
    }

    pub async fn append_audio(&mut self, payload_b64: &str) -> anyhow::Result<()> {
        self.send(json!({
            "type": "input_audio_buffer.append",
            "audio": payload_b64,
        }))
        .await
    }

    /// Hand a tool result back and ask the agent to keep talking.
    pub async fn send_tool_result(&mut self, call_id: &str, output: &str) -> anyhow::Result<()> {
        self.send(json!({
            "type": "conversation.item.create",
            "item": {
                "type": "function_call_output",
                "call_id": call_id,
                "output": output,
            }
        }))
        .await?;
        self.send(json!({ "type": "response.create" })).await
    }

    /// Caller barge-in: stop the in-flight response.
    pub async fn cancel_response(&mut self) -> anyhow::Result<()> {
        self.send(json!({ "type": "response.cancel" })).await
    }

    pub async fn close(&mut self) {
        let _ = self.sink.send(tungstenite::Message::Close(None)).await;
    }
}

/// Events this service cares about; everything else is `Ignored`.
#[derive(Debug, PartialEq)]
pub enum SpeechEvent {
    SessionCreated,
    SessionUpdated,
    AudioDelta(String),
    ResponseDone,
    SpeechStarted,
    CallerTranscript(String),
    AgentTranscript(String),
    ToolCall {
        call_id: String,
        name: String,
        arguments: String,
    },
    Error(String),
    Ignored,
}

pub fn parse_event(raw: &str) -> SpeechEvent {
    let Ok(v) = serde_json::from_str::<serde_json::Value>(raw) else {
        return SpeechEvent::Ignored;
    };

    match v.get("type").and_then(|t| t.as_str()).unwrap_or("") {
        "session.created" => SpeechEvent::SessionCreated,
        "session.updated" => SpeechEvent::SessionUpdated,
        "response.audio.delta" => {
            SpeechEvent::AudioDelta(str_field(&v, "delta"))
        }
        "response.done" => SpeechEvent::ResponseDone,
        "input_audio_buffer.speech_started" => SpeechEvent::SpeechStarted,
        "conversation.item.input_audio_transcription.completed" => {
            SpeechEvent::CallerTranscript(str_field(&v, "transcript"))
        }
        "response.audio_transcript.done" => {
            SpeechEvent::AgentTranscript(str_field(&v, "transcript"))
        }
        "response.function_call_arguments.done" => SpeechEvent::ToolCall {
            call_id: str_field(&v, "call_id"),
            name: str_field(&v, "name"),
            arguments: str_field(&v, "arguments"),
        },
        "error" => {
            let message = v
                .get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .unwrap_or("unknown speech agent error")
                .to_string();
            SpeechEvent::Error(message)
        }
        _ => SpeechEvent::Ignored,
    }
}

/// The tool argument is a JSON object with one free-text field; fall back to
/// the raw string when the agent sends something looser.
pub fn tool_details(arguments: &str) -> String {
    serde_json::from_str::<serde_json::Value>(arguments)
        .ok()
        .and_then(|v| v.get("details").and_then(|d| d.as_str()).map(String::from))
        .unwrap_or_else(|| arguments.to_string())
}

fn str_field(v: &serde_json::Value, key: &str) -> String {
    v.get(key).and_then(|s| s.as_str()).unwrap_or("").to_string()
}
