pub mod speech;
pub mod stream;

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use chrono::NaiveDateTime;
use futures_util::{
    sink::SinkExt,
    stream::{SplitSink, StreamExt},
};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite;
use uuid::Uuid;

use crate::db::queries;
use crate::models::{CallRecord, Speaker, Turn};
use crate::services::booking_state::BookingState;
use crate::services::decision::DecisionOutcome;
use crate::services::mediator::Mediator;
use crate::session::speech::SpeechEvent;
use crate::session::stream::{GatewayMessage, GatewayOutbound, StartMeta};
use crate::state::AppState;

/// Lifecycle of one call, in order. Closed is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallState {
    Connecting,
    Active,
    Closing,
    Closed,
}

impl CallState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallState::Connecting => "connecting",
            CallState::Active => "active",
            CallState::Closing => "closing",
            CallState::Closed => "closed",
        }
    }
}

/// Registry row so the admin surface can see who is on the line.
#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    pub call_sid: String,
    pub caller: Option<String>,
    pub started_at: NaiveDateTime,
}

const AUDIO_BUFFER_FRAMES: usize = 256;

const AGENT_INSTRUCTIONS: &str = "You are the friendly front-desk voice assistant for the clinic. \
     Keep every answer short and conversational. For anything that touches the clinic's records \
     (identifying a patient, open appointment times, booking, rescheduling, cancelling) call the \
     clinic_assist tool and relay its answer.";

/// Inbound audio that arrives before the speech agent is configured. Bounded;
/// the oldest frames drop first.
#[derive(Debug)]
struct AudioBuffer {
    frames: VecDeque<String>,
    cap: usize,
    dropped: u64,
}

impl AudioBuffer {
    fn new(cap: usize) -> Self {
        Self {
            frames: VecDeque::new(),
            cap,
            dropped: 0,
        }
    }

    fn push(&mut self, payload: String) {
        if self.frames.len() == self.cap {
            self.frames.pop_front();
            self.dropped += 1;
        }
        self.frames.push_back(payload);
    }

    fn drain(&mut self) -> Vec<String> {
        self.frames.drain(..).collect()
    }
}

fn transition(state: &mut CallState, next: CallState, call_sid: &str) {
    tracing::info!(call = %call_sid, from = state.as_str(), to = next.as_str(), "session state");
    *state = next;
}

async fn send_gateway(
    sink: &mut SplitSink<WebSocket, Message>,
    frame: &GatewayOutbound,
) -> anyhow::Result<()> {
    let json = serde_json::to_string(frame)?;
    sink.send(Message::Text(json)).await?;
    Ok(())
}

/// Drive one call from connected to torn down. Owns every piece of mutable
/// session state; nothing here is shared with other sessions.
pub async fn run(socket: WebSocket, start: StartMeta, caller: Option<String>, app: Arc<AppState>) {
    let stream_sid = start.stream_sid;
    let call_sid = start.call_sid;
    let started_at = chrono::Utc::now().naive_utc();
    let mut state = CallState::Connecting;

    tracing::info!(call = %call_sid, stream = %stream_sid, caller = ?caller, "call session connecting");
    app.sessions.lock().unwrap().insert(
        stream_sid.clone(),
        SessionInfo {
            call_sid: call_sid.clone(),
            caller: caller.clone(),
            started_at,
        },
    );

    let (mut gateway_sink, mut gateway_stream) = socket.split();
    let mediator = Mediator::new(app.decision.clone());
    let mut booking = BookingState::new();
    let mut turns: Vec<Turn> = Vec::new();
    let mut buffer = AudioBuffer::new(AUDIO_BUFFER_FRAMES);
    let mut speech_ready = false;

    let (mut speech_conn, mut speech_stream) =
        match speech::connect(&app.config.speech_url, &app.config.speech_api_key).await {
            Ok(pair) => pair,
            Err(e) => {
                tracing::error!(error = %e, call = %call_sid, "speech agent connection failed");
                teardown(&app, &stream_sid, &call_sid, caller, started_at, turns, &booking);
                return;
            }
        };

    let (tool_tx, mut tool_rx) = mpsc::channel::<(String, anyhow::Result<DecisionOutcome>)>(4);
    let mut keepalive = tokio::time::interval(Duration::from_secs(app.config.keepalive_secs));
    keepalive.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            msg = gateway_stream.next() => {
                match msg {
                    Some(Ok(Message::Text(json))) => match serde_json::from_str::<GatewayMessage>(&json) {
                        Ok(GatewayMessage::Media { media, .. }) => {
                            if speech_ready {
                                if let Err(e) = speech_conn.append_audio(&media.payload).await {
                                    tracing::warn!(error = %e, call = %call_sid, "failed to forward caller audio");
                                }
                            } else {
                                buffer.push(media.payload);
                            }
                        }
                        Ok(GatewayMessage::Stop { .. }) => {
                            tracing::info!(call = %call_sid, "gateway stop signal");
                            break;
                        }
                        Ok(GatewayMessage::Mark { mark, .. }) => {
                            tracing::debug!(call = %call_sid, mark = %mark.name, "playback mark echoed");
                        }
                        Ok(_) => {}
                        Err(e) => tracing::warn!(error = %e, "unparseable gateway frame"),
                    },
                    Some(Ok(Message::Ping(_) | Message::Pong(_))) => {}
                    Some(Ok(Message::Close(_))) | None => {
                        tracing::info!(call = %call_sid, "gateway disconnected");
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::warn!(error = %e, call = %call_sid, "gateway stream error");
                        break;
                    }
                }
            }
            msg = speech_stream.next() => {
                match msg {
                    Some(Ok(tungstenite::Message::Text(raw))) => match speech::parse_event(&raw) {
                        SpeechEvent::SessionCreated => {
                            if let Err(e) = speech_conn
                                .send_session_config(&app.config.speech_voice, AGENT_INSTRUCTIONS)
                                .await
                            {
                                tracing::error!(error = %e, call = %call_sid, "failed to configure speech agent");
                                break;
                            }
                        }
                        SpeechEvent::SessionUpdated => {
                            if !speech_ready {
                                speech_ready = true;
                                transition(&mut state, CallState::Active, &call_sid);
                                if buffer.dropped > 0 {
                                    tracing::warn!(call = %call_sid, dropped = buffer.dropped, "dropped early audio frames");
                                }
                                for payload in buffer.drain() {
                                    if let Err(e) = speech_conn.append_audio(&payload).await {
                                        tracing::warn!(error = %e, "failed to flush buffered audio");
                                        break;
                                    }
                                }
                                if let Err(e) = speech_conn.request_greeting().await {
                                    tracing::warn!(error = %e, "failed to request greeting");
                                }
                            }
                        }
                        SpeechEvent::AudioDelta(payload) => {
                            if let Err(e) =
                                send_gateway(&mut gateway_sink, &GatewayOutbound::media(&stream_sid, payload)).await
                            {
                                tracing::warn!(error = %e, call = %call_sid, "failed to forward agent audio");
                                break;
                            }
                        }
                        SpeechEvent::ResponseDone => {
                            let mark = GatewayOutbound::mark(&stream_sid, Uuid::new_v4().to_string());
                            if let Err(e) = send_gateway(&mut gateway_sink, &mark).await {
                                tracing::warn!(error = %e, "failed to send playback mark");
                            }
                        }
                        SpeechEvent::SpeechStarted => {
                            // Caller barge-in: flush queued audio and stop the
                            // in-flight response.
                            let _ = send_gateway(&mut gateway_sink, &GatewayOutbound::clear(&stream_sid)).await;
                            let _ = speech_conn.cancel_response().await;
                        }
                        SpeechEvent::CallerTranscript(text) => {
                            if !text.trim().is_empty() {
                                turns.push(Turn::new(Speaker::Caller, text));
                            }
                        }
                        SpeechEvent::AgentTranscript(text) => {
                            if !text.trim().is_empty() {
                                turns.push(Turn::new(Speaker::Agent, text));
                            }
                        }
                        SpeechEvent::ToolCall { call_id, name, arguments } => {
                            if name != speech::TOOL_NAME {
                                tracing::warn!(tool = %name, "unknown tool requested");
                                let _ = speech_conn
                                    .send_tool_result(&call_id, "That isn't something I can help with.")
                                    .await;
                            } else {
                                let raw = speech::tool_details(&arguments);
                                tracing::info!(call = %call_sid, details = %raw, "tool request dispatched");
                                // Guard context reflects the state as of this
                                // moment; the slow decision call runs detached
                                // so a disconnect can abandon it.
                                let context = mediator.prepare(&mut booking, &turns, &raw);
                                let dispatcher = mediator.clone();
                                let snapshot = turns.clone();
                                let tx = tool_tx.clone();
                                tokio::spawn(async move {
                                    let outcome = dispatcher.dispatch(snapshot, context).await;
                                    let _ = tx.send((call_id, outcome)).await;
                                });
                            }
                        }
                        SpeechEvent::Error(message) => {
                            tracing::warn!(call = %call_sid, error = %message, "speech agent error event");
                        }
                        SpeechEvent::Ignored => {}
                    },
                    Some(Ok(tungstenite::Message::Close(_))) | None => {
                        tracing::info!(call = %call_sid, "speech agent closed the connection");
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::warn!(error = %e, call = %call_sid, "speech stream error");
                        break;
                    }
                }
            }
            Some((call_id, outcome)) = tool_rx.recv() => {
                let reply = mediator.harvest(&mut booking, &turns, outcome);
                turns.push(Turn::new(Speaker::Agent, reply.clone()));
                if let Err(e) = speech_conn.send_tool_result(&call_id, &reply).await {
                    tracing::warn!(error = %e, call = %call_sid, "failed to return tool result");
                }
            }
            _ = keepalive.tick() => {
                if state == CallState::Active {
                    let _ = gateway_sink.send(Message::Ping(Vec::new())).await;
                }
            }
        }
    }

    transition(&mut state, CallState::Closing, &call_sid);
    speech_conn.close().await;
    teardown(&app, &stream_sid, &call_sid, caller, started_at, turns, &booking);
    transition(&mut state, CallState::Closed, &call_sid);
}

fn teardown(
    app: &Arc<AppState>,
    stream_sid: &str,
    call_sid: &str,
    caller: Option<String>,
    started_at: NaiveDateTime,
    turns: Vec<Turn>,
    booking: &BookingState,
) {
    app.sessions.lock().unwrap().remove(stream_sid);

    let record = CallRecord {
        call_sid: call_sid.to_string(),
        caller,
        started_at,
        ended_at: chrono::Utc::now().naive_utc(),
        transcript: turns,
        appointment_id: booking.appointment_id().map(String::from),
    };

    let db = app.db.lock().unwrap();
    if let Err(e) = queries::insert_call(&db, &record) {
        tracing::error!(error = %e, call = %call_sid, "failed to persist call record");
    }
}
