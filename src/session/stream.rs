use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Inbound frames on the gateway's media websocket. Audio payloads are opaque
/// base64; this service only routes them.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase", tag = "event")]
pub enum GatewayMessage {
    Connected {
        protocol: String,
        version: String,
    },
    Start {
        #[serde(rename = "sequenceNumber")]
        sequence_number: String,
        start: StartMeta,
        #[serde(rename = "streamSid")]
        stream_sid: String,
    },
    Media {
        #[serde(rename = "sequenceNumber")]
        sequence_number: String,
        media: MediaMeta,
        #[serde(rename = "streamSid")]
        stream_sid: String,
    },
    Stop {
        #[serde(rename = "sequenceNumber")]
        sequence_number: String,
        #[serde(rename = "streamSid")]
        stream_sid: String,
    },
    Mark {
        #[serde(rename = "sequenceNumber")]
        sequence_number: String,
        mark: MarkMeta,
        #[serde(rename = "streamSid")]
        stream_sid: String,
    },
}

#[derive(Debug, Deserialize)]
pub struct StartMeta {
    #[serde(rename = "streamSid")]
    pub stream_sid: String,
    #[serde(rename = "callSid")]
    pub call_sid: String,
    #[serde(rename = "customParameters", default)]
    pub custom_parameters: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
pub struct MediaMeta {
    pub timestamp: String,
    pub payload: String,
}

#[derive(Debug, Deserialize)]
pub struct MarkMeta {
    pub name: String,
}

/// Outbound frames to the gateway, tagged with the stream they belong to.
#[derive(Debug, Serialize)]
#[serde(rename_all = "lowercase", tag = "event")]
pub enum GatewayOutbound {
    Media {
        #[serde(rename = "streamSid")]
        stream_sid: String,
        media: OutboundMedia,
    },
    Mark {
        #[serde(rename = "streamSid")]
        stream_sid: String,
        mark: OutboundMark,
    },
    Clear {
        #[serde(rename = "streamSid")]
        stream_sid: String,
    },
}

#[derive(Debug, Serialize)]
pub struct OutboundMedia {
    pub payload: String,
}

#[derive(Debug, Serialize)]
pub struct OutboundMark {
    pub name: String,
}

impl GatewayOutbound {
    pub fn media(stream_sid: &str, payload: String) -> Self {
        GatewayOutbound::Media {
            stream_sid: stream_sid.to_string(),
            media: OutboundMedia { payload },
        }
    }

    pub fn mark(stream_sid: &str, name: String) -> Self {
        GatewayOutbound::Mark {
            stream_sid: stream_sid.to_string(),
            mark: OutboundMark { name },
        }
    }

    pub fn clear(stream_sid: &str) -> Self {
        GatewayOutbound::Clear {
            stream_sid: stream_sid.to_string(),
        }
    }
}

/// Answer document pointing the gateway at our media websocket.
pub fn answer_twiml(media_ws_url: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
         <Response><Connect><Stream url=\"{media_ws_url}\" /></Connect></Response>"
    )
}
