use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::config::AppConfig;
use crate::services::decision::DecisionAgent;
use crate::session::SessionInfo;

/// Caller identity captured by the answer webhook, waiting for its media
/// stream to arrive. Keyed by call sid.
#[derive(Debug, Clone)]
pub struct PendingCall {
    pub from: String,
    pub to: String,
}

pub struct AppState {
    pub db: Arc<Mutex<Connection>>,
    pub config: AppConfig,
    pub decision: Arc<dyn DecisionAgent>,
    pub pending_calls: Mutex<HashMap<String, PendingCall>>,
    pub sessions: Mutex<HashMap<String, SessionInfo>>,
}
