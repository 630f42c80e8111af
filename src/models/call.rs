use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::Turn;

/// One completed call, persisted at session teardown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallRecord {
    pub call_sid: String,
    pub caller: Option<String>,
    pub started_at: NaiveDateTime,
    pub ended_at: NaiveDateTime,
    pub transcript: Vec<Turn>,
    pub appointment_id: Option<String>,
}
