use std::sync::Arc;

use axum::extract::State;
use axum::Json;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::CallRecord;
use crate::session::SessionInfo;
use crate::state::AppState;

pub async fn get_sessions(State(state): State<Arc<AppState>>) -> Json<Vec<SessionInfo>> {
    let mut sessions: Vec<SessionInfo> =
        state.sessions.lock().unwrap().values().cloned().collect();
    sessions.sort_by(|a, b| b.started_at.cmp(&a.started_at));
    Json(sessions)
}

pub async fn get_calls(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<CallRecord>>, AppError> {
    let db = state.db.lock().unwrap();
    let calls =
        queries::recent_calls(&db, 50).map_err(|e| AppError::Internal(e.to_string()))?;
    Ok(Json(calls))
}
