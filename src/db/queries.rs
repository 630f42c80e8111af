use chrono::NaiveDateTime;
use rusqlite::{params, Connection};

use crate::models::CallRecord;

const DATETIME_FMT: &str = "%Y-%m-%d %H:%M:%S";

pub fn insert_call(conn: &Connection, record: &CallRecord) -> anyhow::Result<()> {
    let transcript = serde_json::to_string(&record.transcript)?;
    conn.execute(
        "INSERT INTO call_log (call_sid, caller, started_at, ended_at, transcript, appointment_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(call_sid) DO UPDATE SET
           ended_at = excluded.ended_at,
           transcript = excluded.transcript,
           appointment_id = excluded.appointment_id",
        params![
            record.call_sid,
            record.caller,
            record.started_at.format(DATETIME_FMT).to_string(),
            record.ended_at.format(DATETIME_FMT).to_string(),
            transcript,
            record.appointment_id,
        ],
    )?;
    Ok(())
}

pub fn recent_calls(conn: &Connection, limit: i64) -> anyhow::Result<Vec<CallRecord>> {
    let mut stmt = conn.prepare(
        "SELECT call_sid, caller, started_at, ended_at, transcript, appointment_id
         FROM call_log ORDER BY started_at DESC LIMIT ?1",
    )?;

    let rows = stmt.query_map(params![limit], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, Option<String>>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, String>(4)?,
            row.get::<_, Option<String>>(5)?,
        ))
    })?;

    let mut calls = Vec::new();
    for row in rows {
        let (call_sid, caller, started_at, ended_at, transcript, appointment_id) = row?;
        calls.push(CallRecord {
            call_sid,
            caller,
            started_at: parse_dt(&started_at),
            ended_at: parse_dt(&ended_at),
            transcript: serde_json::from_str(&transcript).unwrap_or_default(),
            appointment_id,
        });
    }
    Ok(calls)
}

fn parse_dt(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, DATETIME_FMT)
        .unwrap_or_else(|_| chrono::Utc::now().naive_utc())
}
