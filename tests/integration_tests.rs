use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::routing::{get, post};
use axum::Router;
use chrono::{NaiveDate, NaiveDateTime};
use tower::ServiceExt;

use frontdesk::config::AppConfig;
use frontdesk::db;
use frontdesk::handlers;
use frontdesk::models::{
    Appointment, AppointmentStatus, NewPatient, Operatory, Patient, Provider, Slot, Speaker, Turn,
};
use frontdesk::services::ai::{LlmProvider, Message};
use frontdesk::services::booking_state::BookingState;
use frontdesk::services::decision::{DecisionAgent, DecisionOutcome, PlannerAgent};
use frontdesk::services::mediator::{Mediator, HOLDING_REPLY};
use frontdesk::services::pms::{AppointmentPatch, NewAppointment, PatientQuery, PmsClient};
use frontdesk::state::AppState;

// ── Mock Providers ──

/// Pops canned responses in order and records every prompt it was sent.
struct ScriptedLlm {
    responses: Mutex<Vec<String>>,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl ScriptedLlm {
    fn new(responses: Vec<&str>) -> (Self, Arc<Mutex<Vec<String>>>) {
        let prompts = Arc::new(Mutex::new(vec![]));
        (
            Self {
                responses: Mutex::new(responses.into_iter().rev().map(String::from).collect()),
                prompts: Arc::clone(&prompts),
            },
            prompts,
        )
    }
}

#[async_trait]
impl LlmProvider for ScriptedLlm {
    async fn chat(&self, _system_prompt: &str, messages: &[Message]) -> anyhow::Result<String> {
        let last_user = messages
            .iter()
            .rev()
            .find(|m| m.role == "user")
            .map(|m| m.content.clone())
            .unwrap_or_default();
        self.prompts.lock().unwrap().push(last_user);

        self.responses
            .lock()
            .unwrap()
            .pop()
            .ok_or_else(|| anyhow::anyhow!("scripted LLM ran out of responses"))
    }
}

struct FailingLlm;

#[async_trait]
impl LlmProvider for FailingLlm {
    async fn chat(&self, _system_prompt: &str, _messages: &[Message]) -> anyhow::Result<String> {
        anyhow::bail!("planner timeout")
    }
}

#[derive(Default)]
struct MockPmsInner {
    patients: Vec<Patient>,
    appointments: Vec<Appointment>,
    slots: Vec<Slot>,
    /// Emulates a deployment whose validation rejects the priority attribute.
    reject_priority: bool,
    create_count: usize,
    break_count: usize,
}

struct MockPms {
    inner: Mutex<MockPmsInner>,
}

impl MockPms {
    fn new(inner: MockPmsInner) -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(inner),
        })
    }

    fn create_count(&self) -> usize {
        self.inner.lock().unwrap().create_count
    }

    fn break_count(&self) -> usize {
        self.inner.lock().unwrap().break_count
    }
}

#[async_trait]
impl PmsClient for MockPms {
    async fn search_patients(&self, query: &PatientQuery) -> anyhow::Result<Vec<Patient>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .patients
            .iter()
            .filter(|p| {
                query
                    .phone
                    .as_ref()
                    .map_or(true, |phone| p.phone.as_deref() == Some(phone.as_str()))
                    && query
                        .first_name
                        .as_ref()
                        .map_or(true, |f| p.first_name.eq_ignore_ascii_case(f))
                    && query
                        .last_name
                        .as_ref()
                        .map_or(true, |l| p.last_name.eq_ignore_ascii_case(l))
            })
            .cloned()
            .collect())
    }

    async fn create_patient(&self, new: &NewPatient) -> anyhow::Result<Patient> {
        let mut inner = self.inner.lock().unwrap();
        let patient = Patient {
            id: format!("pat{}", inner.patients.len() + 1),
            first_name: new.first_name.clone(),
            last_name: new.last_name.clone(),
            phone: new.phone.clone(),
            email: new.email.clone(),
        };
        inner.patients.push(patient.clone());
        Ok(patient)
    }

    async fn list_providers(&self) -> anyhow::Result<Vec<Provider>> {
        Ok(vec![])
    }

    async fn list_operatories(&self) -> anyhow::Result<Vec<Operatory>> {
        Ok(vec![])
    }

    async fn appointments_on(
        &self,
        date: NaiveDate,
        operatory_id: Option<&str>,
    ) -> anyhow::Result<Vec<Appointment>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .appointments
            .iter()
            .filter(|a| {
                a.starts_at.date() == date && operatory_id.map_or(true, |op| a.operatory_id == op)
            })
            .cloned()
            .collect())
    }

    async fn provider_appointments_on(
        &self,
        date: NaiveDate,
        provider_id: &str,
    ) -> anyhow::Result<Vec<Appointment>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .appointments
            .iter()
            .filter(|a| a.starts_at.date() == date && a.provider_id == provider_id)
            .cloned()
            .collect())
    }

    async fn get_appointment(&self, id: &str) -> anyhow::Result<Appointment> {
        let inner = self.inner.lock().unwrap();
        inner
            .appointments
            .iter()
            .find(|a| a.id == id)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("appointment not found"))
    }

    async fn create_appointment(&self, new: &NewAppointment) -> anyhow::Result<Appointment> {
        let mut inner = self.inner.lock().unwrap();
        if inner.reject_priority && new.priority.is_some() {
            anyhow::bail!("validation failed: Priority is not accepted here");
        }
        inner.create_count += 1;
        let appt = Appointment {
            id: format!("appt{}", inner.create_count),
            patient_id: new.patient_id.clone(),
            starts_at: new.starts_at,
            duration_minutes: new.duration_minutes,
            provider_id: new.provider_id.clone(),
            operatory_id: new.operatory_id.clone(),
            status: AppointmentStatus::Scheduled,
            notes: new.notes.clone(),
        };
        inner.appointments.push(appt.clone());
        Ok(appt)
    }

    async fn update_appointment(
        &self,
        id: &str,
        patch: &AppointmentPatch,
    ) -> anyhow::Result<Appointment> {
        let mut inner = self.inner.lock().unwrap();
        let appt = inner
            .appointments
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| anyhow::anyhow!("appointment not found"))?;
        if let Some(starts_at) = patch.starts_at {
            appt.starts_at = starts_at;
        }
        if let Some(provider_id) = &patch.provider_id {
            appt.provider_id = provider_id.clone();
        }
        if let Some(operatory_id) = &patch.operatory_id {
            appt.operatory_id = operatory_id.clone();
        }
        Ok(appt.clone())
    }

    async fn break_appointment(&self, id: &str) -> anyhow::Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.break_count += 1;
        let appt = inner
            .appointments
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| anyhow::anyhow!("appointment not found"))?;
        appt.status = AppointmentStatus::Broken;
        Ok(())
    }

    async fn open_slots(&self, date: NaiveDate) -> anyhow::Result<Vec<Slot>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .slots
            .iter()
            .filter(|s| s.starts_at.date() == date)
            .cloned()
            .collect())
    }
}

// ── Helpers ──

fn dt(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
}

fn slot(s: &str) -> Slot {
    Slot {
        starts_at: dt(s),
        provider_id: "prov1".to_string(),
        operatory_id: "op1".to_string(),
    }
}

fn patient(id: &str, first: &str, last: &str, phone: &str) -> Patient {
    Patient {
        id: id.to_string(),
        first_name: first.to_string(),
        last_name: last.to_string(),
        phone: Some(phone.to_string()),
        email: None,
    }
}

fn tuesday_slots() -> Vec<Slot> {
    vec![
        slot("2025-06-17 09:00"),
        slot("2025-06-17 10:30"),
        slot("2025-06-17 14:00"),
    ]
}

async fn tool_round(
    mediator: &Mediator,
    booking: &mut BookingState,
    turns: &[Turn],
    raw_context: &str,
) -> String {
    let context = mediator.prepare(booking, turns, raw_context);
    let outcome = mediator.dispatch(turns.to_vec(), context).await;
    mediator.harvest(booking, turns, outcome)
}

// ── Scenario: book a cleaning for Tuesday at 2 ──

#[tokio::test]
async fn test_booking_scenario_with_duplicate_suppression() {
    let pms = MockPms::new(MockPmsInner {
        patients: vec![patient("pat1", "Maria", "Lopez", "+15550001111")],
        slots: tuesday_slots(),
        ..Default::default()
    });

    let (llm, prompts) = ScriptedLlm::new(vec![
        // 1: identify the caller
        r#"{"action":"lookup_patient","last_name":"Lopez","phone":"+15550001111","reply":"Let me pull up your file."}"#,
        // 2: find openings for Tuesday
        r#"{"action":"search_slots","date":"2025-06-17","reply":"Checking Tuesday."}"#,
        // 3: caller confirmed the 2 PM slot
        r#"{"action":"book","patient_id":"pat1","date":"2025-06-17","time":"14:00","provider_id":"prov1","operatory_id":"op1","reply":"Booking that now."}"#,
        // 4: repeat booking request after the guard kicked in
        r#"{"action":"answer","reply":"You're already booked for Tuesday at 2 PM."}"#,
    ]);

    let agent: Arc<dyn DecisionAgent> =
        Arc::new(PlannerAgent::new(Box::new(llm), pms.clone() as Arc<dyn PmsClient>));
    let mediator = Mediator::new(agent);
    let mut booking = BookingState::new();
    let mut turns = vec![Turn::new(Speaker::Caller, "Hi, this is Maria Lopez")];

    let reply = tool_round(&mediator, &mut booking, &turns, "caller gave name Maria Lopez").await;
    assert!(booking.patient_known());
    assert_eq!(reply, "Let me pull up your file.");

    // Caller names the day and the time in one breath.
    turns.push(Turn::new(
        Speaker::Caller,
        "Book a cleaning for Tuesday at 2",
    ));
    let reply = tool_round(
        &mediator,
        &mut booking,
        &turns,
        "caller wants a cleaning Tuesday June 17",
    )
    .await;
    assert!(reply.contains("9:00 AM"));
    assert!(reply.contains("2:00 PM"));
    assert_eq!(booking.candidate_slots().len(), 3);
    // Slot resolver matched the caller's own phrasing in the same turn.
    assert_eq!(
        booking.selected_slot().unwrap().starts_at,
        dt("2025-06-17 14:00")
    );

    turns.push(Turn::new(Speaker::Caller, "Yes, 2 PM works"));
    let reply = tool_round(&mediator, &mut booking, &turns, "caller confirmed 2 PM").await;
    assert!(reply.contains("all set"));
    assert!(booking.appointment_created());
    assert_eq!(pms.create_count(), 1);

    // An identical booking request later in the call must not create again.
    turns.push(Turn::new(
        Speaker::Caller,
        "Book a cleaning for Tuesday at 2",
    ));
    let reply = tool_round(
        &mediator,
        &mut booking,
        &turns,
        "caller asked to book Tuesday at 2 again",
    )
    .await;
    assert!(reply.contains("already booked"));
    assert_eq!(pms.create_count(), 1);

    // The guard text is what suppressed it: the fourth prompt carried it.
    let prompts = prompts.lock().unwrap();
    assert!(prompts[3].contains("APPOINTMENT ALREADY CREATED"));
    assert!(prompts[3].contains("Do not create another"));
    // And by then the earlier facts were established too.
    assert!(prompts[2].contains("EXISTING PATIENT: Maria Lopez"));
    assert!(prompts[2].contains("CALLER SELECTED: 2025-06-17 2:00 PM"));
}

// ── Scenario: household phone number maps to two patients ──

#[tokio::test]
async fn test_household_disambiguation_by_first_name() {
    let pms = MockPms::new(MockPmsInner {
        patients: vec![
            patient("pat1", "Maria", "Lopez", "+15550001111"),
            patient("pat2", "Diego", "Lopez", "+15550001111"),
        ],
        ..Default::default()
    });

    let (llm, _) = ScriptedLlm::new(vec![
        r#"{"action":"lookup_patient","phone":"+15550001111","reply":"One moment."}"#,
        r#"{"action":"lookup_patient","first_name":"Diego","phone":"+15550001111","reply":"Found you, Diego."}"#,
    ]);

    let agent: Arc<dyn DecisionAgent> =
        Arc::new(PlannerAgent::new(Box::new(llm), pms as Arc<dyn PmsClient>));
    let mediator = Mediator::new(agent);
    let mut booking = BookingState::new();
    let turns = vec![Turn::new(Speaker::Caller, "I'd like to come in")];

    let reply = tool_round(&mediator, &mut booking, &turns, "caller number +15550001111").await;
    assert!(reply.contains("Maria") && reply.contains("Diego"));
    assert!(!booking.patient_known());

    // First name alone is enough on the next turn.
    let reply = tool_round(&mediator, &mut booking, &turns, "caller says they are Diego").await;
    assert_eq!(reply, "Found you, Diego.");
    assert_eq!(booking.patient().unwrap().id, "pat2");
}

// ── Scenario: schedule conflict surfaces a speakable rejection ──

#[tokio::test]
async fn test_conflicting_booking_is_rejected_with_reason() {
    let pms = MockPms::new(MockPmsInner {
        appointments: vec![Appointment {
            id: "existing".to_string(),
            patient_id: "other".to_string(),
            starts_at: dt("2025-06-17 14:00"),
            duration_minutes: 60,
            provider_id: "prov1".to_string(),
            operatory_id: "op1".to_string(),
            status: AppointmentStatus::Scheduled,
            notes: None,
        }],
        slots: tuesday_slots(),
        ..Default::default()
    });

    let (llm, _) = ScriptedLlm::new(vec![
        r#"{"action":"book","patient_id":"pat1","date":"2025-06-17","time":"14:00","provider_id":"prov1","operatory_id":"op1","reply":"Booking you in."}"#,
    ]);

    let agent: Arc<dyn DecisionAgent> =
        Arc::new(PlannerAgent::new(Box::new(llm), pms.clone() as Arc<dyn PmsClient>));
    let mediator = Mediator::new(agent);
    let mut booking = BookingState::new();
    let turns = vec![Turn::new(Speaker::Caller, "2 PM Tuesday please")];

    let reply = tool_round(&mediator, &mut booking, &turns, "caller wants Tuesday 2 PM").await;
    assert!(reply.contains("already booked at 2:00 PM"));
    assert!(!booking.appointment_created());
    assert_eq!(pms.create_count(), 0);
}

// ── Scenario: cancel guard refuses a broken appointment ──

#[tokio::test]
async fn test_cancel_rejected_for_broken_appointment() {
    let pms = MockPms::new(MockPmsInner {
        appointments: vec![Appointment {
            id: "appt9".to_string(),
            patient_id: "pat1".to_string(),
            starts_at: dt("2025-06-17 14:00"),
            duration_minutes: 60,
            provider_id: "prov1".to_string(),
            operatory_id: "op1".to_string(),
            status: AppointmentStatus::Broken,
            notes: None,
        }],
        ..Default::default()
    });

    let (llm, _) = ScriptedLlm::new(vec![
        r#"{"action":"cancel","appointment_id":"appt9","reply":"Cancelling that."}"#,
    ]);

    let agent: Arc<dyn DecisionAgent> =
        Arc::new(PlannerAgent::new(Box::new(llm), pms as Arc<dyn PmsClient>));
    let mediator = Mediator::new(agent);
    let mut booking = BookingState::new();
    let turns = vec![Turn::new(Speaker::Caller, "cancel my appointment")];

    let reply = tool_round(&mediator, &mut booking, &turns, "caller wants to cancel appt9").await;
    assert!(reply.contains("marked broken"));
}

// ── Scenario: a scheduled appointment cancels cleanly ──

#[tokio::test]
async fn test_cancel_scheduled_appointment_allows_rebooking() {
    let pms = MockPms::new(MockPmsInner {
        appointments: vec![Appointment {
            id: "appt5".to_string(),
            patient_id: "pat1".to_string(),
            starts_at: dt("2025-06-17 14:00"),
            duration_minutes: 60,
            provider_id: "prov1".to_string(),
            operatory_id: "op1".to_string(),
            status: AppointmentStatus::Scheduled,
            notes: None,
        }],
        ..Default::default()
    });

    let (llm, _) = ScriptedLlm::new(vec![
        r#"{"action":"cancel","appointment_id":"appt5","reply":"Cancelling."}"#,
    ]);

    let agent: Arc<dyn DecisionAgent> =
        Arc::new(PlannerAgent::new(Box::new(llm), pms.clone() as Arc<dyn PmsClient>));
    let mediator = Mediator::new(agent);
    let mut booking = BookingState::new();
    booking.record_appointment("appt5".to_string());
    let turns = vec![Turn::new(Speaker::Caller, "please cancel my appointment")];

    let reply = tool_round(&mediator, &mut booking, &turns, "caller cancels appt5").await;
    assert!(reply.contains("cancelled"));
    assert_eq!(pms.break_count(), 1);
    // The ledger forgets the appointment, so the caller can book again.
    assert!(!booking.appointment_created());
}

// ── Scenario: rejected optional attribute is stripped and the create retried ──

#[tokio::test]
async fn test_asap_priority_stripped_and_create_retried() {
    let pms = MockPms::new(MockPmsInner {
        slots: tuesday_slots(),
        reject_priority: true,
        ..Default::default()
    });

    let (llm, _) = ScriptedLlm::new(vec![
        r#"{"action":"book","patient_id":"pat1","date":"2025-06-17","time":"14:00","provider_id":"prov1","operatory_id":"op1","asap":true,"reply":"Booking that now."}"#,
    ]);

    let agent: Arc<dyn DecisionAgent> =
        Arc::new(PlannerAgent::new(Box::new(llm), pms.clone() as Arc<dyn PmsClient>));
    let mediator = Mediator::new(agent);
    let mut booking = BookingState::new();
    let turns = vec![Turn::new(Speaker::Caller, "soonest you have, Tuesday at 2")];

    let reply = tool_round(&mediator, &mut booking, &turns, "caller wants asap Tuesday 2 PM").await;
    assert!(reply.contains("all set"));
    assert!(booking.appointment_created());
    assert_eq!(pms.create_count(), 1);
}

// ── Scenario: planner failure never reaches the caller as an error ──

#[tokio::test]
async fn test_planner_failure_yields_holding_reply() {
    let pms = MockPms::new(MockPmsInner::default());
    let agent: Arc<dyn DecisionAgent> = Arc::new(PlannerAgent::new(
        Box::new(FailingLlm),
        pms as Arc<dyn PmsClient>,
    ));
    let mediator = Mediator::new(agent);
    let mut booking = BookingState::new();
    let turns = vec![Turn::new(Speaker::Caller, "hello?")];

    let reply = tool_round(&mediator, &mut booking, &turns, "anything").await;
    assert_eq!(reply, HOLDING_REPLY);
}

// ── Scenario: malformed plan JSON retried once with a degraded prompt ──

#[tokio::test]
async fn test_malformed_plan_retries_once() {
    let pms = MockPms::new(MockPmsInner::default());
    let (llm, prompts) = ScriptedLlm::new(vec![
        "I think the caller wants an appointment?",
        r#"{"action":"answer","reply":"How can I help?"}"#,
    ]);

    let agent: Arc<dyn DecisionAgent> =
        Arc::new(PlannerAgent::new(Box::new(llm), pms as Arc<dyn PmsClient>));
    let mediator = Mediator::new(agent);
    let mut booking = BookingState::new();
    let turns = vec![Turn::new(Speaker::Caller, "hi")];

    let reply = tool_round(&mediator, &mut booking, &turns, "greeting").await;
    assert_eq!(reply, "How can I help?");
    assert_eq!(prompts.lock().unwrap().len(), 2);
}

// ── Handler tests ──

struct StubAgent;

#[async_trait]
impl DecisionAgent for StubAgent {
    async fn decide(&self, _turns: &[Turn], _context: &str) -> anyhow::Result<DecisionOutcome> {
        Ok(DecisionOutcome {
            reply: "ok".to_string(),
            operations: vec![],
        })
    }
}

fn test_config() -> AppConfig {
    AppConfig {
        port: 3000,
        database_url: ":memory:".to_string(),
        public_host: "frontdesk.example.com".to_string(),
        gateway_auth_token: "".to_string(), // empty = skip signature validation
        llm_provider: "ollama".to_string(),
        llm_base_url: "https://api.openai.com/v1".to_string(),
        llm_api_key: "".to_string(),
        llm_model: "gpt-4o-mini".to_string(),
        ollama_url: "http://localhost:11434".to_string(),
        ollama_model: "llama3.2".to_string(),
        speech_url: "wss://localhost/realtime".to_string(),
        speech_api_key: "".to_string(),
        speech_voice: "alloy".to_string(),
        pms_base_url: "http://localhost:8080/api".to_string(),
        pms_api_key: "".to_string(),
        keepalive_secs: 15,
    }
}

fn test_state() -> Arc<AppState> {
    let conn = db::init_db(":memory:").unwrap();
    Arc::new(AppState {
        db: Arc::new(Mutex::new(conn)),
        config: test_config(),
        decision: Arc::new(StubAgent),
        pending_calls: Mutex::new(HashMap::new()),
        sessions: Mutex::new(HashMap::new()),
    })
}

fn test_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/voice/answer", post(handlers::voice::answer))
        .route("/api/admin/sessions", get(handlers::admin::get_sessions))
        .route("/api/admin/calls", get(handlers::admin::get_calls))
        .with_state(state)
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = test_router(test_state());
    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_answer_webhook_returns_stream_twiml_and_registers_call() {
    let state = test_state();
    let app = test_router(Arc::clone(&state));

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/voice/answer")
                .header("Content-Type", "application/x-www-form-urlencoded")
                .body(Body::from(
                    "CallSid=CA123&From=%2B15550001111&To=%2B15559990000&CallStatus=ringing",
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    assert!(content_type.contains("xml"));

    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .unwrap();
    let twiml = String::from_utf8(body.to_vec()).unwrap();
    assert!(twiml.contains("wss://frontdesk.example.com/voice/media"));

    let pending = state.pending_calls.lock().unwrap();
    assert_eq!(pending.get("CA123").unwrap().from, "+15550001111");
}

#[tokio::test]
async fn test_admin_sessions_lists_active_calls() {
    let state = test_state();
    state.sessions.lock().unwrap().insert(
        "MZ1".to_string(),
        frontdesk::session::SessionInfo {
            call_sid: "CA1".to_string(),
            caller: Some("+15550001111".to_string()),
            started_at: chrono::Utc::now().naive_utc(),
        },
    );
    let app = test_router(Arc::clone(&state));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/admin/sessions")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .unwrap();
    let sessions: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(sessions.as_array().unwrap().len(), 1);
    assert_eq!(sessions[0]["call_sid"], "CA1");
}

#[tokio::test]
async fn test_admin_calls_empty_on_fresh_db() {
    let app = test_router(test_state());
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/admin/calls")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .unwrap();
    let calls: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert!(calls.as_array().unwrap().is_empty());
}
