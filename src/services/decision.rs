use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::models::{
    AgentPlan, Appointment, NewPatient, PatientRef, PlanAction, ProposedAppointment, Slot, Speaker,
    Turn,
};
use crate::services::ai::{LlmProvider, Message};
use crate::services::conflict::{self, StatusGuardError};
use crate::services::pms::{AppointmentPatch, NewAppointment, PatientQuery, PmsClient};

/// What the decision agent did this turn, typed so the mediator can fold the
/// results into the booking state without re-parsing anything.
#[derive(Debug, Clone)]
pub enum OperationResult {
    IntentReset,
    PatientFound(PatientRef),
    PatientCreated(PatientRef),
    SlotsFound(Vec<Slot>),
    Booked { appointment_id: String },
    Rescheduled { appointment_id: String },
    Cancelled { appointment_id: String },
    Rejected { reason: String },
}

#[derive(Debug)]
pub struct DecisionOutcome {
    pub reply: String,
    pub operations: Vec<OperationResult>,
}

impl DecisionOutcome {
    fn reply_only(reply: String) -> Self {
        Self {
            reply,
            operations: Vec::new(),
        }
    }
}

/// The slower, tool-executing agent. Given the conversation so far and the
/// enriched request context, it performs whatever practice-management work the
/// caller's request needs and comes back with something to say.
#[async_trait]
pub trait DecisionAgent: Send + Sync {
    async fn decide(&self, turns: &[Turn], context: &str) -> anyhow::Result<DecisionOutcome>;
}

const SYSTEM_PROMPT: &str = r#"You are the scheduling brain of a clinic's phone assistant. Decide the single next operation for the caller's latest request, honoring every directive line in the request context: they describe what is already established, never repeat those operations.

Return ONLY valid JSON (no markdown, no explanation) with this exact structure:
{
  "action": "lookup_patient|create_patient|search_slots|book|reschedule|cancel|answer",
  "first_name": "string or null",
  "last_name": "string or null",
  "phone": "string or null",
  "patient_id": "string or null",
  "date": "YYYY-MM-DD or null",
  "time": "HH:MM 24-hour or null",
  "provider_id": "string or null",
  "operatory_id": "string or null",
  "appointment_id": "string or null",
  "duration_minutes": 60,
  "notes": "string or null",
  "new_intent": false,
  "asap": false,
  "reply": "What to say to the caller"
}

Rules:
- "lookup_patient" needs at least a name or phone number; "create_patient" needs first and last name.
- "search_slots" needs a date. When the caller has picked a time from offered slots and confirmed, use "book" with that slot's provider_id and operatory_id from the context.
- "reschedule" and "cancel" need the appointment_id from the context.
- Set "new_intent" true only when an appointment already exists this call and the caller asks to book a separate, additional visit.
- "answer" performs nothing; use it for questions, confirmations still pending, or when you need more information: put what you need in "reply".
- Keep "reply" short, warm, and speakable."#;

struct StripRule {
    /// Substring matched against the create error, lowercased.
    signature: &'static str,
    field: &'static str,
}

/// Some practice-management deployments reject optional attributes with a
/// validation error; the matching attribute is removed and the create retried
/// once. Keyed by error signature rather than hardcoded at a call site.
const STRIP_RULES: &[StripRule] = &[StripRule {
    signature: "priority",
    field: "priority",
}];

pub struct PlannerAgent {
    llm: Box<dyn LlmProvider>,
    pms: Arc<dyn PmsClient>,
    default_duration_minutes: i32,
}

impl PlannerAgent {
    pub fn new(llm: Box<dyn LlmProvider>, pms: Arc<dyn PmsClient>) -> Self {
        Self {
            llm,
            pms,
            default_duration_minutes: 60,
        }
    }

    async fn plan(&self, turns: &[Turn], context: &str) -> anyhow::Result<AgentPlan> {
        let mut messages: Vec<Message> = turns
            .iter()
            .map(|t| Message {
                role: match t.speaker {
                    Speaker::Caller => "user".to_string(),
                    Speaker::Agent => "assistant".to_string(),
                },
                content: t.text.clone(),
            })
            .collect();
        messages.push(Message {
            role: "user".to_string(),
            content: context.to_string(),
        });

        let today = chrono::Utc::now().naive_utc().date();
        let system = format!("{SYSTEM_PROMPT}\n\nToday's date: {today}.");

        let raw = self.llm.chat(&system, &messages).await?;
        if let Some(plan) = parse_plan(&raw) {
            return Ok(plan);
        }

        // Malformed plan JSON is treated as transient: one retry with a
        // degraded prompt before giving up.
        tracing::warn!("planner returned malformed JSON, retrying with degraded prompt");
        let degraded = format!(
            "{system}\n\nYour previous answer was not valid JSON. Respond with ONLY the JSON object described above, nothing else."
        );
        let raw = self.llm.chat(&degraded, &messages).await?;
        parse_plan(&raw).context("planner returned malformed JSON twice")
    }

    async fn execute(&self, plan: AgentPlan) -> anyhow::Result<DecisionOutcome> {
        let mut operations = Vec::new();
        if plan.new_intent {
            operations.push(OperationResult::IntentReset);
        }

        let mut outcome = match plan.action {
            PlanAction::Answer => DecisionOutcome::reply_only(plan.reply.clone()),
            PlanAction::LookupPatient => self.lookup_patient(&plan).await?,
            PlanAction::CreatePatient => self.create_patient(&plan).await?,
            PlanAction::SearchSlots => self.search_slots(&plan).await?,
            PlanAction::Book => self.book(&plan).await?,
            PlanAction::Reschedule => self.reschedule(&plan).await?,
            PlanAction::Cancel => self.cancel(&plan).await?,
        };

        let mut all = operations;
        all.append(&mut outcome.operations);
        Ok(DecisionOutcome {
            reply: outcome.reply,
            operations: all,
        })
    }

    async fn lookup_patient(&self, plan: &AgentPlan) -> anyhow::Result<DecisionOutcome> {
        let query = PatientQuery {
            first_name: plan.first_name.clone(),
            last_name: plan.last_name.clone(),
            phone: plan.phone.clone(),
        };
        if query.is_empty() {
            return Ok(DecisionOutcome::reply_only(plan.reply.clone()));
        }

        let matches = self.pms.search_patients(&query).await?;
        Ok(match matches.len() {
            0 => DecisionOutcome::reply_only(plan.reply.clone()),
            1 => DecisionOutcome {
                reply: plan.reply.clone(),
                operations: vec![OperationResult::PatientFound(matches[0].to_ref())],
            },
            _ => {
                // Household number shared by several patients: ask which one.
                let names: Vec<String> =
                    matches.iter().map(|p| p.first_name.clone()).collect();
                DecisionOutcome::reply_only(format!(
                    "I found a few people under that number. Is this {}?",
                    join_or(&names)
                ))
            }
        })
    }

    async fn create_patient(&self, plan: &AgentPlan) -> anyhow::Result<DecisionOutcome> {
        let (Some(first), Some(last)) = (plan.first_name.clone(), plan.last_name.clone()) else {
            return Ok(DecisionOutcome::reply_only(plan.reply.clone()));
        };
        let patient = self
            .pms
            .create_patient(&NewPatient {
                first_name: first,
                last_name: last,
                phone: plan.phone.clone(),
                email: None,
            })
            .await?;
        Ok(DecisionOutcome {
            reply: plan.reply.clone(),
            operations: vec![OperationResult::PatientCreated(patient.to_ref())],
        })
    }

    async fn search_slots(&self, plan: &AgentPlan) -> anyhow::Result<DecisionOutcome> {
        let Some(date) = plan.date.as_deref().and_then(parse_date) else {
            return Ok(DecisionOutcome::reply_only(plan.reply.clone()));
        };
        let slots = self.pms.open_slots(date).await?;
        if slots.is_empty() {
            return Ok(DecisionOutcome::reply_only(format!(
                "I don't have any openings on {}. Would another day work?",
                speakable_date(date)
            )));
        }

        let times: Vec<String> = slots
            .iter()
            .map(|s| speakable_time(s.starts_at))
            .collect();
        let reply = format!(
            "On {} I have {}. Which works best for you?",
            speakable_date(date),
            join_or(&times)
        );
        Ok(DecisionOutcome {
            reply,
            operations: vec![OperationResult::SlotsFound(slots)],
        })
    }

    async fn book(&self, plan: &AgentPlan) -> anyhow::Result<DecisionOutcome> {
        let Some(starts_at) = plan_datetime(plan) else {
            return Ok(DecisionOutcome::reply_only(plan.reply.clone()));
        };
        let Some(patient_id) = plan.patient_id.clone() else {
            return Ok(DecisionOutcome::reply_only(plan.reply.clone()));
        };

        let (provider_id, operatory_id) =
            match self.resolve_slot_ids(plan, starts_at).await? {
                Some(ids) => ids,
                None => {
                    return Ok(DecisionOutcome {
                        reply: format!(
                            "I'm sorry, {} isn't open after all. Could we look at another time?",
                            speakable_time(starts_at)
                        ),
                        operations: vec![OperationResult::Rejected {
                            reason: "requested time is not an open slot".to_string(),
                        }],
                    })
                }
            };

        let proposed = ProposedAppointment {
            starts_at,
            provider_id: provider_id.clone(),
            operatory_id: operatory_id.clone(),
            exclude_appointment_id: None,
        };
        let check = conflict::check(self.pms.as_ref(), &proposed).await;
        if check.conflict {
            let reason = check.reason.unwrap_or_else(|| "that time is taken".to_string());
            return Ok(DecisionOutcome {
                reply: format!("I'm sorry, that time is {reason}. Could we try a different time?"),
                operations: vec![OperationResult::Rejected { reason }],
            });
        }

        let new = NewAppointment {
            patient_id,
            starts_at,
            duration_minutes: plan
                .duration_minutes
                .unwrap_or(self.default_duration_minutes),
            provider_id,
            operatory_id,
            notes: plan.notes.clone(),
            priority: plan.asap.then(|| "asap".to_string()),
        };
        let appt = self.create_with_strip_policy(&new).await?;

        let with_provider = self
            .provider_name(&appt.provider_id)
            .await
            .map(|name| format!(" with {name}"))
            .unwrap_or_default();
        Ok(DecisionOutcome {
            reply: format!(
                "You're all set for {}{}. Is there anything else I can help with?",
                speakable(appt.starts_at),
                with_provider
            ),
            operations: vec![OperationResult::Booked {
                appointment_id: appt.id,
            }],
        })
    }

    async fn reschedule(&self, plan: &AgentPlan) -> anyhow::Result<DecisionOutcome> {
        let Some(appointment_id) = plan.appointment_id.clone() else {
            return Ok(DecisionOutcome::reply_only(plan.reply.clone()));
        };
        let Some(starts_at) = plan_datetime(plan) else {
            return Ok(DecisionOutcome::reply_only(plan.reply.clone()));
        };

        let current = self.pms.get_appointment(&appointment_id).await?;
        let (provider_id, operatory_id) = match self.resolve_slot_ids(plan, starts_at).await? {
            Some(ids) => ids,
            None => (current.provider_id.clone(), current.operatory_id.clone()),
        };

        let proposed = ProposedAppointment {
            starts_at,
            provider_id: provider_id.clone(),
            operatory_id: operatory_id.clone(),
            exclude_appointment_id: Some(appointment_id.clone()),
        };
        let check = conflict::check(self.pms.as_ref(), &proposed).await;
        if check.conflict {
            let reason = check.reason.unwrap_or_else(|| "that time is taken".to_string());
            return Ok(DecisionOutcome {
                reply: format!("I'm sorry, that time is {reason}. Could we try a different time?"),
                operations: vec![OperationResult::Rejected { reason }],
            });
        }

        let patch = AppointmentPatch {
            starts_at: Some(starts_at),
            provider_id: Some(provider_id),
            operatory_id: Some(operatory_id),
            status: None,
        };
        let appt = self.pms.update_appointment(&appointment_id, &patch).await?;

        Ok(DecisionOutcome {
            reply: format!("Done, you're moved to {}.", speakable(appt.starts_at)),
            operations: vec![OperationResult::Rescheduled {
                appointment_id: appt.id,
            }],
        })
    }

    async fn cancel(&self, plan: &AgentPlan) -> anyhow::Result<DecisionOutcome> {
        let Some(appointment_id) = plan.appointment_id.clone() else {
            return Ok(DecisionOutcome::reply_only(plan.reply.clone()));
        };

        let appt = match conflict::guard_cancellable(self.pms.as_ref(), &appointment_id).await {
            Ok(appt) => appt,
            Err(StatusGuardError::WrongStatus { status }) => {
                let reason = format!("appointment is {status}, not scheduled");
                return Ok(DecisionOutcome {
                    reply: format!(
                        "I'm sorry, that appointment is currently marked {status}, so I can't cancel it. Is there something else I can help with?"
                    ),
                    operations: vec![OperationResult::Rejected { reason }],
                });
            }
            Err(StatusGuardError::Lookup(e)) => return Err(e),
        };

        self.pms.break_appointment(&appointment_id).await?;
        Ok(DecisionOutcome {
            reply: format!(
                "Your appointment on {} is cancelled. Would you like to pick a new time?",
                speakable(appt.starts_at)
            ),
            operations: vec![OperationResult::Cancelled {
                appointment_id: appt.id,
            }],
        })
    }

    /// Provider/operatory for a requested time: the plan carries them when the
    /// caller picked from offered slots; otherwise re-derive from the day's
    /// open slots.
    async fn resolve_slot_ids(
        &self,
        plan: &AgentPlan,
        starts_at: NaiveDateTime,
    ) -> anyhow::Result<Option<(String, String)>> {
        if let (Some(p), Some(o)) = (plan.provider_id.clone(), plan.operatory_id.clone()) {
            return Ok(Some((p, o)));
        }
        let slots = self.pms.open_slots(starts_at.date()).await?;
        Ok(slots
            .iter()
            .find(|s| s.starts_at == starts_at)
            .map(|s| (s.provider_id.clone(), s.operatory_id.clone())))
    }

    /// Best-effort: a failed directory lookup just drops the name from the
    /// confirmation.
    async fn provider_name(&self, provider_id: &str) -> Option<String> {
        self.pms
            .list_providers()
            .await
            .ok()?
            .into_iter()
            .find(|p| p.id == provider_id)
            .map(|p| p.name)
    }

    async fn create_with_strip_policy(&self, new: &NewAppointment) -> anyhow::Result<Appointment> {
        match self.pms.create_appointment(new).await {
            Ok(appt) => Ok(appt),
            Err(e) => {
                let message = e.to_string().to_lowercase();
                for rule in STRIP_RULES {
                    if message.contains(rule.signature) {
                        let mut stripped = new.clone();
                        if strip_field(&mut stripped, rule.field) {
                            tracing::warn!(
                                field = rule.field,
                                "create rejected the optional attribute, retrying without it"
                            );
                            return self.pms.create_appointment(&stripped).await;
                        }
                    }
                }
                Err(e)
            }
        }
    }
}

#[async_trait]
impl DecisionAgent for PlannerAgent {
    async fn decide(&self, turns: &[Turn], context: &str) -> anyhow::Result<DecisionOutcome> {
        let plan = self.plan(turns, context).await?;
        tracing::info!(action = ?plan.action, "executing plan");
        self.execute(plan).await
    }
}

fn strip_field(new: &mut NewAppointment, field: &str) -> bool {
    match field {
        "priority" => new.priority.take().is_some(),
        "notes" => new.notes.take().is_some(),
        _ => false,
    }
}

fn parse_plan(response: &str) -> Option<AgentPlan> {
    if let Ok(plan) = serde_json::from_str::<AgentPlan>(response) {
        return Some(plan);
    }

    // Strip markdown code fences
    let cleaned = response
        .trim()
        .strip_prefix("```json")
        .or_else(|| response.trim().strip_prefix("```"))
        .unwrap_or(response.trim());
    let cleaned = cleaned.strip_suffix("```").unwrap_or(cleaned).trim();

    if let Ok(plan) = serde_json::from_str::<AgentPlan>(cleaned) {
        return Some(plan);
    }

    // Last resort: the first {...} span in the response
    if let (Some(start), Some(end)) = (cleaned.find('{'), cleaned.rfind('}')) {
        if start < end {
            if let Ok(plan) = serde_json::from_str::<AgentPlan>(&cleaned[start..=end]) {
                return Some(plan);
            }
        }
    }

    None
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

fn parse_time(s: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(s, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(s, "%I:%M %p"))
        .ok()
}

fn plan_datetime(plan: &AgentPlan) -> Option<NaiveDateTime> {
    let date = plan.date.as_deref().and_then(parse_date)?;
    let time = plan.time.as_deref().and_then(parse_time)?;
    Some(date.and_time(time))
}

fn speakable(dt: NaiveDateTime) -> String {
    format!("{} at {}", speakable_date(dt.date()), speakable_time(dt))
}

fn speakable_date(date: NaiveDate) -> String {
    date.format("%A, %B %-d").to_string()
}

fn speakable_time(dt: NaiveDateTime) -> String {
    dt.format("%-I:%M %p").to_string()
}

fn join_or(items: &[String]) -> String {
    match items.len() {
        0 => String::new(),
        1 => items[0].clone(),
        _ => format!(
            "{} or {}",
            items[..items.len() - 1].join(", "),
            items[items.len() - 1]
        ),
    }
}
