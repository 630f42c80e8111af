use serde::{Deserialize, Serialize};

/// The single operation the planning agent decided to run this turn.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum PlanAction {
    LookupPatient,
    CreatePatient,
    SearchSlots,
    Book,
    Reschedule,
    Cancel,
    Answer,
}

/// Structured output of one planning-LLM call. Optional fields are filled
/// only when the action needs them; `reply` is always present and is what the
/// caller ultimately hears unless a schedule rejection overrides it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentPlan {
    pub action: PlanAction,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub patient_id: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub provider_id: Option<String>,
    pub operatory_id: Option<String>,
    pub appointment_id: Option<String>,
    pub duration_minutes: Option<i32>,
    pub notes: Option<String>,
    /// True when the caller is starting a separate, additional booking after
    /// one was already made this call.
    #[serde(default)]
    pub new_intent: bool,
    /// Ask the practice to slot the patient in sooner if anything opens up.
    #[serde(default)]
    pub asap: bool,
    pub reply: String,
}
