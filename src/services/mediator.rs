use std::sync::Arc;

use crate::models::{Speaker, Turn};
use crate::services::booking_state::BookingState;
use crate::services::decision::{DecisionAgent, DecisionOutcome, OperationResult};
use crate::services::slot_resolver;

/// Spoken when the decision agent fails for any reason. The conversation
/// never hard-fails from the caller's side.
pub const HOLDING_REPLY: &str =
    "I'm sorry, I'm having a little trouble with that right now. Could you say that once more?";

/// Sits between the realtime speech agent and the decision agent: enriches
/// each tool request with the booking state's guard context, and folds the
/// decision agent's structured results back into that state.
///
/// Prepare and harvest are synchronous against the session's own state; the
/// decision call itself runs wherever the session wants it to, so a
/// disconnect can abandon it mid-flight.
#[derive(Clone)]
pub struct Mediator {
    decision: Arc<dyn DecisionAgent>,
}

impl Mediator {
    pub fn new(decision: Arc<dyn DecisionAgent>) -> Self {
        Self { decision }
    }

    /// Steps before dispatch: match the caller's latest words against pending
    /// candidate slots, then prepend the guard context to the raw tool text.
    pub fn prepare(&self, booking: &mut BookingState, turns: &[Turn], raw_context: &str) -> String {
        if booking.slots_queried() && booking.selected_slot().is_none() {
            if let Some(utterance) = last_caller_text(turns) {
                if let Some(slot) =
                    slot_resolver::resolve(utterance, booking.candidate_slots()).cloned()
                {
                    booking.record_selection(slot);
                }
            }
        }

        let guard = booking.guard_context();
        if guard.is_empty() {
            raw_context.to_string()
        } else {
            format!("{guard}\n\n{raw_context}")
        }
    }

    pub async fn dispatch(
        &self,
        turns: Vec<Turn>,
        context: String,
    ) -> anyhow::Result<DecisionOutcome> {
        self.decision.decide(&turns, &context).await
    }

    /// Fold the outcome into the booking state and produce the reply the
    /// speech agent should speak. Errors become the fixed holding reply.
    pub fn harvest(
        &self,
        booking: &mut BookingState,
        turns: &[Turn],
        outcome: anyhow::Result<DecisionOutcome>,
    ) -> String {
        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(error = %e, "decision agent failed, holding reply");
                return HOLDING_REPLY.to_string();
            }
        };

        for op in outcome.operations {
            match op {
                OperationResult::IntentReset => booking.begin_new_intent(),
                OperationResult::PatientFound(p) | OperationResult::PatientCreated(p) => {
                    booking.record_patient(p)
                }
                OperationResult::SlotsFound(slots) => {
                    booking.record_slots(slots);
                    // The caller may have named a time in the same breath as
                    // the date ("Tuesday at 2"); match it right away.
                    if let Some(utterance) = last_caller_text(turns) {
                        if let Some(slot) =
                            slot_resolver::resolve(utterance, booking.candidate_slots()).cloned()
                        {
                            booking.record_selection(slot);
                        }
                    }
                }
                OperationResult::Booked { appointment_id }
                | OperationResult::Rescheduled { appointment_id } => {
                    booking.record_appointment(appointment_id)
                }
                OperationResult::Cancelled { .. } => booking.record_cancelled(),
                OperationResult::Rejected { reason } => {
                    tracing::info!(reason = %reason, "decision agent rejected a write");
                }
            }
        }

        outcome.reply
    }
}

fn last_caller_text(turns: &[Turn]) -> Option<&str> {
    turns
        .iter()
        .rev()
        .find(|t| t.speaker == Speaker::Caller)
        .map(|t| t.text.as_str())
}
